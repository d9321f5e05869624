use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Which login form the user came through. Faculty ids are resolved against
/// admins first and instructors second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase", try_from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LoginRole {
    Faculty,
    Student,
}

impl TryFrom<String> for LoginRole {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.trim().parse()
    }
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "02230001")]
    pub user_id: String,
    pub password: String,
    pub role: LoginRole,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordReq {
    pub current_password: String,
    pub new_password: String,
}

/// Credentials row shared by the three account tables.
#[derive(FromRow)]
pub struct AccountSql {
    pub id: u64,
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Database id in the role's account table
    pub account_id: u64,
    /// College user id
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_role_is_case_insensitive() {
        let req: LoginReqDto = serde_json::from_str(
            r#"{"user_id": "INS001", "password": "secret", "role": "Faculty"}"#,
        )
        .unwrap();
        assert_eq!(req.role, LoginRole::Faculty);
    }

    #[test]
    fn unknown_login_role_is_rejected() {
        let res = serde_json::from_str::<LoginReqDto>(
            r#"{"user_id": "x", "password": "y", "role": "janitor"}"#,
        );
        assert!(res.is_err());
    }
}
