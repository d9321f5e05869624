use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorForbidden,
    error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Database id in the role's account table
    pub account_id: u64,
    pub user_id: String,
    pub role: Role,
}

impl AuthUser {
    /// Decodes an access token from a `Bearer` header value.
    pub fn from_bearer(header: &str, secret: &str) -> Result<Self, &'static str> {
        let token = header
            .strip_prefix("Bearer ")
            .ok_or("Authorization header must start with Bearer")?;

        let claims = verify_token(token, secret).map_err(|_| "Invalid or expired token")?;
        if claims.token_type != TokenType::Access {
            return Err("Access token required");
        }

        let role = Role::from_id(claims.role).ok_or("Invalid role")?;

        Ok(AuthUser {
            account_id: claims.account_id,
            user_id: claims.sub,
            role,
        })
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Set by auth_middleware on protected scopes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let header = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
        {
            Some(h) => h,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        ready(AuthUser::from_bearer(header, &config.jwt_secret).map_err(ErrorUnauthorized))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ErrorForbidden("Admin only"))
        }
    }

    pub fn require_instructor_or_admin(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Instructor) {
            Ok(())
        } else {
            Err(ErrorForbidden("Instructor/Admin only"))
        }
    }

    pub fn require_student(&self) -> actix_web::Result<()> {
        if self.role == Role::Student {
            Ok(())
        } else {
            Err(ErrorForbidden("Student only"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{generate_access_token, generate_refresh_token};

    #[test]
    fn bearer_access_token_is_accepted() {
        let token =
            generate_access_token(5, "INS001".to_string(), Role::Instructor, "k", 60).unwrap();
        let user = AuthUser::from_bearer(&format!("Bearer {token}"), "k").unwrap();
        assert_eq!(user.account_id, 5);
        assert_eq!(user.user_id, "INS001");
        assert!(user.require_instructor_or_admin().is_ok());
        assert!(user.require_admin().is_err());
    }

    #[test]
    fn refresh_token_cannot_authorize_requests() {
        let (token, _) =
            generate_refresh_token(5, "INS001".to_string(), Role::Instructor, "k", 60).unwrap();
        let err = AuthUser::from_bearer(&format!("Bearer {token}"), "k").unwrap_err();
        assert_eq!(err, "Access token required");
    }

    #[test]
    fn header_without_bearer_prefix_is_rejected() {
        assert!(AuthUser::from_bearer("Token abc", "k").is_err());
    }
}
