use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::role::Role;
use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}

fn issue(
    account_id: u64,
    user_id: String,
    role: Role,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = Claims {
        account_id,
        sub: user_id,
        role: role.id(),
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn generate_access_token(
    account_id: u64,
    user_id: String,
    role: Role,
    secret: &str,
    ttl: usize,
) -> Result<String, Error> {
    issue(account_id, user_id, role, TokenType::Access, secret, ttl).map(|(token, _)| token)
}

pub fn generate_refresh_token(
    account_id: u64,
    user_id: String,
    role: Role,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    issue(account_id, user_id, role, TokenType::Refresh, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_round_trips() {
        let token =
            generate_access_token(7, "INS001".to_string(), Role::Instructor, "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.account_id, 7);
        assert_eq!(claims.sub, "INS001");
        assert_eq!(Role::from_id(claims.role), Some(Role::Instructor));
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_token_carries_its_claims() {
        let (token, claims) =
            generate_refresh_token(3, "02230001".to_string(), Role::Student, "secret", 60).unwrap();
        let decoded = verify_token(&token, "secret").unwrap();

        assert_eq!(decoded.jti, claims.jti);
        assert_eq!(decoded.token_type, TokenType::Refresh);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(1, "ADM".to_string(), Role::Admin, "secret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }
}
