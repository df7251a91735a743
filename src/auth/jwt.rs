use crate::error::{AppError, Result};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims issued by the identity provider. Only `sub` is trusted here.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: i64,
}

/// Verify JWT token and extract claims
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
}

/// Resolve the caller id from an `Authorization: Bearer` header value.
pub fn authenticate(auth_header: Option<&str>, secret: &str) -> Result<Uuid> {
    let token = auth_header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized("Invalid credentials".to_string()))?;

    let claims = verify_jwt(token, secret)?;

    Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
}

#[cfg(test)]
pub fn create_access_token(user_id: Uuid, secret: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::minutes(15)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token encodes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate_round_trip() {
        let user_id = Uuid::new_v4();
        let token = create_access_token(user_id, "secret");
        let header = format!("Bearer {token}");

        assert_eq!(authenticate(Some(&header), "secret").unwrap(), user_id);
    }

    #[test]
    fn test_authenticate_rejects_bad_input() {
        let token = create_access_token(Uuid::new_v4(), "secret");

        assert!(matches!(authenticate(None, "secret"), Err(AppError::Unauthorized(_))));
        assert!(matches!(
            authenticate(Some(&token), "secret"),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            authenticate(Some(&format!("Bearer {token}")), "other-secret"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
