use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::core::config::AuthConfig;

/// Claims carried by session tokens: user id, email, expiry.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub exp: usize,
}

/// HS256 signing/verification keys derived from the configured secret.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl JwtKeys {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            expiry: config.token_expiry,
        }
    }

    /// Sign a session token for a user.
    pub fn sign(&self, user_id: i64, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = (Utc::now() + self.expiry).timestamp() as usize;

        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            exp,
        };

        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Verify a token and return its claims. Expired or tampered tokens fail.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(secret: &str, expiry_secs: u64) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            token_expiry: Duration::from_secs(expiry_secs),
        }
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let keys = JwtKeys::new(&test_config("test-secret", 3600));

        let token = keys.sign(42, "user@example.com").unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "user@example.com");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let keys = JwtKeys::new(&test_config("secret-a", 3600));
        let other = JwtKeys::new(&test_config("secret-b", 3600));

        let token = keys.sign(1, "user@example.com").unwrap();
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Default validation applies 60s leeway, so back-date well past it.
        let keys = JwtKeys::new(&test_config("test-secret", 3600));

        let claims = Claims {
            sub: 7,
            email: "user@example.com".to_string(),
            exp: (Utc::now().timestamp() - 600) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let keys = JwtKeys::new(&test_config("test-secret", 3600));
        assert!(keys.verify("not-a-token").is_err());
    }
}
