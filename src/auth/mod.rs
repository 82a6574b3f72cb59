use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::tenant::TenantId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub user_id: i64,
    pub tenant_id: TenantId,
    #[serde(default)]
    pub roles: Vec<i32>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        sub: impl Into<String>,
        user_id: i64,
        tenant_id: TenantId,
        roles: Vec<i32>,
        permissions: Vec<String>,
        expiry_hours: u64,
    ) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: sub.into(),
            user_id,
            tenant_id,
            roles,
            permissions,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

/// HS256 signing material derived from the security config
#[derive(Clone)]
pub struct JwtKeys {
    secret: String,
    expiry_hours: u64,
}

impl JwtKeys {
    pub fn new(secret: impl Into<String>, expiry_hours: u64) -> Self {
        Self {
            secret: secret.into(),
            expiry_hours,
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(security.jwt_secret.clone(), security.jwt_expiry_hours)
    }

    pub fn expiry_hours(&self) -> u64 {
        self.expiry_hours
    }

    pub fn generate(&self, claims: &Claims) -> Result<String, JwtError> {
        if self.secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }

        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        if self.secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        decode::<Claims>(token, &decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| JwtError::InvalidToken(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_and_validates_tokens() {
        let keys = JwtKeys::new("test-secret", 1);
        let claims = Claims::new("admin", 1, TenantId(3), vec![1], vec!["sys_menu_add".into()], 1);
        let token = keys.generate(&claims).unwrap();

        let decoded = keys.validate(&token).unwrap();
        assert_eq!(decoded.sub, "admin");
        assert_eq!(decoded.tenant_id, TenantId(3));
        assert_eq!(decoded.permissions, vec!["sys_menu_add".to_string()]);
    }

    #[test]
    fn rejects_foreign_signature_and_missing_secret() {
        let claims = Claims::new("admin", 1, TenantId(1), vec![], vec![], 1);
        let token = JwtKeys::new("one", 1).generate(&claims).unwrap();
        assert!(matches!(JwtKeys::new("two", 1).validate(&token), Err(JwtError::InvalidToken(_))));
        assert!(matches!(JwtKeys::new("", 1).generate(&claims), Err(JwtError::InvalidSecret)));
    }
}
