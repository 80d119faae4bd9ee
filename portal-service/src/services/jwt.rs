use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::UserRole;

/// JWT service for session token generation and validation.
///
/// The portal is both the only issuer and the only verifier, so tokens
/// are HMAC-signed (HS256) with a configured secret. There is no
/// refresh or rotation; tokens simply expire.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_hours: i64,
}

/// Claims embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Email
    pub email: String,
    /// Role string ("PARENT" | "ADMIN")
    pub role: String,
    /// Tenant the user belongs to
    pub tenant_id: Uuid,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl AuthClaims {
    pub fn parsed_role(&self) -> Option<UserRole> {
        UserRole::parse(&self.role)
    }
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            token_expiry_hours: config.token_expiry_hours,
        }
    }

    /// Issue a signed, time-limited token for a verified user.
    pub fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
        tenant_id: Uuid,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.token_expiry_hours);

        let claims = AuthClaims {
            sub: user_id,
            email: email.to_string(),
            role: role.as_str().to_string(),
            tenant_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode token: {}", e))?;

        Ok(token)
    }

    /// Validate a token and recover its claims, or report invalid/expired.
    pub fn verify(&self, token: &str) -> Result<AuthClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<AuthClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid token: {}", e))?;

        Ok(token_data.claims)
    }
}
