//! JWT Token Handler
//! Mission: issue and validate the session tokens behind every API call

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use crate::auth::models::{Claims, User};

const DEFAULT_EXPIRATION_HOURS: i64 = 24;

/// Token issuer/validator with precomputed keys.
pub struct JwtHandler {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiration_hours: i64,
}

impl JwtHandler {
    pub fn new(secret: String) -> Self {
        let expiration_hours = std::env::var("JWT_EXPIRATION_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|&h| h > 0)
            .unwrap_or(DEFAULT_EXPIRATION_HOURS);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiration_hours,
        }
    }

    /// Issue a token for a user. Returns the token and its lifetime in
    /// seconds.
    pub fn generate_token(&self, user: &User) -> Result<(String, usize)> {
        let expiration = Utc::now()
            .checked_add_signed(chrono::Duration::hours(self.expiration_hours))
            .context("Invalid timestamp")?
            .timestamp() as usize;

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            exp: expiration,
        };

        debug!(
            "Issuing JWT for {} ({}), {}h lifetime",
            user.username, user.id, self.expiration_hours
        );

        let token = encode(&Header::default(), &claims, &self.encoding)
            .context("Failed to generate JWT")?;

        Ok((token, (self.expiration_hours * 3600) as usize))
    }

    /// Validate a token and extract its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(token, &self.decoding, &Validation::default())
            .context("Invalid or expired token")?;

        Ok(decoded.claims)
    }
}
