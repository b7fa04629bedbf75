pub mod password;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::types::AccountRole;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    InvalidToken(String),

    #[error("token is outside the refresh window")]
    RefreshWindowExpired,

    #[error("session revoked or expired")]
    SessionRevoked,

    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("password hashing error: {0}")]
    Hashing(String),
}

/// Claims carried by every session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: Uuid,
    /// Session id, checked against the sessions table on every request
    pub sid: Uuid,
    pub role: AccountRole,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(account_id: Uuid, session_id: Uuid, role: AccountRole, email: String) -> Self {
        let expiry_hours = config::config().security.jwt_expiry_hours;
        Self::with_lifetime(account_id, session_id, role, email, Duration::hours(expiry_hours as i64))
    }

    pub fn with_lifetime(
        account_id: Uuid,
        session_id: Uuid,
        role: AccountRole,
        email: String,
        lifetime: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: account_id,
            sid: session_id,
            role,
            email,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }

    pub fn expires_in(&self) -> i64 {
        (self.exp - Utc::now().timestamp()).max(0)
    }

    /// Same identity and session, fresh timestamps.
    pub fn renewed(&self) -> Self {
        Self::new(self.sub, self.sid, self.role, self.email.clone())
    }
}

pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    encode_with_secret(claims, &config::config().security.jwt_secret)
}

/// Decode and verify a token, rejecting expired ones.
pub fn validate_jwt(token: &str) -> Result<Claims, AuthError> {
    decode_with_secret(token, &config::config().security.jwt_secret, false)
}

/// Decode a token for refresh: signature must verify, expiry may have passed
/// but not by more than the configured refresh window.
pub fn validate_jwt_for_refresh(token: &str) -> Result<Claims, AuthError> {
    let security = &config::config().security;
    let claims = decode_with_secret(token, &security.jwt_secret, true)?;
    check_refresh_window(&claims, Utc::now(), security.refresh_window_days)?;
    Ok(claims)
}

pub fn check_refresh_window(claims: &Claims, now: DateTime<Utc>, window_days: i64) -> Result<(), AuthError> {
    if now > claims.expires_at() + Duration::days(window_days) {
        return Err(AuthError::RefreshWindowExpired);
    }
    Ok(())
}

pub fn encode_with_secret(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

pub fn decode_with_secret(token: &str, secret: &str, allow_expired: bool) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = !allow_expired;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}
