//! Signed bearer tokens.
//!
//! Tokens are HS256 JWTs carrying the user id, username and role. Issuer and
//! audience come from configuration and are checked on every decode.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    config::JwtConfig,
    dto::auth::Claims,
    error::{AppError, AppResult},
    models::Role,
};

/// Issue a token for `user_id` valid for the configured lifetime.
pub fn issue_token(
    config: &JwtConfig,
    user_id: Uuid,
    username: &str,
    role: Role,
) -> AppResult<(String, DateTime<Utc>)> {
    let now = Utc::now();
    let expires_at = Duration::try_seconds(config.expiry_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        name: username.to_string(),
        role: role.as_str().to_string(),
        jti: Uuid::new_v4().to_string(),
        iss: config.issuer.clone(),
        aud: config.audience.clone(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok((token, expires_at))
}

/// Decode and verify signature, expiry, issuer and audience.
pub fn verify_token(config: &JwtConfig, token: &str) -> AppResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[config.issuer.as_str()]);
    validation.set_audience(&[config.audience.as_str()]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))
}
