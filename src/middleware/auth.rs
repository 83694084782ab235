use axum::{extract::FromRequestParts, http::header};
use uuid::Uuid;

use crate::{error::AppError, jwt::verify_token, models::Role, state::AppState};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// "AdminOnly" policy.
pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// "AdminOrUser" policy.
pub fn ensure_admin_or_user(user: &AuthUser) -> Result<(), AppError> {
    match user.role {
        Role::Admin | Role::User => Ok(()),
    }
}

/// The caller may act on `owner`'s data only if it is their own or they are an admin.
pub fn ensure_self_or_admin(user: &AuthUser, owner: Uuid) -> Result<(), AppError> {
    if user.user_id != owner && !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Resolve the user a request acts for: the caller unless an admin names someone else.
pub fn acting_user(user: &AuthUser, requested: Option<Uuid>) -> Result<Uuid, AppError> {
    let target = requested.unwrap_or(user.user_id);
    ensure_self_or_admin(user, target)?;
    Ok(target)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

        let claims = verify_token(&state.config.jwt, token)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| AppError::Unauthorized("Invalid role in token".into()))?;

        Ok(AuthUser {
            user_id,
            username: claims.name,
            role,
        })
    }
}
