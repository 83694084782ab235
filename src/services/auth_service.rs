use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
    entity::users::{self, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    jwt::issue_token,
    models::Role,
    response::{ApiResponse, Meta},
    state::AppState,
    validation::Validator,
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<RegisterResponse>> {
    let mut v = Validator::new();
    v.required("username", &payload.username)
        .max_len("username", &payload.username, 50)
        .required("email", &payload.email)
        .email("email", &payload.email)
        .min_len("password", &payload.password, 6)
        .required("full_name", &payload.full_name)
        .max_len("full_name", &payload.full_name, 100);

    let role = match payload.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        None => Some(Role::User),
        Some(raw) => raw.parse::<Role>().ok(),
    };
    v.check(role.is_some(), "role", "role must be Admin or User");
    v.finish()?;
    let role = role.unwrap_or(Role::User);

    if role == Role::Admin && !state.config.allow_admin_signup {
        return Err(AppError::Forbidden);
    }

    let username = payload.username.trim().to_string();
    let exists = Users::find()
        .filter(UserCol::Username.eq(username.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest("User already exists".into()));
    }

    let password_hash = hash_password(&payload.password)?;

    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        email: Set(payload.email.trim().to_string()),
        full_name: Set(payload.full_name.trim().to_string()),
        phone_number: Set(None),
        password_hash: Set(password_hash),
        role: Set(role.as_str().to_string()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.id,
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id, "role": user.role }),
    )
    .await;

    Ok(ApiResponse::success(
        "User created successfully",
        RegisterResponse {
            user_id: user.id,
            username: user.username,
            role: user.role,
        },
        Some(Meta::empty()),
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let user = Users::find()
        .filter(UserCol::Username.eq(payload.username.trim()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let role = user
        .role
        .parse::<Role>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
    let (token, expires_at) = issue_token(&state.config.jwt, user.id, &user.username, role)?;

    audit::record(
        &state.pool,
        user.id,
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token,
            user_id: user.id,
            expires_at,
        },
        Some(Meta::empty()),
    ))
}
