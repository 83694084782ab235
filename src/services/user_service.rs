use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::users::{UpdateUserRequest, UserList},
    entity::users::{ActiveModel, Column, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_self_or_admin},
    models::{Role, UserProfile, UserSummary},
    response::{ApiResponse, Meta},
    state::AppState,
    validation::Validator,
};

pub async fn list_users(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let items: Vec<UserSummary> = Users::find()
        .order_by_asc(Column::Username)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();

    let meta = Meta::whole(items.len());
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

pub async fn get_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<UserProfile>> {
    ensure_self_or_admin(user, id)?;
    let found = find_user(state, id).await?;
    Ok(ApiResponse::success("User", found.into(), None))
}

pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<()> {
    ensure_self_or_admin(user, id)?;

    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());
    let phone = payload
        .phone_number
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let mut v = Validator::new();
    v.required("full_name", &payload.full_name)
        .max_len("full_name", &payload.full_name, 100);
    if let Some(email) = email {
        v.email("email", email);
    }
    if let Some(phone) = phone {
        v.phone("phone_number", phone);
    }
    v.finish()?;

    let existing = find_user(state, id).await?;
    let mut active: ActiveModel = existing.into();
    active.full_name = Set(payload.full_name.trim().to_string());
    if let Some(email) = email {
        active.email = Set(email.to_string());
    }
    if let Some(phone) = phone {
        active.phone_number = Set(Some(phone.to_string()));
    }
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "user_update",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    Ok(())
}

pub async fn delete_user(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    ensure_admin(user)?;
    let result = Users::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "user_delete",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    Ok(())
}

/// Users holding `role`. An unknown role name has no members and yields 404.
pub async fn list_users_by_role(
    state: &AppState,
    user: &AuthUser,
    role: &str,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let role = role.parse::<Role>().map_err(|_| AppError::NotFound)?;

    let items: Vec<UserSummary> = Users::find()
        .filter(Column::Role.eq(role.as_str()))
        .order_by_asc(Column::Username)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();

    if items.is_empty() {
        return Err(AppError::NotFound);
    }

    let meta = Meta::whole(items.len());
    Ok(ApiResponse::success(
        format!("Users with role {role}"),
        UserList { items },
        Some(meta),
    ))
}

async fn find_user(state: &AppState, id: Uuid) -> AppResult<UserModel> {
    Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}
