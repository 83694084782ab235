use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::favorites::{AddFavoriteRequest, FavoriteList},
    error::AppResult,
    extract::{ApiJson, ApiPath},
    middleware::auth::AuthUser,
    models::Favorite,
    response::{ApiResponse, Created},
    services::favorite_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(add_favorite))
        .route("/user/{user_id}", get(list_favorites))
        .route("/{favorite_id}", delete(remove_favorite))
}

#[utoipa::path(
    get,
    path = "/api/favorite/user/{user_id}",
    params(("user_id" = Uuid, Path, description = "Favorites owner")),
    responses(
        (status = 200, description = "Favorite products", body = ApiResponse<FavoriteList>),
        (status = 403, description = "Not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn list_favorites(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<FavoriteList>>> {
    let resp = favorite_service::list_favorites(&state, &user, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/favorite",
    request_body = AddFavoriteRequest,
    responses(
        (status = 201, description = "Favorite added", body = ApiResponse<Favorite>),
        (status = 400, description = "Unknown product")
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn add_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<AddFavoriteRequest>,
) -> AppResult<Created<Favorite>> {
    let resp = favorite_service::add_favorite(&state, &user, payload).await?;
    Ok(Created(resp))
}

#[utoipa::path(
    delete,
    path = "/api/favorite/{favorite_id}",
    params(("favorite_id" = Uuid, Path, description = "Favorite ID")),
    responses(
        (status = 204, description = "Favorite removed"),
        (status = 404, description = "Favorite not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn remove_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(favorite_id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    favorite_service::remove_favorite(&state, &user, favorite_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
