use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartCount, CartCountQuery, CartList, UpdateCartRequest},
    error::AppResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::auth::AuthUser,
    models::CartLine,
    response::{ApiResponse, Created},
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(add_to_cart))
        .route("/count", get(cart_count))
        .route("/user/{user_id}", get(cart_list))
        .route("/{cart_id}", put(update_cart).delete(remove_from_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart/user/{user_id}",
    params(("user_id" = Uuid, Path, description = "Cart owner")),
    responses(
        (status = 200, description = "Cart lines of the user", body = ApiResponse<CartList>),
        (status = 403, description = "Not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<CartList>>> {
    let resp = cart_service::list_cart(&state, &user, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Line added or grown", body = ApiResponse<CartLine>),
        (status = 400, description = "Bad quantity or unknown product")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<AddToCartRequest>,
) -> AppResult<Created<CartLine>> {
    let resp = cart_service::add_to_cart(&state, &user, payload).await?;
    Ok(Created(resp))
}

#[utoipa::path(
    put,
    path = "/api/cart/{cart_id}",
    params(("cart_id" = Uuid, Path, description = "Cart line ID")),
    request_body = UpdateCartRequest,
    responses(
        (status = 200, description = "Line updated", body = ApiResponse<CartLine>),
        (status = 400, description = "Bad quantity"),
        (status = 404, description = "Cart line not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_cart(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(cart_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateCartRequest>,
) -> AppResult<Json<ApiResponse<CartLine>>> {
    let resp = cart_service::update_quantity(&state, &user, cart_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{cart_id}",
    params(("cart_id" = Uuid, Path, description = "Cart line ID")),
    responses(
        (status = 204, description = "Line removed"),
        (status = 404, description = "Cart line not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(cart_id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    cart_service::remove_from_cart(&state, &user, cart_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/cart/count",
    params(("user_id" = Option<Uuid>, Query, description = "Defaults to the caller")),
    responses(
        (status = 200, description = "Units in the cart", body = ApiResponse<CartCount>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_count(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<CartCountQuery>,
) -> AppResult<Json<ApiResponse<CartCount>>> {
    let resp = cart_service::cart_count(&state, &user, query).await?;
    Ok(Json(resp))
}
