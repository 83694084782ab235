use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::qrcode::GenerateQrCodeRequest,
    error::AppResult,
    extract::{ApiJson, ApiPath},
    middleware::auth::AuthUser,
    models::{QrCode, QrCodeDetails},
    response::{ApiResponse, Created},
    services::qrcode_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(generate_qr_code))
        .route("/generate-svg/{qr_code_id}", get(qr_code_svg))
        .route("/{order_id}", get(get_qr_code))
}

#[utoipa::path(
    post,
    path = "/api/qrcode",
    request_body = GenerateQrCodeRequest,
    responses(
        (status = 201, description = "Receipt stored", body = ApiResponse<QrCode>),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Receipt already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "QR Codes"
)]
pub async fn generate_qr_code(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<GenerateQrCodeRequest>,
) -> AppResult<Created<QrCode>> {
    let resp = qrcode_service::generate_qr_code(&state, &user, payload).await?;
    Ok(Created(resp))
}

#[utoipa::path(
    get,
    path = "/api/qrcode/{order_id}",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Receipt with its items", body = ApiResponse<QrCodeDetails>),
        (status = 404, description = "No receipt for the order")
    ),
    security(("bearer_auth" = [])),
    tag = "QR Codes"
)]
pub async fn get_qr_code(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(order_id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<QrCodeDetails>>> {
    let resp = qrcode_service::get_by_order(&state, &user, order_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/qrcode/generate-svg/{qr_code_id}",
    params(("qr_code_id" = Uuid, Path, description = "QR code ID")),
    responses(
        (status = 200, description = "QR code image", content_type = "image/svg+xml", body = String),
        (status = 404, description = "QR code not found")
    ),
    security(("bearer_auth" = [])),
    tag = "QR Codes"
)]
pub async fn qr_code_svg(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(qr_code_id): ApiPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    let svg = qrcode_service::render_svg(&state, &user, qr_code_id).await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}
