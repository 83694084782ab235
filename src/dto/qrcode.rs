use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateQrCodeRequest {
    pub order_id: Uuid,
}
