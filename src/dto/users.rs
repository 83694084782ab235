use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::UserSummary;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub full_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct UserList {
    #[schema(value_type = Vec<UserSummary>)]
    pub items: Vec<UserSummary>,
}
