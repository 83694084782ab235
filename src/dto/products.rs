use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: i64,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub image: String,
    pub stock: i32,
}

/// Full replacement of the catalog fields. Stock only moves through orders.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: String,
    pub price: i64,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub image: String,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
