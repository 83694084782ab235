use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{categories, products, users};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Pending,
    Completed,
    Canceled,
}

/// Outcome of moving an order from one status to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Unchanged,
    Changed { restore_stock: bool },
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::Completed,
        OrderStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Completed => "Completed",
            OrderStatus::Canceled => "Canceled",
        }
    }

    /// Stock goes back exactly once, on the way into `Canceled`. A canceled
    /// order has already returned its stock and cannot be reopened.
    pub fn transition(self, next: OrderStatus) -> Result<StatusChange, String> {
        match (self, next) {
            (current, next) if current == next => Ok(StatusChange::Unchanged),
            (OrderStatus::Canceled, _) => Err("canceled order cannot change status".into()),
            (_, OrderStatus::Canceled) => Ok(StatusChange::Changed {
                restore_stock: true,
            }),
            _ => Ok(StatusChange::Changed {
                restore_stock: false,
            }),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown order status '{s}'"))
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub full_name: String,
    pub role: String,
}

impl From<users::Model> for UserSummary {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            phone_number: model.phone_number,
        }
    }
}

impl From<users::Model> for UserProfile {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            phone_number: model.phone_number,
            full_name: model.full_name,
            role: model.role,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryWithProducts {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Minor currency units.
    pub price: i64,
    pub stock: i32,
    pub image: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn from_entity(model: products::Model, category_name: Option<String>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            stock: model.stock,
            image: model.image,
            category_id: model.category_id,
            category_name,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub cart_id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price: i64,
    pub stock: i32,
    pub quantity: i32,
    pub line_total: i64,
    pub added_time: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_price: i64,
    pub status: String,
    pub order_time: DateTime<Utc>,
    pub details: Vec<OrderDetail>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub sub_total: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Favorite {
    pub favorite_id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price: i64,
    pub product_image: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QrCode {
    pub qr_code_id: Uuid,
    pub order_id: Uuid,
    pub qr_code_data: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReceiptItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_image: String,
    pub quantity: i32,
    pub sub_total: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QrCodeDetails {
    pub qr_code_id: Uuid,
    pub order_id: Uuid,
    pub total_price: i64,
    pub qr_code_data: String,
    pub items: Vec<ReceiptItem>,
}
