use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, OnConflict};
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{AddToCartRequest, CartCount, CartCountQuery, CartList, UpdateCartRequest},
    entity::{
        carts::{ActiveModel, Column as CartCol, Entity as Carts, Model as CartModel},
        products::{Entity as Products, Model as ProductModel},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, acting_user, ensure_admin_or_user, ensure_self_or_admin},
    models::CartLine,
    response::{ApiResponse, Meta},
    state::AppState,
    validation::Validator,
};

pub async fn list_cart(
    state: &AppState,
    user: &AuthUser,
    owner: Uuid,
) -> AppResult<ApiResponse<CartList>> {
    ensure_self_or_admin(user, owner)?;

    let items: Vec<CartLine> = Carts::find()
        .find_also_related(Products)
        .filter(CartCol::UserId.eq(owner))
        .order_by_desc(CartCol::AddedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .filter_map(|(line, product)| product.map(|p| cart_line(line, &p)))
        .collect();

    let meta = Meta::whole(items.len());
    Ok(ApiResponse::success("Cart", CartList { items }, Some(meta)))
}

/// Adds `quantity` of a product to the cart; an existing line for the same product grows.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartLine>> {
    ensure_admin_or_user(user)?;
    let owner = acting_user(user, payload.user_id)?;
    Validator::new()
        .check(payload.quantity >= 1, "quantity", "Quantity must be greater than 0.")
        .finish()?;

    if Users::find_by_id(owner).one(&state.orm).await?.is_none() {
        return Err(AppError::BadRequest(format!(
            "User with ID {owner} does not exist."
        )));
    }
    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Product with ID {} does not exist.",
                payload.product_id
            ))
        })?;

    let current = Carts::find()
        .filter(CartCol::UserId.eq(owner))
        .filter(CartCol::ProductId.eq(product.id))
        .one(&state.orm)
        .await?
        .map_or(0, |line| line.quantity);
    if current.checked_add(payload.quantity).is_none() {
        return Err(AppError::BadRequest("Quantity is too large.".into()));
    }

    // concurrent adds of the same product land on one line
    let line = Carts::insert(ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner),
        product_id: Set(product.id),
        quantity: Set(payload.quantity),
        added_at: NotSet,
    })
    .on_conflict(
        OnConflict::columns([CartCol::UserId, CartCol::ProductId])
            .value(
                CartCol::Quantity,
                Expr::col((Carts, CartCol::Quantity)).add(payload.quantity),
            )
            .to_owned(),
    )
    .exec_with_returning(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_add",
        "carts",
        serde_json::json!({
            "cart_id": line.id,
            "product_id": product.id,
            "quantity": payload.quantity,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Added to cart",
        cart_line(line, &product),
        Some(Meta::empty()),
    ))
}

pub async fn update_quantity(
    state: &AppState,
    user: &AuthUser,
    cart_id: Uuid,
    payload: UpdateCartRequest,
) -> AppResult<ApiResponse<CartLine>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest("Quantity must be greater than 0.".into()));
    }

    let line = owned_line(state, user, cart_id).await?;
    let product = Products::find_by_id(line.product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = line.into();
    active.quantity = Set(payload.quantity);
    let line = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_update",
        "carts",
        serde_json::json!({ "cart_id": cart_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success(
        "Cart updated",
        cart_line(line, &product),
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_cart(state: &AppState, user: &AuthUser, cart_id: Uuid) -> AppResult<()> {
    let line = owned_line(state, user, cart_id).await?;
    Carts::delete_by_id(line.id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_remove",
        "carts",
        serde_json::json!({ "cart_id": cart_id }),
    )
    .await;

    Ok(())
}

/// Total number of units across the user's cart lines.
pub async fn cart_count(
    state: &AppState,
    user: &AuthUser,
    query: CartCountQuery,
) -> AppResult<ApiResponse<CartCount>> {
    let owner = acting_user(user, query.user_id)?;

    let sum: Option<i64> = Carts::find()
        .select_only()
        .column_as(Expr::col(CartCol::Quantity).sum(), "count")
        .filter(CartCol::UserId.eq(owner))
        .into_tuple::<Option<i64>>()
        .one(&state.orm)
        .await?
        .flatten();

    Ok(ApiResponse::success(
        "Cart count",
        CartCount {
            count: sum.unwrap_or(0),
        },
        None,
    ))
}

/// Cart lines of other users are reported as missing.
async fn owned_line(state: &AppState, user: &AuthUser, cart_id: Uuid) -> AppResult<CartModel> {
    Carts::find_by_id(cart_id)
        .one(&state.orm)
        .await?
        .filter(|line| line.user_id == user.user_id || user.is_admin())
        .ok_or(AppError::NotFound)
}

fn cart_line(line: CartModel, product: &ProductModel) -> CartLine {
    CartLine {
        cart_id: line.id,
        user_id: line.user_id,
        product_id: product.id,
        product_name: product.name.clone(),
        product_price: product.price,
        stock: product.stock,
        quantity: line.quantity,
        line_total: product.price.saturating_mul(i64::from(line.quantity)),
        added_time: line.added_at.with_timezone(&Utc),
    }
}
