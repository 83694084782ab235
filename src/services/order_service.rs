use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderList, PlaceOrderRequest, UpdateOrderStatusRequest},
    entity::{
        carts::{Column as CartCol, Entity as Carts},
        order_details::{
            ActiveModel as DetailActive, Column as DetailCol, Entity as OrderDetails,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{
        AuthUser, acting_user, ensure_admin, ensure_admin_or_user, ensure_self_or_admin,
    },
    models::{Order, OrderDetail, OrderStatus, StatusChange},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// One cart line picked for checkout.
#[derive(Debug, Clone, Copy)]
pub struct CartSelection {
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Product price and stock as read under lock.
#[derive(Debug, Clone)]
pub struct StockedProduct {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub stock: i32,
}

impl From<&ProductModel> for StockedProduct {
    fn from(model: &ProductModel) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            price: model.price,
            stock: model.stock,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub sub_total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub total: i64,
    pub lines: Vec<PricedLine>,
    /// Units to take from each product, summed over all lines.
    pub demand: Vec<(Uuid, i32)>,
}

/// Price the selected lines against current product data.
///
/// Demand is aggregated per product before comparing with stock, so two lines
/// for the same product cannot each pass on their own and oversell together.
pub fn price_order(
    selection: &[CartSelection],
    products: &HashMap<Uuid, StockedProduct>,
) -> AppResult<PricedOrder> {
    if selection.is_empty() {
        return Err(AppError::BadRequest("Cart IDs cannot be empty.".into()));
    }

    let mut demand: Vec<(Uuid, i64)> = Vec::new();
    for line in selection {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        match demand.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some((_, units)) => *units += i64::from(line.quantity),
            None => demand.push((line.product_id, i64::from(line.quantity))),
        }
    }

    let mut checked = Vec::with_capacity(demand.len());
    for (product_id, units) in demand {
        let product = lookup(products, product_id)?;
        if i64::from(product.stock) < units {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {}. Available: {}, Requested: {}",
                product.name, product.stock, units
            )));
        }
        // bounded by stock, which is an i32
        checked.push((product_id, units as i32));
    }

    let mut total: i64 = 0;
    let mut lines = Vec::with_capacity(selection.len());
    for line in selection {
        let product = lookup(products, line.product_id)?;
        let sub_total = product
            .price
            .checked_mul(i64::from(line.quantity))
            .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))?;
        total = total
            .checked_add(sub_total)
            .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))?;
        lines.push(PricedLine {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity: line.quantity,
            sub_total,
        });
    }

    Ok(PricedOrder {
        total,
        lines,
        demand: checked,
    })
}

fn lookup(products: &HashMap<Uuid, StockedProduct>, id: Uuid) -> AppResult<&StockedProduct> {
    products
        .get(&id)
        .ok_or_else(|| AppError::BadRequest(format!("Product with ID {id} does not exist.")))
}

/// Turn cart lines into an order inside one transaction: lock lines and
/// products, check stock, write the order and its details, take stock and
/// drop the consumed lines. Any failure leaves every row untouched.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin_or_user(user)?;
    let owner = acting_user(user, payload.user_id)?;

    let cart_ids = payload.cart_ids;
    if cart_ids.is_empty() {
        return Err(AppError::BadRequest("Cart IDs cannot be empty.".into()));
    }
    let distinct: HashSet<Uuid> = cart_ids.iter().copied().collect();
    if distinct.len() != cart_ids.len() {
        return Err(AppError::BadRequest("Duplicate cart IDs are not allowed.".into()));
    }

    let txn = state.orm.begin().await?;

    let mut cart_lines: HashMap<Uuid, _> = Carts::find()
        .filter(CartCol::Id.is_in(cart_ids.clone()))
        .filter(CartCol::UserId.eq(owner))
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|line| (line.id, line))
        .collect();
    if cart_lines.len() != cart_ids.len() {
        return Err(AppError::BadRequest(
            "One or more cart IDs do not exist or do not belong to the user.".into(),
        ));
    }

    let mut selection = Vec::with_capacity(cart_ids.len());
    for id in &cart_ids {
        let line = cart_lines.remove(id).ok_or(AppError::NotFound)?;
        selection.push(CartSelection {
            cart_id: line.id,
            product_id: line.product_id,
            quantity: line.quantity,
        });
    }

    let product_ids: Vec<Uuid> = selection.iter().map(|s| s.product_id).collect();
    let products: HashMap<Uuid, StockedProduct> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .iter()
        .map(|p| (p.id, StockedProduct::from(p)))
        .collect();

    let priced = price_order(&selection, &products)?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner),
        total_price: Set(priced.total),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        order_time: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;

    let mut details = Vec::with_capacity(priced.lines.len());
    for line in &priced.lines {
        let detail = DetailActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            sub_total: Set(line.sub_total),
        }
        .insert(&txn)
        .await?;
        details.push(OrderDetail {
            id: detail.id,
            product_id: detail.product_id,
            product_name: line.product_name.clone(),
            quantity: detail.quantity,
            sub_total: detail.sub_total,
        });
    }

    for (product_id, units) in &priced.demand {
        let updated = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(*units))
            .filter(ProdCol::Id.eq(*product_id))
            .filter(ProdCol::Stock.gte(*units))
            .exec(&txn)
            .await?;
        if updated.rows_affected != 1 {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {product_id}"
            )));
        }
    }

    Carts::delete_many()
        .filter(CartCol::Id.is_in(cart_ids))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %owner,
        total = priced.total,
        lines = details.len(),
        "order placed"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "order_place",
        "orders",
        serde_json::json!({ "order_id": order.id, "user_id": owner, "total": priced.total }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed",
        order_view(order, details),
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let status = status.parse::<OrderStatus>().map_err(AppError::BadRequest)?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::OrderTime),
        SortOrder::Desc => finder.order_by_desc(OrderCol::OrderTime),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = load_order_views(&state.orm, orders).await?;

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|o| o.user_id == user.user_id || user.is_admin())
        .ok_or(AppError::NotFound)?;

    let view = load_order_views(&state.orm, vec![order])
        .await?
        .pop()
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Order", view, None))
}

pub async fn list_user_orders(
    state: &AppState,
    user: &AuthUser,
    owner: Uuid,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_self_or_admin(user, owner)?;
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(owner))
        .order_by_desc(OrderCol::OrderTime)
        .all(&state.orm)
        .await?;
    let items = load_order_views(&state.orm, orders).await?;

    let meta = Meta::whole(items.len());
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let raw = payload.status.trim();
    if raw.is_empty() {
        return Err(AppError::BadRequest("Status is required.".into()));
    }
    let next = raw.parse::<OrderStatus>().map_err(AppError::BadRequest)?;

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let current = order
        .status
        .parse::<OrderStatus>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    let change = current.transition(next).map_err(AppError::BadRequest)?;
    let order = match change {
        StatusChange::Unchanged => order,
        StatusChange::Changed { restore_stock } => {
            if restore_stock {
                return_stock(&txn, order.id).await?;
            }
            let mut active: OrderActive = order.into();
            active.status = Set(next.as_str().to_string());
            active.update(&txn).await?
        }
    };

    let view = load_order_views(&txn, vec![order])
        .await?
        .pop()
        .ok_or(AppError::NotFound)?;
    txn.commit().await?;

    if let StatusChange::Changed { restore_stock } = change {
        match next {
            OrderStatus::Completed => {
                tracing::info!(order_id = %id, user_id = %view.user_id, "order completed")
            }
            OrderStatus::Canceled => {
                tracing::info!(order_id = %id, restore_stock, "order canceled")
            }
            OrderStatus::Pending => tracing::info!(order_id = %id, "order reopened"),
        }
        audit::record(
            &state.pool,
            user.user_id,
            "order_status",
            "orders",
            serde_json::json!({
                "order_id": id,
                "from": current.as_str(),
                "to": next.as_str(),
            }),
        )
        .await;
    }

    Ok(ApiResponse::success(
        "Order status updated",
        view,
        Some(Meta::empty()),
    ))
}

/// Removes the order with its details and receipt. Stock stays where it is.
pub async fn delete_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    ensure_admin(user)?;
    let result = Orders::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(())
}

async fn return_stock(txn: &DatabaseTransaction, order_id: Uuid) -> Result<(), DbErr> {
    let details = OrderDetails::find()
        .filter(DetailCol::OrderId.eq(order_id))
        .all(txn)
        .await?;

    for detail in details {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(detail.quantity))
            .filter(ProdCol::Id.eq(detail.product_id))
            .exec(txn)
            .await?;
    }
    Ok(())
}

/// Attach details (with product names) to each order, preserving order.
pub(crate) async fn load_order_views<C: ConnectionTrait>(
    db: &C,
    orders: Vec<OrderModel>,
) -> Result<Vec<Order>, DbErr> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let rows = OrderDetails::find()
        .find_also_related(Products)
        .filter(DetailCol::OrderId.is_in(ids))
        .all(db)
        .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderDetail>> = HashMap::new();
    for (detail, product) in rows {
        by_order.entry(detail.order_id).or_default().push(OrderDetail {
            id: detail.id,
            product_id: detail.product_id,
            product_name: product.map(|p| p.name).unwrap_or_default(),
            quantity: detail.quantity,
            sub_total: detail.sub_total,
        });
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let details = by_order.remove(&order.id).unwrap_or_default();
            order_view(order, details)
        })
        .collect())
}

fn order_view(model: OrderModel, details: Vec<OrderDetail>) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        total_price: model.total_price,
        status: model.status,
        order_time: model.order_time.with_timezone(&Utc),
        details,
    }
}
