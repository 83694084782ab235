use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::{
        categories::Entity as Categories,
        order_details::{Column as DetailCol, Entity as OrderDetails},
        products::{ActiveModel, Column, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_admin_or_user},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
    validation::Validator,
};

pub async fn list_products(
    state: &AppState,
    user: &AuthUser,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin_or_user(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        condition = condition.add(
            Condition::any()
                .add(Expr::col((Products, Column::Name)).ilike(pattern.clone()))
                .add(Expr::col((Products, Column::Description)).ilike(pattern)),
        );
    }
    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }
    match query.in_stock {
        Some(true) => condition = condition.add(Column::Stock.gt(0)),
        Some(false) => condition = condition.add(Column::Stock.eq(0)),
        None => {}
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let total = Products::find()
        .filter(condition.clone())
        .count(&state.orm)
        .await? as i64;

    let mut finder = Products::find()
        .find_also_related(Categories)
        .filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(product, category)| Product::from_entity(product, category.map(|c| c.name)))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let (product, category) = Products::find_by_id(id)
        .find_also_related(Categories)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Product",
        Product::from_entity(product, category.map(|c| c.name)),
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let mut v = Validator::new();
    validate_catalog_fields(&mut v, &payload.name, payload.price, &payload.image);
    v.non_negative("stock", payload.stock.into());
    v.finish()?;

    let category_name = category_name(state, payload.category_id).await?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        price: Set(payload.price),
        stock: Set(payload.stock),
        image: Set(payload.image.trim().to_string()),
        category_id: Set(Some(payload.category_id)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id, "stock": product.stock }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        Product::from_entity(product, Some(category_name)),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<()> {
    ensure_admin(user)?;
    let mut v = Validator::new();
    validate_catalog_fields(&mut v, &payload.name, payload.price, &payload.image);
    v.finish()?;

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    category_name(state, payload.category_id).await?;

    let mut active: ActiveModel = existing.into();
    active.name = Set(payload.name.trim().to_string());
    active.description = Set(payload.description);
    active.price = Set(payload.price);
    active.image = Set(payload.image.trim().to_string());
    active.category_id = Set(Some(payload.category_id));
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(())
}

/// Products referenced by past orders stay; removing them would rewrite history.
pub async fn delete_product(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    ensure_admin(user)?;
    if Products::find_by_id(id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let ordered = OrderDetails::find()
        .filter(DetailCol::ProductId.eq(id))
        .count(&state.orm)
        .await?;
    if ordered > 0 {
        return Err(AppError::Conflict(
            "Product appears in existing orders and cannot be deleted".into(),
        ));
    }

    Products::delete_by_id(id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(())
}

fn validate_catalog_fields(v: &mut Validator, name: &str, price: i64, image: &str) {
    v.required("name", name)
        .max_len("name", name, 100)
        .positive("price", price)
        .required("image", image);
}

async fn category_name(state: &AppState, category_id: Uuid) -> AppResult<String> {
    Categories::find_by_id(category_id)
        .one(&state.orm)
        .await?
        .map(|c| c.name)
        .ok_or_else(|| {
            AppError::BadRequest(format!("Category with ID {category_id} does not exist."))
        })
}
