use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
    sea_query::{Expr, Func},
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::categories::{CategoryInput, CategoryList},
    entity::{
        categories::{ActiveModel, Column, Entity as Categories, Model as CategoryModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, CategoryWithProducts, Product},
    response::{ApiResponse, Meta},
    state::AppState,
    validation::Validator,
};

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<Category> = Categories::find()
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();

    let meta = Meta::whole(items.len());
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(meta),
    ))
}

pub async fn get_category(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<CategoryWithProducts>> {
    let category = find_category(state, id).await?;
    let products = category
        .find_related(Products)
        .order_by_asc(ProdCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| Product::from_entity(p, Some(category.name.clone())))
        .collect();

    Ok(ApiResponse::success(
        "Category",
        CategoryWithProducts {
            id: category.id,
            name: category.name,
            description: category.description,
            products,
        },
        None,
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CategoryInput,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    validate(&payload)?;
    let name = payload.name.trim().to_string();
    ensure_name_free(state, &name, None).await?;

    let category = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(clean_description(payload.description)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category created",
        category.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: CategoryInput,
) -> AppResult<()> {
    ensure_admin(user)?;
    validate(&payload)?;
    let existing = find_category(state, id).await?;
    let name = payload.name.trim().to_string();
    ensure_name_free(state, &name, Some(id)).await?;

    let mut active: ActiveModel = existing.into();
    active.name = Set(name);
    active.description = Set(clean_description(payload.description));
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "category_update",
        "categories",
        serde_json::json!({ "category_id": id }),
    )
    .await;

    Ok(())
}

/// Products of a deleted category stay in the catalog uncategorized.
pub async fn delete_category(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    ensure_admin(user)?;
    let result = Categories::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "category_delete",
        "categories",
        serde_json::json!({ "category_id": id }),
    )
    .await;

    Ok(())
}

fn validate(payload: &CategoryInput) -> AppResult<()> {
    Validator::new()
        .required("name", &payload.name)
        .max_len("name", &payload.name, 100)
        .finish()
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

async fn find_category(state: &AppState, id: Uuid) -> AppResult<CategoryModel> {
    Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

async fn ensure_name_free(state: &AppState, name: &str, except: Option<Uuid>) -> AppResult<()> {
    let mut finder = Categories::find()
        .filter(Expr::expr(Func::lower(Expr::col(Column::Name))).eq(name.to_lowercase()));
    if let Some(id) = except {
        finder = finder.filter(Column::Id.ne(id));
    }

    if finder.count(&state.orm).await? > 0 {
        return Err(AppError::Conflict(format!(
            "Category with name '{name}' already exists"
        )));
    }
    Ok(())
}
