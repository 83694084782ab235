use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::OnConflict;
use uuid::Uuid;

use crate::{
    audit,
    dto::favorites::{AddFavoriteRequest, FavoriteList},
    entity::{
        favorites::{ActiveModel, Column as FavCol, Entity as Favorites, Model as FavoriteModel},
        products::{Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, acting_user, ensure_admin_or_user, ensure_self_or_admin},
    models::Favorite,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_favorites(
    state: &AppState,
    user: &AuthUser,
    owner: Uuid,
) -> AppResult<ApiResponse<FavoriteList>> {
    ensure_self_or_admin(user, owner)?;

    let items: Vec<Favorite> = Favorites::find()
        .find_also_related(Products)
        .filter(FavCol::UserId.eq(owner))
        .order_by_desc(FavCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .filter_map(|(fav, product)| product.map(|p| favorite(fav, &p)))
        .collect();

    let meta = Meta::whole(items.len());
    Ok(ApiResponse::success(
        "Favorites",
        FavoriteList { items },
        Some(meta),
    ))
}

pub async fn add_favorite(
    state: &AppState,
    user: &AuthUser,
    payload: AddFavoriteRequest,
) -> AppResult<ApiResponse<Favorite>> {
    ensure_admin_or_user(user)?;
    let owner = acting_user(user, payload.user_id)?;

    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Product with ID {} does not exist.",
                payload.product_id
            ))
        })?;

    let inserted = Favorites::insert(ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner),
        product_id: Set(product.id),
        created_at: NotSet,
    })
    .on_conflict(
        OnConflict::columns([FavCol::UserId, FavCol::ProductId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(&state.orm)
    .await?;

    let fav = Favorites::find()
        .filter(FavCol::UserId.eq(owner))
        .filter(FavCol::ProductId.eq(product.id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if inserted == 0 {
        return Ok(ApiResponse::success(
            "Already in favorites",
            favorite(fav, &product),
            Some(Meta::empty()),
        ));
    }

    audit::record(
        &state.pool,
        user.user_id,
        "favorite_add",
        "favorites",
        serde_json::json!({ "favorite_id": fav.id, "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Added to favorites",
        favorite(fav, &product),
        Some(Meta::empty()),
    ))
}

pub async fn remove_favorite(
    state: &AppState,
    user: &AuthUser,
    favorite_id: Uuid,
) -> AppResult<()> {
    let fav = Favorites::find_by_id(favorite_id)
        .one(&state.orm)
        .await?
        .filter(|f| f.user_id == user.user_id || user.is_admin())
        .ok_or(AppError::NotFound)?;

    Favorites::delete_by_id(fav.id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "favorite_remove",
        "favorites",
        serde_json::json!({ "favorite_id": favorite_id }),
    )
    .await;

    Ok(())
}

fn favorite(fav: FavoriteModel, product: &ProductModel) -> Favorite {
    Favorite {
        favorite_id: fav.id,
        user_id: fav.user_id,
        product_id: product.id,
        product_name: product.name.clone(),
        product_price: product.price,
        product_image: product.image.clone(),
    }
}
