mod common;

use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use smart_canteen_api::{
    db::{create_pool, run_migrations},
    dto::{
        cart::{AddToCartRequest, CartCountQuery},
        categories::CategoryInput,
        favorites::AddFavoriteRequest,
        orders::{PlaceOrderRequest, UpdateOrderStatusRequest},
        qrcode::GenerateQrCodeRequest,
    },
    entity::{
        Carts, OrderDetails, Products, QrCodes, categories::ActiveModel as CategoryActive,
        order_details::Column as DetailCol, products::ActiveModel as ProductActive,
        qr_codes::Column as QrCol, users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::Role,
    services::{
        cart_service, category_service, favorite_service, order_service, product_service,
        qrcode_service,
    },
    state::AppState,
};
use uuid::Uuid;

// Flow tests need a real database and skip without one. Fixtures use fresh
// ids so tests can run in parallel against the same schema.

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let Some(database_url) = common::database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run order flow tests.");
        return Ok(None);
    };
    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    Ok(Some(AppState::new(pool, common::test_config(&database_url))))
}

async fn create_user(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    let username = format!("{}-{}", role.as_str().to_lowercase(), Uuid::new_v4());
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username.clone()),
        email: Set(format!("{username}@canteen.local")),
        full_name: Set("Flow Tester".into()),
        phone_number: Set(None),
        password_hash: Set("unused".into()),
        role: Set(role.as_str().into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        username,
        role,
    })
}

async fn create_category(state: &AppState) -> anyhow::Result<Uuid> {
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Flow {}", Uuid::new_v4())),
        description: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(category.id)
}

async fn create_named_product(
    state: &AppState,
    category_id: Uuid,
    name: String,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(Some("Rice, egg and vegetables".into())),
        price: Set(price),
        stock: Set(stock),
        image: Set("lunch-box.jpg".into()),
        category_id: Set(Some(category_id)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product.id)
}

async fn create_product(state: &AppState, price: i64, stock: i32) -> anyhow::Result<Uuid> {
    let category_id = create_category(state).await?;
    let name = format!("Lunch Box {}", &Uuid::new_v4().to_string()[..8]);
    create_named_product(state, category_id, name, price, stock).await
}

async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product vanished"))?;
    Ok(product.stock)
}

async fn add_line(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<Uuid> {
    let line = cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            product_id,
            quantity,
            user_id: None,
        },
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("no cart line"))?;
    Ok(line.cart_id)
}

fn place(cart_ids: Vec<Uuid>) -> PlaceOrderRequest {
    PlaceOrderRequest {
        cart_ids,
        user_id: None,
    }
}

fn status(value: &str) -> UpdateOrderStatusRequest {
    UpdateOrderStatusRequest {
        status: value.into(),
    }
}

#[tokio::test]
async fn placing_an_order_prices_lines_takes_stock_and_clears_cart() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state, Role::User).await?;
    let product_id = create_product(&state, 1_000, 5).await?;

    // adding the same product twice grows one line
    let first = add_line(&state, &user, product_id, 1).await?;
    let second = add_line(&state, &user, product_id, 1).await?;
    assert_eq!(first, second);

    let order = order_service::place_order(&state, &user, place(vec![first]))
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("no order"))?;

    assert_eq!(order.status, "Pending");
    assert_eq!(order.user_id, user.user_id);
    assert_eq!(order.total_price, 2_000);
    assert_eq!(
        order.total_price,
        order.details.iter().map(|d| d.sub_total).sum::<i64>()
    );
    assert_eq!(stock_of(&state, product_id).await?, 3);
    assert!(Carts::find_by_id(first).one(&state.orm).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn insufficient_stock_changes_nothing() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state, Role::User).await?;
    let product_id = create_product(&state, 1_000, 2).await?;
    let line = add_line(&state, &user, product_id, 3).await?;

    let err = order_service::place_order(&state, &user, place(vec![line]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(ref msg) if msg.contains("Insufficient stock")));
    assert_eq!(stock_of(&state, product_id).await?, 2);
    assert!(Carts::find_by_id(line).one(&state.orm).await?.is_some());

    Ok(())
}

#[tokio::test]
async fn foreign_cart_lines_cannot_be_ordered() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let owner = create_user(&state, Role::User).await?;
    let intruder = create_user(&state, Role::User).await?;
    let product_id = create_product(&state, 1_000, 5).await?;
    let line = add_line(&state, &owner, product_id, 1).await?;

    let err = order_service::place_order(&state, &intruder, place(vec![line]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(stock_of(&state, product_id).await?, 5);
    assert!(Carts::find_by_id(line).one(&state.orm).await?.is_some());

    Ok(())
}

#[tokio::test]
async fn canceling_restores_stock_exactly_once() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state, Role::User).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let product_id = create_product(&state, 2_500, 4).await?;
    let line = add_line(&state, &user, product_id, 3).await?;

    let order = order_service::place_order(&state, &user, place(vec![line]))
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("no order"))?;
    assert_eq!(stock_of(&state, product_id).await?, 1);

    let completed = order_service::update_status(&state, &admin, order.id, status("completed")).await?;
    assert_eq!(completed.data.map(|o| o.status).as_deref(), Some("Completed"));
    assert_eq!(stock_of(&state, product_id).await?, 1);

    order_service::update_status(&state, &admin, order.id, status("Canceled")).await?;
    assert_eq!(stock_of(&state, product_id).await?, 4);

    // same status again is a no-op
    order_service::update_status(&state, &admin, order.id, status("Canceled")).await?;
    assert_eq!(stock_of(&state, product_id).await?, 4);

    let err = order_service::update_status(&state, &admin, order.id, status("Pending"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(stock_of(&state, product_id).await?, 4);

    Ok(())
}

#[tokio::test]
async fn orders_of_other_users_are_hidden() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let owner = create_user(&state, Role::User).await?;
    let other = create_user(&state, Role::User).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let product_id = create_product(&state, 1_000, 5).await?;
    let line = add_line(&state, &owner, product_id, 1).await?;
    let order = order_service::place_order(&state, &owner, place(vec![line]))
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("no order"))?;

    let err = order_service::get_order(&state, &other, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    assert!(order_service::get_order(&state, &admin, order.id).await.is_ok());

    Ok(())
}

#[tokio::test]
async fn receipt_is_generated_once_and_lists_details() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state, Role::User).await?;
    let product_id = create_product(&state, 1_500, 5).await?;
    let line = add_line(&state, &user, product_id, 2).await?;
    let order = order_service::place_order(&state, &user, place(vec![line]))
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("no order"))?;

    let request = || GenerateQrCodeRequest { order_id: order.id };
    let qr = qrcode_service::generate_qr_code(&state, &user, request())
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("no qr code"))?;

    let product_name = &order.details[0].product_name;
    assert!(qr.qr_code_data.starts_with(&format!("OrderId: {}\n", order.id)));
    assert!(qr.qr_code_data.contains("Total: 3000\n"));
    assert!(qr.qr_code_data.contains(&format!("- {product_name} x2: 3000\n")));

    let again = qrcode_service::generate_qr_code(&state, &user, request())
        .await
        .unwrap_err();
    assert!(matches!(again, AppError::Conflict(_)));

    let details = qrcode_service::get_by_order(&state, &user, order.id)
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("no details"))?;
    assert_eq!(details.items.len(), 1);
    assert_eq!(details.total_price, 3_000);

    let svg = qrcode_service::render_svg(&state, &user, qr.qr_code_id).await?;
    assert!(svg.contains("<svg"));

    Ok(())
}

#[tokio::test]
async fn receipt_too_large_for_a_qr_code_is_refused() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state, Role::User).await?;
    let category_id = create_category(&state).await?;

    let mut lines = Vec::new();
    for _ in 0..40 {
        let name = format!("Nasi goreng special with extra egg {}", Uuid::new_v4());
        let product_id = create_named_product(&state, category_id, name, 1_000, 5).await?;
        lines.push(add_line(&state, &user, product_id, 1).await?);
    }
    let order = order_service::place_order(&state, &user, place(lines))
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("no order"))?;

    let err = qrcode_service::generate_qr_code(
        &state,
        &user,
        GenerateQrCodeRequest { order_id: order.id },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let stored = QrCodes::find()
        .filter(QrCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?;
    assert!(stored.is_none());

    Ok(())
}

#[tokio::test]
async fn deleting_a_category_keeps_its_products() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, Role::Admin).await?;
    let category_id = create_category(&state).await?;
    let product_id =
        create_named_product(&state, category_id, "Soto Ayam".into(), 12_000, 3).await?;

    category_service::delete_category(&state, &admin, category_id).await?;

    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product vanished"))?;
    assert_eq!(product.category_id, None);

    Ok(())
}

#[tokio::test]
async fn category_names_clash_regardless_of_case() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, Role::Admin).await?;
    let name = format!("Soups {}", &Uuid::new_v4().to_string()[..8]);
    let input = |name: String| CategoryInput {
        name,
        description: None,
    };

    category_service::create_category(&state, &admin, input(name.clone())).await?;
    let err = category_service::create_category(&state, &admin, input(name.to_uppercase()))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));

    Ok(())
}

#[tokio::test]
async fn ordered_product_cannot_be_deleted() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state, Role::User).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let product_id = create_product(&state, 1_000, 5).await?;
    let line = add_line(&state, &user, product_id, 1).await?;
    order_service::place_order(&state, &user, place(vec![line])).await?;

    let err = product_service::delete_product(&state, &admin, product_id)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    assert!(Products::find_by_id(product_id).one(&state.orm).await?.is_some());

    Ok(())
}

#[tokio::test]
async fn favoriting_twice_returns_the_same_favorite() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state, Role::User).await?;
    let product_id = create_product(&state, 8_000, 5).await?;
    let request = || AddFavoriteRequest {
        product_id,
        user_id: None,
    };

    let first = favorite_service::add_favorite(&state, &user, request()).await?;
    let second = favorite_service::add_favorite(&state, &user, request()).await?;

    let first = first.data.ok_or_else(|| anyhow::anyhow!("no favorite"))?;
    let second = second.data.ok_or_else(|| anyhow::anyhow!("no favorite"))?;
    assert_eq!(first.favorite_id, second.favorite_id);

    let listed = favorite_service::list_favorites(&state, &user, user.user_id)
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("no favorites"))?;
    assert_eq!(listed.items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn cart_count_sums_quantities_across_concurrent_adds() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state, Role::User).await?;
    let rice = create_product(&state, 1_000, 10).await?;
    let tea = create_product(&state, 500, 10).await?;

    // racing adds of one product still end up as a single line
    let (a, b) = tokio::join!(
        add_line(&state, &user, rice, 2),
        add_line(&state, &user, rice, 3)
    );
    assert_eq!(a?, b?);
    add_line(&state, &user, tea, 1).await?;

    let count = cart_service::cart_count(&state, &user, CartCountQuery { user_id: None })
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("no count"))?;
    assert_eq!(count.count, 6);

    Ok(())
}

#[tokio::test]
async fn deleting_an_order_drops_details_and_receipt_but_not_stock() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = create_user(&state, Role::User).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let product_id = create_product(&state, 1_000, 5).await?;
    let line = add_line(&state, &user, product_id, 2).await?;
    let order = order_service::place_order(&state, &user, place(vec![line]))
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("no order"))?;
    qrcode_service::generate_qr_code(&state, &user, GenerateQrCodeRequest { order_id: order.id })
        .await?;

    order_service::delete_order(&state, &admin, order.id).await?;

    assert_eq!(stock_of(&state, product_id).await?, 3);
    let details = OrderDetails::find()
        .filter(DetailCol::OrderId.eq(order.id))
        .count(&state.orm)
        .await?;
    assert_eq!(details, 0);
    let receipt = QrCodes::find()
        .filter(QrCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?;
    assert!(receipt.is_none());

    let again = order_service::delete_order(&state, &admin, order.id)
        .await
        .unwrap_err();
    assert!(matches!(again, AppError::NotFound));

    Ok(())
}
