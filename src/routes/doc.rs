use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
        cart::{AddToCartRequest, CartCount, CartList, UpdateCartRequest},
        categories::{CategoryInput, CategoryList},
        favorites::{AddFavoriteRequest, FavoriteList},
        orders::{OrderList, PlaceOrderRequest, UpdateOrderStatusRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        qrcode::GenerateQrCodeRequest,
        users::{UpdateUserRequest, UserList},
    },
    models::{
        CartLine, Category, CategoryWithProducts, Favorite, Order, OrderDetail, Product, QrCode,
        QrCodeDetails, ReceiptItem, UserProfile, UserSummary,
    },
    response::{ApiResponse, Meta},
    routes::{auth, cart, categories, favorites, health, orders, params, products, qrcode, users},
    validation::FieldError,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Smart Canteen API"),
    paths(
        health::health_check,
        auth::register,
        auth::login,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart,
        cart::remove_from_cart,
        cart::cart_count,
        orders::place_order,
        orders::list_orders,
        orders::get_order,
        orders::list_user_orders,
        orders::update_order_status,
        orders::delete_order,
        qrcode::generate_qr_code,
        qrcode::get_qr_code,
        qrcode::qr_code_svg,
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite,
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::list_users_by_role
    ),
    components(
        schemas(
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            LoginResponse,
            Category,
            CategoryInput,
            CategoryList,
            CategoryWithProducts,
            Product,
            ProductList,
            CreateProductRequest,
            UpdateProductRequest,
            CartLine,
            CartList,
            CartCount,
            AddToCartRequest,
            UpdateCartRequest,
            Order,
            OrderDetail,
            OrderList,
            PlaceOrderRequest,
            UpdateOrderStatusRequest,
            QrCode,
            QrCodeDetails,
            ReceiptItem,
            GenerateQrCodeRequest,
            Favorite,
            FavoriteList,
            AddFavoriteRequest,
            UserSummary,
            UserProfile,
            UserList,
            UpdateUserRequest,
            FieldError,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Order>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Categories", description = "Menu categories"),
        (name = "Products", description = "Menu items and stock"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order placement and lifecycle"),
        (name = "QR Codes", description = "Order receipts"),
        (name = "Favorites", description = "Favorite products"),
        (name = "Users", description = "User administration"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
