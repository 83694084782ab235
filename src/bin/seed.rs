use smart_canteen_api::{
    db::{create_pool, run_migrations},
    models::Role,
    services::auth_service::hash_password,
};
use uuid::Uuid;

const CATEGORIES: &[(&str, &str)] = &[
    ("Meals", "Rice and noodle dishes"),
    ("Snacks", "Small bites between classes"),
    ("Drinks", "Hot and cold beverages"),
];

// (category, name, description, price, stock, image)
const PRODUCTS: &[(&str, &str, &str, i64, i32, &str)] = &[
    ("Meals", "Fried Rice", "Fried rice with egg", 25000, 40, "fried-rice.jpg"),
    ("Meals", "Chicken Noodles", "Noodles with braised chicken", 22000, 30, "chicken-noodles.jpg"),
    ("Snacks", "Spring Rolls", "Three crispy rolls", 12000, 60, "spring-rolls.jpg"),
    ("Snacks", "Banana Fritters", "Warm fried banana", 8000, 50, "banana-fritters.jpg"),
    ("Drinks", "Iced Tea", "Sweet iced tea", 5000, 120, "iced-tea.jpg"),
    ("Drinks", "Coffee", "Black coffee", 7000, 80, "coffee.jpg"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin", "admin@canteen.local", "admin123", Role::Admin).await?;
    let user_id = ensure_user(&pool, "student", "student@canteen.local", "student123", Role::User).await?;
    seed_menu(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, full_name, password_hash, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (username) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(username)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    println!("Ensured user {username} (role={role})");
    Ok(id)
}

async fn seed_menu(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for &(name, description) in CATEGORIES {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description)
            SELECT $1, $2, $3
            WHERE NOT EXISTS (SELECT 1 FROM categories WHERE LOWER(name) = LOWER($2))
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    }

    for &(category, name, description, price, stock, image) in PRODUCTS {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock, image, category_id)
            SELECT $1, $2, $3, $4, $5, $6, c.id
            FROM categories c
            WHERE LOWER(c.name) = LOWER($7)
              AND NOT EXISTS (SELECT 1 FROM products WHERE name = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(stock)
        .bind(image)
        .bind(category)
        .execute(pool)
        .await?;
    }

    println!("Seeded {} categories and {} products", CATEGORIES.len(), PRODUCTS.len());
    Ok(())
}
