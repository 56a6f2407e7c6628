//! Explicit lookups over the storefront tables. Every function runs on a
//! caller-supplied connection so it joins whatever unit of work is open.

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db::models::{
    DbCart, DbCartItem, DbCheckout, DbProduct, DbProfile, DbUser, NewProduct, NewProfile,
};
use crate::error::StorefrontError;

const USER_COLUMNS: &str = "id, username, email, password, created_at, disabled";

/// Insert a user whose password is already hashed. Returns the row id.
pub async fn insert_user(
    conn: &mut SqliteConnection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<i64, StorefrontError> {
    let rec: (i64,) = sqlx::query_as(
        r#"INSERT INTO users (username, email, password, created_at, disabled)
           VALUES (?, ?, ?, ?, 0)
           RETURNING id"#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(rec.0)
}

pub async fn user_by_id(conn: &mut SqliteConnection, id: i64) -> Result<DbUser, StorefrontError> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
    ))
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(user)
}

pub async fn user_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<Option<DbUser>, StorefrontError> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
    ))
    .bind(username)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

pub async fn set_user_disabled(
    conn: &mut SqliteConnection,
    id: i64,
    disabled: bool,
) -> Result<(), StorefrontError> {
    let res = sqlx::query("UPDATE users SET disabled = ? WHERE id = ?")
        .bind(disabled)
        .bind(id)
        .execute(conn)
        .await?;
    if res.rows_affected() == 0 {
        return Err(StorefrontError::NotFound);
    }
    Ok(())
}

pub async fn insert_profile(
    conn: &mut SqliteConnection,
    user_id: i64,
    profile: &NewProfile,
) -> Result<DbProfile, StorefrontError> {
    let row = sqlx::query_as::<_, DbProfile>(
        r#"INSERT INTO profiles (user_id, first_name, last_name, address, phone)
           VALUES (?, ?, ?, ?, ?)
           RETURNING id, user_id, first_name, last_name, address, phone"#,
    )
    .bind(user_id)
    .bind(&profile.first_name)
    .bind(&profile.last_name)
    .bind(&profile.address)
    .bind(&profile.phone)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn profile_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<DbProfile>, StorefrontError> {
    let row = sqlx::query_as::<_, DbProfile>(
        r#"SELECT id, user_id, first_name, last_name, address, phone
           FROM profiles WHERE user_id = ? ORDER BY id LIMIT 1"#,
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn insert_product(
    conn: &mut SqliteConnection,
    product: &NewProduct,
) -> Result<DbProduct, StorefrontError> {
    let row = sqlx::query_as::<_, DbProduct>(
        r#"INSERT INTO products (name, description, price, category, image_url, stock_quantity)
           VALUES (?, ?, ?, ?, ?, ?)
           RETURNING id, name, description, price, category, image_url, stock_quantity"#,
    )
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.category)
    .bind(&product.image_url)
    .bind(product.stock_quantity)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn product_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<DbProduct, StorefrontError> {
    let row = sqlx::query_as::<_, DbProduct>(
        r#"SELECT id, name, description, price, category, image_url, stock_quantity
           FROM products WHERE id = ?"#,
    )
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn create_cart(
    conn: &mut SqliteConnection,
    profile_id: i64,
) -> Result<DbCart, StorefrontError> {
    let row = sqlx::query_as::<_, DbCart>(
        "INSERT INTO carts (profile_id, created_at) VALUES (?, ?) RETURNING id, profile_id, created_at",
    )
    .bind(profile_id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Most recent cart of a profile.
pub async fn cart_for_profile(
    conn: &mut SqliteConnection,
    profile_id: i64,
) -> Result<Option<DbCart>, StorefrontError> {
    let row = sqlx::query_as::<_, DbCart>(
        "SELECT id, profile_id, created_at FROM carts WHERE profile_id = ? ORDER BY id DESC LIMIT 1",
    )
    .bind(profile_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn add_cart_item(
    conn: &mut SqliteConnection,
    cart_id: i64,
    product_id: i64,
    quantity: i64,
) -> Result<DbCartItem, StorefrontError> {
    if quantity <= 0 {
        return Err(StorefrontError::Validation(
            "quantity must be positive".to_string(),
        ));
    }
    let row = sqlx::query_as::<_, DbCartItem>(
        r#"INSERT INTO cart_items (cart_id, product_id, quantity)
           VALUES (?, ?, ?)
           RETURNING id, cart_id, product_id, quantity"#,
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn items_in_cart(
    conn: &mut SqliteConnection,
    cart_id: i64,
) -> Result<Vec<DbCartItem>, StorefrontError> {
    let rows = sqlx::query_as::<_, DbCartItem>(
        "SELECT id, cart_id, product_id, quantity FROM cart_items WHERE cart_id = ? ORDER BY id",
    )
    .bind(cart_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Record a pending checkout for a cart, totalling its items at current prices.
pub async fn checkout_cart(
    conn: &mut SqliteConnection,
    cart_id: i64,
    shipping_address: &str,
    payment_method: &str,
) -> Result<DbCheckout, StorefrontError> {
    let (total,): (Option<f64>,) = sqlx::query_as(
        r#"SELECT SUM(ci.quantity * p.price)
           FROM cart_items ci JOIN products p ON p.id = ci.product_id
           WHERE ci.cart_id = ?"#,
    )
    .bind(cart_id)
    .fetch_one(&mut *conn)
    .await?;
    let Some(order_total) = total else {
        return Err(StorefrontError::Validation("cart is empty".to_string()));
    };

    let row = sqlx::query_as::<_, DbCheckout>(
        r#"INSERT INTO checkouts (cart_id, order_total, shipping_address, payment_method, order_status)
           VALUES (?, ?, ?, ?, 'pending')
           RETURNING id, cart_id, order_total, shipping_address, payment_method, order_status"#,
    )
    .bind(cart_id)
    .bind(order_total)
    .bind(shipping_address)
    .bind(payment_method)
    .fetch_one(conn)
    .await?;
    Ok(row)
}
