//! SQL DDL for the storefront tables and the create-if-absent initializer.
//! SQLite-first; every statement is guarded with `IF NOT EXISTS`.

use tracing::{debug, info};

use crate::db::engine::ConnectionEngine;
use crate::error::StorefrontError;

/// Storage shape of one entity: a table plus its indexes.
#[derive(Debug, Clone, Copy)]
pub struct EntityTable {
    pub name: &'static str,
    pub ddl: &'static str,
}

pub const USERS: EntityTable = EntityTable {
    name: "users",
    ddl: r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE CHECK (length(username) <= 50),
    email TEXT NOT NULL UNIQUE CHECK (length(email) <= 255),
    password TEXT NOT NULL, -- PHC-encoded argon2 hash
    created_at TEXT NOT NULL, -- RFC3339
    disabled INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);
CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
"#,
};

pub const PROFILES: EntityTable = EntityTable {
    name: "profiles",
    ddl: r#"
CREATE TABLE IF NOT EXISTS profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    first_name TEXT NULL,
    last_name TEXT NULL,
    address TEXT NULL,
    phone TEXT NULL
);
CREATE INDEX IF NOT EXISTS idx_profiles_user_id ON profiles(user_id);
"#,
};

pub const PRODUCTS: EntityTable = EntityTable {
    name: "products",
    ddl: r#"
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    price REAL NOT NULL,
    category TEXT NOT NULL,
    image_url TEXT NULL,
    stock_quantity INTEGER NOT NULL DEFAULT 1
);
"#,
};

pub const CARTS: EntityTable = EntityTable {
    name: "carts",
    ddl: r#"
CREATE TABLE IF NOT EXISTS carts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id INTEGER NOT NULL REFERENCES profiles(id),
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_carts_profile_id ON carts(profile_id);
"#,
};

pub const CART_ITEMS: EntityTable = EntityTable {
    name: "cart_items",
    ddl: r#"
CREATE TABLE IF NOT EXISTS cart_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cart_id INTEGER NOT NULL REFERENCES carts(id),
    product_id INTEGER NOT NULL REFERENCES products(id),
    quantity INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_cart_items_cart_id ON cart_items(cart_id);
"#,
};

pub const CHECKOUTS: EntityTable = EntityTable {
    name: "checkouts",
    ddl: r#"
CREATE TABLE IF NOT EXISTS checkouts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cart_id INTEGER NOT NULL REFERENCES carts(id),
    order_total REAL NOT NULL,
    shipping_address TEXT NOT NULL,
    payment_method TEXT NOT NULL,
    order_status TEXT NOT NULL
);
"#,
};

/// Every entity, ordered so referenced tables come first.
pub const STOREFRONT_CATALOG: &[EntityTable] =
    &[USERS, PROFILES, PRODUCTS, CARTS, CART_ITEMS, CHECKOUTS];

/// Create every table in `catalog` that does not exist yet, in one
/// transaction. Running it against a complete schema changes nothing.
///
/// Not meant to run concurrently with itself; call once before serving.
pub async fn ensure_schema(
    engine: &ConnectionEngine,
    catalog: &[EntityTable],
) -> Result<(), StorefrontError> {
    let mut tx = engine.begin().await?;
    for table in catalog {
        // sqlx::query runs a single statement, so split the bundle.
        for stmt in table.ddl.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&mut *tx).await?;
        }
        debug!(table = table.name, "table ensured");
    }
    tx.commit().await.map_err(StorefrontError::Transaction)?;
    info!(tables = catalog.len(), "database schema ensured");
    Ok(())
}
