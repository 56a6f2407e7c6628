use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use log::LevelFilter;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, Pool, Sqlite, Transaction};
use tracing::{debug, info, warn};

use crate::error::StorefrontError;

pub type SqlitePool = Pool<Sqlite>;

/// Pool and driver settings applied when the engine is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum number of pooled connections.
    pub pool_size: u32,
    /// Log every statement at INFO.
    pub echo: bool,
    /// How long a caller may wait for a pooled connection.
    pub acquire_timeout: Duration,
    /// How long `dispose` waits for checked-out connections to come back.
    pub close_timeout: Duration,
    /// Opaque driver settings, applied as SQLite pragmas.
    pub driver_options: BTreeMap<String, String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            pool_size: 5,
            echo: false,
            acquire_timeout: Duration::from_secs(30),
            close_timeout: Duration::from_secs(10),
            driver_options: BTreeMap::new(),
        }
    }
}

/// Shared handle over the connection pool. Cloning is cheap; all clones
/// refer to the same pool.
#[derive(Clone)]
pub struct ConnectionEngine {
    pool: SqlitePool,
    options: Arc<EngineOptions>,
}

impl ConnectionEngine {
    pub async fn connect(database_url: &str, options: EngineOptions) -> Result<Self, StorefrontError> {
        let mut connect_opts = SqliteConnectOptions::from_str(database_url)
            .map_err(StorefrontError::Database)?
            .create_if_missing(true);
        connect_opts = if options.echo {
            connect_opts.log_statements(LevelFilter::Info)
        } else {
            connect_opts.disable_statement_logging()
        };
        for (key, value) in &options.driver_options {
            connect_opts = connect_opts.pragma(key.clone(), value.clone());
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(options.pool_size.max(1))
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect_opts)
            .await?;

        info!(
            pool_size = options.pool_size,
            echo = options.echo,
            "connection engine ready"
        );

        Ok(Self {
            pool,
            options: Arc::new(options),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Borrow a connection and open a transaction on it. May wait up to the
    /// configured acquire timeout for a free connection.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, StorefrontError> {
        Ok(self.pool.begin().await?)
    }

    /// Close the pool. Checked-out connections get `close_timeout` to be
    /// returned; after that we stop waiting and they are closed on release.
    pub async fn dispose(self) {
        let in_use = (self.pool.size() as usize).saturating_sub(self.pool.num_idle());
        debug!(in_use, "disposing connection engine");
        match tokio::time::timeout(self.options.close_timeout, self.pool.close()).await {
            Ok(()) => info!("connection engine disposed"),
            Err(_) => warn!(
                timeout_secs = self.options.close_timeout.as_secs(),
                "connections still checked out after close timeout; releasing on return"
            ),
        }
    }
}
