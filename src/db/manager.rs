//! Process-wide owner of the connection engine and session factory.
//!
//! Construct one [`SessionManager`], `init` it at startup, hand it (usually in
//! an `Arc`) to whatever needs storage, and `close` it once at shutdown. Every
//! operation before `init` or after `close` fails with `NotInitialized`.

use futures::future::BoxFuture;
use sqlx::SqliteConnection;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::db::engine::{ConnectionEngine, EngineOptions};
use crate::db::schema::{self, STOREFRONT_CATALOG};
use crate::db::session::{Session, SessionFactory, SessionStats};
use crate::error::StorefrontError;

struct Handles {
    engine: ConnectionEngine,
    factory: SessionFactory,
}

#[derive(Default)]
pub struct SessionManager {
    handles: RwLock<Option<Handles>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the engine and session factory.
    pub async fn init(
        &self,
        database_url: &str,
        options: EngineOptions,
    ) -> Result<(), StorefrontError> {
        let mut handles = self.handles.write().await;
        if handles.is_some() {
            return Err(StorefrontError::AlreadyInitialized);
        }
        let engine = ConnectionEngine::connect(database_url, options).await?;
        let factory = SessionFactory::new(&engine);
        *handles = Some(Handles { engine, factory });
        info!("session manager initialized");
        Ok(())
    }

    /// Dispose the engine and drop all handles.
    pub async fn close(&self) -> Result<(), StorefrontError> {
        let handles = self
            .handles
            .write()
            .await
            .take()
            .ok_or(StorefrontError::NotInitialized)?;
        let stats = handles.factory.stats();
        handles.engine.dispose().await;
        info!(
            sessions_opened = stats.opened,
            sessions_closed = stats.closed,
            "session manager closed"
        );
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.handles.read().await.is_some()
    }

    pub async fn engine(&self) -> Result<ConnectionEngine, StorefrontError> {
        self.handles
            .read()
            .await
            .as_ref()
            .map(|h| h.engine.clone())
            .ok_or(StorefrontError::NotInitialized)
    }

    async fn factory(&self) -> Result<SessionFactory, StorefrontError> {
        self.handles
            .read()
            .await
            .as_ref()
            .map(|h| h.factory.clone())
            .ok_or(StorefrontError::NotInitialized)
    }

    pub async fn session_stats(&self) -> Result<SessionStats, StorefrontError> {
        Ok(self.factory().await?.stats())
    }

    /// Create any missing storefront tables.
    pub async fn ensure_schema(&self) -> Result<(), StorefrontError> {
        let engine = self.engine().await?;
        schema::ensure_schema(&engine, STOREFRONT_CATALOG).await
    }

    /// Run `f` on a raw connection inside a transaction.
    ///
    /// Commits when `f` returns `Ok`. When `f` returns `Err` the transaction
    /// is rolled back and that same error is returned. If the returned future
    /// is dropped early the transaction is rolled back as the connection goes
    /// back to the pool.
    pub async fn scoped_connection<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, E>>,
        E: From<StorefrontError>,
    {
        let engine = self.engine().await?;
        let mut tx = engine.begin().await?;
        match f(&mut *tx).await {
            Ok(value) => {
                tx.commit().await.map_err(StorefrontError::Transaction)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    warn!(error = %rb, "rollback after failed unit of work also failed");
                }
                Err(e)
            }
        }
    }

    /// Run `f` with a fresh [`Session`].
    ///
    /// When `f` returns `Err`, the session's pending transaction is rolled back
    /// before the error is returned. The session is closed afterwards in every
    /// case. Commit is left to `f`; work it leaves uncommitted is discarded.
    pub async fn scoped_session<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, E>>,
        E: From<StorefrontError>,
    {
        let factory = self.factory().await?;
        let mut session = factory.open();
        let result = f(&mut session).await;

        if result.is_err()
            && session.is_open()
            && let Err(rb) = session.rollback().await
        {
            warn!(session = session.id(), error = %rb, "session rollback failed");
        }
        if session.is_open()
            && let Err(e) = session.close().await
        {
            warn!(session = session.id(), error = %e, "session close failed");
        }
        result
    }
}
