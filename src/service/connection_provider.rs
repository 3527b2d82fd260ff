use crate::db::{BookDatabase, Connector, DbCredentials};
use crate::error::GatewayError;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, warn};

struct CachedConnection {
    endpoint: String,
    db: Arc<dyn BookDatabase>,
}

/// Lazily opens the database connection and reuses it across requests.
///
/// Readers take the `RwLock` fast path. Opening is serialized by
/// `open_lock`, so at most one open is in flight per process.
pub struct ConnectionProvider {
    connector: Arc<dyn Connector>,
    open_timeout: Duration,
    current: RwLock<Option<CachedConnection>>,
    open_lock: Mutex<()>,
}

impl ConnectionProvider {
    pub fn new(connector: Arc<dyn Connector>, open_timeout: Duration) -> Self {
        Self {
            connector,
            open_timeout,
            current: RwLock::new(None),
            open_lock: Mutex::new(()),
        }
    }

    pub async fn get_connection(
        &self,
        endpoint: &str,
        creds: &DbCredentials,
    ) -> Result<Arc<dyn BookDatabase>, GatewayError> {
        if let Some(db) = self.cached(endpoint).await {
            debug!(endpoint = %endpoint, "reusing database connection");
            return Ok(db);
        }

        let _opening = self.open_lock.lock().await;
        // Another caller may have finished opening while we waited.
        if let Some(db) = self.cached(endpoint).await {
            return Ok(db);
        }

        match self.open(endpoint, creds).await {
            Ok(db) => {
                *self.current.write().await = Some(CachedConnection {
                    endpoint: endpoint.to_string(),
                    db: db.clone(),
                });
                info!(endpoint = %endpoint, "database connection established");
                Ok(db)
            }
            Err(e) => {
                self.current.write().await.take();
                warn!(endpoint = %endpoint, error = %e, "database connection failed");
                Err(e)
            }
        }
    }

    /// Drop the cached connection if it is still `stale`, so the next call
    /// opens a fresh one. A connection that has already been replaced is left
    /// alone.
    pub async fn invalidate(&self, stale: &Arc<dyn BookDatabase>) {
        let mut current = self.current.write().await;
        if current
            .as_ref()
            .is_some_and(|cached| Arc::ptr_eq(&cached.db, stale))
        {
            current.take();
            info!("cached database connection invalidated");
        }
    }

    async fn cached(&self, endpoint: &str) -> Option<Arc<dyn BookDatabase>> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|cached| cached.endpoint == endpoint)
            .map(|cached| cached.db.clone())
    }

    async fn open(
        &self,
        endpoint: &str,
        creds: &DbCredentials,
    ) -> Result<Arc<dyn BookDatabase>, GatewayError> {
        let open_and_verify = async {
            let db = self.connector.open(endpoint, creds).await?;
            db.ping().await?;
            Ok::<_, GatewayError>(db)
        };
        timeout(self.open_timeout, open_and_verify)
            .await
            .map_err(|_| {
                GatewayError::Connection(format!(
                    "opening {endpoint} timed out after {:?}",
                    self.open_timeout
                ))
            })?
    }
}
