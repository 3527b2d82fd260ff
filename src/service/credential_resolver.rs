use crate::db::DbCredentials;
use crate::error::GatewayError;
use crate::secrets::SecretStore;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::{debug, info, warn};

type CredentialCell = Arc<OnceCell<Arc<DbCredentials>>>;

/// Resolves database credentials from the secret store, once per secret
/// name for the life of the process.
///
/// Each name owns a `OnceCell`: concurrent callers for the same name wait on
/// a single in-flight lookup, and a failed lookup leaves the cell empty so
/// the next call tries again.
pub struct CredentialResolver {
    store: Arc<dyn SecretStore>,
    fetch_timeout: Duration,
    cells: Mutex<HashMap<String, CredentialCell>>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn SecretStore>, fetch_timeout: Duration) -> Self {
        Self {
            store,
            fetch_timeout,
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, secret_name: &str) -> Result<Arc<DbCredentials>, GatewayError> {
        if secret_name.trim().is_empty() {
            return Err(GatewayError::CredentialFetch(
                "secret name must not be empty".to_string(),
            ));
        }

        let cell = self.cell_for(secret_name);
        if let Some(creds) = cell.get() {
            debug!(secret = %secret_name, "credentials served from cache");
            return Ok(creds.clone());
        }

        let creds = cell
            .get_or_try_init(|| self.fetch(secret_name))
            .await
            .inspect_err(|e| warn!(secret = %secret_name, error = %e, "credential fetch failed"))?;
        Ok(creds.clone())
    }

    fn cell_for(&self, secret_name: &str) -> CredentialCell {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.entry(secret_name.to_string()).or_default().clone()
    }

    async fn fetch(&self, secret_name: &str) -> Result<Arc<DbCredentials>, GatewayError> {
        info!(secret = %secret_name, "fetching database credentials");
        let payload = timeout(self.fetch_timeout, self.store.secret_string(secret_name))
            .await
            .map_err(|_| {
                GatewayError::CredentialFetch(format!(
                    "secret lookup timed out after {:?}",
                    self.fetch_timeout
                ))
            })??;

        let creds = DbCredentials::from_secret_payload(&payload)?;
        info!(secret = %secret_name, username = %creds.username, "database credentials cached");
        Ok(Arc::new(creds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::future::join_all;
    use secrecy::ExposeSecret;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PAYLOAD: &str = r#"{"username":"admin","password":"hunter2"}"#;

    struct ScriptedStore {
        lookups: AtomicUsize,
        delay: Duration,
        replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    }

    impl ScriptedStore {
        fn new(replies: Vec<Result<String, GatewayError>>) -> Arc<Self> {
            Self::with_delay(replies, Duration::ZERO)
        }

        fn with_delay(replies: Vec<Result<String, GatewayError>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                lookups: AtomicUsize::new(0),
                delay,
                replies: Mutex::new(replies.into()),
            })
        }

        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SecretStore for ScriptedStore {
        async fn secret_string(&self, _name: &str) -> Result<String, GatewayError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(PAYLOAD.to_string()))
        }
    }

    #[tokio::test]
    async fn repeated_resolve_hits_store_once() {
        let store = ScriptedStore::new(vec![]);
        let resolver = CredentialResolver::new(store.clone(), Duration::from_secs(1));

        let first = resolver.resolve("db-credentials").await.unwrap();
        let second = resolver.resolve("db-credentials").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.username, "admin");
        assert_eq!(first.password.expose_secret(), "hunter2");
        assert_eq!(store.lookups(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let store = ScriptedStore::new(vec![Err(GatewayError::CredentialFetch(
            "unreachable".into(),
        ))]);
        let resolver = CredentialResolver::new(store.clone(), Duration::from_secs(1));

        assert!(matches!(
            resolver.resolve("db-credentials").await,
            Err(GatewayError::CredentialFetch(_))
        ));
        assert!(resolver.resolve("db-credentials").await.is_ok());
        assert_eq!(store.lookups(), 2);
    }

    #[tokio::test]
    async fn malformed_payload_is_surfaced_and_retried() {
        let store = ScriptedStore::new(vec![Ok("{\"user\":\"nobody\"}".to_string())]);
        let resolver = CredentialResolver::new(store.clone(), Duration::from_secs(1));

        assert!(resolver.resolve("db-credentials").await.is_err());
        assert!(resolver.resolve("db-credentials").await.is_ok());
        assert_eq!(store.lookups(), 2);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_lookup() {
        let store = ScriptedStore::with_delay(vec![], Duration::from_millis(50));
        let resolver = CredentialResolver::new(store.clone(), Duration::from_secs(1));

        let results = join_all((0..16).map(|_| resolver.resolve("db-credentials"))).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(store.lookups(), 1);
    }

    #[tokio::test]
    async fn each_secret_name_is_cached_separately() {
        let store = ScriptedStore::new(vec![]);
        let resolver = CredentialResolver::new(store.clone(), Duration::from_secs(1));

        resolver.resolve("primary").await.unwrap();
        resolver.resolve("replica").await.unwrap();
        resolver.resolve("primary").await.unwrap();

        assert_eq!(store.lookups(), 2);
    }

    #[tokio::test]
    async fn slow_store_times_out() {
        let store = ScriptedStore::with_delay(vec![], Duration::from_millis(200));
        let resolver = CredentialResolver::new(store, Duration::from_millis(20));

        let err = resolver.resolve("db-credentials").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn empty_secret_name_skips_store() {
        let store = ScriptedStore::new(vec![]);
        let resolver = CredentialResolver::new(store.clone(), Duration::from_secs(1));

        assert!(resolver.resolve("  ").await.is_err());
        assert_eq!(store.lookups(), 0);
    }
}
