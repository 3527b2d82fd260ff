use std::sync::Arc;

use axum::{Router, routing::get};
use tracing::info;

use crate::aws::{load_sdk_config, s3_config};
use crate::config::Config;
use crate::db::MySqlConnector;
use crate::handlers::books::{health_handler, list_books_handler};
use crate::query_source::{ObjectQuery, QuerySource, StaticQuery};
use crate::secrets::SecretsManagerStore;
use crate::service::{BooksService, ConnectionProvider, CredentialResolver};

/// Process-wide state shared by every request. Owns the credential and
/// connection caches.
#[derive(Clone)]
pub struct GatewayState {
    pub books: Arc<BooksService>,
}

impl GatewayState {
    pub fn new(books: BooksService) -> Self {
        Self {
            books: Arc::new(books),
        }
    }

    /// Wire the production collaborators described by `cfg`.
    pub async fn from_config(cfg: &Config) -> Self {
        let sdk_config = load_sdk_config(cfg).await;

        let store = SecretsManagerStore::new(aws_sdk_secretsmanager::Client::new(&sdk_config));
        let credentials = CredentialResolver::new(Arc::new(store), cfg.secret_timeout());

        let connector = MySqlConnector::from_config(cfg);
        let connections = ConnectionProvider::new(Arc::new(connector), cfg.connect_timeout());

        let query: Arc<dyn QuerySource> = match &cfg.bucket_name {
            Some(bucket) => {
                info!(bucket = %bucket, key = %cfg.sql_object_key, "books query read from object storage");
                Arc::new(ObjectQuery::new(
                    aws_sdk_s3::Client::from_conf(s3_config(&sdk_config, cfg)),
                    bucket.clone(),
                    cfg.sql_object_key.clone(),
                    cfg.query_timeout(),
                ))
            }
            None => {
                info!("no bucket configured; using built-in books query");
                Arc::new(StaticQuery::default())
            }
        };

        Self::new(BooksService::new(
            cfg.rds_secret_name.clone(),
            cfg.proxy_endpoint.clone(),
            credentials,
            connections,
            query,
        ))
    }
}

pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/books", get(list_books_handler))
        .route("/healthz", get(health_handler))
        .with_state(state)
}
