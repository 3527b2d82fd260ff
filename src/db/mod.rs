//! Database module: the connection seam and its MySQL implementation.
//!
//! Layout:
//! - `models.rs`: credentials decoded from the secret store, and the `Book` row
//! - `mysql.rs`: sqlx-backed connector that talks to MySQL through the proxy

pub mod models;
pub mod mysql;

pub use models::{Book, DbCredentials};
pub use mysql::MySqlConnector;

use crate::error::GatewayError;
use async_trait::async_trait;
use std::sync::Arc;

/// A live handle to the books database.
#[async_trait]
pub trait BookDatabase: Send + Sync {
    /// Lightweight liveness check.
    async fn ping(&self) -> Result<(), GatewayError>;

    /// Run a parameter-free read query and map each row positionally
    /// as `(id, name, price)`.
    async fn fetch_books(&self, sql: &str) -> Result<Vec<Book>, GatewayError>;
}

/// Opens new database handles.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(
        &self,
        endpoint: &str,
        creds: &DbCredentials,
    ) -> Result<Arc<dyn BookDatabase>, GatewayError>;
}
