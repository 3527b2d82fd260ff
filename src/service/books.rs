use crate::db::Book;
use crate::error::GatewayError;
use crate::query_source::QuerySource;
use crate::service::connection_provider::ConnectionProvider;
use crate::service::credential_resolver::CredentialResolver;

use std::sync::Arc;
use tracing::debug;

/// Lists books: credentials, then connection, then query.
pub struct BooksService {
    secret_name: String,
    proxy_endpoint: String,
    credentials: CredentialResolver,
    connections: ConnectionProvider,
    query: Arc<dyn QuerySource>,
}

impl BooksService {
    pub fn new(
        secret_name: impl Into<String>,
        proxy_endpoint: impl Into<String>,
        credentials: CredentialResolver,
        connections: ConnectionProvider,
        query: Arc<dyn QuerySource>,
    ) -> Self {
        Self {
            secret_name: secret_name.into(),
            proxy_endpoint: proxy_endpoint.into(),
            credentials,
            connections,
            query,
        }
    }

    pub async fn list_books(&self) -> Result<Vec<Book>, GatewayError> {
        let creds = self.credentials.resolve(&self.secret_name).await?;
        let db = self
            .connections
            .get_connection(&self.proxy_endpoint, &creds)
            .await?;
        let sql = self.query.load().await?;

        match db.fetch_books(&sql).await {
            Ok(books) => {
                debug!(count = books.len(), "books fetched");
                Ok(books)
            }
            Err(err @ GatewayError::Connection(_)) => {
                self.connections.invalidate(&db).await;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}
