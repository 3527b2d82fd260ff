use crate::config::Config;
use crate::db::{Book, BookDatabase, Connector, DbCredentials};
use crate::error::GatewayError;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::{RawSql, Row};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// Opens sqlx MySQL pools against the RDS Proxy endpoint.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    database: String,
    default_port: u16,
    max_connections: u32,
    ssl_ca_path: Option<PathBuf>,
    connect_timeout: Duration,
    query_timeout: Duration,
}

impl MySqlConnector {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            database: cfg.database_name.clone(),
            default_port: cfg.database_port,
            max_connections: cfg.db_max_connections,
            ssl_ca_path: cfg.ssl_ca_path.clone(),
            connect_timeout: cfg.connect_timeout(),
            query_timeout: cfg.query_timeout(),
        }
    }

    fn connect_options(&self, endpoint: &str, creds: &DbCredentials) -> MySqlConnectOptions {
        let (host, port) = split_host_port(endpoint, self.default_port);
        let opts = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(&creds.username)
            .password(creds.password.expose_secret())
            .database(&self.database)
            .charset("utf8mb4");

        // RDS Proxy only accepts TLS clients.
        match &self.ssl_ca_path {
            Some(ca) => opts.ssl_mode(MySqlSslMode::VerifyCa).ssl_ca(ca),
            None => opts.ssl_mode(MySqlSslMode::Required),
        }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn open(
        &self,
        endpoint: &str,
        creds: &DbCredentials,
    ) -> Result<Arc<dyn BookDatabase>, GatewayError> {
        let opts = self.connect_options(endpoint, creds);
        let connect = MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.connect_timeout)
            .connect_with(opts);

        let pool = timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| {
                GatewayError::Connection(format!(
                    "connect to {endpoint} timed out after {:?}",
                    self.connect_timeout
                ))
            })?
            .map_err(|e| GatewayError::Connection(e.to_string()))?;

        info!(
            endpoint = %endpoint,
            database = %self.database,
            max_connections = self.max_connections,
            "MySQL pool opened"
        );
        Ok(Arc::new(MySqlBooks {
            pool,
            query_timeout: self.query_timeout,
        }))
    }
}

/// Books database backed by a sqlx MySQL pool.
pub struct MySqlBooks {
    pool: MySqlPool,
    query_timeout: Duration,
}

#[async_trait]
impl BookDatabase for MySqlBooks {
    async fn ping(&self) -> Result<(), GatewayError> {
        let ping = text_statement("SELECT 1").execute(&self.pool);
        timeout(self.query_timeout, ping)
            .await
            .map_err(|_| GatewayError::Connection("liveness check timed out".to_string()))?
            .map_err(|e| GatewayError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn fetch_books(&self, sql: &str) -> Result<Vec<Book>, GatewayError> {
        let fetch = text_statement(sql).fetch_all(&self.pool);
        let rows = timeout(self.query_timeout, fetch)
            .await
            .map_err(|_| {
                GatewayError::Query(format!("query timed out after {:?}", self.query_timeout))
            })?
            .map_err(classify_sqlx_error)?;

        debug!(rows = rows.len(), "books query returned");
        rows.iter()
            .map(row_to_book)
            .collect::<Result<Vec<_>, _>>()
            .map_err(classify_sqlx_error)
    }
}

/// Statements go over the text protocol (COM_QUERY). A prepared statement
/// pins the client session to one backend connection inside RDS Proxy.
fn text_statement(sql: &str) -> RawSql<'_> {
    sqlx::raw_sql(sql)
}

fn row_to_book(row: &MySqlRow) -> Result<Book, sqlx::Error> {
    Ok(Book {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
        price: row.try_get(2)?,
    })
}

/// Transport-level failures mean the pool is no longer trustworthy and the
/// caller should reopen; everything else is a problem with the query itself.
fn classify_sqlx_error(err: sqlx::Error) -> GatewayError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => GatewayError::Connection(err.to_string()),
        other => GatewayError::Query(other.to_string()),
    }
}

/// Split `host[:port]`, falling back to `default_port` when no numeric
/// port suffix is present.
fn split_host_port(endpoint: &str, default_port: u16) -> (&str, u16) {
    match endpoint.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => match port.parse::<u16>() {
            Ok(port) => (host, port),
            Err(_) => (endpoint, default_port),
        },
        _ => (endpoint, default_port),
    }
}
