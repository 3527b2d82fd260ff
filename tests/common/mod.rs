#![allow(dead_code)]

use async_trait::async_trait;
use books_gateway::GatewayError;
use books_gateway::db::{Book, BookDatabase, Connector, DbCredentials};
use books_gateway::query_source::QuerySource;
use books_gateway::secrets::SecretStore;
use books_gateway::service::{BooksService, ConnectionProvider, CredentialResolver};
use books_gateway::{GatewayState, gateway_router};

use axum::Router;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SECRET_NAME: &str = "rds-proxy-credentials";
pub const PROXY_ENDPOINT: &str = "books.proxy-test.ap-northeast-1.rds.amazonaws.com";

pub fn sample_books(n: usize) -> Vec<Book> {
    (1..=n as i64)
        .map(|i| Book {
            id: i,
            name: format!("book-{i}"),
            price: 100 * i,
        })
        .collect()
}

/// Secret store that counts lookups and can be switched into failure.
pub struct FakeSecretStore {
    pub lookups: AtomicUsize,
    pub reachable: AtomicBool,
    pub payload: String,
    pub delay: Duration,
}

impl FakeSecretStore {
    pub fn healthy() -> Arc<Self> {
        Self::slow(Duration::ZERO)
    }

    pub fn unreachable() -> Arc<Self> {
        let store = Self::healthy();
        store.reachable.store(false, Ordering::SeqCst);
        store
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            lookups: AtomicUsize::new(0),
            reachable: AtomicBool::new(true),
            payload: r#"{"username":"admin","password":"secret"}"#.to_string(),
            delay,
        })
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn secret_string(&self, name: &str) -> Result<String, GatewayError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(GatewayError::CredentialFetch(format!(
                "secret store unreachable for {name}"
            )));
        }
        Ok(self.payload.clone())
    }
}

/// In-memory books table. Queued failures are returned before any rows.
pub struct FakeDb {
    rows: Vec<Book>,
    failures: Mutex<VecDeque<GatewayError>>,
    pub queries: Mutex<Vec<String>>,
}

#[async_trait]
impl BookDatabase for FakeDb {
    async fn ping(&self) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn fetch_books(&self, sql: &str) -> Result<Vec<Book>, GatewayError> {
        self.queries.lock().unwrap().push(sql.to_string());
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.rows.clone())
    }
}

/// Connector handing out `FakeDb`s over the same rows.
pub struct FakeConnector {
    pub opens: AtomicUsize,
    pub reachable: AtomicBool,
    pub delay: Duration,
    rows: Vec<Book>,
    failures: Mutex<VecDeque<GatewayError>>,
    pub last_db: Mutex<Option<Arc<FakeDb>>>,
}

impl FakeConnector {
    pub fn with_rows(rows: Vec<Book>) -> Arc<Self> {
        Self::build(rows, Duration::ZERO)
    }

    pub fn slow(rows: Vec<Book>, delay: Duration) -> Arc<Self> {
        Self::build(rows, delay)
    }

    fn build(rows: Vec<Book>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            opens: AtomicUsize::new(0),
            reachable: AtomicBool::new(true),
            delay,
            rows,
            failures: Mutex::new(VecDeque::new()),
            last_db: Mutex::new(None),
        })
    }

    /// Queue an error for the next query run on the next opened database.
    pub fn fail_next_query(&self, err: GatewayError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(
        &self,
        endpoint: &str,
        creds: &DbCredentials,
    ) -> Result<Arc<dyn BookDatabase>, GatewayError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(GatewayError::Connection(format!(
                "{endpoint}: access denied for user {}",
                creds.username
            )));
        }
        let db = Arc::new(FakeDb {
            rows: self.rows.clone(),
            failures: Mutex::new(std::mem::take(&mut *self.failures.lock().unwrap())),
            queries: Mutex::new(Vec::new()),
        });
        *self.last_db.lock().unwrap() = Some(db.clone());
        Ok(db)
    }
}

/// Query source that can be told to fail.
pub struct FakeQuery {
    pub sql: String,
    pub available: AtomicBool,
}

impl FakeQuery {
    pub fn new(sql: &str) -> Arc<Self> {
        Arc::new(Self {
            sql: sql.to_string(),
            available: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl QuerySource for FakeQuery {
    async fn load(&self) -> Result<String, GatewayError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(GatewayError::QuerySource("object not found".into()));
        }
        Ok(self.sql.clone())
    }
}

pub fn build_app(
    store: Arc<FakeSecretStore>,
    connector: Arc<FakeConnector>,
    query: Arc<FakeQuery>,
) -> Router {
    let credentials = CredentialResolver::new(store, Duration::from_secs(2));
    let connections = ConnectionProvider::new(connector, Duration::from_secs(2));
    let books = BooksService::new(SECRET_NAME, PROXY_ENDPOINT, credentials, connections, query);
    gateway_router(GatewayState::new(books))
}
