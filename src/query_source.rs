//! Where the books query comes from.
//!
//! Deployments that ship a bucket keep the statement as an object so it can
//! change without a redeploy; everything else runs the built-in statement.

use crate::error::GatewayError;
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::DisplayErrorContext;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

pub const DEFAULT_BOOKS_QUERY: &str = "SELECT id, name, price FROM books ORDER BY id";

#[async_trait]
pub trait QuerySource: Send + Sync {
    async fn load(&self) -> Result<String, GatewayError>;
}

/// Fixed statement compiled into the binary.
#[derive(Debug, Clone)]
pub struct StaticQuery {
    sql: String,
}

impl StaticQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }
}

impl Default for StaticQuery {
    fn default() -> Self {
        Self::new(DEFAULT_BOOKS_QUERY)
    }
}

#[async_trait]
impl QuerySource for StaticQuery {
    async fn load(&self) -> Result<String, GatewayError> {
        Ok(self.sql.clone())
    }
}

/// Statement stored as an S3 object, read on every call.
#[derive(Clone)]
pub struct ObjectQuery {
    client: S3Client,
    bucket: String,
    key: String,
    read_timeout: Duration,
}

impl ObjectQuery {
    pub fn new(
        client: S3Client,
        bucket: impl Into<String>,
        key: impl Into<String>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: key.into(),
            read_timeout,
        }
    }

    async fn fetch(&self) -> Result<Vec<u8>, GatewayError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .map_err(|e| {
                GatewayError::QuerySource(format!(
                    "GetObject s3://{}/{} failed: {}",
                    self.bucket,
                    self.key,
                    DisplayErrorContext(&e)
                ))
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| GatewayError::QuerySource(format!("reading object body failed: {e}")))?;
        Ok(body.into_bytes().to_vec())
    }
}

#[async_trait]
impl QuerySource for ObjectQuery {
    async fn load(&self) -> Result<String, GatewayError> {
        let bytes = timeout(self.read_timeout, self.fetch())
            .await
            .map_err(|_| {
                GatewayError::QuerySource(format!(
                    "reading s3://{}/{} timed out",
                    self.bucket, self.key
                ))
            })??;

        let raw = String::from_utf8(bytes)
            .map_err(|e| GatewayError::QuerySource(format!("query object is not UTF-8: {e}")))?;
        let sql = normalize_statement(&raw)?;
        debug!(bucket = %self.bucket, key = %self.key, len = sql.len(), "query loaded from object");
        Ok(sql)
    }
}

/// Trim surrounding whitespace and trailing semicolons, so a file saved from
/// a SQL editor goes out as one bare statement. An object with nothing left
/// is an error.
fn normalize_statement(raw: &str) -> Result<String, GatewayError> {
    let sql = raw.trim().trim_end_matches(';').trim_end();
    if sql.is_empty() {
        return Err(GatewayError::QuerySource("stored query is empty".to_string()));
    }
    Ok(sql.to_string())
}
