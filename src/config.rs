use crate::error::GatewayError;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::Deserialize;
use std::{collections::BTreeMap, path::PathBuf, time::Duration};

/// Variables taken verbatim. figment's `Env` provider would turn `20240101`
/// or `true` into typed values, and these are names, not numbers.
const STRING_KEYS: &[&str] = &[
    "PROXY_ENDPOINT",
    "RDS_SECRET_NAME",
    "BUCKET_NAME",
    "SQL_OBJECT_KEY",
    "DATABASE_NAME",
    "SSL_CA_PATH",
    "AWS_REGION",
    "LISTEN_ADDR",
    "LOGLEVEL",
];

/// Variables parsed as numbers.
const NUMERIC_KEYS: &[&str] = &[
    "DATABASE_PORT",
    "DB_MAX_CONNECTIONS",
    "SECRET_TIMEOUT_SECS",
    "CONNECT_TIMEOUT_SECS",
    "QUERY_TIMEOUT_SECS",
];

/// Process configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// RDS Proxy host name, optionally `host:port`.
    pub proxy_endpoint: String,
    /// Secrets Manager id holding the database credentials.
    pub rds_secret_name: String,
    /// Bucket holding the stored query. Absent means the built-in query is used.
    #[serde(default)]
    pub bucket_name: Option<String>,
    #[serde(default = "default_sql_object_key")]
    pub sql_object_key: String,
    #[serde(default = "default_database_name")]
    pub database_name: String,
    #[serde(default = "default_database_port")]
    pub database_port: u16,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default)]
    pub ssl_ca_path: Option<PathBuf>,
    #[serde(default)]
    pub aws_region: Option<String>,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_loglevel")]
    pub loglevel: String,
    #[serde(default = "default_secret_timeout_secs")]
    pub secret_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_sql_object_key() -> String {
    "test.sql".to_string()
}

fn default_database_name() -> String {
    "rds_proxy_go".to_string()
}

fn default_database_port() -> u16 {
    3306
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_secret_timeout_secs() -> u64 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_query_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Figment reading the recognised variables from the process environment.
    /// Anything else in the environment is ignored.
    pub fn figment() -> Figment {
        Figment::from(Env::raw().only(NUMERIC_KEYS))
            .merge(Serialized::defaults(verbatim_env(STRING_KEYS)))
    }

    /// Load and validate configuration from the process environment.
    pub fn load() -> Result<Self, GatewayError> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, GatewayError> {
        let cfg: Config = figment
            .extract()
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        cfg.validate()
    }

    fn validate(mut self) -> Result<Self, GatewayError> {
        self.proxy_endpoint = required("PROXY_ENDPOINT", &self.proxy_endpoint)?;
        self.rds_secret_name = required("RDS_SECRET_NAME", &self.rds_secret_name)?;

        self.bucket_name = self
            .bucket_name
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());
        self.aws_region = self
            .aws_region
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        self.ssl_ca_path = self
            .ssl_ca_path
            .filter(|p| !p.as_os_str().to_string_lossy().trim().is_empty());

        if self.sql_object_key.trim().is_empty() {
            return Err(GatewayError::Config("SQL_OBJECT_KEY must not be blank".into()));
        }
        if self.db_max_connections == 0 {
            return Err(GatewayError::Config(
                "DB_MAX_CONNECTIONS must be at least 1".into(),
            ));
        }
        for (key, secs) in [
            ("SECRET_TIMEOUT_SECS", self.secret_timeout_secs),
            ("CONNECT_TIMEOUT_SECS", self.connect_timeout_secs),
            ("QUERY_TIMEOUT_SECS", self.query_timeout_secs),
        ] {
            if secs == 0 {
                return Err(GatewayError::Config(format!("{key} must be non-zero")));
            }
        }
        Ok(self)
    }

    pub fn secret_timeout(&self) -> Duration {
        Duration::from_secs(self.secret_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[cfg(test)]
impl Config {
    /// Defaults with the two required values filled in.
    pub(crate) fn sample() -> Self {
        Self {
            proxy_endpoint: "books.proxy-abc.ap-northeast-1.rds.amazonaws.com".into(),
            rds_secret_name: "db-credentials".into(),
            bucket_name: None,
            sql_object_key: default_sql_object_key(),
            database_name: default_database_name(),
            database_port: default_database_port(),
            db_max_connections: default_db_max_connections(),
            ssl_ca_path: None,
            aws_region: None,
            listen_addr: default_listen_addr(),
            loglevel: default_loglevel(),
            secret_timeout_secs: default_secret_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

/// Log filter for the window before [`Config::load`] has run: `LOGLEVEL`, or
/// `info` when it is unset or blank.
pub fn startup_loglevel() -> String {
    verbatim_env(&["LOGLEVEL"])
        .remove("loglevel")
        .map(|level| level.trim().to_string())
        .filter(|level| !level.is_empty())
        .unwrap_or_else(default_loglevel)
}

/// Present variables among `keys`, keyed the way `Env` keys them (lowercase).
fn verbatim_env(keys: &[&str]) -> BTreeMap<String, String> {
    keys.iter()
        .filter_map(|key| {
            std::env::var(key)
                .ok()
                .map(|value| (key.to_ascii_lowercase(), value))
        })
        .collect()
}

fn required(key: &str, value: &str) -> Result<String, GatewayError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GatewayError::Config(format!("{key} must not be blank")));
    }
    Ok(value.to_string())
}
