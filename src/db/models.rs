use crate::error::GatewayError;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Database login decoded from the secret payload.
///
/// RDS-generated secrets also carry `host`, `port`, `engine` and friends;
/// those are ignored since the proxy endpoint comes from configuration.
#[derive(Debug)]
pub struct DbCredentials {
    pub username: String,
    pub password: SecretString,
}

#[derive(Deserialize)]
struct SecretPayload {
    username: String,
    password: String,
}

impl DbCredentials {
    /// Decode the JSON string payload of a secret.
    pub fn from_secret_payload(payload: &str) -> Result<Self, GatewayError> {
        let raw: SecretPayload = serde_json::from_str(payload).map_err(|e| {
            GatewayError::CredentialFetch(format!("malformed secret payload: {e}"))
        })?;
        if raw.username.trim().is_empty() {
            return Err(GatewayError::CredentialFetch(
                "secret payload has an empty username".to_string(),
            ));
        }
        Ok(Self {
            username: raw.username,
            password: SecretString::from(raw.password),
        })
    }
}

/// One row of the books table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Book {
    pub id: i64,
    pub name: String,
    pub price: i64,
}
