//! Secret store access.

use crate::error::GatewayError;
use async_trait::async_trait;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use tracing::debug;

/// Looks up named secrets and returns their string payload.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn secret_string(&self, name: &str) -> Result<String, GatewayError>;
}

/// AWS Secrets Manager backed store.
#[derive(Clone)]
pub struct SecretsManagerStore {
    client: SecretsManagerClient,
}

impl SecretsManagerStore {
    pub fn new(client: SecretsManagerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn secret_string(&self, name: &str) -> Result<String, GatewayError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| {
                GatewayError::CredentialFetch(format!(
                    "GetSecretValue({name}) failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        debug!(secret = %name, version = ?output.version_id(), "secret value fetched");

        output.secret_string().map(str::to_string).ok_or_else(|| {
            GatewayError::CredentialFetch(format!("secret {name} has no string payload"))
        })
    }
}
