use crate::config::Config;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Shared SDK configuration for the Secrets Manager and S3 clients.
///
/// Region comes from `AWS_REGION` when set, otherwise from the standard
/// provider chain. Operations are capped by the secret timeout unless a
/// client overrides it, as [`s3_config`] does.
pub async fn load_sdk_config(cfg: &Config) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &cfg.aws_region {
        loader = loader.region(Region::new(region.clone()));
    }

    loader.timeout_config(secret_store_timeouts(cfg)).load().await
}

/// S3 client config for reading the stored query, capped by
/// `QUERY_TIMEOUT_SECS` instead of the secret timeout.
pub fn s3_config(sdk_config: &SdkConfig, cfg: &Config) -> aws_sdk_s3::Config {
    aws_sdk_s3::config::Builder::from(sdk_config)
        .timeout_config(object_store_timeouts(cfg))
        .build()
}

fn secret_store_timeouts(cfg: &Config) -> TimeoutConfig {
    TimeoutConfig::builder()
        .connect_timeout(cfg.connect_timeout())
        .operation_timeout(cfg.secret_timeout())
        .build()
}

fn object_store_timeouts(cfg: &Config) -> TimeoutConfig {
    TimeoutConfig::builder()
        .connect_timeout(cfg.connect_timeout())
        .operation_timeout(cfg.query_timeout())
        .build()
}
