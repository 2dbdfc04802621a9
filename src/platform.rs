use async_trait::async_trait;
use aws_config::{BehaviorVersion, retry::RetryConfig, timeout::TimeoutConfig};
use aws_types::region::Region;
use kube::Client;
use tracing::debug;

use crate::{
    config::{REQUEST_TIMEOUT, Settings},
    eks::EksDescriber,
    error::AppError,
    handler::{Connection, Platform},
    kubeconfig::ClientConfig,
    token::TokenMinter,
};

/// The real AWS environment: process environment, the default credential
/// chain, EKS and the cluster's API server.
#[derive(Debug, Default)]
pub struct AwsPlatform;

#[async_trait]
impl Platform for AwsPlatform {
    type Describer = EksDescriber;

    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    async fn connect(&self, settings: &Settings) -> Result<Connection<EksDescriber>, AppError> {
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .operation_timeout(REQUEST_TIMEOUT)
            .build();

        // retries are left to whoever re-runs the invocation
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region().to_string()))
            .timeout_config(timeouts)
            .retry_config(RetryConfig::disabled())
            .load()
            .await;
        debug!("Loaded AWS configuration for {}", settings.region());

        Ok(Connection {
            describer: EksDescriber::new(aws_sdk_eks::Client::new(&sdk_config)),
            minter: TokenMinter::new(sdk_config),
        })
    }

    fn client(&self, config: &ClientConfig) -> Result<Client, AppError> {
        debug!(
            "Connecting to {} trusting {} certificate(s)",
            config.endpoint(),
            config.root_certs().len()
        );
        Ok(Client::try_from(config.to_kube_config())?)
    }
}
