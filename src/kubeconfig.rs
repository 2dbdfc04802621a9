use http::Uri;
use kube::Config;
use secrecy::SecretBox;
use tracing::debug;

use crate::{
    config::REQUEST_TIMEOUT, eks::ClusterDescriptor, error::AssembleError, token::BearerToken,
};

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Endpoint, trust anchors and credential for one control plane.
#[derive(Clone)]
pub struct ClientConfig {
    endpoint: Uri,
    root_certs: Vec<Vec<u8>>,
    token: BearerToken,
}

impl ClientConfig {
    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    /// DER encoded certificates from the cluster's CA bundle.
    pub fn root_certs(&self) -> &[Vec<u8>] {
        &self.root_certs
    }

    /// In-memory equivalent of a kubeconfig with one cluster and a token user.
    pub fn to_kube_config(&self) -> Config {
        let mut config = Config::new(self.endpoint.clone());
        config.root_cert = Some(self.root_certs.clone());
        config.accept_invalid_certs = false;
        config.auth_info.token = Some(SecretBox::new(self.token.as_str().into()));
        config.connect_timeout = Some(REQUEST_TIMEOUT);
        config.read_timeout = Some(REQUEST_TIMEOUT);
        config.write_timeout = Some(REQUEST_TIMEOUT);
        config
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("root_certs", &self.root_certs.len())
            .field("token", &self.token)
            .finish()
    }
}

pub fn assemble(
    descriptor: &ClusterDescriptor,
    token: BearerToken,
) -> Result<ClientConfig, AssembleError> {
    let cluster = descriptor.name();

    if descriptor.ca_bundle().is_empty() {
        return Err(AssembleError::EmptyCaBundle {
            cluster: cluster.to_string(),
        });
    }
    if token.is_empty() {
        return Err(AssembleError::EmptyToken {
            cluster: cluster.to_string(),
        });
    }

    let root_certs = certificates(cluster, descriptor.ca_bundle())?;

    let endpoint = descriptor.endpoint().as_str();
    let endpoint = endpoint
        .parse::<Uri>()
        .map_err(|source| AssembleError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;

    debug!(
        "Assembled client for {endpoint} trusting {} certificate(s)",
        root_certs.len()
    );

    Ok(ClientConfig {
        endpoint,
        root_certs,
        token,
    })
}

fn certificates(cluster: &str, bundle: &[u8]) -> Result<Vec<Vec<u8>>, AssembleError> {
    let invalid = |message: String| AssembleError::InvalidCaBundle {
        cluster: cluster.to_string(),
        message,
    };

    let certs: Vec<Vec<u8>> = pem::parse_many(bundle)
        .map_err(|e| invalid(e.to_string()))?
        .into_iter()
        .filter(|p| p.tag() == CERTIFICATE_TAG)
        .map(pem::Pem::into_contents)
        .collect();

    if certs.is_empty() {
        return Err(invalid("no certificate found".to_string()));
    }
    Ok(certs)
}
