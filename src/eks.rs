use async_trait::async_trait;
use aws_sdk_eks::{error::SdkError, operation::describe_cluster::DescribeClusterError};
use aws_smithy_types::error::display::DisplayErrorContext;
use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AppError, ControlPlaneError};

const ACTIVE: &str = "ACTIVE";

/// Raw fields of a `DescribeCluster` response, before validation.
#[derive(Debug, Clone, Default)]
pub struct ClusterDescription {
    pub name: Option<String>,
    pub endpoint: Option<String>,
    pub certificate_authority_data: Option<String>,
    pub status: Option<String>,
}

/// A control plane that can describe clusters in a single, fixed region.
#[async_trait]
pub trait DescribeCluster {
    async fn describe_cluster(&self, name: &str) -> Result<ClusterDescription, ControlPlaneError>;
}

#[derive(Debug, Clone)]
pub struct EksDescriber {
    client: aws_sdk_eks::Client,
}

impl EksDescriber {
    pub fn new(client: aws_sdk_eks::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DescribeCluster for EksDescriber {
    async fn describe_cluster(&self, name: &str) -> Result<ClusterDescription, ControlPlaneError> {
        let output = self
            .client
            .describe_cluster()
            .name(name)
            .send()
            .await
            .map_err(|err| classify(name, err))?;

        let Some(cluster) = output.cluster() else {
            return Err(ControlPlaneError::Unknown {
                message: format!("describe-cluster response for {name} has no cluster"),
            });
        };

        Ok(ClusterDescription {
            name: cluster.name().map(str::to_string),
            endpoint: cluster.endpoint().map(str::to_string),
            certificate_authority_data: cluster
                .certificate_authority()
                .and_then(|ca| ca.data())
                .map(str::to_string),
            status: cluster.status().map(|s| s.as_str().to_string()),
        })
    }
}

fn classify<R>(name: &str, err: SdkError<DescribeClusterError, R>) -> ControlPlaneError
where
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::ServiceError(service) => classify_service(name, service.err(), message),
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            ControlPlaneError::Unavailable { message }
        }
        _ => ControlPlaneError::Unknown { message },
    }
}

fn classify_service(name: &str, err: &DescribeClusterError, message: String) -> ControlPlaneError {
    match err {
        DescribeClusterError::ResourceNotFoundException(_) => ControlPlaneError::NotFound {
            name: name.to_string(),
            message,
        },
        DescribeClusterError::ClientException(_) => ControlPlaneError::ClientError { message },
        DescribeClusterError::ServerException(_) => ControlPlaneError::ServerError { message },
        DescribeClusterError::ServiceUnavailableException(_) => {
            ControlPlaneError::Unavailable { message }
        }
        _ => ControlPlaneError::Unknown { message },
    }
}

/// Immutable connection parameters of one cluster, valid for one invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterDescriptor {
    name: String,
    endpoint: Url,
    ca_bundle: Vec<u8>,
    authorized_role: String,
    status: Option<String>,
}

impl ClusterDescriptor {
    pub fn new(
        name: String,
        endpoint: Url,
        ca_bundle: Vec<u8>,
        authorized_role: String,
        status: Option<String>,
    ) -> Self {
        Self {
            name,
            endpoint,
            ca_bundle,
            authorized_role,
            status,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// PEM encoded certificate authority data.
    pub fn ca_bundle(&self) -> &[u8] {
        &self.ca_bundle
    }

    pub fn authorized_role(&self) -> &str {
        &self.authorized_role
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

impl std::fmt::Debug for ClusterDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterDescriptor")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint.as_str())
            .field("ca_bundle_len", &self.ca_bundle.len())
            .field("authorized_role", &self.authorized_role)
            .field("status", &self.status)
            .finish()
    }
}

#[tracing::instrument(skip(describer))]
pub async fn fetch<D>(
    describer: &D,
    name: &str,
    authorized_role: &str,
) -> Result<ClusterDescriptor, AppError>
where
    D: DescribeCluster + ?Sized,
{
    if name.is_empty() {
        return Err(ControlPlaneError::ClientError {
            message: "cluster name must not be empty".to_string(),
        }
        .into());
    }

    debug!("Describing cluster {name}");
    let description = describer.describe_cluster(name).await?;

    let endpoint = description
        .endpoint
        .ok_or_else(|| unknown(format!("cluster {name} has no endpoint")))?;
    let endpoint = Url::parse(&endpoint)
        .map_err(|e| unknown(format!("cluster {name} endpoint {endpoint} is invalid: {e}")))?;
    if endpoint.scheme() != "https" {
        return Err(unknown(format!("cluster {name} endpoint {endpoint} is not https")).into());
    }

    let ca_data = description
        .certificate_authority_data
        .ok_or_else(|| unknown(format!("cluster {name} has no certificate authority data")))?;
    let ca_bundle = STANDARD
        .decode(ca_data.trim())
        .map_err(|source| AppError::Decode {
            cluster: name.to_string(),
            source,
        })?;

    match description.status.as_deref() {
        Some(ACTIVE) => info!("Cluster {name} is active at {endpoint}"),
        Some(status) => warn!("Cluster {name} is {status}, API calls may fail"),
        None => warn!("Cluster {name} reported no status"),
    }

    Ok(ClusterDescriptor::new(
        description.name.unwrap_or_else(|| name.to_string()),
        endpoint,
        ca_bundle,
        authorized_role.to_string(),
        description.status,
    ))
}

fn unknown(message: String) -> ControlPlaneError {
    ControlPlaneError::Unknown { message }
}
