use std::time::{Duration, SystemTime};

use aws_config::{SdkConfig, sts::AssumeRoleProvider};
use aws_credential_types::{Credentials, provider::ProvideCredentials};
use aws_sigv4::{
    http_request::{
        SignableBody, SignableRequest, SignatureLocation, SigningParams, SigningSettings, sign,
    },
    sign::v4,
};
use aws_smithy_runtime_api::client::identity::Identity;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_types::region::Region;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use tracing::{debug, info};

use crate::error::TokenError;

/// Scheme marker the EKS authenticating webhook expects in front of the payload.
pub const TOKEN_PREFIX: &str = "k8s-aws-v1.";

/// Signed header that binds the presigned request to one cluster.
pub const CLUSTER_ID_HEADER: &str = "x-k8s-aws-id";

const STS_SERVICE: &str = "sts";
const PRESIGN_EXPIRY: Duration = Duration::from_secs(60);
const SESSION_NAME: &str = "eks-bootstrap";

#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Mints cluster-scoped bearer tokens from the ambient AWS identity.
#[derive(Debug, Clone)]
pub struct TokenMinter {
    sdk_config: SdkConfig,
}

impl TokenMinter {
    pub fn new(sdk_config: SdkConfig) -> Self {
        Self { sdk_config }
    }

    pub async fn mint(&self, cluster_name: &str, role: &str) -> Result<BearerToken, TokenError> {
        self.mint_at(cluster_name, role, SystemTime::now()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mint_at(
        &self,
        cluster_name: &str,
        role: &str,
        time: SystemTime,
    ) -> Result<BearerToken, TokenError> {
        validate_cluster_name(cluster_name)?;
        validate_role(role)?;

        let region = self
            .sdk_config
            .region()
            .ok_or_else(|| TokenError::Config("no region configured for STS".to_string()))?;

        let credentials = self.credentials(role, region).await?;
        let token = presign(&credentials, cluster_name, region.as_ref(), time)?;
        info!("Minted token for cluster {cluster_name}");
        Ok(token)
    }

    async fn credentials(&self, role: &str, region: &Region) -> Result<Credentials, TokenError> {
        let source = self
            .sdk_config
            .credentials_provider()
            .ok_or_else(|| {
                TokenError::Signing("no ambient AWS credentials available".to_string())
            })?;

        let credentials = if role.is_empty() {
            debug!("Signing with the invocation's own identity");
            source.provide_credentials().await
        } else {
            debug!("Assuming role {role}");
            AssumeRoleProvider::builder(role)
                .session_name(SESSION_NAME)
                .configure(&self.sdk_config)
                .region(region.clone())
                .build_from_provider(source)
                .await
                .provide_credentials()
                .await
        };

        credentials.map_err(|e| {
            TokenError::Signing(format!(
                "resolving credentials failed: {}",
                DisplayErrorContext(&e)
            ))
        })
    }
}

fn validate_cluster_name(cluster_name: &str) -> Result<(), TokenError> {
    if cluster_name.is_empty() {
        return Err(TokenError::Config(
            "cluster name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Accepts an empty role or `arn:<partition>:iam::<account>:role/<name>`.
fn validate_role(role: &str) -> Result<(), TokenError> {
    if role.is_empty() {
        return Ok(());
    }

    let parts: Vec<&str> = role.splitn(6, ':').collect();
    match parts.as_slice() {
        ["arn", partition, "iam", "", account, resource]
            if !partition.is_empty()
                && !account.is_empty()
                && resource.strip_prefix("role/").is_some_and(|n| !n.is_empty()) =>
        {
            Ok(())
        }
        _ => Err(TokenError::Config(format!("{role} is not an IAM role ARN"))),
    }
}

fn signing_params<'a>(
    identity: &'a Identity,
    region: &'a str,
    time: SystemTime,
) -> Result<SigningParams<'a>, TokenError> {
    let mut settings = SigningSettings::default();
    settings.signature_location = SignatureLocation::QueryParams;
    settings.expires_in = Some(PRESIGN_EXPIRY);

    Ok(v4::SigningParams::builder()
        .identity(identity)
        .region(region)
        .name(STS_SERVICE)
        .time(time)
        .settings(settings)
        .build()
        .map_err(|e| TokenError::Signing(e.to_string()))?
        .into())
}

/// Presigns an STS `GetCallerIdentity` request scoped to `cluster_name` and
/// wraps the resulting URL into a bearer token.
pub fn presign(
    credentials: &Credentials,
    cluster_name: &str,
    region: &str,
    time: SystemTime,
) -> Result<BearerToken, TokenError> {
    validate_cluster_name(cluster_name)?;

    let uri =
        format!("https://sts.{region}.amazonaws.com/?Action=GetCallerIdentity&Version=2011-06-15");
    let mut request = http::Request::builder()
        .method("GET")
        .uri(uri)
        .header(CLUSTER_ID_HEADER, cluster_name)
        .body(())
        .map_err(|e| TokenError::Config(format!("invalid identity request: {e}")))?;

    let identity: Identity = credentials.clone().into();
    let params = signing_params(&identity, region, time)?;

    let instructions = {
        let headers = request
            .headers()
            .iter()
            .map(|(name, value)| value.to_str().map(|value| (name.as_str(), value)))
            .collect::<Result<Vec<_>, http::header::ToStrError>>()
            .map_err(|e| TokenError::Config(format!("invalid identity request: {e}")))?;
        let signable = SignableRequest::new(
            request.method().as_str(),
            request.uri().to_string(),
            headers.into_iter(),
            SignableBody::Bytes(&[]),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))?;

        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| TokenError::Signing(e.to_string()))?
            .into_parts();
        instructions
    };
    instructions.apply_to_request_http1x(&mut request);

    let presigned = request.uri().to_string();
    Ok(BearerToken::new(format!(
        "{TOKEN_PREFIX}{}",
        URL_SAFE_NO_PAD.encode(presigned)
    )))
}
