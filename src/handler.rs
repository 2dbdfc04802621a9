use std::io::Write;

use async_trait::async_trait;
use kube::Client;
use tracing::{info, warn};

use crate::{
    config::Settings,
    eks::{self, DescribeCluster},
    error::AppError,
    kubeconfig::{self, ClientConfig},
    pods,
    token::TokenMinter,
};

/// Region-scoped collaborators, available once configuration is resolved.
pub struct Connection<D> {
    pub describer: D,
    pub minter: TokenMinter,
}

/// Everything an invocation reaches outside the process.
#[async_trait]
pub trait Platform: Sync {
    type Describer: DescribeCluster + Send + Sync;

    fn var(&self, key: &str) -> Option<String>;

    async fn connect(&self, settings: &Settings) -> Result<Connection<Self::Describer>, AppError>;

    fn client(&self, config: &ClientConfig) -> Result<Client, AppError>;
}

/// Runs one invocation: resolve configuration, bootstrap an authenticated
/// client, then report on the cluster's pods.
pub async fn handle<P, W>(platform: &P, out: &mut W) -> Result<(), AppError>
where
    P: Platform,
    W: Write,
{
    let settings = Settings::from_lookup(|key| platform.var(key))?;
    info!(
        "Bootstrapping cluster {} in {}",
        settings.cluster_name(),
        settings.region()
    );

    let connection = platform.connect(&settings).await?;
    let client_config = bootstrap(&connection, &settings, out).await?;
    let client = platform.client(&client_config)?;

    report(&client, &settings, out).await
}

async fn bootstrap<D, W>(
    connection: &Connection<D>,
    settings: &Settings,
    out: &mut W,
) -> Result<ClientConfig, AppError>
where
    D: DescribeCluster + Send + Sync,
    W: Write,
{
    let descriptor = eks::fetch(
        &connection.describer,
        settings.cluster_name(),
        settings.role_arn(),
    )
    .await?;
    writeln!(
        out,
        "Cluster {} ({}) at {}",
        descriptor.name(),
        descriptor.status().unwrap_or("UNKNOWN"),
        descriptor.endpoint()
    )?;

    let token = connection
        .minter
        .mint(descriptor.name(), descriptor.authorized_role())
        .await?;

    Ok(kubeconfig::assemble(&descriptor, token)?)
}

async fn report<W>(client: &Client, settings: &Settings, out: &mut W) -> Result<(), AppError>
where
    W: Write,
{
    let count = pods::list_pods(client, settings.namespace()).await?;
    writeln!(out, "There are {count} pods in the cluster.")?;

    let (namespace, pod) = (settings.pod_namespace(), settings.pod_name());
    match pods::get_pod(client, namespace, pod).await {
        Ok(_) => writeln!(out, "Found pod {pod} in namespace {namespace}.")?,
        Err(e) if e.is_not_found() => {
            writeln!(out, "Pod {pod} in namespace {namespace} not found.")?
        }
        Err(e) => {
            warn!("Looking up pod {namespace}/{pod} failed: {e}");
            writeln!(out, "Error getting pod {pod} in namespace {namespace}: {e}")?
        }
    }

    Ok(())
}
