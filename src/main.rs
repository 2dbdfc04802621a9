use anyhow::Context;
use platform::AwsPlatform;
use tracing::info;

mod config;
mod eks;
mod error;
mod handler;
mod kubeconfig;
mod platform;
mod pods;
mod token;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();

    // kube and the AWS SDK compile in different rustls providers, so the
    // process default has to be chosen explicitly
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let mut stdout = std::io::stdout();
    handler::handle(&AwsPlatform, &mut stdout)
        .await
        .context("EKS bootstrap failed")?;

    info!("Invocation finished");

    Ok(())
}
