use clap::Parser;
use mr::config::{CoordinatorOpts, JobConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = JobConfig::from(CoordinatorOpts::parse());
    mr::coordinator::run(config).await
}
