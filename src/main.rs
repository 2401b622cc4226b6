use afford::{api, logging};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = api::Cli::parse();
    logging::init_tracing(cli.log_filter.as_deref())?;
    api::run(cli).await
}
