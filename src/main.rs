use chargetap::cmd::{Cli, run};
use chargetap::log::init_tracing;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "chargetap failed");
        return Err(e.into());
    }
    Ok(())
}
