use clap::Parser;
use tinyrag_cli::cli::Cli;
use tinyrag_cli::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    telemetry::init(cli.log_format)?;

    tinyrag_cli::run(cli).await
}
