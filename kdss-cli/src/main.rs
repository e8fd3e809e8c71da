//! KDSS CLI - rainfall climatology, anomaly, SPI and drought/flood
//! frequency for a region from daily gridded precipitation.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "kdss-cli",
    version,
    about = "Kajiado drought and flood decision support toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: kdss_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    kdss_cmd::run(cli.command).await
}
