//! RDA CLI - Command line tool for turning hourly ERA5-Land extracts into
//! local daily forcing and climate attributes.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "rda-cli",
    version,
    about = "Reanalysis de-accumulation and daily aggregation toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: rda_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("rda-cli {}", env!("CARGO_PKG_VERSION"));
    rda_cmd::run(cli.command).await
}
