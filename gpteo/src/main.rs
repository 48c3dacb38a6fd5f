// gpteo/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};
use commands::scan::ScanArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug gpteo scan ... for per-page detail.
    // Logs go to stderr so `--format json` stays parseable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = commands::settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            domain,
            urls,
            mode,
            format,
            output,
        } => {
            let args = ScanArgs {
                domain,
                urls,
                mode,
                format,
                output,
            };
            commands::scan::execute(&settings, &cli.owner, args).await
        }
        Commands::Checks => commands::checks::execute(&settings),
        Commands::List { limit, offset } => {
            commands::list::execute(&settings, &cli.owner, limit, offset).await
        }
        Commands::Show { scan_id, format } => {
            commands::show::execute(&settings, &cli.owner, scan_id, format).await
        }
        Commands::Stats => commands::stats::execute(&settings, &cli.owner).await,
        Commands::Delete { scan_id } => {
            commands::delete::execute(&settings, &cli.owner, scan_id).await
        }
    }
}
