//! Point d'entrée CLI pour riverain

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;
mod report;
mod source;

use cli::Commands;

/// Rejouer les décisions de façade et de subdivision sur des couches GeoJSON
#[derive(Parser)]
#[command(name = "riverain")]
#[command(author, version)]
#[command(about = "Classement de façade, subdivision et attribution de nœuds sur des couches GeoJSON")]
#[command(
    long_about = "Rejoue le moteur de décision cadastral sur des couches GeoJSON locales : classement des limites, zone de recul, attribution de nœuds électriques et scénarios de subdivision."
)]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Frontage(args) => {
            info!(parcels = %args.parcels.display(), id = %args.id, "Frontage decision");
            cli::cmd_frontage(args).await?;
        }
        Commands::Subdivide(args) => {
            info!(
                parcels = %args.common.parcels.display(),
                scenario = %args.scenario.display(),
                "Subdivision replay"
            );
            cli::cmd_subdivide(args).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
