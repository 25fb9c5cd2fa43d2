mod cmd;
mod context;
mod output;

use clap::{Parser, Subcommand};
use cmd::order::OrderSubcommand;
use cmd::sensor::SensorSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mes",
    about = "Manufacturing execution backend: work orders, progress tracking and delivery/defect prediction",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ./mes.yaml when present)
    #[arg(long, global = true, env = "MES_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file, overrides database.path
    #[arg(long, global = true, env = "MES_DB")]
    db: Option<PathBuf>,

    /// Model artifact directory, overrides models.dir
    #[arg(long, global = true, env = "MES_MODELS")]
    models: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port to listen on (default: server.port)
        #[arg(long)]
        port: Option<u16>,
        /// Address to bind (default: server.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Write a config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Manage work orders
    Order {
        #[command(subcommand)]
        subcommand: OrderSubcommand,
    },

    /// Equipment sensor readings
    Sensor {
        #[command(subcommand)]
        subcommand: SensorSubcommand,
    },

    /// Predict delivery and defect rate for a hypothetical order
    Predict {
        #[arg(long)]
        product: String,
        #[arg(long)]
        qty: i64,
        /// Due date, YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS]
        #[arg(long)]
        due: String,
        /// Reference time in RFC 3339 (default: now)
        #[arg(long)]
        now: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = context::Context::resolve(
        cli.config.as_deref(),
        cli.db.as_deref(),
        cli.models.as_deref(),
    )
    .and_then(|ctx| match cli.command {
        Commands::Serve { port, bind } => cmd::serve::run(&ctx, port, bind),
        Commands::Init { force } => cmd::init::run(&ctx, force),
        Commands::Order { subcommand } => cmd::order::run(&ctx, subcommand, cli.json),
        Commands::Sensor { subcommand } => cmd::sensor::run(&ctx, subcommand, cli.json),
        Commands::Predict {
            product,
            qty,
            due,
            now,
        } => cmd::predict::run(&ctx, &product, qty, &due, now.as_deref(), cli.json),
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
