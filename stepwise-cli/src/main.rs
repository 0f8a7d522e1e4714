//! Stepwise CLI - apply SQL migrations to a SQLite database

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

use commands::{columns, new, status, tables, up, GlobalOpts};

/// Stepwise - ordered, transactional schema migrations for SQLite
#[derive(Parser)]
#[command(name = "stepwise", version, about, long_about = None)]
struct Cli {
    /// SQLite database file (overrides stepwise.json)
    #[arg(long, global = true, env = "STEPWISE_DATABASE")]
    database: Option<PathBuf>,

    /// Directory of *.sql migrations (overrides stepwise.json)
    #[arg(long, global = true, env = "STEPWISE_MIGRATIONS_DIR")]
    migrations_dir: Option<PathBuf>,

    /// Project directory containing stepwise.json
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Log migration progress to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show schema version and pending migrations
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply all pending migrations
    Up {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List tables in the database
    Tables {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List columns of a table
    Columns {
        /// Table name
        table: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the next numbered migration file
    New {
        /// Short description used in the file name
        description: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let opts = GlobalOpts {
        database: cli.database,
        migrations_dir: cli.migrations_dir,
        project_dir: cli.project_dir,
    };

    match cli.command {
        Commands::Status { json } => status::run(&opts, json),
        Commands::Up { json } => up::run(&opts, json),
        Commands::Tables { json } => tables::run(&opts, json),
        Commands::Columns { table, json } => columns::run(&opts, &table, json),
        Commands::New { description } => new::run(&opts, description),
    }
}
