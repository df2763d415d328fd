//! Shelfstore CLI
//!
//! Command-line front end for the product catalog. Every invocation logs
//! in with the given credentials and passes the resulting session to the
//! one command it runs.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shelfstore_core::{Config, CredentialTable, Inventory, ShelfError};

#[derive(Parser, Debug)]
#[command(name = "shelfstore")]
#[command(about = "Product catalog with location movement audit")]
#[command(version)]
struct Cli {
    /// Directory holding the catalog and movement files
    #[arg(long, env = "SHELFSTORE_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// User id
    #[arg(short, long, env = "SHELFSTORE_USER")]
    user: String,

    /// Password
    #[arg(short, long, env = "SHELFSTORE_PASSWORD", hide_env_values = true)]
    password: String,

    /// Skip fsync on writes
    #[arg(long)]
    no_sync: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the logged-in user and role
    Whoami,

    /// Print the next free catalog key
    SuggestKey,

    /// Add a product to the catalog
    Add(commands::AddArgs),

    /// List products (last few by default)
    List {
        /// List every product instead of the most recent ones
        #[arg(long)]
        all: bool,
    },

    /// Show one product
    Show {
        /// Catalog key, e.g. OBEN001
        key: String,
    },

    /// Replace a product's locations and record the movement (admin)
    Move {
        /// Catalog key, e.g. OBEN001
        key: String,

        /// New locations, comma separated
        #[arg(long)]
        locations: String,
    },

    /// Delete a product (admin)
    Delete {
        /// Catalog key, e.g. OBEN001
        key: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show the movement audit trail
    History {
        /// Only movements of this key
        key: Option<String>,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        let code = match e.downcast_ref::<ShelfError>() {
            Some(ShelfError::Validation(_)) => 2,
            Some(ShelfError::InvalidCredentials) | Some(ShelfError::Forbidden { .. }) => 3,
            _ => 1,
        };
        process::exit(code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let session = CredentialTable::builtin().login(&cli.user, &cli.password)?;

    let mut config = Config::durable(&cli.data_dir);
    config.durable_writes = !cli.no_sync;
    let inventory = Inventory::open(config)?;
    debug!(
        user = session.user_id(),
        token = %session.token(),
        data_dir = %cli.data_dir.display(),
        "session opened"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Whoami => commands::whoami(&session, &mut out),
        Commands::SuggestKey => commands::suggest_key(&inventory, &session, &mut out),
        Commands::Add(args) => commands::add(&inventory, &session, args, &mut out),
        Commands::List { all } => commands::list(&inventory, &session, all, &mut out),
        Commands::Show { key } => commands::show(&inventory, &session, &key, &mut out),
        Commands::Move { key, locations } => {
            commands::move_locations(&inventory, &session, &key, &locations, &mut out)
        }
        Commands::Delete { key, yes } => {
            commands::delete(&inventory, &session, &key, yes, &mut out)
        }
        Commands::History { key } => {
            commands::history(&inventory, &session, key.as_deref(), &mut out)
        }
    }
}
