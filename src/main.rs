//! wg-converge main entry point
//!
//! This binary is invoked once per reconciliation by an automation caller.
//! It handles CLI parsing, logging setup, and wiring the real collaborators
//! into the reconciler. Logs go to stderr; stdout carries only the JSON
//! outcome.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wg_converge::config::{ConvergeRequest, Settings};
use wg_converge::platform::WgCommandControl;
use wg_converge::reconcile::{Action, JsonReporter, Outcome, OutcomeReporter, Reconciler};
use wg_converge::security::PrivilegeLevel;
use wg_converge::storage::LocalFileStore;
use wg_converge::wireguard::{render, OsKeyGenerator};
use wg_converge::{APP_NAME, VERSION};

/// Idempotent WireGuard interface reconciler
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version = VERSION, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file path (defaults to /etc/wg-converge/config.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Converge the interface onto the requested state
    Apply {
        /// JSON request file, or `-` for stdin
        #[arg(long, default_value = "-")]
        args: String,
    },

    /// Report what `apply` would do without changing anything
    Check {
        /// JSON request file, or `-` for stdin
        #[arg(long, default_value = "-")]
        args: String,
    },

    /// Print the configuration a request renders to, without secrets
    Render {
        /// JSON request file, or `-` for stdin
        #[arg(long, default_value = "-")]
        args: String,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    debug!("Starting {} v{}", APP_NAME, VERSION);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Initialize structured logging with tracing
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run the CLI command, returning the process exit code
fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Apply { args } => converge(cli.config.as_deref(), &args, false),
        Commands::Check { args } => converge(cli.config.as_deref(), &args, true),
        Commands::Render { args } => {
            let request = read_request(&args)?.into_request()?;
            print!("{}", render(&request.spec, None).as_str());
            Ok(0)
        }
        Commands::Version => {
            println!("{} v{}", APP_NAME, VERSION);
            Ok(0)
        }
    }
}

/// Run one reconciliation and report its outcome on stdout
fn converge(config: Option<&Path>, args: &str, force_dry_run: bool) -> anyhow::Result<i32> {
    let prepared = Settings::load(config).and_then(|settings| {
        let request = read_request(args)?.into_request()?;
        Ok((settings, request))
    });

    let outcome = match prepared {
        Ok((settings, mut request)) => {
            request.dry_run |= force_dry_run;

            if !request.dry_run {
                let privileges = PrivilegeLevel::detect();
                if !privileges.is_elevated() {
                    warn!(
                        "Running as {}; managing interfaces usually requires root",
                        privileges
                    );
                }
            }

            info!("Using configuration directory {:?}", settings.config_dir);
            let reconciler = Reconciler::new(
                Box::new(WgCommandControl::new(&settings)),
                Box::new(OsKeyGenerator),
                Box::new(LocalFileStore),
                settings,
            );
            reconciler.reconcile(&request)
        }
        Err(e) => {
            error!("Rejected request: {}", e);
            Outcome::failure(Action::None, &e).with_dry_run(force_dry_run)
        }
    };

    JsonReporter::stdout().report(&outcome)?;
    Ok(outcome.exit_code())
}

/// Read the caller's request from a file or stdin
fn read_request(source: &str) -> wg_converge::Result<ConvergeRequest> {
    if source == "-" {
        debug!("Reading request from stdin");
        ConvergeRequest::from_reader(std::io::stdin().lock())
    } else {
        debug!("Reading request from {}", source);
        let file = File::open(source)?;
        ConvergeRequest::from_reader(BufReader::new(file))
    }
}
