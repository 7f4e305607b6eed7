//! runbridge - loopback HTTP bridge for project run configurations.
//!
//! This is the main entry point for the runbridge CLI. It provides commands for:
//!
//! - Serving the HTTP API (`runbridge serve`)
//! - Printing or rotating the API token (`runbridge token`)
//! - Inspecting project manifests (`runbridge configs`)
//!
//! See `runbridge --help` for full usage information.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell};
use std::path::PathBuf;
use tracing::Level;

use runbridge::config::GlobalConfig;
use runbridge::http;
use runbridge::logging::{self, LogConfig, LogFormat};
use runbridge::manifest::{Manifest, MANIFEST_FILE};
use runbridge::scope::ScopeSet;
use runbridge::token;

const AFTER_HELP: &str = "\
COMMON WORKFLOWS:
  # Serve the current project
  runbridge serve

  # Serve several projects on a custom port
  runbridge serve ~/src/api ~/src/worker --port 9000

  # Print the API token for client configuration
  runbridge token

EXAMPLES:
  runbridge serve                   Serve the current directory
  runbridge token --rotate          Replace the API token
  runbridge configs ~/src/api       List run configurations
  runbridge completions zsh         Shell completions

For endpoint documentation, see 'runbridge serve --help'.";

#[derive(Parser)]
#[command(name = "runbridge")]
#[command(version)]
#[command(about = "runbridge - local HTTP bridge for project run configurations")]
#[command(
    long_about = "Serves a loopback-only, token-authenticated HTTP API to start, stop,\nrestart, and observe the run configurations declared in runbridge.toml\nmanifests."
)]
#[command(after_help = AFTER_HELP)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose/debug output for any command
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    // =========================================================================
    // Daemon
    // =========================================================================
    /// Serve the HTTP API for one or more project roots
    ///
    /// Binds to 127.0.0.1 and serves run-configuration control and log
    /// access for every listed project. Without arguments, serves the
    /// current directory.
    ///
    /// Examples:
    ///   runbridge serve                      # Current directory
    ///   runbridge serve ~/src/api            # One project
    ///   runbridge serve a/ b/ --port 9000    # Two projects, custom port
    Serve {
        /// Project roots to serve (default: current directory)
        roots: Vec<PathBuf>,
        /// Port for the HTTP API (overrides ~/.runbridge/config.toml)
        #[arg(short, long)]
        port: Option<u16>,
        /// Log output format
        #[arg(long, value_enum, default_value = "pretty")]
        log_format: LogFormat,
    },

    // =========================================================================
    // Utilities
    // =========================================================================
    /// Print the API bearer token
    ///
    /// Generates and persists a token on first use (~/.runbridge/token).
    /// Clients pass it as `Authorization: Bearer <token>`.
    ///
    /// Examples:
    ///   runbridge token                  # Print the current token
    ///   runbridge token --rotate         # Replace it with a fresh one
    Token {
        /// Generate a new token, invalidating the old one
        #[arg(long)]
        rotate: bool,
    },
    /// List run configurations declared by a project manifest
    ///
    /// Examples:
    ///   runbridge configs                # Current directory
    ///   runbridge configs ~/src/api      # Specific root
    Configs {
        /// Project root (default: current directory)
        root: Option<PathBuf>,
    },
    /// Generate shell completions
    ///
    /// Outputs shell completion script to stdout.
    /// Add to your shell config for tab completion support.
    ///
    /// Examples:
    ///   runbridge completions bash > ~/.bash_completion.d/runbridge
    ///   runbridge completions zsh > ~/.zfunc/_runbridge
    ///   runbridge completions fish > ~/.config/fish/completions/runbridge.fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn print_completions<G: Generator>(generator: G, cmd: &mut clap::Command) {
    clap_complete::generate(
        generator,
        cmd,
        cmd.get_name().to_string(),
        &mut std::io::stdout(),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            roots,
            port,
            log_format,
        } => {
            let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
            logging::init_logging(&LogConfig::default().level(level).format(log_format));

            let config = GlobalConfig::load()?;
            let port = port.unwrap_or(config.server.port);
            let token = token::load_or_create()?;

            let roots = if roots.is_empty() {
                vec![std::env::current_dir().context("Failed to resolve current directory")?]
            } else {
                roots
            };

            let scopes = ScopeSet::open_all(&roots, &config)?;
            http::serve(scopes, token, port).await?;
        },

        Commands::Token { rotate } => {
            let token = if rotate {
                token::rotate()?
            } else {
                token::load_or_create()?
            };
            println!("{token}");
        },
        Commands::Configs { root } => {
            let root = root.unwrap_or_else(|| PathBuf::from("."));
            let manifest = Manifest::load(&root)?;

            if manifest.configs.is_empty() {
                println!("No run configurations in {}", root.join(MANIFEST_FILE).display());
            } else {
                println!("{:<24} {:<12} COMMAND", "NAME", "TYPE");
                for config in &manifest.configs {
                    let command = std::iter::once(config.command.as_str())
                        .chain(config.args.iter().map(String::as_str))
                        .collect::<Vec<_>>()
                        .join(" ");
                    println!("{:<24} {:<12} {command}", config.name, config.kind);
                }
            }
        },
        Commands::Completions { shell } => {
            print_completions(shell, &mut Cli::command());
        },
    }

    Ok(())
}
