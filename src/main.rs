use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use l10n::app::{CleanOptions, InitOptions, find_root};

mod cmd;

/// Environment variable holding the log filter, e.g. `L10N_LOG=l10n=debug`.
const LOG_ENV: &str = "L10N_LOG";

#[derive(Parser)]
#[command(name = "l10n")]
#[command(version, about = "Agentic localization with layered L10N.md context")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project root. Defaults to the nearest ancestor with .l10n/ or .git
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate every stale (source, language) pair
    Translate {
        /// Translate every pair, even those that are up to date
        #[arg(long)]
        force: bool,
        /// Extra attempts per pair after a failed validation
        #[arg(long)]
        retries: Option<u32>,
        /// List the pairs that would be translated
        #[arg(long)]
        dry_run: bool,
        /// Check command run against each output ({path} is replaced)
        #[arg(long)]
        check_cmd: Option<String>,
        /// Keep translating after a pair fails and report failures at the end
        #[arg(long)]
        keep_going: bool,
    },
    /// Validate existing outputs without translating
    Check {
        /// Check command run against each output ({path} is replaced)
        #[arg(long)]
        check_cmd: Option<String>,
    },
    /// Show which outputs are ok, stale or missing
    Status,
    /// Remove generated outputs and lock files
    Clean {
        /// Show what would be removed
        #[arg(long)]
        dry_run: bool,
        /// Also remove outputs of sources that are no longer configured
        #[arg(long)]
        orphans: bool,
    },
    /// List resolved sources and their outputs
    Plan,
    /// Create an L10N.md template in the project root
    Init {
        /// Language of the source files
        #[arg(long, default_value = "en")]
        source_lang: String,
        /// Target languages (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        targets: Vec<String>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default .l10n/config.toml file
    Init,
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "l10n=debug" } else { "l10n=warn" };
    let filter = match std::env::var(LOG_ENV) {
        Ok(value) if !value.trim().is_empty() => EnvFilter::try_new(value)
            .with_context(|| format!("Invalid {LOG_ENV} filter"))?,
        _ => EnvFilter::new(default_level),
    };
    let filter = if verbose {
        filter.add_directive("l10n=debug".parse()?)
    } else {
        filter
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            match &cli.command {
                // init scaffolds where it is run
                Commands::Init { .. } => cwd,
                _ => find_root(&cwd),
            }
        }
    };

    match cli.command {
        Commands::Translate {
            force,
            retries,
            dry_run,
            check_cmd,
            keep_going,
        } => {
            let args = cmd::translate::TranslateArgs {
                force,
                retries,
                dry_run,
                check_cmd,
                keep_going,
            };
            cmd::cmd_translate(&project_dir, args, cli.verbose).await?;
        }
        Commands::Check { check_cmd } => {
            cmd::cmd_check(&project_dir, check_cmd, cli.verbose).await?;
        }
        Commands::Status => cmd::cmd_status(&project_dir, cli.verbose)?,
        Commands::Clean { dry_run, orphans } => {
            cmd::cmd_clean(&project_dir, CleanOptions { dry_run, orphans }, cli.verbose)?
        }
        Commands::Plan => cmd::cmd_plan(&project_dir)?,
        Commands::Init {
            source_lang,
            targets,
        } => cmd::cmd_init(
            &project_dir,
            InitOptions {
                source_lang,
                targets,
            },
        )?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command)?,
    }

    Ok(())
}
