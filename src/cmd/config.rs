//! Configuration view and validation commands: `l10n config`.

use anyhow::{Context, Result};

use super::super::ConfigCommands;
use l10n::agent::DEFAULT_RETRIES;
use l10n::l10n_config::{L10nConfig, L10nToml};

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    let config = L10nConfig::new(project_dir.to_path_buf())?;
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("l10n Configuration");
            println!("==================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No config.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            let toml = &config.toml;
            println!("[run]");
            match toml.run.retries {
                Some(retries) => println!("  retries = {}", retries),
                None => println!("  # retries unset (directive value or {})", DEFAULT_RETRIES),
            }
            println!("  failure_policy = \"{}\"", toml.run.failure_policy);
            println!();
            println!("[checks]");
            match &toml.checks.check_cmd {
                Some(cmd) => println!("  check_cmd = \"{}\"", cmd),
                None => println!("  # check_cmd unset"),
            }
            println!();

            println!("Effective values (with env overrides):");
            match config.retries()? {
                Some(retries) => println!("  retries = {}", retries),
                None => println!(
                    "  retries = per directive (default {})",
                    config.default_retries().unwrap_or(DEFAULT_RETRIES)
                ),
            }
            println!("  failure_policy = \"{}\"", config.failure_policy()?);
            println!(
                "  check_cmd = {}",
                config
                    .check_cmd()
                    .map(|cmd| format!("\"{cmd}\""))
                    .unwrap_or_else(|| "none".to_string())
            );
            println!("  locks = {}", config.lock_dir().display());
            println!();

            if !config_path.exists() {
                println!("Run 'l10n config init' to create a config.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No config.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = L10nToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("config.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            let toml = L10nToml {
                run: l10n::l10n_config::RunSection {
                    retries: Some(DEFAULT_RETRIES),
                    ..Default::default()
                },
                ..Default::default()
            };
            toml.save(&config_path)
                .context("Failed to create config.toml")?;

            println!("Created config.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [run] retries, failure_policy (abort | continue)");
            println!("  - [checks] check_cmd, run against every output as {{path}}");
            println!();
        }
    }

    Ok(())
}
