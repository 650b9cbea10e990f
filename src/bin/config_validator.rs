//! # cacheflow Configuration Validator
//!
//! Loads configuration exactly as the binaries do and reports whether it is
//! valid for each role. Prints the effective configuration with credentials masked.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use cacheflow::config::{ConfigLoader, RelayConfig};

#[derive(Parser)]
#[command(name = "cacheflow-config")]
#[command(about = "Validate cacheflow configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "CACHEFLOW_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate for one role, or all of them
    Validate {
        #[arg(short, long, value_enum, default_value_t = Role::All)]
        role: Role,
    },

    /// Print the effective configuration as JSON, credentials masked
    Show,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Role {
    Gateway,
    Relay,
    All,
}

fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Validate { role: Role::All }) {
        Commands::Validate { role } => validate(&config, role),
        Commands::Show => show(&config),
    };

    if let Err(e) = result {
        eprintln!("❌ {e}");
        process::exit(1);
    }
}

fn validate(config: &RelayConfig, role: Role) -> Result<(), Box<dyn std::error::Error>> {
    if matches!(role, Role::Gateway | Role::All) {
        config.validate_for_gateway()?;
        println!("✅ gateway configuration is valid");
    }
    if matches!(role, Role::Relay | Role::All) {
        config.validate_for_relay()?;
        println!("✅ relay configuration is valid");
    }
    Ok(())
}

fn show(config: &RelayConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&config.sanitized())?);
    Ok(())
}
