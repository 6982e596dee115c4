mod commands;
mod config;
mod patch;
mod telemetry;

use clap::{Parser, Subcommand};
use config::Config;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "flagops",
    about = "Operational tooling for the backend's feature flags and integrations"
)]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, global = true, default_value = "flagops.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage feature flags in the cache service
    Flag {
        #[command(subcommand)]
        command: FlagCommand,
    },
    /// Seed flags from the snapshot file or the configured defaults
    Seed,
    /// Smoke-test third-party integrations
    Smoke {
        #[command(subcommand)]
        command: SmokeCommand,
    },
    /// Patch the model routing config file with the configured substitutions
    PatchModels { file: PathBuf },
}

#[derive(Subcommand)]
enum FlagCommand {
    /// Create or update a flag
    Set {
        name: String,
        #[arg(long)]
        enabled: bool,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Turn a flag on, keeping its description
    Enable { name: String },
    /// Turn a flag off, keeping its description
    Disable { name: String },
    /// Enable every flag named in the configured defaults
    EnableAll,
    /// List all flags with their stored values
    List,
    /// Show the stored record for a flag
    Get { name: String },
    /// Show the effective value, including the override layer
    Check { name: String },
    /// Remove a flag
    Delete { name: String },
}

#[derive(Subcommand)]
enum SmokeCommand {
    /// Probe the LLM gateway with one completion per configured model
    Llm,
    /// Probe the OAuth connector service
    Connector {
        #[arg(long, default_value = "flagops_probe_user")]
        probe_user: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("could not load config {}: {err}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    let _guards = telemetry::init(&config);

    let result = match cli.command {
        Command::Flag { command } => match command {
            FlagCommand::Set {
                name,
                enabled,
                description,
            } => commands::flag_set(&config, &name, enabled, &description).await,
            FlagCommand::Enable { name } => commands::flag_toggle(&config, &name, true).await,
            FlagCommand::Disable { name } => commands::flag_toggle(&config, &name, false).await,
            FlagCommand::EnableAll => commands::flag_enable_all(&config).await,
            FlagCommand::List => commands::flag_list(&config).await,
            FlagCommand::Get { name } => commands::flag_get(&config, &name).await,
            FlagCommand::Check { name } => commands::flag_check(&config, &name).await,
            FlagCommand::Delete { name } => commands::flag_delete(&config, &name).await,
        },
        Command::Seed => commands::seed(&config).await,
        Command::Smoke { command } => match command {
            SmokeCommand::Llm => commands::smoke_llm(&config).await,
            SmokeCommand::Connector { probe_user } => {
                commands::smoke_connector(&config, &probe_user).await
            }
        },
        Command::PatchModels { file } => commands::patch_models(&config, &file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
