use crate::config::Config;
use crate::patch::{self, PatchError};
use flagstore::seed::{self, SeedSource};
use flagstore::{FlagError, FlagMap, FlagStore, HttpCache, get_provider};
use smokecheck::connector::{self, ConnectorCheck, ConnectorError};
use smokecheck::env::EnvReport;
use smokecheck::llm::{GatewayCheck, ProbeOutcome};
use std::path::Path;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("flag store error: {0}")]
    Flag(#[from] FlagError),

    #[error("patch error: {0}")]
    Patch(#[from] PatchError),

    #[error("connector check failed: {0}")]
    Connector(#[from] ConnectorError),

    #[error("flag '{0}' has never been set")]
    FlagNotFound(String),

    #[error("config has no '{0}' section")]
    MissingConfig(&'static str),

    #[error("{failed} of {total} probes failed")]
    ProbesFailed { failed: usize, total: usize },

    #[error("{0} flag writes failed")]
    FlagWritesFailed(usize),
}

fn build_store(config: &Config) -> FlagStore {
    let cache = Arc::new(HttpCache::new(config.flag_store.cache.url.clone()));
    FlagStore::new(cache, config.flag_store.overrides.clone())
}

fn print_flag_listing(flags: &FlagMap) {
    if flags.is_empty() {
        println!("no flags set");
        return;
    }

    let mut names: Vec<&String> = flags.keys().collect();
    names.sort();
    for name in names {
        let record = &flags[name];
        let status = if record.enabled { "enabled " } else { "disabled" };
        println!("{status}  {name}  {}", record.description);
    }
}

pub async fn flag_set(
    config: &Config,
    name: &str,
    enabled: bool,
    description: &str,
) -> Result<(), CommandError> {
    let store = build_store(config);
    let record = store.set(name, enabled, description).await?;
    println!("flag '{name}' set: enabled={}", record.enabled);
    Ok(())
}

pub async fn flag_toggle(config: &Config, name: &str, enabled: bool) -> Result<(), CommandError> {
    let store = build_store(config);
    let record = if enabled {
        store.enable(name).await?
    } else {
        store.disable(name).await?
    };
    println!(
        "flag '{name}' {}",
        if record.enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

pub async fn flag_enable_all(config: &Config) -> Result<(), CommandError> {
    let store = build_store(config);

    let mut names: Vec<&String> = config.flag_store.defaults.keys().collect();
    names.sort();

    let mut failed = 0;
    for name in names {
        match store.enable(name).await {
            Ok(_) => println!("enabled '{name}'"),
            Err(err) => {
                failed += 1;
                eprintln!("could not enable '{name}': {err}");
            }
        }
    }

    println!("\ncurrent flags:");
    print_flag_listing(&store.list().await?);

    if failed > 0 {
        return Err(CommandError::FlagWritesFailed(failed));
    }
    Ok(())
}

pub async fn flag_list(config: &Config) -> Result<(), CommandError> {
    let store = build_store(config);
    print_flag_listing(&store.list().await?);
    Ok(())
}

pub async fn flag_get(config: &Config, name: &str) -> Result<(), CommandError> {
    let store = build_store(config);
    match store.get_details(name).await? {
        Some(record) => {
            println!(
                "{name}: enabled={} description={:?} updated_at={}",
                record.enabled, record.description, record.updated_at
            );
            Ok(())
        }
        None => Err(CommandError::FlagNotFound(name.to_string())),
    }
}

/// Effective value, including the override layer, as the application sees it.
pub async fn flag_check(config: &Config, name: &str) -> Result<(), CommandError> {
    let store = build_store(config);
    let enabled = store.is_enabled(name).await?;
    println!("{name}: {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

pub async fn flag_delete(config: &Config, name: &str) -> Result<(), CommandError> {
    let store = build_store(config);
    store.delete(name).await?;
    println!("flag '{name}' deleted");
    Ok(())
}

pub async fn seed(config: &Config) -> Result<(), CommandError> {
    let store = build_store(config);
    let snapshot = get_provider(&config.flag_store.snapshot);

    let report = seed::seed(&store, snapshot.as_ref(), &config.flag_store.defaults).await?;

    match report.source {
        SeedSource::Snapshot => println!("seeding flags from the snapshot file"),
        SeedSource::Defaults => println!("seeding flags from the configured defaults"),
    }

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(()) => println!("seeded '{}': enabled={}", outcome.name, outcome.enabled),
            Err(err) => eprintln!("failed to seed '{}': {err}", outcome.name),
        }
    }
    if !report.snapshot_written {
        eprintln!("warning: flag snapshot was not written");
    }

    println!("\ncurrent flags:");
    print_flag_listing(&report.final_state);

    let failures = report.failures();
    if failures > 0 {
        return Err(CommandError::FlagWritesFailed(failures));
    }
    Ok(())
}

pub async fn smoke_llm(config: &Config) -> Result<(), CommandError> {
    let smoke = config.smoke.as_ref().ok_or(CommandError::MissingConfig("smoke"))?;
    let check = GatewayCheck::new(&smoke.gateway_url);

    let results = check.run(&smoke.models).await;
    let total = results.len();
    let mut failed = 0;

    for (probe, outcome) in &results {
        match outcome {
            ProbeOutcome::Passed {
                reply,
                served_model,
            } => {
                println!(
                    "ok    {} ({}): {reply} [served by {served_model}]",
                    probe.label, probe.model
                );
            }
            ProbeOutcome::Skipped { env_key } => {
                println!("skip  {}: {env_key} not set", probe.label);
            }
            ProbeOutcome::Failed { reason } => {
                failed += 1;
                println!("fail  {} ({}): {reason}", probe.label, probe.model);
            }
        }
    }

    if failed > 0 {
        return Err(CommandError::ProbesFailed { failed, total });
    }
    Ok(())
}

pub async fn smoke_connector(config: &Config, probe_user: &str) -> Result<(), CommandError> {
    let smoke = config.smoke.as_ref().ok_or(CommandError::MissingConfig("smoke"))?;

    println!("checking connector environment...");
    let env_report = EnvReport::collect(connector::REQUIRED_ENV);
    for entry in &env_report.entries {
        match &entry.preview {
            Some(preview) => println!("ok    {}: {preview}", entry.name),
            None => println!("miss  {}: not set", entry.name),
        }
    }

    let check = ConnectorCheck::new(&smoke.connector_url);
    let report = check.run(probe_user).await?;

    println!("token obtained: {}", report.token_preview);
    println!("connections for probe user: {}", report.connections);
    println!("connector configuration is working");
    Ok(())
}

pub fn patch_models(config: &Config, file: &Path) -> Result<(), CommandError> {
    let patch_config = config.patch.as_ref().ok_or(CommandError::MissingConfig("patch"))?;

    let report = patch::patch_file(file, &patch_config.substitutions)?;

    println!("backed up original to {}", report.backup_path.display());
    for substitution in &report.applied {
        println!("applied: {}", substitution.find);
    }
    for substitution in &report.missed {
        println!("no match for: {}", substitution.find);
    }
    println!(
        "{} of {} substitutions applied",
        report.applied.len(),
        report.applied.len() + report.missed.len()
    );
    Ok(())
}
