use crate::cli::ConfigCommands;
use crate::config::DrafterConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// `effective` is the loaded file with `--data-dir`/`--session` applied.
pub async fn run(cmd: ConfigCommands, config_path: &Path, effective: &DrafterConfig) -> Result<()> {
    match cmd {
        ConfigCommands::Validate => validate(config_path),
        ConfigCommands::Show => show(effective),
    }
}

fn validate(config_path: &Path) -> Result<()> {
    let config = DrafterConfig::load(config_path)
        .with_context(|| format!("❌ cannot load {}", config_path.display()))?;

    let problems = config.validate();
    if !problems.is_empty() {
        anyhow::bail!(
            "❌ {} has {} problem(s):\n  - {}",
            config_path.display(),
            problems.len(),
            problems.join("\n  - ")
        );
    }

    println!("✅ {} is valid.", config_path.display());
    println!("   model:   {} ({})", config.model.model, config.model.base_url);
    println!("   session: {:?}", config.db_path());
    if config.model.api_key().is_none() {
        println!("⚠️  {} is not set; model calls will go out unauthenticated.", config.model.api_key_env);
    }
    Ok(())
}

fn show(config: &DrafterConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("serialize config")?;
    print!("{}", rendered);
    Ok(())
}
