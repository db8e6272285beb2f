use crate::config::{DrafterConfig, ModelConfig, SessionSettings};
use anyhow::Result;
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<()> {
    use inquire::{Confirm, Select, Text};

    println!("\nWelcome to drafter: dependency-driven patent drafting.\n");

    if config_path.exists() {
        let overwrite = Confirm::new(&format!("{} exists. Overwrite it?", config_path.display()))
            .with_default(false)
            .prompt()?;
        if !overwrite {
            println!("Keeping the existing config.");
            return Ok(());
        }
    }

    let endpoint = Select::new(
        "Which model endpoint?",
        vec![
            "Mistral (https://api.mistral.ai/v1)",
            "OpenAI (https://api.openai.com/v1)",
            "Local OpenAI-compatible server (http://localhost:1234/v1)",
            "Other",
        ],
    )
    .prompt()?;

    let (base_url, default_model) = if endpoint.starts_with("Mistral") {
        ("https://api.mistral.ai/v1".to_string(), "mistral-medium-latest")
    } else if endpoint.starts_with("OpenAI") {
        ("https://api.openai.com/v1".to_string(), "gpt-4o-mini")
    } else if endpoint.starts_with("Local") {
        ("http://localhost:1234/v1".to_string(), "local-model")
    } else {
        (
            Text::new("Base URL (including /v1)?").prompt()?,
            "local-model",
        )
    };

    let model = Text::new("Model name?")
        .with_default(default_model)
        .prompt()?;

    let data_dir = Text::new("Where should drafts be stored?")
        .with_default("./data")
        .prompt()?;

    let session_id = Text::new("Session id for this application?")
        .with_default("default")
        .prompt()?;

    let drawings = Confirm::new("Generate drawings (Mermaid diagrams)?")
        .with_default(false)
        .prompt()?;

    let config = DrafterConfig {
        model: ModelConfig {
            base_url,
            model,
            ..ModelConfig::default()
        },
        session: SessionSettings {
            data_dir: std::path::PathBuf::from(&data_dir),
            skip_drawings: !drawings,
            session_id,
        },
        ..DrafterConfig::default()
    };

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            println!("❌ {}", e);
        }
        anyhow::bail!("Generated config is invalid; nothing written");
    }

    let toml_str = toml::to_string_pretty(&config)?;
    std::fs::write(config_path, &toml_str)?;
    println!("\n✅ Generated {}", config_path.display());

    std::fs::create_dir_all(&data_dir)?;
    println!("✅ Created data directory: {}", data_dir);

    if config.model.api_key().is_none() {
        println!("⚠️  Export {} before generating.", config.model.api_key_env);
    }
    println!("\nRun `drafter analyze --file disclosure.txt` to start, or `drafter shell` for interactive mode.");

    Ok(())
}
