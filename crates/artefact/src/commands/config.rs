//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use artefact_config::{ArtefactConfig, Service, resolve_api_key};
use clap::{Args, Subcommand};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration and API key status
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./artefact.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { local } => cmd_init(ctx, local),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn user_config_path(ctx: &Context) -> Option<PathBuf> {
    match &ctx.config_dir {
        Some(dir) => Some(dir.join("config.toml")),
        None => artefact_config::xdg_config_path(),
    }
}

fn key_status(service: Service, config_value: Option<&str>) -> String {
    match resolve_api_key(service, config_value) {
        Some(secret) => format!("✓ ({})", secret.source),
        None => format!("✗ (set {})", service.env_var()),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let config = &loaded.config;

    if ctx.json_output {
        let value = serde_json::json!({
            "sources": loaded.loaded_from(),
            "warnings": loaded.warnings,
            "config": serde_json::to_value(config)?,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("# Artefact Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    let store = config.store_or_default();
    match store.resolve_default() {
        Ok(paths) => {
            println!("Store:");
            println!("  database: {}", paths.database.display());
            println!("  assets:   {}", paths.assets_dir.display());
            println!();
        }
        Err(e) => println!("Store: {e}\n"),
    }

    let poll = config.poll_or_default();
    println!("Polling:");
    println!(
        "  image: every {}s, {} attempts",
        poll.image.interval_secs, poll.image.max_attempts
    );
    println!(
        "  model: every {}s, {} attempts",
        poll.model.interval_secs, poll.model.max_attempts
    );
    println!();

    println!("API keys:");
    println!(
        "  {:<16} {}",
        "tasks",
        key_status(Service::Tasks, config.tasks_or_default().api_key.as_deref())
    );
    println!(
        "  {:<16} {}",
        "content",
        key_status(Service::Content, config.content_or_default().api_key.as_deref())
    );
    println!(
        "  {:<16} {}",
        "search",
        key_status(Service::Search, config.search_or_default().api_key.as_deref())
    );
    println!();

    let translation = config.translation_or_default();
    if translation.enabled {
        println!(
            "Translation: {} → {}\n",
            translation.model,
            translation.languages.join(", ")
        );
    } else {
        println!("Translation: disabled\n");
    }

    let schedule = config.schedule_or_default();
    println!("Schedule: daily at {:02}:{:02} UTC\n", schedule.hour, schedule.minute);

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    println!("Config file search order (later overrides earlier):\n");

    for source in &ctx.loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {:<8} {}", status, source.layer, source.path.display());
    }

    println!();
    Ok(())
}

const TEMPLATE: &str = r#"# Artefact Configuration
#
# API keys are read from TRIPO_API_KEY, OPENAI_API_KEY and TAVILY_API_KEY.

[tasks]
base_url = "https://api.tripo3d.ai/v2/openapi"

[poll.image]
interval_secs = 5
max_attempts = 20

[poll.model]
interval_secs = 30
max_attempts = 40

[content]
model = "gemini-3-pro-preview"

[translation]
enabled = true
model = "gpt-5-mini"
languages = ["en", "ja", "ko", "es", "ru", "pt"]

[schedule]
hour = 0
minute = 5

# [store]
# database = "artefact.db"
# assets_dir = "assets"
"#;

fn cmd_init(ctx: &Context, local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("artefact.toml")
    } else {
        user_config_path(ctx).ok_or_else(|| anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    // Refuse to write a template that would not load back.
    ArtefactConfig::from_toml(TEMPLATE)?;
    std::fs::write(&path, TEMPLATE)?;
    println!("✓ Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  export TRIPO_API_KEY=...     # remote task service");
    println!("  export OPENAI_API_KEY=...    # content + translation");
    println!("  export TAVILY_API_KEY=...    # news search");
    println!("  artefact config show         # verify configuration");

    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    if let Some(path) = user_config_path(ctx) {
        println!("{}", path.display());
    } else {
        eprintln!("Could not determine config directory");
    }
    Ok(())
}
