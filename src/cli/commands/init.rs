use anyhow::{Context, Result};
use console::{style, Emoji};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use crate::config::{Config, PlatformTomlConfig};

static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");

pub async fn run(force: bool) -> Result<()> {
    println!();
    println!("{}", style(" translorc - Initialization ").bold().reverse());
    println!();

    let config_dir = Config::config_dir()?;
    let config_path = config_dir.join("config.toml");

    if config_path.exists() && !force {
        println!(
            "{}Configuration already exists at {}",
            WARN,
            style(config_path.display()).cyan()
        );
        println!("  Use {} to overwrite", style("--force").yellow());
        return Ok(());
    }

    fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template(&format!("{}{{spinner:.green}} {{msg}}", GEAR))
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Creating configuration...");

    let mut platforms = HashMap::new();
    platforms.insert(
        "openai".to_string(),
        PlatformTomlConfig {
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o".to_string(),
            rps: 5,
            rpm: 0,
            max_workers: 8,
        },
    );
    platforms.insert(
        "local".to_string(),
        PlatformTomlConfig {
            api_url: "http://localhost:8080/v1".to_string(),
            api_key: String::new(),
            model: "local-model".to_string(),
            rps: 0,
            rpm: 0,
            max_workers: 0,
        },
    );

    let default_config = Config {
        active_platform: "openai".to_string(),
        chunk_size: 500,
        token_threshold: 768,
        max_round: 16,
        preceding_lines_threshold: 3,
        mtool_preprocess_enabled: true,
        glossary_refresh_on_save: false,
        platforms,
    };

    let config_content = toml::to_string_pretty(&default_config)?;
    fs::write(&config_path, config_content).context("Failed to write config file")?;
    spinner.finish_and_clear();

    println!(
        "{}Created configuration at {}",
        CHECK,
        style(config_path.display()).cyan()
    );

    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!();
    println!("{}Next steps:", ROCKET);
    println!();
    println!("  {}Set your API key and translate a file:", ROCKET);
    println!("    {} translorc run ./source.json --output ./out", style("$").dim());
    println!();

    Ok(())
}
