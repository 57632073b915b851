//! `agentloop config` — Configuration management commands.

use agentloop_config::AppConfig;

const REDACTED: &str = "***";

/// A copy of `config` safe to print.
pub fn redacted(config: &AppConfig) -> AppConfig {
    let mut config = config.clone();
    if config.api_key.is_some() {
        config.api_key = Some(REDACTED.into());
    }
    if config.tools.serpapi_api_key.is_some() {
        config.tools.serpapi_api_key = Some(REDACTED.into());
    }
    config
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&redacted(&config))?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

pub async fn init(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let dir = AppConfig::config_dir();
    let config_path = dir.join("config.toml");
    if config_path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    std::fs::create_dir_all(AppConfig::workspace_dir())?;
    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Wrote {}", config_path.display());
    Ok(())
}
