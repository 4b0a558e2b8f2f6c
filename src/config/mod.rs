mod schema;

pub use schema::{Config, Settings, MAX_FUZZY_THRESHOLD};

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::rules::{OperatorPolicy, TableForm};

const CONFIG_ENV_VAR: &str = "RULEBATCH_CONFIG";

pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }

    Ok(rulebatch_dir()?.join("config.json"))
}

/// `--config` flag first, then RULEBATCH_CONFIG, then ~/.rulebatch/config.json
pub fn get_config_path_with_override(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => get_config_path(),
    }
}

fn rulebatch_dir() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not find home directory"))?
        .join(".rulebatch"))
}

/// load config, writing defaults when the file does not exist yet
pub fn load_with_override(path: Option<&Path>) -> Result<Config> {
    let path = get_config_path_with_override(path)?;

    if !path.exists() {
        let config = Config::default();
        save_to(&config, &path)?;
        return Ok(config);
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

pub fn save_with_override(config: &Config, path: Option<&Path>) -> Result<()> {
    let path = get_config_path_with_override(path)?;
    save_to(config, &path)
}

fn save_to(config: &Config, path: &Path) -> Result<()> {
    // ensure directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
    }

    let content = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    Ok(())
}

/// Verify configuration file and return a list of errors
pub fn verify(path: &Path) -> Result<Vec<String>> {
    let mut errors = Vec::new();

    if !path.exists() {
        return Err(anyhow!("config file not found: {}", path.display()));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let root: Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            return Err(anyhow!("invalid JSON: {}", e));
        }
    };

    let Some(root) = root.as_object() else {
        return Err(anyhow!("invalid config: expected a JSON object"));
    };

    for key in root.keys().filter(|k| k.as_str() != "settings") {
        errors.push(format!("{}: unknown key", key));
    }

    let Some(settings) = root.get("settings") else {
        return Ok(errors);
    };

    let Some(settings) = settings.as_object() else {
        errors.push("settings: expected an object".to_string());
        return Ok(errors);
    };

    for (key, value) in settings {
        let prefix = format!("settings.{}", key);

        if let Err(e) = validate_setting(key, value) {
            errors.push(format!("{}: {}", prefix, e));
        }
    }

    Ok(errors)
}

fn validate_setting(key: &str, value: &Value) -> Result<(), String> {
    match key {
        "table_form" => {
            let text = value.as_str().ok_or("expected a string")?;
            text.parse::<TableForm>().map(|_| ())
        }
        "operators" => {
            let text = value.as_str().ok_or("expected a string")?;
            text.parse::<OperatorPolicy>().map(|_| ())
        }
        "report_skipped_attributes" => value
            .as_bool()
            .map(|_| ())
            .ok_or_else(|| "expected true or false".to_string()),
        "fuzzy_threshold" => match value.as_u64() {
            Some(n) if n as usize <= MAX_FUZZY_THRESHOLD => Ok(()),
            Some(n) => Err(format!(
                "fuzzy_threshold {} out of range (0-{})",
                n, MAX_FUZZY_THRESHOLD
            )),
            None => Err("expected a non-negative number".to_string()),
        },
        _ => Err("unknown setting".to_string()),
    }
}

pub fn set_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["settings", "table_form"] => {
            config.settings.table_form = value.parse().map_err(|e: String| anyhow!(e))?;
        }
        ["settings", "operators"] => {
            config.settings.operators = value.parse().map_err(|e: String| anyhow!(e))?;
        }
        ["settings", "report_skipped_attributes"] => {
            config.settings.report_skipped_attributes = parse_bool(value)?;
        }
        ["settings", "fuzzy_threshold"] => {
            let threshold: usize = value
                .parse()
                .with_context(|| format!("Invalid number: {}", value))?;
            if threshold > MAX_FUZZY_THRESHOLD {
                return Err(anyhow!(
                    "fuzzy_threshold {} out of range (0-{})",
                    threshold,
                    MAX_FUZZY_THRESHOLD
                ));
            }
            config.settings.fuzzy_threshold = threshold;
        }
        _ => {
            return Err(anyhow!(
                "Unknown config key: {}. Valid keys: settings.table_form, settings.operators, settings.report_skipped_attributes, settings.fuzzy_threshold",
                key
            ));
        }
    }

    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(anyhow!(
            "Invalid boolean value: {}. Use true/false, yes/no, 1/0, or on/off",
            value
        )),
    }
}
