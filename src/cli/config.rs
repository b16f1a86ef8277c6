//! Config command handler.

use std::path::Path;

use anyhow::{Context, Result};

use turnstile::config::validate::{validate_config, DiagnosticLevel};

use super::common::{config_file, read_config};

/// Print the effective config, or validate the config file with `--check`.
pub(crate) fn cmd_config(config_path: Option<&Path>, check: bool) -> Result<()> {
    if check {
        return check_config(config_path);
    }

    let config = read_config(config_path)?;
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    Ok(())
}

fn check_config(config_path: Option<&Path>) -> Result<()> {
    let path = config_file(config_path);
    println!("Config file: {}", path.display());

    if !path.exists() {
        println!("[OK] No config file found (using defaults)");
        return Ok(());
    }

    let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
    let raw: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            println!("[ERROR] Invalid JSON: {}", e);
            return Ok(());
        }
    };

    let diagnostics = validate_config(&raw);
    for diag in &diagnostics {
        println!("{}", diag);
    }

    let mut errors = diagnostics
        .iter()
        .filter(|d| d.level == DiagnosticLevel::Error)
        .count();
    let warnings = diagnostics
        .iter()
        .filter(|d| d.level == DiagnosticLevel::Warn)
        .count();

    if errors == 0 {
        if let Err(e) = read_config(config_path).and_then(|c| Ok(c.validate()?)) {
            println!("[ERROR] {:#}", e);
            errors += 1;
        }
    }

    if errors == 0 && warnings == 0 {
        println!("\nConfiguration looks good!");
    } else {
        println!("\nFound {} error(s), {} warning(s)", errors, warnings);
    }
    Ok(())
}
