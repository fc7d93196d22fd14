//! Init and Config commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Settings;
use crate::repository::Repository;

/// Run init command - create the repository and optionally a settings file.
///
/// `write_config` is `Some(path)` when a settings file was requested, with
/// the `--config` path if one was given.
pub fn run_init(
    root: PathBuf,
    settings: Arc<Settings>,
    write_config: Option<Option<&Path>>,
    force: bool,
) -> Result<()> {
    let repository = Repository::init(&root, settings)
        .with_context(|| format!("Failed to initialize {}", root.display()))?;
    println!(
        "Initialized repository at {} ({} documents)",
        repository.root().display(),
        repository.index().len()
    );

    if let Some(config_path) = write_config {
        let path = Settings::init_config_file(config_path, force)?;
        println!("Created configuration file at: {}", path.display());
        println!("Edit this file to customize your settings.");
    }
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> Result<()> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    let toml_str = toml::to_string_pretty(config).context("Error displaying config")?;
    println!("{toml_str}");
    Ok(())
}
