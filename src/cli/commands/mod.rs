//! Command implementations for the CLI.
//!
//! Each command family lives in its own module and returns `anyhow::Result`
//! so `main` can print the error chain and exit non-zero.

pub mod documents;
pub mod init;
pub mod vocab;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands};
use crate::config::Settings;
use crate::repository::Repository;

/// Dispatch a parsed command line.
pub async fn run(cli: Cli, settings: Arc<Settings>) -> Result<()> {
    let root = repository_root(cli.repository.as_deref(), &settings)?;

    match cli.command {
        Commands::Init {
            path,
            write_config,
            force,
        } => init::run_init(path.unwrap_or(root), settings, write_config.then_some(cli.config.as_deref()), force),
        Commands::Config => init::run_config(&settings),
        Commands::List(args) => documents::run_list(&open(&root, &settings, false)?, &args),
        Commands::Import { files } => documents::run_import(&mut open(&root, &settings, false)?, &files),
        Commands::Rename { from, to } => documents::run_rename(&mut open(&root, &settings, false)?, &from, &to),
        Commands::Edit(args) => documents::run_edit(&mut open(&root, &settings, false)?, &args),
        Commands::Delete { name } => documents::run_delete(&mut open(&root, &settings, false)?, &name),
        Commands::Vocab { action } => vocab::run(&mut open(&root, &settings, false)?, action),
        Commands::Watch { json } => watch::run(open(&root, &settings, true)?, json).await,
    }
}

/// `-C` flag, then `repository` from settings, then the current directory.
fn repository_root(cli_repository: Option<&Path>, settings: &Settings) -> Result<PathBuf> {
    match cli_repository.or(settings.repository.as_deref()) {
        Some(path) => Ok(path.to_path_buf()),
        None => std::env::current_dir().context("Cannot determine current directory"),
    }
}

/// Open the repository; one-shot commands never start the watcher.
fn open(root: &Path, settings: &Arc<Settings>, watch: bool) -> Result<Repository> {
    let mut settings = Settings::clone(settings);
    settings.watcher.enabled = watch;
    Repository::open(root, Arc::new(settings))
        .with_context(|| format!("Failed to open repository {}", root.display()))
}
