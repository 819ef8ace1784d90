//! CLI command implementations.

pub mod build;
pub mod check;
pub mod grammar;

pub use build::{build_documents, BuildOptions};
pub use check::check_file;
pub use grammar::show_grammar;

use anyhow::{Context, Result};
use quire_core::{Config, ExtensionCatalog, Translator};
use std::path::Path;

/// Load `quire.yml`, falling back to the defaults when the file is absent
pub(crate) fn load_config(config_path: &Path) -> Result<Config> {
    if config_path.exists() {
        tracing::debug!("Loading config from {:?}", config_path);
        Config::from_file(config_path).context("Failed to load configuration")
    } else {
        tracing::debug!("No config at {:?}, using defaults", config_path);
        Ok(Config::default())
    }
}

pub(crate) fn translator(config: &Config) -> Result<Translator> {
    Translator::from_config(config, &ExtensionCatalog::builtin())
        .context("Failed to load extensions")
}
