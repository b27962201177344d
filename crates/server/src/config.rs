//! Configuration file support for docbench.
//!
//! Settings are resolved with the following precedence:
//! CLI arguments > Environment variables > Config file > built-in defaults
//!
//! The file is the first of these that exists: the path in
//! `DOCBENCH_CONFIG_FILE`, `./docbench.toml`, `~/.docbench/config.toml`.
//!
//! ## Configuration File Format
//!
//! ```toml
//! [serve]
//! host = "127.0.0.1"
//! port = 8080
//! root = "docs/viewer"
//!
//! # Extra or replacement content types, keyed by extension
//! [serve.mime_types]
//! wasm = "application/wasm"
//! "tar.gz" = "application/x-gtar"
//!
//! [generate]
//! canonical = "config.yaml"
//! alternate = "config_test.yaml"
//! backup = "config.yaml.bak"
//! command = ["python3", "-c", "from generate_docs import main; main()"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable naming an explicit config file.
pub const CONFIG_FILE_ENV: &str = "DOCBENCH_CONFIG_FILE";

const LOCAL_CONFIG_FILE: &str = "docbench.toml";

/// Top-level configuration structure.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Documentation viewer server settings.
    #[serde(default)]
    pub serve: ServeSection,
    /// Test-configuration harness settings.
    #[serde(default)]
    pub generate: GenerateSection,
}

/// Configuration for the serve command.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ServeSection {
    /// Bind host.
    pub host: Option<String>,
    /// Listening port.
    pub port: Option<u16>,
    /// Directory to serve.
    pub root: Option<PathBuf>,
    /// Content-type overrides applied on top of the built-in ones.
    #[serde(default)]
    pub mime_types: BTreeMap<String, String>,
}

/// Configuration for the generate and restore commands.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
pub struct GenerateSection {
    /// Canonical configuration path the generator reads.
    pub canonical: Option<PathBuf>,
    /// Alternate (test) configuration path.
    pub alternate: Option<PathBuf>,
    /// Backup slot for the canonical file.
    pub backup: Option<PathBuf>,
    /// Generator command line, program first.
    pub command: Option<Vec<String>>,
}

/// Returns the config file to load, if any exists.
fn config_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(CONFIG_FILE_ENV) {
        return Some(PathBuf::from(explicit));
    }
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    dirs::home_dir()
        .map(|h| h.join(".docbench").join("config.toml"))
        .filter(|p| p.is_file())
}

/// Loads the configuration file if one exists.
///
/// Returns `Ok(None)` if there is no file to load. An explicit
/// `DOCBENCH_CONFIG_FILE` that does not exist is an error.
pub fn load_config() -> Result<Option<Config>> {
    let Some(path) = config_path() else {
        return Ok(None);
    };
    load_config_from(&path).map(Some)
}

/// Loads and parses a specific configuration file.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;

    tracing::debug!(
        target: "docbench::config",
        path = %path.display(),
        "Loaded configuration file"
    );

    Ok(config)
}
