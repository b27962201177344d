use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docbench_harness::{GeneratorCommand, SwapPlan};

use crate::config::{GenerateSection, ServeSection};
use crate::http_server::{ServeConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_ROOT};
use crate::mime::MimeTable;

const DEFAULT_CANONICAL: &str = "config.yaml";
const DEFAULT_ALTERNATE: &str = "config_test.yaml";

/// Command-line interface for the `docbench` application.
#[derive(Debug, Parser)]
#[command(
    name = "docbench",
    version,
    about = "Serves the documentation viewer and runs the docs generator under test settings"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available `docbench` commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serves the documentation viewer over HTTP (default).
    Serve(ServeArgs),
    /// Runs the documentation generator with the test configuration swapped in.
    Generate(GenerateArgs),
    /// Restores a configuration left swapped by a run that was killed.
    Restore(SlotArgs),
}

impl Default for Commands {
    fn default() -> Self {
        Self::Serve(ServeArgs::default())
    }
}

#[derive(Debug, Default, Args)]
pub struct ServeArgs {
    /// Address to bind.
    #[arg(long, env = "DOCBENCH_HOST")]
    pub host: Option<String>,
    /// Port to listen on.
    #[arg(long, short, env = "DOCBENCH_PORT")]
    pub port: Option<u16>,
    /// Directory to serve.
    #[arg(long, env = "DOCBENCH_ROOT", value_name = "DIR")]
    pub root: Option<PathBuf>,
}

impl ServeArgs {
    /// Merges CLI/env values over the config file section and built-in defaults.
    pub fn resolve(self, file: &ServeSection) -> Result<ServeConfig> {
        let mut mime_types = MimeTable::default();
        mime_types
            .extend(&file.mime_types)
            .context("invalid [serve.mime_types] entry in config file")?;

        Ok(ServeConfig {
            host: self
                .host
                .or_else(|| file.host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.or(file.port).unwrap_or(DEFAULT_PORT),
            root: self
                .root
                .or_else(|| file.root.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT)),
            mime_types,
        })
    }
}

/// The three configuration paths a swap touches.
#[derive(Debug, Default, Args)]
pub struct SlotArgs {
    /// Canonical configuration file the generator reads.
    #[arg(long, value_name = "FILE")]
    pub canonical: Option<PathBuf>,
    /// Alternate (test) configuration file.
    #[arg(long, value_name = "FILE")]
    pub alternate: Option<PathBuf>,
    /// Backup slot for the canonical file (default: canonical path + `.bak`).
    #[arg(long, value_name = "FILE")]
    pub backup: Option<PathBuf>,
}

impl SlotArgs {
    pub fn plan(&self, file: &GenerateSection) -> SwapPlan {
        let canonical = self
            .canonical
            .clone()
            .or_else(|| file.canonical.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CANONICAL));
        let alternate = self
            .alternate
            .clone()
            .or_else(|| file.alternate.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ALTERNATE));

        let plan = SwapPlan::new(canonical, alternate);
        match self.backup.clone().or_else(|| file.backup.clone()) {
            Some(backup) => plan.with_backup(backup),
            None => plan,
        }
    }
}

#[derive(Debug, Default, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub slots: SlotArgs,
    /// Leaves files in place and hands the alternate path to the generator
    /// through `DOCBENCH_CONFIG_PATH` instead of swapping.
    #[arg(long, default_value_t = false)]
    pub direct: bool,
    /// Generator command line (default: the Python `generate_docs.main` entry point).
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl GenerateArgs {
    pub fn generator(&self, file: &GenerateSection) -> GeneratorCommand {
        GeneratorCommand::from_argv(self.command.iter().cloned())
            .or_else(|| file.command.clone().and_then(GeneratorCommand::from_argv))
            .unwrap_or_default()
    }
}
