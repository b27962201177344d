//! The documentation generator as an external process.
//!
//! The generator is opaque: it is started with inherited stdio, told where
//! its configuration lives through [`CONFIG_PATH_ENV`], and judged only by
//! its exit status. While it runs, Ctrl+C stops it and surfaces as
//! [`GeneratorError::Interrupted`], so a surrounding swap guard still gets to
//! restore the original configuration on the way out.

use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;

/// Environment variable naming the configuration file the generator should read.
pub const CONFIG_PATH_ENV: &str = "DOCBENCH_CONFIG_PATH";

const DEFAULT_PROGRAM: &str = "python3";
const DEFAULT_ENTRY_POINT: &str = "from generate_docs import main; main()";

/// Errors that can occur while running the generator.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// The process could not be started.
    #[error("failed to spawn generator '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("generator exited with code {code:?}")]
    Failed { code: Option<i32> },

    /// Waiting on the process failed.
    #[error("failed to wait for generator: {0}")]
    Wait(#[source] io::Error),

    /// An interrupt arrived while the generator was running; the process was stopped.
    #[error("generator interrupted")]
    Interrupted,
}

impl GeneratorError {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// How to launch the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorCommand {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env_vars: BTreeMap<String, String>,
}

impl Default for GeneratorCommand {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM).with_args(["-c", DEFAULT_ENTRY_POINT])
    }
}

impl GeneratorCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env_vars: BTreeMap::new(),
        }
    }

    /// Builds a command from an argv-style list. Returns `None` for an empty list.
    pub fn from_argv<I, S>(argv: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next()?;
        Some(Self::new(program).with_args(argv))
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Points the generator at a configuration file via [`CONFIG_PATH_ENV`].
    pub fn with_config_path(self, path: &Path) -> Self {
        self.with_env(CONFIG_PATH_ENV, path.display().to_string())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Runs the generator to completion, stopping it on Ctrl+C.
    pub async fn run(&self) -> Result<(), GeneratorError> {
        // Registered before spawning so an early Ctrl+C is not lost.
        let interrupt = interrupt_signal();
        self.run_until(interrupt).await
    }

    /// Runs the generator until it exits or `interrupt` resolves, whichever
    /// comes first. On interrupt the child is killed and reaped.
    pub async fn run_until<I>(&self, interrupt: I) -> Result<(), GeneratorError>
    where
        I: Future<Output = ()>,
    {
        let mut command = Command::new(&self.program);
        command.args(&self.args).envs(&self.env_vars).kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| GeneratorError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        tracing::info!(
            target: "docbench::generator",
            program = %self.program,
            pid = ?child.id(),
            "Generator started"
        );

        tokio::pin!(interrupt);
        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(GeneratorError::Wait)?;
                if status.success() {
                    tracing::info!(target: "docbench::generator", "Generator finished");
                    Ok(())
                } else {
                    tracing::warn!(
                        target: "docbench::generator",
                        code = ?status.code(),
                        "Generator failed"
                    );
                    Err(GeneratorError::Failed { code: status.code() })
                }
            }
            () = &mut interrupt => {
                tracing::warn!(
                    target: "docbench::generator",
                    program = %self.program,
                    "Interrupt received; stopping generator"
                );
                if let Err(err) = child.kill().await {
                    tracing::warn!(
                        target: "docbench::generator",
                        error = %err,
                        "Failed to stop generator process"
                    );
                }
                Err(GeneratorError::Interrupted)
            }
        }
    }
}

/// Resolves on SIGINT. Never resolves if the handler cannot be installed.
///
/// The handler is installed when this is called, not when the future is
/// first polled, so a signal arriving in between is not lost. Must be called
/// inside a tokio runtime.
#[cfg(unix)]
pub fn interrupt_signal() -> impl Future<Output = ()> {
    use tokio::signal::unix::{signal, SignalKind};

    let registered = signal(SignalKind::interrupt());
    async move {
        match registered {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::warn!(
                    target: "docbench::generator",
                    error = %err,
                    "Could not listen for interrupts"
                );
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
#[cfg(not(unix))]
pub fn interrupt_signal() -> impl Future<Output = ()> {
    async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(
                target: "docbench::generator",
                error = %err,
                "Could not listen for Ctrl+C"
            );
            std::future::pending::<()>().await;
        }
    }
}
