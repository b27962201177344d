//! Command dispatch for the `docbench` binary.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use docbench_harness::{interrupt_signal, with_alternate_async, GeneratorError, HarnessError};

use crate::cli::{Cli, Commands, GenerateArgs, SlotArgs};
use crate::config::{load_config, Config, GenerateSection};
use crate::http_server::{serve, ServeConfig};
use crate::signals::shutdown_signal;

/// Exit status for a run stopped by Ctrl+C, following the shell convention.
const EXIT_INTERRUPTED: u8 = 130;

/// The main entry point for the `docbench` application.
pub fn run() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config()?.unwrap_or_default();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    match cli.command.unwrap_or_default() {
        Commands::Serve(args) => {
            let serve_config = args.resolve(&config.serve)?;
            runtime.block_on(serve_command(serve_config))
        }
        Commands::Generate(args) => runtime.block_on(generate_command(args, &config)),
        Commands::Restore(args) => restore_command(&args, &config.generate),
    }
}

async fn serve_command(config: ServeConfig) -> Result<ExitCode> {
    serve(config, shutdown_signal()).await?;
    println!("\nServer stopped.");
    Ok(ExitCode::SUCCESS)
}

async fn generate_command(args: GenerateArgs, config: &Config) -> Result<ExitCode> {
    let plan = args.slots.plan(&config.generate);
    let generator = args.generator(&config.generate);
    // Installed before any file moves so Ctrl+C cannot bypass the restore.
    let interrupt = interrupt_signal();

    let result = if args.direct {
        tracing::info!(
            target: "docbench::generate",
            alternate = %plan.alternate().display(),
            "Running generator against the alternate configuration without swapping"
        );
        generator
            .with_config_path(plan.alternate())
            .run_until(interrupt)
            .await
            .map_err(HarnessError::Generator)
    } else {
        let generator = generator.with_config_path(plan.canonical());
        with_alternate_async(&plan, || generator.run_until(interrupt)).await
    };

    finish_generate(result).map(ExitCode::from)
}

/// How a generate run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GenerateOutcome {
    Completed,
    Interrupted,
}

impl From<GenerateOutcome> for ExitCode {
    fn from(outcome: GenerateOutcome) -> Self {
        match outcome {
            GenerateOutcome::Completed => ExitCode::SUCCESS,
            GenerateOutcome::Interrupted => ExitCode::from(EXIT_INTERRUPTED),
        }
    }
}

/// An interrupt whose restore succeeded is reported, not treated as a failure.
fn finish_generate(result: Result<(), HarnessError<GeneratorError>>) -> Result<GenerateOutcome> {
    match result {
        Ok(()) => Ok(GenerateOutcome::Completed),
        Err(HarnessError::Generator(GeneratorError::Interrupted)) => {
            eprintln!("Generation interrupted; original configuration restored.");
            Ok(GenerateOutcome::Interrupted)
        }
        Err(err) => Err(err.into()),
    }
}

fn restore_command(args: &SlotArgs, file: &GenerateSection) -> Result<ExitCode> {
    let plan = args.plan(file);
    if plan.recover()? {
        println!(
            "Restored {} from {}",
            plan.canonical().display(),
            plan.backup().display()
        );
    } else {
        println!("Nothing to restore: {} does not exist", plan.backup().display());
    }
    Ok(ExitCode::SUCCESS)
}
