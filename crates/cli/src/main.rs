//! Command-line interface for the `docbench` application.
//!
//! This crate serves as the main entry point for the executable, delegating
//! its core functionality to the `docbench-server` crate.

fn main() -> anyhow::Result<std::process::ExitCode> {
    docbench_server::run()
}
