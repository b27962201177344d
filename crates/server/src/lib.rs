//! This crate provides the core functionality for the `docbench` application: the
//! static documentation viewer server and the command-line entry point that also
//! drives the test-configuration harness from `docbench-harness`.
//!
//! The main entry point is the `run` function. The `http_server` module exposes the
//! router and serve loop for embedding and tests; `mime` and `resolve` hold the
//! content-type and path policies it applies.
//!
//! Logging goes to stderr through `tracing`; set `RUST_LOG=docbench=info` to see
//! per-request and swap events.

pub mod app;
pub mod cli;
pub mod config;
pub mod http_server;
pub mod mime;
pub mod resolve;
pub mod signals;

pub use app::run;
