//! Run a documentation generator under an alternate configuration without
//! leaving the swap behind.
//!
//! [`SwapPlan`] and [`SwapGuard`] move a canonical configuration file aside,
//! install an alternate one, and put both back on every exit path.
//! [`with_alternate`] and [`with_alternate_async`] wrap an invocation in that
//! guard. [`GeneratorCommand`] launches the external generator itself.

pub mod error;
pub mod generator;
pub mod swap;

pub use error::{HarnessError, SwapError};
pub use generator::{interrupt_signal, GeneratorCommand, GeneratorError, CONFIG_PATH_ENV};
pub use swap::{with_alternate, with_alternate_async, SwapGuard, SwapPlan, BACKUP_SUFFIX};
