//! Error types for configuration substitution.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A filesystem step of a swap or restore that did not complete.
#[derive(Debug, Error)]
pub enum SwapError {
    /// A rename between two of the managed paths failed.
    #[error("failed to move {} to {}: {}", .from.display(), .to.display(), .source)]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The backup slot is already taken, most likely by a run that was killed
    /// before it could restore. Starting another swap would overwrite it.
    #[error(
        "backup path {} already exists; run `docbench restore` to put it back first",
        .0.display()
    )]
    BackupOccupied(PathBuf),

    /// Recovery found an unexpected file at the canonical path while the
    /// alternate path is also populated, so it cannot tell which one to keep.
    #[error(
        "cannot recover {}: both the canonical and alternate paths are populated",
        .0.display()
    )]
    Conflict(PathBuf),

    /// The canonical path was still occupied when the backup was due to go
    /// back, so the backup was left in its slot for `docbench restore`.
    #[error(
        "{} is still occupied; original configuration left at {}",
        .canonical.display(),
        .backup.display()
    )]
    BackupStranded { canonical: PathBuf, backup: PathBuf },

    /// More than one restore step failed. Every step was still attempted.
    #[error("{} restore steps failed: {}", .0.len(), join_errors(.0))]
    Incomplete(Vec<SwapError>),
}

fn join_errors(errors: &[SwapError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of a scoped run under the alternate configuration.
///
/// `E` is whatever the invoked entry point returns. It is only ever handed
/// back after the restore step has been attempted.
#[derive(Debug, Error)]
pub enum HarnessError<E> {
    /// The alternate configuration could not be installed; nothing was run.
    #[error("could not install alternate configuration: {0}")]
    Engage(#[source] SwapError),

    /// The entry point failed. The original configuration was restored.
    #[error("generator failed: {0}")]
    Generator(#[source] E),

    /// The entry point succeeded but restoring the original configuration did not.
    #[error("original configuration was not restored: {0}")]
    Restore(#[source] SwapError),

    /// Both the entry point and the restore failed.
    #[error("generator failed ({generator}) and original configuration was not restored: {restore}")]
    GeneratorAndRestore {
        #[source]
        generator: E,
        restore: SwapError,
    },
}

impl<E> HarnessError<E> {
    /// Returns the entry point's own error, if it produced one.
    pub fn generator_error(&self) -> Option<&E> {
        match self {
            Self::Generator(err) | Self::GeneratorAndRestore { generator: err, .. } => Some(err),
            Self::Engage(_) | Self::Restore(_) => None,
        }
    }

    /// Returns the swap failure, if any step of engaging or restoring failed.
    pub fn swap_error(&self) -> Option<&SwapError> {
        match self {
            Self::Engage(err) | Self::Restore(err) => Some(err),
            Self::GeneratorAndRestore { restore, .. } => Some(restore),
            Self::Generator(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rename_error(from: &str, to: &str) -> SwapError {
        SwapError::Rename {
            from: from.into(),
            to: to.into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        }
    }

    #[test]
    fn incomplete_lists_every_failed_step() {
        let err = SwapError::Incomplete(vec![
            rename_error("config.yaml", "config_test.yaml"),
            rename_error("config.yaml.bak", "config.yaml"),
        ]);
        let message = err.to_string();
        assert!(message.starts_with("2 restore steps failed"));
        assert!(message.contains("config.yaml to config_test.yaml"));
        assert!(message.contains("config.yaml.bak to config.yaml"));
    }

    #[test]
    fn backup_occupied_points_at_recovery() {
        let err = SwapError::BackupOccupied("config.yaml.bak".into());
        assert!(err.to_string().contains("docbench restore"));
    }

    #[test]
    fn generator_error_is_reachable_from_both_variants() {
        let plain: HarnessError<io::Error> =
            HarnessError::Generator(io::Error::other("boom"));
        assert_eq!(plain.generator_error().map(ToString::to_string).as_deref(), Some("boom"));
        assert!(plain.swap_error().is_none());

        let both: HarnessError<io::Error> = HarnessError::GeneratorAndRestore {
            generator: io::Error::other("boom"),
            restore: rename_error("a", "b"),
        };
        assert!(both.generator_error().is_some());
        assert!(both.swap_error().is_some());
    }

    #[test]
    fn source_chain_exposes_generator_error() {
        use std::error::Error as _;

        let err: HarnessError<io::Error> = HarnessError::Generator(io::Error::other("boom"));
        let source = err.source().expect("generator error should be the source");
        assert_eq!(source.to_string(), "boom");
    }
}
