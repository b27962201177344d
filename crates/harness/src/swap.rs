//! Scoped substitution of a configuration file.
//!
//! A [`SwapPlan`] names three paths: the canonical configuration the generator
//! reads, the alternate (test) configuration, and a backup slot. Engaging the
//! plan moves the canonical file into the backup slot and the alternate file
//! into the canonical path. The returned [`SwapGuard`] moves both back when it
//! is restored explicitly or dropped, so the original layout comes back on
//! normal return, error propagation, panic unwinding and future cancellation
//! alike.
//!
//! Either file may be missing. A missing canonical file means there is nothing
//! to back up; a missing alternate file means nothing is installed and nothing
//! is moved back out.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::{HarnessError, SwapError};

/// Suffix appended to the canonical path to form the default backup path.
pub const BACKUP_SUFFIX: &str = ".bak";

/// The three paths a swap operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    canonical: PathBuf,
    alternate: PathBuf,
    backup: PathBuf,
}

impl SwapPlan {
    /// Creates a plan whose backup slot is the canonical path plus [`BACKUP_SUFFIX`].
    pub fn new(canonical: impl Into<PathBuf>, alternate: impl Into<PathBuf>) -> Self {
        let canonical = canonical.into();
        let backup = default_backup_path(&canonical);
        Self {
            canonical,
            alternate: alternate.into(),
            backup,
        }
    }

    /// Overrides the backup slot.
    pub fn with_backup(mut self, backup: impl Into<PathBuf>) -> Self {
        self.backup = backup.into();
        self
    }

    pub fn canonical(&self) -> &Path {
        &self.canonical
    }

    pub fn alternate(&self) -> &Path {
        &self.alternate
    }

    pub fn backup(&self) -> &Path {
        &self.backup
    }

    /// Moves the canonical file aside and installs the alternate one.
    ///
    /// Refuses to start when the backup slot is already populated. If
    /// installing the alternate file fails after the canonical file was
    /// backed up, the backup is moved back before the error is returned.
    pub fn engage(&self) -> Result<SwapGuard, SwapError> {
        if occupied(&self.backup) {
            return Err(SwapError::BackupOccupied(self.backup.clone()));
        }

        let backed_up = if occupied(&self.canonical) {
            move_file(&self.canonical, &self.backup)?;
            true
        } else {
            tracing::debug!(
                target: "docbench::swap",
                canonical = %self.canonical.display(),
                "No canonical configuration present; nothing to back up"
            );
            false
        };

        let alternate_installed = if occupied(&self.alternate) {
            if let Err(err) = move_file(&self.alternate, &self.canonical) {
                if backed_up {
                    if let Err(rollback) = move_file(&self.backup, &self.canonical) {
                        return Err(SwapError::Incomplete(vec![err, rollback]));
                    }
                }
                return Err(err);
            }
            true
        } else {
            tracing::debug!(
                target: "docbench::swap",
                alternate = %self.alternate.display(),
                "No alternate configuration present; nothing to install"
            );
            false
        };

        tracing::info!(
            target: "docbench::swap",
            canonical = %self.canonical.display(),
            alternate = %self.alternate.display(),
            backed_up,
            alternate_installed,
            "Alternate configuration engaged"
        );

        Ok(SwapGuard {
            plan: self.clone(),
            backed_up,
            alternate_installed,
            restored: false,
        })
    }

    /// Puts back a backup left behind by a run that never restored, typically
    /// because the process was killed outright.
    ///
    /// Returns `Ok(false)` when there is no backup to recover. When the
    /// alternate path is empty, whatever sits at the canonical path is taken
    /// to be the installed alternate file and moved back there first.
    pub fn recover(&self) -> Result<bool, SwapError> {
        if !occupied(&self.backup) {
            return Ok(false);
        }

        if occupied(&self.canonical) {
            if occupied(&self.alternate) {
                return Err(SwapError::Conflict(self.canonical.clone()));
            }
            tracing::warn!(
                target: "docbench::swap",
                canonical = %self.canonical.display(),
                alternate = %self.alternate.display(),
                "Returning installed configuration to the alternate path"
            );
            move_file(&self.canonical, &self.alternate)?;
        }

        move_file(&self.backup, &self.canonical)?;
        tracing::info!(
            target: "docbench::swap",
            canonical = %self.canonical.display(),
            "Recovered configuration from stale backup"
        );
        Ok(true)
    }
}

/// A swap in progress. Restores the original layout exactly once.
#[must_use = "dropping the guard restores the original configuration immediately"]
#[derive(Debug)]
pub struct SwapGuard {
    plan: SwapPlan,
    backed_up: bool,
    alternate_installed: bool,
    restored: bool,
}

impl SwapGuard {
    pub fn plan(&self) -> &SwapPlan {
        &self.plan
    }

    /// Whether the canonical file was moved into the backup slot.
    pub fn backed_up(&self) -> bool {
        self.backed_up
    }

    /// Whether the alternate file now occupies the canonical path.
    pub fn alternate_installed(&self) -> bool {
        self.alternate_installed
    }

    /// Restores the original layout and reports any step that failed.
    ///
    /// The backup only goes back into a vacant canonical path; if the
    /// installed file could not be moved out, the backup stays in its slot.
    pub fn restore(mut self) -> Result<(), SwapError> {
        self.restore_once()
    }

    fn restore_once(&mut self) -> Result<(), SwapError> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;

        let mut failures = Vec::new();
        if self.alternate_installed {
            if let Err(err) = move_file(&self.plan.canonical, &self.plan.alternate) {
                failures.push(err);
            }
        }
        if self.backed_up {
            // Never rename the backup over whatever still sits at the canonical path.
            if occupied(&self.plan.canonical) {
                failures.push(SwapError::BackupStranded {
                    canonical: self.plan.canonical.clone(),
                    backup: self.plan.backup.clone(),
                });
            } else if let Err(err) = move_file(&self.plan.backup, &self.plan.canonical) {
                failures.push(err);
            }
        }

        match failures.len() {
            0 => {
                tracing::info!(
                    target: "docbench::swap",
                    canonical = %self.plan.canonical.display(),
                    "Original configuration restored"
                );
                Ok(())
            }
            1 => Err(failures.remove(0)),
            _ => Err(SwapError::Incomplete(failures)),
        }
    }
}

impl Drop for SwapGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(err) = self.restore_once() {
            tracing::error!(
                target: "docbench::swap",
                canonical = %self.plan.canonical.display(),
                error = %err,
                "Failed to restore original configuration; run `docbench restore`"
            );
        }
    }
}

/// Runs `run` with the alternate configuration installed.
///
/// The original layout is restored before this returns, whatever `run` did;
/// a panic in `run` restores during unwinding.
pub fn with_alternate<T, E, F>(plan: &SwapPlan, run: F) -> Result<T, HarnessError<E>>
where
    F: FnOnce() -> Result<T, E>,
{
    let guard = plan.engage().map_err(HarnessError::Engage)?;
    let outcome = run();
    settle(outcome, guard.restore())
}

/// Async form of [`with_alternate`].
///
/// If the returned future is dropped before completion, the guard restores
/// the original layout as it goes out of scope.
pub async fn with_alternate_async<T, E, F, Fut>(
    plan: &SwapPlan,
    run: F,
) -> Result<T, HarnessError<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let guard = plan.engage().map_err(HarnessError::Engage)?;
    let outcome = run().await;
    settle(outcome, guard.restore())
}

fn settle<T, E>(
    outcome: Result<T, E>,
    restored: Result<(), SwapError>,
) -> Result<T, HarnessError<E>> {
    match (outcome, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(restore)) => Err(HarnessError::Restore(restore)),
        (Err(generator), Ok(())) => Err(HarnessError::Generator(generator)),
        (Err(generator), Err(restore)) => {
            Err(HarnessError::GeneratorAndRestore { generator, restore })
        }
    }
}

fn default_backup_path(canonical: &Path) -> PathBuf {
    let mut name = canonical.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

// Dangling symlinks count as present; they are still something to move.
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn move_file(from: &Path, to: &Path) -> Result<(), SwapError> {
    fs::rename(from, to).map_err(|source| SwapError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;
    tracing::debug!(
        target: "docbench::swap",
        from = %from.display(),
        to = %to.display(),
        "Moved configuration file"
    );
    Ok(())
}
