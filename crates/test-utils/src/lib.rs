//! Shared test utilities for docbench crates.
//!
//! This crate provides the filesystem fixtures used across the workspace:
//! a canonical/alternate configuration pair for harness tests and a served
//! documentation tree for server tests.

use std::path::{Path, PathBuf};

/// Default canonical configuration file name.
pub const CANONICAL_NAME: &str = "config.yaml";
/// Default alternate configuration file name.
pub const ALTERNATE_NAME: &str = "config_test.yaml";

/// Restores an environment variable to its previous value on drop.
///
/// Tests holding one of these should be marked `#[serial]`.
pub struct EnvVarGuard {
    key: &'static str,
    previous: Option<String>,
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        if let Some(v) = &self.previous {
            std::env::set_var(self.key, v);
        } else {
            std::env::remove_var(self.key);
        }
    }
}

/// Set an environment variable and return a guard that restores the original on drop.
pub fn set_env_var(key: &'static str, value: Option<&str>) -> EnvVarGuard {
    let previous = std::env::var(key).ok();
    if let Some(val) = value {
        std::env::set_var(key, val);
    } else {
        std::env::remove_var(key);
    }
    EnvVarGuard { key, previous }
}

/// A temp directory holding an optional canonical and an optional alternate
/// configuration file.
pub struct ConfigPairFixture {
    pub tempdir: tempfile::TempDir,
    canonical: PathBuf,
    alternate: PathBuf,
}

impl ConfigPairFixture {
    /// Creates the pair. `None` leaves the corresponding file absent.
    pub fn new(canonical: Option<&str>, alternate: Option<&str>) -> std::io::Result<Self> {
        let tempdir = tempfile::tempdir()?;
        let canonical_path = tempdir.path().join(CANONICAL_NAME);
        let alternate_path = tempdir.path().join(ALTERNATE_NAME);

        if let Some(contents) = canonical {
            std::fs::write(&canonical_path, contents)?;
        }
        if let Some(contents) = alternate {
            std::fs::write(&alternate_path, contents)?;
        }

        Ok(Self {
            tempdir,
            canonical: canonical_path,
            alternate: alternate_path,
        })
    }

    pub fn dir(&self) -> &Path {
        self.tempdir.path()
    }

    pub fn canonical_path(&self) -> &Path {
        &self.canonical
    }

    pub fn alternate_path(&self) -> &Path {
        &self.alternate
    }

    /// Current contents of the canonical file, `None` if absent.
    pub fn canonical_contents(&self) -> Option<String> {
        std::fs::read_to_string(&self.canonical).ok()
    }

    /// Current contents of the alternate file, `None` if absent.
    pub fn alternate_contents(&self) -> Option<String> {
        std::fs::read_to_string(&self.alternate).ok()
    }
}

/// A temp directory standing in for the documentation viewer root.
pub struct ViewerFixture {
    pub tempdir: tempfile::TempDir,
}

impl ViewerFixture {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            tempdir: tempfile::tempdir()?,
        })
    }

    /// The standard two-file viewer: a 10-byte `index.html` and a 5-byte `app.mjs`.
    pub fn with_sample_files() -> std::io::Result<Self> {
        let fixture = Self::new()?;
        fixture.write("index.html", b"<p>hi</p>\n")?;
        fixture.write("app.mjs", b"x=1;\n")?;
        Ok(fixture)
    }

    pub fn root(&self) -> &Path {
        self.tempdir.path()
    }

    /// Writes `contents` at `relative`, creating parent directories.
    pub fn write(&self, relative: &str, contents: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}
