//! Extension to content-type mapping for served files.
//!
//! Lookup order: the explicit override table (longest matching suffix wins),
//! then the built-in `mime_guess` table, then `application/octet-stream`.
//! The overrides exist because default tables on some hosts are missing or
//! stale for script and data extensions.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

/// Content type used when nothing else matches.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

const DEFAULT_OVERRIDES: &[(&str, &str)] = &[
    ("js", "application/javascript"),
    ("mjs", "application/javascript"),
    ("json", "application/json"),
];

/// A rejected override entry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MimeTableError {
    #[error("empty extension in content-type override")]
    EmptyExtension,
    #[error("invalid content type {value:?} for extension .{extension}")]
    InvalidContentType { extension: String, value: String },
}

/// Override table keyed by lowercase extension without the leading dot.
///
/// Keys may span several dots (`tar.gz`), so a more specific suffix can
/// override a shorter one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeTable {
    overrides: BTreeMap<String, String>,
}

impl Default for MimeTable {
    fn default() -> Self {
        let overrides = DEFAULT_OVERRIDES
            .iter()
            .map(|(ext, value)| ((*ext).to_string(), (*value).to_string()))
            .collect();
        Self { overrides }
    }
}

impl MimeTable {
    /// A table with no overrides; lookups go straight to the built-in table.
    pub fn empty() -> Self {
        Self {
            overrides: BTreeMap::new(),
        }
    }

    /// Adds or replaces one override. A leading dot on `extension` is ignored.
    pub fn insert(
        &mut self,
        extension: &str,
        content_type: impl Into<String>,
    ) -> Result<(), MimeTableError> {
        let key = extension.trim_start_matches('.').to_ascii_lowercase();
        if key.is_empty() {
            return Err(MimeTableError::EmptyExtension);
        }
        let value = content_type.into();
        if value.parse::<mime_guess::Mime>().is_err() {
            return Err(MimeTableError::InvalidContentType {
                extension: key,
                value,
            });
        }
        self.overrides.insert(key, value);
        Ok(())
    }

    /// Builder form of [`MimeTable::insert`].
    pub fn with_override(
        mut self,
        extension: &str,
        content_type: impl Into<String>,
    ) -> Result<Self, MimeTableError> {
        self.insert(extension, content_type)?;
        Ok(self)
    }

    /// Adds every entry, stopping at the first invalid one.
    pub fn extend<'a, I>(&mut self, entries: I) -> Result<(), MimeTableError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (extension, content_type) in entries {
            self.insert(extension, content_type.clone())?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Override for `file_name`, trying the longest dotted suffix first.
    ///
    /// A leading dot (`.htaccess`) does not start an extension.
    pub fn lookup(&self, file_name: &str) -> Option<&str> {
        let name = file_name.to_ascii_lowercase();
        name.char_indices()
            .filter(|&(i, c)| c == '.' && i > 0)
            .find_map(|(i, _)| self.overrides.get(&name[i + 1..]))
            .map(String::as_str)
    }

    /// Content type for a file path.
    pub fn content_type_for(&self, path: &Path) -> &str {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if let Some(found) = self.lookup(file_name) {
            return found;
        }
        mime_guess::from_path(path)
            .first_raw()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
    }
}
