//! Mapping request paths onto the served root.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Maps a URL path onto a filesystem path under `root`.
///
/// The path is percent-decoded and split on `/`. Empty and `.` segments are
/// skipped. Returns `None` for anything that could step outside `root`: `..`
/// segments, backslashes, NUL bytes, drive prefixes, or escapes that do not
/// decode to UTF-8. The result is lexical; symlinks are checked separately by
/// [`is_within_root`].
pub fn resolve_request_path(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(uri_path).decode_utf8().ok()?;
    let mut resolved = root.to_path_buf();

    for segment in decoded.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." || segment.contains(['\\', '\0']) {
            return None;
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => resolved.push(part),
            _ => return None,
        }
    }

    Some(resolved)
}

/// Whether a canonicalized `candidate` lies under the canonicalized `root`.
pub fn is_within_root(root: &Path, candidate: &Path) -> bool {
    candidate.starts_with(root)
}
