//! Shared key handling for storage backends.
//!
//! Every backend stores a relative path at `<prefix>/<relative>`, where the
//! prefix is the configured media folder. Relative paths are normalized here so
//! all backends agree on the layout.

use mediastore_core::constants::TRASH_DIR;

use crate::traits::{StorageError, StorageResult};

/// Normalize a relative path: strip leading slashes, collapse empty segments
/// and reject traversal.
pub fn normalize(relative_path: &str) -> StorageResult<String> {
    let mut segments = Vec::new();
    for segment in relative_path.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(StorageError::InvalidKey(format!(
                    "Path traversal is not allowed: {}",
                    relative_path
                )))
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(StorageError::InvalidKey(format!(
            "Empty storage path: '{}'",
            relative_path
        )));
    }

    Ok(segments.join("/"))
}

/// Normalize a configured prefix. An empty prefix is allowed.
pub fn normalize_prefix(prefix: &str) -> String {
    prefix
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Full backend key for a normalized relative path.
pub fn prefixed(prefix: &str, relative: &str) -> String {
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", prefix, relative)
    }
}

/// Relative path of the trash location for `relative`: `.trash/<basename>`.
pub fn trash_path(relative: &str) -> String {
    let basename = relative.rsplit('/').next().unwrap_or(relative);
    format!("{}/{}", TRASH_DIR, basename)
}

/// Trash location for a derived object: `.trash/<parent dir>/<basename>`.
/// Variants of different presets share a basename, so they keep their
/// directory name to stay apart.
pub fn nested_trash_path(relative: &str) -> String {
    let mut segments = relative.rsplit('/');
    let basename = segments.next().unwrap_or(relative);
    match segments.next() {
        Some(parent) if !parent.is_empty() => format!("{}/{}/{}", TRASH_DIR, parent, basename),
        _ => trash_path(relative),
    }
}

/// Path component of an absolute URL, or the input when it is already a path.
pub(crate) fn url_path(url: &str) -> &str {
    match url.split_once("://") {
        Some((_, rest)) => match rest.find('/') {
            Some(idx) => &rest[idx..],
            None => "/",
        },
        None => url,
    }
}
