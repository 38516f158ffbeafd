use crate::error::{ProcessingError, ProcessingResult};

/// A filesystem and URL safe split of an uploaded filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedName {
    pub base: String,
    /// Lower-cased, without the dot. Empty when the name had none.
    pub ext: String,
}

impl SanitizedName {
    /// `<base>-<hash>.<ext>`, or `<base>-<hash>` without an extension.
    pub fn with_hash(&self, hash: &str) -> String {
        join_name(&self.base, hash, &self.ext)
    }
}

pub(crate) fn join_name(base: &str, hash: &str, ext: &str) -> String {
    if ext.is_empty() {
        format!("{}-{}", base, hash)
    } else {
        format!("{}-{}.{}", base, hash, ext)
    }
}

/// Split `filename` on its last dot and clean both halves.
///
/// Runs of characters outside `[A-Za-z0-9_-]` in the base collapse to a single
/// `-`; the result is trimmed of `-` and lower-cased. A base that ends up empty
/// becomes `file`. Only an empty name is rejected.
pub fn sanitize_name(filename: &str) -> ProcessingResult<SanitizedName> {
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(ProcessingError::InvalidArgument(
            "filename must not be empty".to_string(),
        ));
    }

    let (raw_base, raw_ext) = match filename.rsplit_once('.') {
        Some((base, ext)) => (base, ext),
        None => (filename, ""),
    };

    let mut base = String::with_capacity(raw_base.len());
    let mut pending_dash = false;
    for c in raw_base.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            if pending_dash {
                base.push('-');
                pending_dash = false;
            }
            base.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    let base = base.trim_matches('-');
    let base = if base.is_empty() { "file" } else { base };

    let ext: String = raw_ext
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    Ok(SanitizedName {
        base: base.to_string(),
        ext,
    })
}
