use mediastore_core::constants::HASH_LENGTH;
use sha2::{Digest, Sha256};

use crate::error::{ProcessingError, ProcessingResult};

/// Content hash of `bytes`: the first 32 hex characters of its SHA-256 digest.
pub fn hash(bytes: &[u8]) -> ProcessingResult<String> {
    if bytes.is_empty() {
        return Err(ProcessingError::EmptyInput);
    }
    let mut digest = hex::encode(Sha256::digest(bytes));
    digest.truncate(HASH_LENGTH);
    Ok(digest)
}
