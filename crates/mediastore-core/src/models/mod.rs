//! Data models for the media engine
//!
//! `media` holds the persisted record and its nested types, `access` the
//! access-control entries, and `preset` the configured variant sizes.

mod access;
mod media;
mod preset;

pub use access::*;
pub use media::*;
pub use preset::*;
