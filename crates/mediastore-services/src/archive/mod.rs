//! Bulk download archives.
//!
//! `tar` is the pure header encoder; `exporter` reads stored objects
//! sequentially into a temporary `.tar`, gzips it and hands out a
//! self-cleaning byte stream.

mod exporter;
pub mod tar;

pub use exporter::{ArchiveExporter, ArchiveStream, ExportedArchive, CONTENT_TYPE};
pub use tar::TarError;
