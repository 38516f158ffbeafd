//! Content hashing, name sanitizing and image variant generation.

pub mod error;
pub mod hash;
pub mod sanitize;

#[cfg(feature = "image")]
pub mod compression;
#[cfg(feature = "image")]
pub mod metadata;
#[cfg(feature = "image")]
pub mod resize;
#[cfg(feature = "image")]
pub mod variants;

pub use error::{ProcessingError, ProcessingResult};
pub use hash::hash;
pub use sanitize::{sanitize_name, SanitizedName};

#[cfg(feature = "image")]
pub use compression::{ImageCompressor, OutputFormat};
#[cfg(feature = "image")]
pub use metadata::ImageMetadata;
#[cfg(feature = "image")]
pub use resize::ImageResize;
#[cfg(feature = "image")]
pub use variants::{variant_path, VariantGenerator, VariantSet};
