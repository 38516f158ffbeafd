use serde::{Deserialize, Serialize};

use crate::constants::{ORIGINAL_VARIANT, THUMBNAIL_SIZE, THUMBNAIL_VARIANT};

/// A named variant size.
///
/// Presets without a height keep the source aspect ratio at `width`; presets
/// with a height are cover-resized and centre-cropped to `width x height`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizePreset {
    pub name: String,
    pub width: u32,
    pub height: Option<u32>,
}

impl SizePreset {
    pub fn new(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height: None,
        }
    }

    /// The fixed square thumbnail preset.
    pub fn thumbnail() -> Self {
        Self {
            name: THUMBNAIL_VARIANT.to_string(),
            width: THUMBNAIL_SIZE,
            height: Some(THUMBNAIL_SIZE),
        }
    }

    pub fn is_original(&self) -> bool {
        self.name == ORIGINAL_VARIANT
    }

    /// Parse a single preset: `name:width` or `name:widthxheight`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (name, dims) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("Invalid size preset '{}': expected name:width", s))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("Invalid size preset '{}': empty name", s));
        }

        let (width, height) = match dims.split_once('x') {
            Some((w, h)) => (w, Some(h)),
            None => (dims, None),
        };
        let width: u32 = width
            .trim()
            .parse()
            .map_err(|_| format!("Invalid width in size preset '{}'", s))?;
        let height = height
            .map(|h| {
                h.trim()
                    .parse::<u32>()
                    .map_err(|_| format!("Invalid height in size preset '{}'", s))
            })
            .transpose()?;

        if width == 0 || height == Some(0) {
            return Err(format!("Size preset '{}' must have non-zero dimensions", s));
        }

        Ok(Self {
            name: name.to_string(),
            width,
            height,
        })
    }

    /// Parse a comma separated list of presets.
    pub fn parse_list(s: &str) -> Result<Vec<Self>, String> {
        s.split(',')
            .filter(|p| !p.trim().is_empty())
            .map(Self::parse)
            .collect()
    }
}
