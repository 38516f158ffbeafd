//! Resized variants of an original image, saved through a storage backend.

use image::{DynamicImage, GenericImageView};
use mediastore_core::{ImageConfig, SizePreset, Variant};
use mediastore_storage::Storage;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::compression::{ImageCompressor, OutputFormat};
use crate::error::{ProcessingError, ProcessingResult};
use crate::metadata::{self, ImageMetadata};
use crate::resize::ImageResize;
use crate::sanitize::join_name;

/// Result of one generation run.
#[derive(Debug, Clone)]
pub struct VariantSet {
    /// Metadata of the source image.
    pub source: ImageMetadata,
    pub variants: BTreeMap<String, Variant>,
}

pub struct VariantGenerator {
    storage: Arc<dyn Storage>,
    /// `None` keeps the source format.
    output_format: Option<OutputFormat>,
    quality: u8,
}

struct Rendered {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl VariantGenerator {
    pub fn new(storage: Arc<dyn Storage>, output_format: Option<OutputFormat>, quality: u8) -> Self {
        Self {
            storage,
            output_format,
            quality,
        }
    }

    pub fn from_config(storage: Arc<dyn Storage>, config: &ImageConfig) -> ProcessingResult<Self> {
        let output_format = OutputFormat::from_config(&config.output_format)?;
        Ok(Self::new(storage, output_format, config.quality))
    }

    /// Produce every preset plus the thumbnail for `bytes`.
    ///
    /// The source is decoded once; a decode failure fails the whole call.
    /// A preset that fails to render or save is logged and left out.
    #[tracing::instrument(skip(self, bytes, presets))]
    pub async fn generate(
        &self,
        bytes: &[u8],
        hash: &str,
        base_name: &str,
        ext: &str,
        base_path: &str,
        presets: &[SizePreset],
    ) -> ProcessingResult<VariantSet> {
        let owned = bytes.to_vec();
        let (img, source) = tokio::task::spawn_blocking(move || metadata::decode(&owned))
            .await
            .map_err(|e| ProcessingError::Decode(format!("decode task failed: {}", e)))??;
        let img = Arc::new(img);

        let (format, ext) = self.target_format(source, ext);
        let filename = join_name(base_name, hash, ext);

        let thumbnail = SizePreset::thumbnail();
        let mut variants = BTreeMap::new();
        for preset in presets
            .iter()
            .filter(|p| !p.is_original() && p.name != thumbnail.name)
            .chain(std::iter::once(&thumbnail))
        {
            let start = Instant::now();
            match self.render_and_save(&img, preset, format, base_path, &filename).await {
                Ok(variant) => {
                    tracing::info!(
                        preset = %preset.name,
                        width = variant.width,
                        height = variant.height,
                        size_bytes = variant.size,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "Variant generated"
                    );
                    variants.insert(preset.name.clone(), variant);
                }
                Err(e) => {
                    tracing::warn!(
                        preset = %preset.name,
                        error = %e,
                        "Skipping variant"
                    );
                }
            }
        }

        Ok(VariantSet { source, variants })
    }

    fn target_format<'a>(&self, source: ImageMetadata, source_ext: &'a str) -> (OutputFormat, &'a str) {
        if let Some(format) = self.output_format {
            return (format, format.extension());
        }
        match source.format.and_then(OutputFormat::from_image_format) {
            Some(format) if !source_ext.is_empty() => (format, source_ext),
            Some(format) => (format, format.extension()),
            None => (OutputFormat::Png, OutputFormat::Png.extension()),
        }
    }

    async fn render_and_save(
        &self,
        img: &Arc<DynamicImage>,
        preset: &SizePreset,
        format: OutputFormat,
        base_path: &str,
        filename: &str,
    ) -> ProcessingResult<Variant> {
        let img = Arc::clone(img);
        let task_preset = preset.clone();
        let quality = self.quality;
        let rendered = tokio::task::spawn_blocking(move || -> ProcessingResult<Rendered> {
            let resized = ImageResize::fit(&img, &task_preset);
            let (width, height) = resized.dimensions();
            let data = ImageCompressor::encode(&resized, format, quality)?;
            Ok(Rendered {
                data,
                width,
                height,
            })
        })
        .await
        .map_err(|e| ProcessingError::Encode(format!("resize task failed: {}", e)))??;

        let path = variant_path(base_path, &preset.name, filename);
        let url = self.storage.save(&rendered.data, &path).await?;

        Ok(Variant {
            url,
            width: rendered.width,
            height: rendered.height,
            size: rendered.data.len() as u64,
            mime_type: format.to_mime_type().to_string(),
        })
    }
}

/// `<basePath>/<preset>/<filename>`
pub fn variant_path(base_path: &str, preset: &str, filename: &str) -> String {
    let base_path = base_path.trim_matches('/');
    if base_path.is_empty() {
        format!("{}/{}", preset, filename)
    } else {
        format!("{}/{}/{}", base_path, preset, filename)
    }
}
