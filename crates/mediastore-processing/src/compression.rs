use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

use crate::error::{ProcessingError, ProcessingResult};

/// Encodable variant formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
    Gif,
}

impl OutputFormat {
    pub fn parse(s: &str) -> ProcessingResult<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "avif" => Ok(OutputFormat::Avif),
            "gif" => Ok(OutputFormat::Gif),
            _ => Err(ProcessingError::UnsupportedFormat(s.to_string())),
        }
    }

    /// Configured re-encoding format. `original` means keep the source format.
    pub fn from_config(s: &str) -> ProcessingResult<Option<Self>> {
        if s.eq_ignore_ascii_case("original") {
            return Ok(None);
        }
        Self::parse(s).map(Some)
    }

    /// The format used to re-encode a decoded source, if it can be written back.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::WebP => Some(OutputFormat::WebP),
            ImageFormat::Avif => Some(OutputFormat::Avif),
            ImageFormat::Gif => Some(OutputFormat::Gif),
            _ => None,
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Avif => "image/avif",
            OutputFormat::Gif => "image/gif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Gif => "gif",
        }
    }
}

/// Main compression service
pub struct ImageCompressor;

impl ImageCompressor {
    /// Encode `img` as `format`. `quality` (1-100) applies to the lossy formats.
    pub fn encode(img: &DynamicImage, format: OutputFormat, quality: u8) -> ProcessingResult<Vec<u8>> {
        let quality = quality.clamp(1, 100);
        match format {
            OutputFormat::Jpeg => Self::compress_jpeg(img, quality),
            OutputFormat::Png => Self::write_lossless(img, ImageFormat::Png),
            OutputFormat::Gif => Self::write_lossless(img, ImageFormat::Gif),
            OutputFormat::WebP => Ok(Self::compress_webp(img, quality)),
            OutputFormat::Avif => Self::compress_avif(img, quality),
        }
    }

    fn compress_jpeg(img: &DynamicImage, quality: u8) -> ProcessingResult<Vec<u8>> {
        let rgb_img = img.to_rgb8();
        let mut buffer = Vec::new();
        rgb_img.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, quality))?;
        Ok(buffer)
    }

    fn write_lossless(img: &DynamicImage, format: ImageFormat) -> ProcessingResult<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
        rgba.write_to(&mut Cursor::new(&mut buffer), format)?;
        Ok(buffer)
    }

    fn compress_webp(img: &DynamicImage, quality: u8) -> Vec<u8> {
        let (width, height) = img.dimensions();
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(quality as f32);

        webp_data.to_vec()
    }

    fn compress_avif(img: &DynamicImage, quality: u8) -> ProcessingResult<Vec<u8>> {
        let (width, height) = img.dimensions();

        let rgb_img = img.to_rgb8();
        let rgb_data: Vec<rgb::RGB8> = rgb_img
            .as_raw()
            .chunks_exact(3)
            .map(|chunk| rgb::RGB8::new(chunk[0], chunk[1], chunk[2]))
            .collect();

        let img_buf = ravif::Img::new(rgb_data.as_slice(), width as usize, height as usize);

        let encoder = ravif::Encoder::new()
            .with_quality(quality as f32)
            .with_speed(6);

        let avif_data = encoder
            .encode_rgb(img_buf)
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;

        Ok(avif_data.avif_file)
    }
}
