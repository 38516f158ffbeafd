//! Image metadata extraction

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;

use crate::error::{ProcessingError, ProcessingResult};

/// Dimensions and detected container format of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Option<ImageFormat>,
}

impl ImageMetadata {
    /// Read dimensions from the header without decoding pixels.
    pub fn read(data: &[u8]) -> ProcessingResult<Self> {
        let reader = guessed_reader(data)?;
        let format = reader.format();
        let (width, height) = reader.into_dimensions()?;
        Ok(Self {
            width,
            height,
            format,
        })
    }
}

/// Decode `data` once, returning the pixels and their metadata.
pub fn decode(data: &[u8]) -> ProcessingResult<(DynamicImage, ImageMetadata)> {
    let reader = guessed_reader(data)?;
    let format = reader.format();
    let img = reader.decode()?;
    let (width, height) = img.dimensions();
    Ok((
        img,
        ImageMetadata {
            width,
            height,
            format,
        },
    ))
}

fn guessed_reader(data: &[u8]) -> ProcessingResult<ImageReader<Cursor<&[u8]>>> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ProcessingError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 20, 30])));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_read_dimensions_and_format() {
        let metadata = ImageMetadata::read(&png_bytes(40, 25)).unwrap();
        assert_eq!((metadata.width, metadata.height), (40, 25));
        assert_eq!(metadata.format, Some(ImageFormat::Png));
    }

    #[test]
    fn test_decode_matches_read() {
        let bytes = png_bytes(12, 7);
        let (img, metadata) = decode(&bytes).unwrap();
        assert_eq!(img.dimensions(), (12, 7));
        assert_eq!(metadata, ImageMetadata::read(&bytes).unwrap());
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        assert!(matches!(
            decode(b"definitely not an image"),
            Err(ProcessingError::Decode(_))
        ));
    }
}
