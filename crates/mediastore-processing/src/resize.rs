use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use mediastore_core::SizePreset;

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Output dimensions for `preset`.
    ///
    /// Width-only presets keep the aspect ratio; presets with a height produce
    /// exactly `width x height`.
    pub fn calculate_dimensions(orig_width: u32, orig_height: u32, preset: &SizePreset) -> (u32, u32) {
        match preset.height {
            Some(h) => (preset.width, h),
            None => {
                let aspect_ratio = orig_height as f64 / orig_width.max(1) as f64;
                let h = (preset.width as f64 * aspect_ratio).round() as u32;
                (preset.width, h.max(1))
            }
        }
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(orig_width: u32, orig_height: u32, new_width: u32, new_height: u32) -> FilterType {
        let width_ratio = orig_width as f32 / new_width.max(1) as f32;
        let height_ratio = orig_height as f32 / new_height.max(1) as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Resize `img` for `preset`. Fixed-height presets are scaled to cover the
    /// box and cropped around the centre. Upscaling is allowed.
    pub fn fit(img: &DynamicImage, preset: &SizePreset) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (width, height) = Self::calculate_dimensions(orig_width, orig_height, preset);
        let filter = Self::select_filter(orig_width, orig_height, width, height);

        match preset.height {
            Some(_) => img.resize_to_fill(width, height, filter),
            None => img.resize_exact(width, height, filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn test_width_only_keeps_aspect_ratio() {
        assert_eq!(
            ImageResize::calculate_dimensions(2000, 1000, &SizePreset::new("sm", 600)),
            (600, 300)
        );
        assert_eq!(
            ImageResize::calculate_dimensions(1000, 3000, &SizePreset::new("sm", 100)),
            (100, 300)
        );
    }

    #[test]
    fn test_tiny_height_never_zero() {
        assert_eq!(
            ImageResize::calculate_dimensions(5000, 1, &SizePreset::new("sm", 10)),
            (10, 1)
        );
    }

    #[test]
    fn test_fit_cover_crops_to_box() {
        let resized = ImageResize::fit(&solid(400, 100), &SizePreset::thumbnail());
        assert_eq!(resized.dimensions(), (200, 200));
    }

    #[test]
    fn test_fit_upscales() {
        let resized = ImageResize::fit(&solid(50, 25), &SizePreset::new("lg", 1200));
        assert_eq!(resized.dimensions(), (1200, 600));
    }

    #[test]
    fn test_select_filter() {
        assert_eq!(ImageResize::select_filter(1000, 1000, 400, 400), FilterType::Triangle);
        assert_eq!(ImageResize::select_filter(1000, 1000, 600, 600), FilterType::CatmullRom);
        assert_eq!(ImageResize::select_filter(1000, 1000, 900, 900), FilterType::Lanczos3);
    }
}
