//! # Image Scaling
//!
//! Label text is usually photographed small, and Tesseract reads glyphs far
//! better once they are a couple of dozen pixels tall. Every label image is
//! therefore upscaled by a fixed factor with cubic interpolation.

use image::imageops::FilterType;
use image::GrayImage;

use super::types::{PreprocessingError, ScaledImageResult};

/// Fixed upscale factor applied in both dimensions.
pub const UPSCALE_FACTOR: u32 = 2;

/// Upscales grayscale images with Catmull-Rom interpolation.
#[derive(Debug, Clone, Copy)]
pub struct ImageScaler {
    factor: u32,
}

impl ImageScaler {
    /// Scaler using [`UPSCALE_FACTOR`].
    ///
    /// # Examples
    ///
    /// ```
    /// use skin_journal::preprocessing::ImageScaler;
    ///
    /// assert_eq!(ImageScaler::new().factor(), 2);
    /// ```
    pub fn new() -> Self {
        Self {
            factor: UPSCALE_FACTOR,
        }
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }

    pub fn scale(&self, image: &GrayImage) -> Result<ScaledImageResult, PreprocessingError> {
        let start_time = std::time::Instant::now();
        let (width, height) = image.dimensions();

        if width == 0 || height == 0 {
            return Err(PreprocessingError::EmptyImage { width, height });
        }

        let new_width = width.checked_mul(self.factor).ok_or_else(|| {
            PreprocessingError::ProcessingFailed {
                message: format!("Scaled width overflows for {}px", width),
            }
        })?;
        let new_height = height.checked_mul(self.factor).ok_or_else(|| {
            PreprocessingError::ProcessingFailed {
                message: format!("Scaled height overflows for {}px", height),
            }
        })?;

        let scaled = image::imageops::resize(image, new_width, new_height, FilterType::CatmullRom);
        let processing_time = start_time.elapsed();

        tracing::debug!(
            target: "ocr_preprocessing",
            "Upscaling completed in {}ms: {}x{} -> {}x{}",
            processing_time.as_millis(),
            width,
            height,
            new_width,
            new_height
        );

        Ok(ScaledImageResult {
            image: scaled,
            original_dimensions: (width, height),
            new_dimensions: (new_width, new_height),
            scale_factor: self.factor,
            processing_time_ms: processing_time.as_millis() as u32,
        })
    }
}

impl Default for ImageScaler {
    fn default() -> Self {
        Self::new()
    }
}
