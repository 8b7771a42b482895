//! # Image Preprocessing Module
//!
//! Turns a photographed product label into a clean binary image for OCR.
//! The chain is fixed and every step runs unconditionally:
//!
//! 1. decode and convert to single-channel grayscale
//! 2. upscale 2× with Catmull-Rom interpolation (`scaling`)
//! 3. Otsu binarization (`thresholding`)
//! 4. one dilation then one erosion with a 1×1 element (`filtering`)
//!
//! The only failure a caller should expect in practice is undecodable input,
//! reported as [`PreprocessingError::ImageLoad`].

pub mod filtering;
pub mod scaling;
pub mod thresholding;
pub mod types;

pub use types::{
    MorphologicalImageResult, MorphologicalOperation, PreprocessedImage, PreprocessingError,
    ScaledImageResult, ThresholdedImageResult,
};

pub use filtering::{apply_morphological_operations, clean_binary_image};
pub use scaling::ImageScaler;
pub use thresholding::apply_otsu_threshold;

use image::GrayImage;

/// Decode raw image bytes into grayscale.
pub fn decode_grayscale(bytes: &[u8]) -> Result<GrayImage, PreprocessingError> {
    let image = image::load_from_memory(bytes).map_err(|e| PreprocessingError::ImageLoad {
        message: e.to_string(),
    })?;
    Ok(image.to_luma8())
}

/// Run the full chain on encoded image bytes.
pub fn preprocess_label(bytes: &[u8]) -> Result<PreprocessedImage, PreprocessingError> {
    let start_time = std::time::Instant::now();

    let gray = decode_grayscale(bytes)?;
    let original_dimensions = gray.dimensions();

    let scaled = ImageScaler::new().scale(&gray)?;
    let thresholded = apply_otsu_threshold(&scaled.image)?;
    let cleaned = clean_binary_image(&thresholded.image)?;

    let processing_time = start_time.elapsed();
    let final_dimensions = cleaned.image.dimensions();

    tracing::debug!(
        target: "ocr_preprocessing",
        "Label preprocessing completed in {}ms: {}x{} -> {}x{}, threshold={}",
        processing_time.as_millis(),
        original_dimensions.0,
        original_dimensions.1,
        final_dimensions.0,
        final_dimensions.1,
        thresholded.threshold
    );

    Ok(PreprocessedImage {
        image: cleaned.image,
        original_dimensions,
        final_dimensions,
        threshold: thresholded.threshold,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}
