//! # Shared Types for Image Preprocessing
//!
//! Result structs and the error type used across the preprocessing
//! sub-modules.

use image::GrayImage;

use crate::pipeline_errors::PipelineError;

/// Errors that can occur during image preprocessing operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessingError {
    /// Failed to load or decode image
    ImageLoad { message: String },
    /// Image decoded but has no pixels
    EmptyImage { width: u32, height: u32 },
    /// Structuring element must have an odd, non-zero size
    InvalidKernelSize { size: u32 },
    /// Image processing operation failed
    ProcessingFailed { message: String },
}

impl std::fmt::Display for PreprocessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessingError::ImageLoad { message } => {
                write!(f, "Failed to load image: {}", message)
            }
            PreprocessingError::EmptyImage { width, height } => {
                write!(f, "Image has no pixels ({}x{})", width, height)
            }
            PreprocessingError::InvalidKernelSize { size } => {
                write!(f, "Invalid structuring element size: {}. Must be odd", size)
            }
            PreprocessingError::ProcessingFailed { message } => {
                write!(f, "Image processing failed: {}", message)
            }
        }
    }
}

impl std::error::Error for PreprocessingError {}

impl From<PreprocessingError> for PipelineError {
    fn from(err: PreprocessingError) -> Self {
        match err {
            PreprocessingError::ImageLoad { .. } | PreprocessingError::EmptyImage { .. } => {
                PipelineError::Io(err.to_string())
            }
            PreprocessingError::InvalidKernelSize { .. }
            | PreprocessingError::ProcessingFailed { .. } => PipelineError::Engine(err.to_string()),
        }
    }
}

/// Result of the upscaling step.
#[derive(Debug, Clone)]
pub struct ScaledImageResult {
    pub image: GrayImage,
    /// Original image dimensions (width, height)
    pub original_dimensions: (u32, u32),
    /// New image dimensions (width, height)
    pub new_dimensions: (u32, u32),
    pub scale_factor: u32,
    pub processing_time_ms: u32,
}

/// Result of image thresholding operation.
#[derive(Debug, Clone)]
pub struct ThresholdedImageResult {
    /// The thresholded binary image
    pub image: GrayImage,
    /// Optimal threshold value found by Otsu's method
    pub threshold: u8,
    pub processing_time_ms: u32,
}

/// Result of morphological operations on binary images.
#[derive(Debug, Clone)]
pub struct MorphologicalImageResult {
    pub image: GrayImage,
    /// Operations applied, in order
    pub operations: Vec<MorphologicalOperation>,
    /// Side length of the square structuring element
    pub kernel_size: u32,
    pub processing_time_ms: u32,
}

/// Types of morphological operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphologicalOperation {
    /// Expands bright regions
    Dilation,
    /// Shrinks bright regions
    Erosion,
}

/// Output of the full preprocessing chain, ready for OCR.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    pub image: GrayImage,
    /// Dimensions of the decoded input
    pub original_dimensions: (u32, u32),
    /// Dimensions handed to the OCR engine
    pub final_dimensions: (u32, u32),
    /// Otsu threshold used for binarization
    pub threshold: u8,
    /// Total processing time in milliseconds
    pub processing_time_ms: u32,
}
