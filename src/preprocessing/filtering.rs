//! # Morphological Filtering
//!
//! Dilation and erosion over a square structuring element. Label images go
//! through one dilation followed by one erosion with a 1×1 element.

use image::GrayImage;

use super::types::{MorphologicalImageResult, MorphologicalOperation, PreprocessingError};

/// Structuring element size used for label images.
pub const LABEL_KERNEL_SIZE: u32 = 1;

/// Apply `operations` in order with a `kernel_size`×`kernel_size` element.
///
/// Border pixels only consider neighbours inside the image.
pub fn apply_morphological_operations(
    image: &GrayImage,
    operations: &[MorphologicalOperation],
    kernel_size: u32,
) -> Result<MorphologicalImageResult, PreprocessingError> {
    if kernel_size == 0 || kernel_size % 2 == 0 {
        return Err(PreprocessingError::InvalidKernelSize { size: kernel_size });
    }
    let start_time = std::time::Instant::now();
    let radius = kernel_size / 2;

    let mut current = image.clone();
    for operation in operations {
        current = match operation {
            MorphologicalOperation::Dilation => neighbourhood_extreme(&current, radius, u8::max, 0),
            MorphologicalOperation::Erosion => {
                neighbourhood_extreme(&current, radius, u8::min, u8::MAX)
            }
        };
    }

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "ocr_preprocessing",
        "Morphological operations completed in {}ms: operations={:?}, kernel={}x{}",
        processing_time.as_millis(),
        operations,
        kernel_size,
        kernel_size
    );

    Ok(MorphologicalImageResult {
        image: current,
        operations: operations.to_vec(),
        kernel_size,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

/// One dilation, then one erosion, with the label element.
pub fn clean_binary_image(image: &GrayImage) -> Result<MorphologicalImageResult, PreprocessingError> {
    apply_morphological_operations(
        image,
        &[MorphologicalOperation::Dilation, MorphologicalOperation::Erosion],
        LABEL_KERNEL_SIZE,
    )
}

fn neighbourhood_extreme(
    image: &GrayImage,
    radius: u32,
    pick: fn(u8, u8) -> u8,
    initial: u8,
) -> GrayImage {
    if radius == 0 {
        return image.clone();
    }
    let (width, height) = image.dimensions();

    GrayImage::from_fn(width, height, |x, y| {
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius).min(width - 1);
        let y1 = (y + radius).min(height - 1);

        let mut value = initial;
        for ny in y0..=y1 {
            for nx in x0..=x1 {
                value = pick(value, image.get_pixel(nx, ny)[0]);
            }
        }
        image::Luma([value])
    })
}
