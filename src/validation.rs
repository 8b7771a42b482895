//! Validation module for request input
//!
//! Checks applied at the HTTP boundary before anything reaches the database
//! or the label pipeline:
//!
//! - entry payloads (skin condition, notes, analysis text, products)
//! - uploaded images (size and format)
//! - analytics windows and path dates

use chrono::NaiveDate;
use image::ImageFormat;
use lazy_static::lazy_static;
use regex::Regex;

use crate::db::{EntryChanges, NewEntry, ProductUsage};
use crate::errors::{error_logging, AppError, AppResult};

pub const MAX_SKIN_CONDITION_CHARS: usize = 50;
pub const MAX_NOTES_CHARS: usize = 5000;
pub const MAX_PRODUCT_NAME_CHARS: usize = 200;
pub const MAX_PRODUCTS_PER_ENTRY: usize = 50;
pub const MAX_ANALYSIS_CHARS: usize = 10_000;
pub const MAX_WINDOW_DAYS: u32 = 365;
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Formats the label pipeline and the skin-analysis provider accept
pub const SUPPORTED_FORMATS: [ImageFormat; 5] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
    ImageFormat::WebP,
];

lazy_static! {
    static ref ISO_DATE: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("Invalid ISO date regex pattern");
}

/// Log the rejection and turn it into the error the handler returns.
fn rejected(operation: &str, field: &str, value: Option<&str>, message: String) -> AppError {
    error_logging::log_validation_error(&message, operation, field, value);
    AppError::Validation(message)
}

fn check_length(
    operation: &str,
    field: &str,
    value: Option<&str>,
    max_chars: usize,
) -> AppResult<()> {
    match value {
        Some(v) if v.chars().count() > max_chars => Err(rejected(
            operation,
            field,
            Some(v),
            format!("{} must be at most {} characters", field, max_chars),
        )),
        _ => Ok(()),
    }
}

/// Product names must be non-empty after trimming and bounded in length.
pub fn validate_products(products: &[ProductUsage]) -> AppResult<()> {
    const OPERATION: &str = "validate_products";
    if products.len() > MAX_PRODUCTS_PER_ENTRY {
        return Err(rejected(
            OPERATION,
            "products",
            None,
            format!("An entry can list at most {} products", MAX_PRODUCTS_PER_ENTRY),
        ));
    }
    for product in products {
        let name = product.product_name.trim();
        if name.is_empty() {
            return Err(rejected(
                OPERATION,
                "product_name",
                Some(product.product_name.as_str()),
                "Product name cannot be empty".to_string(),
            ));
        }
        check_length(OPERATION, "product_name", Some(name), MAX_PRODUCT_NAME_CHARS)?;
    }
    Ok(())
}

pub fn validate_new_entry(entry: &NewEntry) -> AppResult<()> {
    const OPERATION: &str = "validate_new_entry";
    check_length(
        OPERATION,
        "skin_condition",
        entry.skin_condition.as_deref(),
        MAX_SKIN_CONDITION_CHARS,
    )?;
    check_length(OPERATION, "notes", entry.notes.as_deref(), MAX_NOTES_CHARS)?;
    check_length(
        OPERATION,
        "analysis_result",
        entry.analysis_result.as_deref(),
        MAX_ANALYSIS_CHARS,
    )?;
    validate_products(&entry.products)
}

pub fn validate_entry_changes(changes: &EntryChanges) -> AppResult<()> {
    const OPERATION: &str = "validate_entry_changes";
    check_length(
        OPERATION,
        "skin_condition",
        changes.skin_condition.as_deref(),
        MAX_SKIN_CONDITION_CHARS,
    )?;
    check_length(OPERATION, "notes", changes.notes.as_deref(), MAX_NOTES_CHARS)?;
    check_length(
        OPERATION,
        "analysis_result",
        changes.analysis_result.as_deref(),
        MAX_ANALYSIS_CHARS,
    )?;
    match &changes.products {
        Some(products) => validate_products(products),
        None => Ok(()),
    }
}

/// Check an upload's size and sniff its format from the leading bytes.
pub fn validate_image_upload(bytes: &[u8], max_bytes: usize) -> AppResult<ImageFormat> {
    const OPERATION: &str = "validate_image_upload";
    if bytes.is_empty() {
        return Err(rejected(
            OPERATION,
            "file",
            None,
            "Uploaded file is empty".to_string(),
        ));
    }
    if bytes.len() > max_bytes {
        return Err(rejected(
            OPERATION,
            "file",
            None,
            format!(
                "Uploaded file is {} bytes, the limit is {} bytes",
                bytes.len(),
                max_bytes
            ),
        ));
    }

    let format = image::guess_format(bytes).map_err(|_| {
        rejected(
            OPERATION,
            "file",
            None,
            "Uploaded file is not a recognized image".to_string(),
        )
    })?;
    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(rejected(
            OPERATION,
            "file",
            None,
            format!(
                "Unsupported image format {:?}; use PNG, JPEG, BMP, TIFF or WebP",
                format
            ),
        ));
    }
    Ok(format)
}

/// `None` means the default 30-day window.
pub fn validate_window_days(days: Option<u32>) -> AppResult<u32> {
    let days = days.unwrap_or(DEFAULT_WINDOW_DAYS);
    if days == 0 || days > MAX_WINDOW_DAYS {
        return Err(rejected(
            "validate_window_days",
            "days",
            Some(days.to_string().as_str()),
            format!("days must be between 1 and {}", MAX_WINDOW_DAYS),
        ));
    }
    Ok(days)
}

/// Strict `YYYY-MM-DD`.
pub fn parse_entry_date(value: &str) -> AppResult<NaiveDate> {
    let invalid = || {
        rejected(
            "parse_entry_date",
            "date",
            Some(value),
            "Invalid date format. Use YYYY-MM-DD".to_string(),
        )
    };
    if !ISO_DATE.is_match(value) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())
}
