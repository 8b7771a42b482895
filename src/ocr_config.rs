//! # OCR Configuration Module
//!
//! Settings for the Tesseract text recognizer. Label photos are read with a
//! general English model and no custom vocabulary.

use crate::errors::{AppError, AppResult};

pub const DEFAULT_LANGUAGES: &str = "eng";
/// Ceiling for one recognition call, shared with the remote services.
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 60;

/// Tesseract page segmentation modes (`tessedit_pageseg_mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSegMode {
    AutoNoOsd = 2,
    /// Fully automatic page segmentation, Tesseract's own default.
    #[default]
    Auto = 3,
    SingleColumn = 4,
    SingleBlock = 6,
    SingleLine = 7,
    SparseText = 11,
}

impl PageSegMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::AutoNoOsd => "2",
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleLine => "7",
            PageSegMode::SparseText => "11",
        }
    }

    /// Parse the numeric Tesseract mode.
    pub fn from_number(value: &str) -> Option<Self> {
        match value.trim() {
            "2" => Some(PageSegMode::AutoNoOsd),
            "3" => Some(PageSegMode::Auto),
            "4" => Some(PageSegMode::SingleColumn),
            "6" => Some(PageSegMode::SingleBlock),
            "7" => Some(PageSegMode::SingleLine),
            "11" => Some(PageSegMode::SparseText),
            _ => None,
        }
    }
}

/// Which trained data set Tesseract loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelType {
    /// Default installation data
    #[default]
    Standard,
    /// `tessdata_fast` integer models
    Fast,
    /// `tessdata_best` float models
    Best,
}

impl ModelType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "standard" | "default" => Some(ModelType::Standard),
            "fast" => Some(ModelType::Fast),
            "best" => Some(ModelType::Best),
            _ => None,
        }
    }

    /// Common install locations for this model family, most specific first.
    pub fn search_paths(&self) -> &'static [&'static str] {
        match self {
            ModelType::Standard => &[],
            ModelType::Fast => &[
                "/usr/share/tesseract-ocr/5/tessdata_fast",
                "/usr/share/tessdata_fast",
                "/usr/local/share/tessdata_fast",
            ],
            ModelType::Best => &[
                "/usr/share/tesseract-ocr/5/tessdata_best",
                "/usr/share/tessdata_best",
                "/usr/local/share/tessdata_best",
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Tesseract language codes joined with `+`
    pub languages: String,
    pub model_type: ModelType,
    pub psm_mode: PageSegMode,
    /// Explicit tessdata directory; overrides the model search paths
    pub tessdata_path: Option<String>,
    pub operation_timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: DEFAULT_LANGUAGES.to_string(),
            model_type: ModelType::default(),
            psm_mode: PageSegMode::default(),
            tessdata_path: None,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        }
    }
}

impl OcrConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.languages.trim().is_empty() {
            return Err(AppError::Config("languages cannot be empty".to_string()));
        }
        if self
            .languages
            .split('+')
            .any(|lang| lang.is_empty() || !lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        {
            return Err(AppError::Config(format!(
                "languages '{}' must be Tesseract codes joined with '+'",
                self.languages
            )));
        }
        if self.operation_timeout_secs == 0 {
            return Err(AppError::Config(
                "operation_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if let Some(path) = &self.tessdata_path {
            if path.trim().is_empty() {
                return Err(AppError::Config(
                    "tessdata_path cannot be empty when set".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Directory handed to Tesseract, or `None` for its compiled-in default.
    pub fn resolve_tessdata_path(&self) -> Option<String> {
        if let Some(path) = &self.tessdata_path {
            return Some(path.clone());
        }
        self.model_type
            .search_paths()
            .iter()
            .find(|path| std::path::Path::new(path).exists())
            .map(|path| path.to_string())
    }
}
