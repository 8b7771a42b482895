//! # Skin Journal
//!
//! Backend for a personal skincare journal: daily entries with products and
//! photos, remote AI skin analysis, product-label compatibility scoring
//! through an OCR pipeline, and trend analytics over the journal.

pub mod analytics;
pub mod compatibility;
pub mod config;
pub mod corpus;
pub mod db;
pub mod errors;
pub mod hallucination;
pub mod label_reader;
pub mod observability;
pub mod observability_config;
pub mod ocr;
pub mod ocr_config;
pub mod path_validation;
pub mod pipeline;
pub mod pipeline_errors;
pub mod preprocessing;
pub mod server;
pub mod skin_analysis;
pub mod spelling;
pub mod validation;

// Re-export types for easier access
pub use compatibility::{FlaggedIngredient, IngredientMatcher};
pub use errors::{AppError, AppResult};
pub use pipeline::{LabelPipeline, LabelReport, ListReport};
pub use pipeline_errors::PipelineError;
