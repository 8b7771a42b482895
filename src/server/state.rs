use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::label_reader::LabelReader;
use crate::pipeline::LabelPipeline;
use crate::skin_analysis::SkinAnalyzer;

/// Shared, read-only handles every handler needs.
#[derive(Clone)]
pub struct ServerState {
    pub pool: PgPool,
    pub pipeline: LabelPipeline,
    pub skin_analyzer: Option<Arc<dyn SkinAnalyzer>>,
    pub label_reader: Option<Arc<dyn LabelReader>>,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_origin: String,
    /// Pins "today" for analytics; `None` uses the local calendar date.
    pub fixed_today: Option<NaiveDate>,
}

impl ServerState {
    pub fn today(&self) -> NaiveDate {
        self.fixed_today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}
