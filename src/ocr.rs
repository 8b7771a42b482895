//! # OCR Processing Module
//!
//! Text recognition behind the [`TextRecognizer`] capability. The production
//! implementation wraps a single Tesseract engine (via `leptess`); tests and
//! alternative engines plug in through the same trait.
//!
//! Recognition is best effort: the engine returns whatever text it sees and
//! the hallucination filter downstream removes what it invents. This module
//! never retries.

use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use image::GrayImage;
use leptess::LepTess;
use parking_lot::Mutex;
use tracing::{info, warn, Instrument};

use crate::observability;
use crate::ocr_config::OcrConfig;
use crate::pipeline_errors::PipelineError;

/// Given a preprocessed image, return the text it contains.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &GrayImage) -> Result<String, PipelineError>;
}

/// Tesseract-backed recognizer holding one engine instance.
///
/// Calls are serialized on the engine mutex and run on tokio's blocking
/// pool, bounded by the configured operation timeout. A call only waits for
/// the engine until its own deadline: when an earlier, timed-out call still
/// holds the engine, later calls give up instead of queueing behind it.
pub struct TesseractRecognizer {
    engine: Arc<Mutex<LepTess>>,
    timeout: Duration,
}

impl TesseractRecognizer {
    /// Initialize the engine for `config.languages`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Engine`] when Tesseract cannot load the trained data
    /// or rejects the page segmentation mode.
    pub fn new(config: &OcrConfig) -> Result<Self, PipelineError> {
        let tessdata_path = config.resolve_tessdata_path();
        info!(
            languages = %config.languages,
            tessdata = ?tessdata_path,
            psm = config.psm_mode.as_str(),
            "Initializing Tesseract OCR engine"
        );

        let mut tess = LepTess::new(tessdata_path.as_deref(), &config.languages).map_err(|e| {
            PipelineError::Engine(format!("Failed to initialize Tesseract OCR instance: {}", e))
        })?;

        tess.set_variable(
            leptess::Variable::TesseditPagesegMode,
            config.psm_mode.as_str(),
        )
        .map_err(|e| PipelineError::Engine(format!("Failed to set PSM mode: {}", e)))?;

        Ok(Self {
            engine: Arc::new(Mutex::new(tess)),
            timeout: Duration::from_secs(config.operation_timeout_secs),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, image: &GrayImage) -> Result<String, PipelineError> {
        let span = observability::pipeline_span("ocr_recognize");
        let start_time = Instant::now();
        let timeout = self.timeout;

        let result = async {
            let png = encode_png(image)?;
            let engine = Arc::clone(&self.engine);

            let task = tokio::task::spawn_blocking(move || {
                with_engine_until(&engine, start_time, timeout, |tess| {
                    tess.set_image_from_mem(&png).map_err(|e| {
                        PipelineError::Engine(format!("Failed to load image for OCR: {}", e))
                    })?;
                    tess.get_utf8_text().map_err(|e| {
                        PipelineError::Engine(format!("Failed to extract text from image: {}", e))
                    })
                })
            });

            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(inner)) => inner.map(|text| clean_extracted_text(&text)),
                Ok(Err(join_error)) => Err(PipelineError::Engine(format!(
                    "OCR worker stopped unexpectedly: {}",
                    join_error
                ))),
                Err(_) => Err(ocr_timeout(timeout)),
            }
        }
        .instrument(span)
        .await;

        let duration = start_time.elapsed();
        observability::record_ocr_metrics(result.is_ok(), duration);

        match &result {
            Ok(text) => info!(
                duration_ms = duration.as_millis() as u64,
                characters = text.len(),
                "OCR processing completed"
            ),
            Err(e) => warn!(
                duration_ms = duration.as_millis() as u64,
                error = %e,
                "OCR processing failed"
            ),
        }

        result
    }
}

fn ocr_timeout(timeout: Duration) -> PipelineError {
    PipelineError::Timeout {
        service: "ocr".to_string(),
        seconds: timeout.as_secs(),
    }
}

/// Run `work` on the engine if the lock is free before
/// `started + timeout`. A call that gave up waiting never touches the
/// engine.
fn with_engine_until<E, T>(
    engine: &Mutex<E>,
    started: Instant,
    timeout: Duration,
    work: impl FnOnce(&mut E) -> Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    let remaining = timeout.saturating_sub(started.elapsed());
    match engine.try_lock_for(remaining) {
        Some(mut guard) => work(&mut guard),
        None => {
            warn!(
                waited_ms = remaining.as_millis() as u64,
                "OCR engine still busy at deadline, skipping recognition"
            );
            Err(ocr_timeout(timeout))
        }
    }
}

/// Encode a grayscale image as PNG for handing to Leptonica.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, PipelineError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}

/// Trim every line and drop blank ones. Line breaks are kept since labels
/// often put one ingredient per line.
pub fn clean_extracted_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}
