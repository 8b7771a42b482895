//! # Label Pipeline
//!
//! Orchestrates one product-label run: preprocess → recognize → filter
//! hallucinations → spell-correct → match ingredients → score. Every run is
//! a pure function of the image and the shared, read-only corpus.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, Instrument};

use crate::compatibility::{split_ingredients, FlaggedIngredient, IngredientMatcher};
use crate::corpus::ReferenceCorpus;
use crate::errors::AppResult;
use crate::hallucination::filter_hallucinations;
use crate::observability;
use crate::ocr::TextRecognizer;
use crate::pipeline_errors::PipelineError;
use crate::preprocessing::preprocess_label;
use crate::spelling::{EmptySlotPolicy, SpellingCorrector};

/// Everything a label run produced, stage by stage.
#[derive(Debug, Clone, Serialize)]
pub struct LabelReport {
    pub raw_text: String,
    pub filtered_text: String,
    pub corrected_text: String,
    /// Ingredient fields that were scored
    pub ingredients: Vec<String>,
    pub flagged: Vec<FlaggedIngredient>,
    pub compatibility_score: f64,
    pub processing_time_ms: u64,
}

/// Score of an ingredient list that did not come from OCR.
#[derive(Debug, Clone, Serialize)]
pub struct ListReport {
    pub ingredients: Vec<String>,
    pub flagged: Vec<FlaggedIngredient>,
    pub compatibility_score: f64,
}

#[derive(Clone)]
pub struct LabelPipeline {
    recognizer: Arc<dyn TextRecognizer>,
    corrector: Arc<SpellingCorrector>,
    matcher: Arc<IngredientMatcher>,
}

impl LabelPipeline {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        corrector: Arc<SpellingCorrector>,
        matcher: Arc<IngredientMatcher>,
    ) -> Self {
        Self {
            recognizer,
            corrector,
            matcher,
        }
    }

    /// Build the corrector and matcher from the corpus.
    pub fn from_corpus(
        recognizer: Arc<dyn TextRecognizer>,
        corpus: &ReferenceCorpus,
        bad_lists: &[String],
        word_lists: &[String],
        policy: EmptySlotPolicy,
    ) -> AppResult<Self> {
        let corrector = SpellingCorrector::from_corpus(corpus, word_lists, policy)?;
        let matcher = IngredientMatcher::from_corpus(corpus, bad_lists)?;
        Ok(Self::new(recognizer, Arc::new(corrector), Arc::new(matcher)))
    }

    pub fn corrector(&self) -> &SpellingCorrector {
        &self.corrector
    }

    pub fn matcher(&self) -> &IngredientMatcher {
        &self.matcher
    }

    /// Run the full chain on encoded image bytes.
    pub async fn analyze(&self, image_bytes: Vec<u8>) -> Result<LabelReport, PipelineError> {
        let span = observability::pipeline_span("label_analyze");
        let start_time = Instant::now();
        let image_size = image_bytes.len();

        let result = async {
            let preprocessed = tokio::task::spawn_blocking(move || preprocess_label(&image_bytes))
                .await
                .map_err(|e| PipelineError::Engine(format!("Preprocessing worker failed: {}", e)))??;

            let raw_text = self.recognizer.recognize(&preprocessed.image).await?;
            let filtered_text = filter_hallucinations(&raw_text);
            let corrected_text = self.correct_lines(&filtered_text);
            debug!(
                raw_chars = raw_text.len(),
                filtered_chars = filtered_text.len(),
                corrected_chars = corrected_text.len(),
                "Label text normalized"
            );

            let ingredients = split_ingredients(&corrected_text);
            let report = self.matcher.score_tokens(&ingredients)?;

            Ok(LabelReport {
                raw_text,
                filtered_text,
                corrected_text,
                ingredients,
                flagged: report.flagged,
                compatibility_score: report.score,
                processing_time_ms: start_time.elapsed().as_millis() as u64,
            })
        }
        .instrument(span)
        .await;

        let duration = start_time.elapsed();
        observability::record_pipeline_metrics("ocr", result.is_ok(), duration);

        match &result {
            Ok(report) => info!(
                image_size_bytes = image_size,
                ingredients = report.ingredients.len(),
                flagged = report.flagged.len(),
                score = report.compatibility_score,
                duration_ms = duration.as_millis() as u64,
                "Label analysis completed"
            ),
            Err(e) => crate::errors::error_logging::log_pipeline_error(
                e,
                "label_analyze",
                None,
                Some(image_size),
                Some(duration),
            ),
        }

        result
    }

    /// Score a list that is already split into ingredients, such as the LLM
    /// reader's output. Blank items are ignored.
    pub fn score_llm_list(&self, items: &[String]) -> Result<ListReport, PipelineError> {
        let start_time = Instant::now();
        let ingredients: Vec<String> = items
            .iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();

        let result = self.matcher.score_tokens(&ingredients).map(|report| ListReport {
            ingredients,
            flagged: report.flagged,
            compatibility_score: report.score,
        });
        observability::record_pipeline_metrics("llm", result.is_ok(), start_time.elapsed());
        result
    }

    /// Correct each line separately so line breaks still separate
    /// ingredients afterwards.
    fn correct_lines(&self, text: &str) -> String {
        text.lines()
            .map(|line| self.corrector.correct_text(line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::GrayImage;

    struct FixedText(&'static str);

    #[async_trait]
    impl TextRecognizer for FixedText {
        async fn recognize(&self, _image: &GrayImage) -> Result<String, PipelineError> {
            Ok(self.0.to_string())
        }
    }

    fn pipeline(text: &'static str) -> LabelPipeline {
        let mut corrector = SpellingCorrector::new(EmptySlotPolicy::Keep);
        for word in ["water", "glycerin", "fragrance", "aqua", "parfum"] {
            corrector.add_word(word);
        }
        LabelPipeline::new(
            Arc::new(FixedText(text)),
            Arc::new(corrector),
            Arc::new(IngredientMatcher::new(["fragrance", "parfum"])),
        )
    }

    fn png_bytes() -> Vec<u8> {
        let img = GrayImage::from_fn(16, 8, |x, _| image::Luma([if x < 8 { 10 } else { 240 }]));
        crate::ocr::encode_png(&img).expect("png")
    }

    #[tokio::test]
    async fn test_label_scenario_end_to_end() {
        let report = pipeline("Water, Glyce3rin, ......, m, Fragrance 5%")
            .analyze(png_bytes())
            .await
            .expect("pipeline succeeds");

        assert_eq!(report.filtered_text, "Water,  , , Fragrance 5%");
        assert_eq!(report.ingredients, vec!["Water", "Fragrance 5%"]);
        assert_eq!(report.flagged.len(), 1);
        assert!((report.compatibility_score - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_lines_stay_separate() {
        let report = pipeline("Aqua\nGlycerln\nParfum")
            .analyze(png_bytes())
            .await
            .expect("pipeline succeeds");

        assert_eq!(report.corrected_text, "Aqua\nGlycerin\nParfum");
        assert_eq!(report.ingredients.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_extraction_is_invalid_input() {
        let result = pipeline("---- ....").analyze(png_bytes()).await;
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_undecodable_image_is_io_error() {
        let result = pipeline("Water").analyze(b"not an image".to_vec()).await;
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }

    #[test]
    fn test_score_llm_list_ignores_blank_items() {
        let items: Vec<String> = ["water", " fragrance ", "", "  "]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let report = pipeline("").score_llm_list(&items).expect("two items");
        assert_eq!(report.ingredients, vec!["water", "fragrance"]);
        assert!((report.compatibility_score - 50.0).abs() < f64::EPSILON);
    }
}
