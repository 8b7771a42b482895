//! End-to-end label pipeline tests over a corpus directory, with a fake
//! recognizer standing in for Tesseract.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use skin_journal::compatibility::IngredientMatcher;
use skin_journal::config::PipelineConfig;
use skin_journal::corpus::ReferenceCorpus;
use skin_journal::hallucination::filter_hallucinations;
use skin_journal::pipeline::LabelPipeline;
use skin_journal::pipeline_errors::PipelineError;
use skin_journal::spelling::{EmptySlotPolicy, SpellingCorrector};
use tempfile::TempDir;

use test_helpers::{fixed_text_pipeline, label_png, write_test_corpus, FixedTextRecognizer};

fn shipped_corpus_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data/ingredients")
}

/// Pipeline over the corpus that ships with the crate, using the default
/// list names.
fn shipped_pipeline(text: &str) -> LabelPipeline {
    let config = PipelineConfig::default();
    let corpus = ReferenceCorpus::load_dir(&shipped_corpus_dir()).unwrap();
    LabelPipeline::from_corpus(
        Arc::new(FixedTextRecognizer(text.to_string())),
        &corpus,
        &config.bad_lists,
        &config.word_lists(),
        config.empty_slots,
    )
    .unwrap()
}

#[test]
fn test_corpus_directory_loading() {
    let dir = TempDir::new().unwrap();
    write_test_corpus(dir.path());

    let corpus = ReferenceCorpus::load_dir(dir.path()).unwrap();
    let mut names = corpus.names();
    names.sort_unstable();
    assert_eq!(
        names,
        vec!["drying_skin", "english_words", "ingredient_words", "pore_clogging"]
    );

    let drying = corpus.list("drying_skin").unwrap();
    assert_eq!(drying.len(), 3);
    assert!(drying.contains("alcohol denat"));
    assert!(corpus.require("sun_damage").is_err());
}

#[test]
fn test_missing_corpus_directory_is_config_error() {
    let dir = TempDir::new().unwrap();
    let result = ReferenceCorpus::load_dir(&dir.path().join("nope"));
    assert!(matches!(result, Err(skin_journal::AppError::Config(_))));
}

#[test]
fn test_shipped_corpus_has_required_lists() {
    let corpus = ReferenceCorpus::load_dir(&shipped_corpus_dir()).unwrap();
    for name in ["drying_skin", "pore_clogging", "ingredient_words", "english_words"] {
        let list = corpus.require(name).unwrap();
        assert!(!list.is_empty(), "{} should not be empty", name);
    }
}

#[tokio::test]
async fn test_shipped_corpus_keeps_real_label_intact() {
    let label = "Aqua, Butyrospermum Parkii Butter, Caprylic/Capric Triglyceride, \
                 Sodium Benzoate, Limonene";
    let report = shipped_pipeline(label).analyze(label_png()).await.unwrap();

    assert_eq!(report.corrected_text, label);
    assert_eq!(
        report.ingredients,
        vec![
            "Aqua",
            "Butyrospermum Parkii Butter",
            "Caprylic/Capric Triglyceride",
            "Sodium Benzoate",
            "Limonene"
        ]
    );
    assert!(report.flagged.is_empty());
}

#[tokio::test]
async fn test_shipped_corpus_repairs_ocr_typos() {
    let report = shipped_pipeline(
        "Aqua, Glycerln, Cetearyl Alcohol, Isopropyl Myristat, Sodium Benzoaet, Trigylceride, Parfum",
    )
    .analyze(label_png())
    .await
    .unwrap();

    assert_eq!(
        report.ingredients,
        vec![
            "Aqua",
            "Glycerin",
            "Cetearyl Alcohol",
            "Isopropyl Myristate",
            "Sodium Benzoate",
            "Triglyceride",
            "Parfum"
        ]
    );
    let flagged: Vec<_> = report.flagged.iter().map(|f| f.token.as_str()).collect();
    assert_eq!(flagged, vec!["Isopropyl Myristate", "Parfum"]);
}

#[tokio::test]
async fn test_noisy_label_scores_against_corpus() {
    let dir = TempDir::new().unwrap();
    let pipeline = fixed_text_pipeline(
        dir.path(),
        "Aqua, Glycerln, ~~~~, Coconut Oil, x, Fragrance 4b\nNiacinamide",
    );

    let report = pipeline.analyze(label_png()).await.unwrap();

    assert!(!report.filtered_text.contains("~~~~"));
    assert_eq!(
        report.ingredients,
        vec!["Aqua", "Glycerin", "Coconut Oil", "Fragrance", "Niacinamide"]
    );
    let flagged: Vec<_> = report.flagged.iter().map(|f| f.token.as_str()).collect();
    assert_eq!(flagged, vec!["Coconut Oil", "Fragrance"]);
    assert!((report.compatibility_score - 60.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_clean_label_scores_full_marks() {
    let dir = TempDir::new().unwrap();
    let pipeline = fixed_text_pipeline(dir.path(), "Water, Glycerin, Niacinamide");

    let report = pipeline.analyze(label_png()).await.unwrap();
    assert!(report.flagged.is_empty());
    assert!((report.compatibility_score - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_unreadable_label_is_invalid_input() {
    let dir = TempDir::new().unwrap();
    let pipeline = fixed_text_pipeline(dir.path(), "|||| .... ////");

    let result = pipeline.analyze(label_png()).await;
    assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
}

#[tokio::test]
async fn test_non_image_upload_is_io_error() {
    let dir = TempDir::new().unwrap();
    let pipeline = fixed_text_pipeline(dir.path(), "Water");

    let result = pipeline.analyze(b"%PDF-1.4".to_vec()).await;
    assert!(matches!(result, Err(PipelineError::Io(_))));
}

#[test]
fn test_llm_list_uses_same_matcher() {
    let dir = TempDir::new().unwrap();
    let pipeline = fixed_text_pipeline(dir.path(), "");

    let items: Vec<String> = ["water", "isopropyl myristate", "menthol", "glycerin"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let report = pipeline.score_llm_list(&items).unwrap();
    assert_eq!(report.flagged.len(), 2);
    assert!((report.compatibility_score - 50.0).abs() < f64::EPSILON);

    assert!(matches!(
        pipeline.score_llm_list(&[" ".to_string()]),
        Err(PipelineError::InvalidInput(_))
    ));
}

#[test]
fn test_filter_then_correct_keeps_percentages() {
    let mut corrector = SpellingCorrector::new(EmptySlotPolicy::Compact);
    corrector.add_word("niacinamide");

    let filtered = filter_hallucinations("Niacinamid 10% a2b ....");
    let corrected = corrector.correct_text(&filtered);
    assert!(corrected.contains("10%"));
    assert!(corrected.to_lowercase().contains("niacinamide"));
    assert!(!corrected.contains("a2b"));
}

#[test]
fn test_substring_matching_is_case_insensitive() {
    let matcher = IngredientMatcher::new(["alcohol denat"]);
    let report = matcher
        .score_text("Water, SD ALCOHOL DENAT. 40-B, Glycerin, Aloe")
        .unwrap();
    assert_eq!(report.bad_count(), 1);
    assert!((report.score - 75.0).abs() < f64::EPSILON);
}
