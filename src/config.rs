//! # Unified Application Configuration
//!
//! All service settings in one structured object, loaded from environment
//! variables (after `dotenvy` has read `.env`) and validated once at startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use crate::ocr_config::{ModelType, OcrConfig, PageSegMode};
use crate::spelling::EmptySlotPolicy;

/// Database configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Minimum number of idle connections
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            connect_timeout_secs: 30,
            min_connections: 1,
        }
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.url.trim().is_empty() {
            return Err(AppError::Config("Database URL cannot be empty".to_string()));
        }
        if !self.url.starts_with("postgresql://") && !self.url.starts_with("postgres://") {
            return Err(AppError::Config(
                "Database URL must start with 'postgresql://' or 'postgres://'".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(AppError::Config("Max connections cannot be 0".to_string()));
        }
        if self.max_connections > 100 {
            return Err(AppError::Config(
                "Max connections cannot be greater than 100".to_string(),
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(AppError::Config("Connect timeout cannot be 0".to_string()));
        }
        if self.min_connections > self.max_connections {
            return Err(AppError::Config(
                "Min connections cannot be greater than max connections".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    /// API port
    pub port: u16,
    /// Prometheus and health check port
    pub metrics_port: u16,
    /// Whether to allow privileged ports (< 1024)
    pub allow_privileged_ports: bool,
    /// Where uploaded entry photos are stored
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Browser origin allowed by CORS
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            metrics_port: 9090,
            allow_privileged_ports: false,
            uploads_dir: PathBuf::from("uploads"),
            max_upload_bytes: 10 * 1024 * 1024,
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> AppResult<()> {
        if !self.allow_privileged_ports {
            for (name, port) in [("API", self.port), ("Metrics", self.metrics_port)] {
                if port < 1024 {
                    return Err(AppError::Config(format!(
                        "{} port {} is privileged. Set allow_privileged_ports=true or use port >= 1024",
                        name, port
                    )));
                }
            }
        }
        if self.port == self.metrics_port {
            return Err(AppError::Config(
                "API port and metrics port cannot be the same".to_string(),
            ));
        }
        if self.bind_address.parse::<std::net::IpAddr>().is_err() {
            return Err(AppError::Config(format!(
                "Bind address '{}' is not an IP address",
                self.bind_address
            )));
        }
        if self.max_upload_bytes == 0 {
            return Err(AppError::Config("Max upload size cannot be 0".to_string()));
        }
        if self.uploads_dir.as_os_str().is_empty() {
            return Err(AppError::Config("Uploads directory cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Label pipeline settings: which corpus lists feed which stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub corpus_dir: PathBuf,
    /// Lists whose entries flag an ingredient as problematic
    pub bad_lists: Vec<String>,
    /// Domain vocabulary for the spelling corrector
    pub ingredient_words: String,
    /// General language vocabulary for the spelling corrector
    pub language_words: String,
    pub empty_slots: EmptySlotPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("data/ingredients"),
            bad_lists: vec!["drying_skin".to_string(), "pore_clogging".to_string()],
            ingredient_words: "ingredient_words".to_string(),
            language_words: "english_words".to_string(),
            empty_slots: EmptySlotPolicy::Keep,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.bad_lists.is_empty() {
            return Err(AppError::Config(
                "At least one bad ingredient list must be configured".to_string(),
            ));
        }
        if self
            .word_lists()
            .iter()
            .chain(self.bad_lists.iter())
            .any(|name| name.trim().is_empty())
        {
            return Err(AppError::Config("Corpus list names cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Lists that seed the spelling dictionary.
    pub fn word_lists(&self) -> Vec<String> {
        vec![self.ingredient_words.clone(), self.language_words.clone()]
    }
}

/// Remote skin analysis (AILabTools)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinAnalysisConfig {
    pub enabled: bool,
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SkinAnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "https://www.ailabapi.com/api/portrait/analysis/skin-analysis".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl SkinAnalysisConfig {
    pub fn validate(&self) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(AppError::Config(
                "AILABTOOLS_API_KEY is required when skin analysis is enabled".to_string(),
            ));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Skin analysis URL must be http(s): {}",
                self.api_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::Config("Skin analysis timeout cannot be 0".to_string()));
        }
        Ok(())
    }
}

/// Optional LLM label reader (Gemini)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelReaderConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    /// Override for the API root, mostly for tests
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LabelReaderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            base_url: None,
            timeout_secs: 60,
        }
    }
}

impl LabelReaderConfig {
    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.model.trim().is_empty() {
            return Err(AppError::Config("Label reader model cannot be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::Config("Label reader timeout cannot be 0".to_string()));
        }
        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    pub pipeline: PipelineConfig,
    pub skin_analysis: SkinAnalysisConfig,
    pub label_reader: LabelReaderConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        config.database.url = env::var("DATABASE_URL").map_err(|_| {
            AppError::Config("DATABASE_URL environment variable is required".to_string())
        })?;
        config.database.max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 10)?;
        config.database.connect_timeout_secs = parse_env("DATABASE_CONNECT_TIMEOUT_SECS", 30)?;
        config.database.min_connections = parse_env("DATABASE_MIN_CONNECTIONS", 1)?;

        config.server.bind_address =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string());
        config.server.port = parse_env("PORT", 8000)?;
        config.server.metrics_port = parse_env("METRICS_PORT", 9090)?;
        config.server.allow_privileged_ports = parse_env("ALLOW_PRIVILEGED_PORTS", false)?;
        config.server.uploads_dir =
            PathBuf::from(env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string()));
        config.server.max_upload_bytes = parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?;
        config.server.cors_origin =
            env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        config.ocr.languages = env::var("OCR_LANGUAGES").unwrap_or_else(|_| "eng".to_string());
        if let Ok(psm) = env::var("OCR_PSM") {
            config.ocr.psm_mode = PageSegMode::from_number(&psm).ok_or_else(|| {
                AppError::Config(format!("OCR_PSM '{}' is not a supported mode", psm))
            })?;
        }
        if let Ok(model) = env::var("OCR_MODEL") {
            config.ocr.model_type = ModelType::parse(&model).ok_or_else(|| {
                AppError::Config(format!("OCR_MODEL must be standard, fast or best, got '{}'", model))
            })?;
        }
        config.ocr.tessdata_path = env::var("OCR_TESSDATA_PATH").ok();
        config.ocr.operation_timeout_secs = parse_env("OCR_TIMEOUT_SECS", 60)?;

        config.pipeline.corpus_dir = PathBuf::from(
            env::var("CORPUS_DIR").unwrap_or_else(|_| "data/ingredients".to_string()),
        );
        if let Ok(lists) = env::var("BAD_INGREDIENT_LISTS") {
            config.pipeline.bad_lists = lists
                .split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect();
        }
        config.pipeline.ingredient_words =
            env::var("INGREDIENT_WORDS_LIST").unwrap_or_else(|_| "ingredient_words".to_string());
        config.pipeline.language_words =
            env::var("LANGUAGE_WORDS_LIST").unwrap_or_else(|_| "english_words".to_string());
        config.pipeline.empty_slots = env::var("EMPTY_SLOT_POLICY")
            .unwrap_or_else(|_| "keep".to_string())
            .parse()?;

        config.skin_analysis.api_key = env::var("AILABTOOLS_API_KEY").ok();
        config.skin_analysis.enabled =
            parse_env("SKIN_ANALYSIS_ENABLED", config.skin_analysis.api_key.is_some())?;
        if let Ok(url) = env::var("SKIN_ANALYSIS_URL") {
            config.skin_analysis.api_url = url;
        }
        config.skin_analysis.timeout_secs = parse_env("SKIN_ANALYSIS_TIMEOUT_SECS", 60)?;

        config.label_reader.api_key = env::var("GEMINI_API_KEY").ok();
        config.label_reader.model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());
        config.label_reader.timeout_secs = parse_env("LABEL_READER_TIMEOUT_SECS", 60)?;

        config.observability = ObservabilityConfig::from_env();
        config.observability.metrics_port = config.server.metrics_port;

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.database.validate()?;
        self.server.validate()?;
        self.ocr.validate()?;
        self.pipeline.validate()?;
        self.skin_analysis.validate()?;
        self.label_reader.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: db_url=[REDACTED], port={}, metrics_port={}, ocr_languages={}, corpus_dir={}, bad_lists={}, empty_slots={:?}, skin_analysis={}, skin_analysis_key={}, label_reader={}, environment={}",
            self.server.port,
            self.server.metrics_port,
            self.ocr.languages,
            self.pipeline.corpus_dir.display(),
            self.pipeline.bad_lists.join("+"),
            self.pipeline.empty_slots,
            self.skin_analysis.enabled,
            if self.skin_analysis.api_key.is_some() { "[REDACTED]" } else { "unset" },
            self.label_reader.is_enabled(),
            self.observability.environment
        )
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value '{}'", key, value))),
        Err(_) => Ok(default),
    }
}
