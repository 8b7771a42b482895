//! Readiness checks behind `/health/ready`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use leptess::LepTess;
use sqlx::PgPool;

use super::metrics::record_health_check_metrics;

/// Database first, then the OCR engine.
pub async fn perform_readiness_checks(db_pool: Option<&PgPool>, ocr_languages: &str) -> Result<()> {
    if let Some(pool) = db_pool {
        check_database_health(pool).await?;
    }
    check_ocr_health(ocr_languages).await?;
    Ok(())
}

pub async fn check_database_health(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| anyhow::anyhow!("Database health check failed: {}", e))?;

    tracing::debug!("Database health check passed");
    Ok(())
}

/// Creating an engine loads the traineddata, which is what fails on a
/// misconfigured host.
pub async fn check_ocr_health(languages: &str) -> Result<()> {
    let languages = languages.to_string();
    let result = tokio::task::spawn_blocking(move || {
        LepTess::new(None, &languages).map(|_| ()).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| anyhow::anyhow!("OCR health check worker failed: {}", e))?;

    match result {
        Ok(()) => {
            tracing::debug!("OCR health check passed");
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("OCR health check failed: {}", e)),
    }
}

/// Periodically record check outcomes as metrics.
pub fn start_health_metrics_recorder(
    db_pool: Option<Arc<PgPool>>,
    ocr_languages: String,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;

            if let Some(pool) = &db_pool {
                let check_start = Instant::now();
                let healthy = check_database_health(pool.as_ref()).await.is_ok();
                record_health_check_metrics("database", healthy, check_start.elapsed());
            }

            let check_start = Instant::now();
            let healthy = check_ocr_health(&ocr_languages).await.is_ok();
            record_health_check_metrics("ocr", healthy, check_start.elapsed());
        }
    })
}
