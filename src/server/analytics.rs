//! Dashboard analytics handlers. Each loads the window's entries once and
//! hands them to the pure functions in [`crate::analytics`].

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;

use super::models::WindowQuery;
use super::{ServerState, UserId};
use crate::analytics::{self, EntrySnapshot, Overview, ProductEffectivenessReport, SkinProgress, TimeWindow};
use crate::db;
use crate::errors::AppResult;
use crate::validation;

async fn load_window(
    state: &ServerState,
    user_id: i64,
    days: Option<u32>,
) -> AppResult<(TimeWindow, Vec<EntrySnapshot>)> {
    let days = validation::validate_window_days(days)?;
    let window = TimeWindow::ending_on(state.today(), days)?;
    let entries = db::list_entries_in_range(&state.pool, user_id, window.start_date, window.end_date).await?;
    Ok((window, entries.iter().map(|e| e.snapshot()).collect()))
}

pub async fn overview(
    State(state): State<Arc<ServerState>>,
    UserId(user_id): UserId,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<Overview>> {
    let (window, entries) = load_window(&state, user_id, query.days).await?;
    let dates = db::list_entry_dates(&state.pool, user_id, window.end_date).await?;
    let streak = analytics::calculate_streak(dates, window.end_date);
    Ok(Json(analytics::overview(&window, &entries, streak)?))
}

pub async fn skin_progress(
    State(state): State<Arc<ServerState>>,
    UserId(user_id): UserId,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<SkinProgress>> {
    let (window, entries) = load_window(&state, user_id, query.days).await?;
    Ok(Json(analytics::skin_progress(&window, &entries)))
}

pub async fn product_effectiveness(
    State(state): State<Arc<ServerState>>,
    UserId(user_id): UserId,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<ProductEffectivenessReport>> {
    let (window, entries) = load_window(&state, user_id, query.days).await?;
    Ok(Json(analytics::product_effectiveness_report(&window, &entries)))
}
