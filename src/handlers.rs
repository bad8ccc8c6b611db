use crate::advice::{AdviceGenerator, emotion_summary};
use crate::errors::AppError;
use crate::models::{
    self, AdviceRequest, DailyRecord, NoteRequest, ReflectionRequest, StatsResponse,
    ThoughtsRequest, VerdictRequest, is_valid_date_key,
};
use crate::state::AppState;
use crate::stats::{DEFAULT_TREND_WINDOW, build_stats};
use crate::storage::today_key;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub window: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub imported: usize,
}

pub async fn get_today(State(state): State<AppState>) -> Result<Json<DailyRecord>, AppError> {
    let store = state.store.lock().await;
    Ok(Json(store.get_or_create(&today_key()).await?))
}

pub async fn set_verdict(
    State(state): State<AppState>,
    Json(payload): Json<VerdictRequest>,
) -> Result<Json<DailyRecord>, AppError> {
    update_today(&state, |record| {
        models::set_verdict(record, payload.target, payload.has_negative_emotion)
    })
    .await
}

pub async fn adjust_thoughts(
    State(state): State<AppState>,
    Json(payload): Json<ThoughtsRequest>,
) -> Result<Json<DailyRecord>, AppError> {
    update_today(&state, |record| {
        models::adjust_counts(record, payload.target, payload.delta_positive, payload.delta_negative)
    })
    .await
}

pub async fn set_note(
    State(state): State<AppState>,
    Json(payload): Json<NoteRequest>,
) -> Result<Json<DailyRecord>, AppError> {
    update_today(&state, |record| models::set_note(record, payload.target, payload.note)).await
}

pub async fn set_reflection(
    State(state): State<AppState>,
    Json(payload): Json<ReflectionRequest>,
) -> Result<Json<DailyRecord>, AppError> {
    update_today(&state, |record| models::set_reflection(record, payload.reflection)).await
}

/// Saves the reflection, asks the advisor without holding the store, then
/// attaches the answer to whatever today's record looks like by then.
pub async fn request_advice(
    State(state): State<AppState>,
    Json(payload): Json<AdviceRequest>,
) -> Result<Json<DailyRecord>, AppError> {
    let date = today_key();
    let (reflection, summary) = {
        let store = state.store.lock().await;
        let record = store.get_or_create(&date).await?;
        let reflection = payload.reflection.unwrap_or_else(|| record.reflection.clone());
        if reflection.trim().is_empty() {
            return Err(AppError::bad_request("reflection must not be empty"));
        }
        let record = models::set_reflection(&record, reflection.clone());
        store.save(&record).await?;
        (reflection, emotion_summary(&record))
    };

    let advice = state.advisor.generate(&reflection, &summary).await;

    let store = state.store.lock().await;
    let current = store.get_or_create(&date).await?;
    let updated = models::set_advice(&current, advice);
    store.save(&updated).await?;
    Ok(Json(updated))
}

pub async fn list_records(State(state): State<AppState>) -> Json<Vec<DailyRecord>> {
    let store = state.store.lock().await;
    Json(store.list_all().await)
}

pub async fn get_record(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DailyRecord>, AppError> {
    if !is_valid_date_key(&date) {
        return Err(AppError::bad_request("date must be YYYY-MM-DD"));
    }
    let store = state.store.lock().await;
    store
        .get(&date)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("no record for {date}")))
}

pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Json<StatsResponse> {
    let records = state.store.lock().await.list_all().await;
    Json(build_stats(&records, query.window.unwrap_or(DEFAULT_TREND_WINDOW)))
}

pub async fn export_backup(State(state): State<AppState>) -> Result<Response, AppError> {
    let store = state.store.lock().await;
    let Some(blob) = store.export_blob().await else {
        return Err(AppError::not_found("no data to export yet"));
    };
    let disposition = format!(
        "attachment; filename=\"mindful_mirror_backup_{}.json\"",
        today_key()
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        blob,
    )
        .into_response())
}

/// Replaces every stored record with the uploaded backup.
pub async fn import_backup(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ImportResponse>, AppError> {
    let store = state.store.lock().await;
    let imported = store.try_import_blob(&body).await?;
    info!(imported, "restored backup");
    Ok(Json(ImportResponse { imported }))
}

async fn update_today<F>(state: &AppState, update: F) -> Result<Json<DailyRecord>, AppError>
where
    F: FnOnce(&DailyRecord) -> DailyRecord,
{
    let store = state.store.lock().await;
    let record = store.get_or_create(&today_key()).await?;
    let updated = update(&record);
    store.save(&updated).await?;
    Ok(Json(updated))
}
