use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/today", get(handlers::get_today))
        .route("/api/today/verdict", post(handlers::set_verdict))
        .route("/api/today/thoughts", post(handlers::adjust_thoughts))
        .route("/api/today/note", post(handlers::set_note))
        .route("/api/today/reflection", post(handlers::set_reflection))
        .route("/api/today/advice", post(handlers::request_advice))
        .route("/api/records", get(handlers::list_records))
        .route("/api/records/:date", get(handlers::get_record))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/backup", get(handlers::export_backup).post(handlers::import_backup))
        .with_state(state)
}
