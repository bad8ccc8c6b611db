pub mod advice;
pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod stats;
pub mod storage;
pub mod state;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::{Backend, FileBackend, MemoryBackend, Store, today_key};
