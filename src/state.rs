use crate::advice::GeminiAdvisor;
use crate::storage::{FileBackend, Store};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handler state. The mutex serialises writers; it holds no data of
/// its own, every request reads through to the backing file.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<Store<FileBackend>>>,
    pub advisor: Arc<GeminiAdvisor>,
}

impl AppState {
    pub fn new(store: Store<FileBackend>, advisor: GeminiAdvisor) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            advisor: Arc::new(advisor),
        }
    }
}
