use crate::errors::{ImportError, StoreError};
use crate::models::{DailyRecord, Records, is_valid_date_key, make_initial_record};
use chrono::Local;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tracing::{error, info, warn};

/// Versioned name of the persisted blob.
pub const STORAGE_KEY: &str = "mindful_mirror_data_v1";

/// Durable home of the serialized store. `read` yields `None` when nothing
/// has ever been written.
pub trait Backend: Send + Sync {
    fn read(&self) -> impl Future<Output = io::Result<Option<String>>> + Send;
    fn write(&self, blob: &str) -> impl Future<Output = io::Result<()>> + Send;
}

#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Backend for FileBackend {
    async fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn write(&self, blob: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        // Rename over the old file so a failed write leaves it intact.
        let temp = self.temp_path();
        fs::write(&temp, blob).await?;
        fs::rename(&temp, &self.path).await
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    blob: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.blob.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Backend for MemoryBackend {
    async fn read(&self) -> io::Result<Option<String>> {
        Ok(self.slot().clone())
    }

    async fn write(&self, blob: &str) -> io::Result<()> {
        *self.slot() = Some(blob.to_string());
        Ok(())
    }
}

/// Date-keyed record store. Every call goes back to the backend, nothing is
/// cached between calls.
#[derive(Debug)]
pub struct Store<B> {
    backend: B,
}

impl<B: Backend> Store<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Reads the whole store. Missing or unreadable storage is an empty store.
    pub async fn load(&self) -> Records {
        match self.backend.read().await {
            Ok(Some(blob)) => match serde_json::from_str(&blob) {
                Ok(records) => records,
                Err(err) => {
                    error!("failed to parse stored records: {err}");
                    Records::new()
                }
            },
            Ok(None) => Records::new(),
            Err(err) => {
                error!("failed to read stored records: {err}");
                Records::new()
            }
        }
    }

    pub async fn get(&self, date: &str) -> Option<DailyRecord> {
        self.load().await.remove(date)
    }

    /// Returns the record for `date`, creating and persisting a zeroed one on
    /// first access. A failed creation write is logged and the fresh record is
    /// still returned; only a malformed date is an error.
    pub async fn get_or_create(&self, date: &str) -> Result<DailyRecord, StoreError> {
        check_date_key(date)?;
        let mut records = self.load().await;
        if let Some(record) = records.remove(date) {
            return Ok(record);
        }

        let record = make_initial_record(date);
        records.insert(date.to_string(), record.clone());
        match self.persist(&records).await {
            Ok(()) => info!(date, "created daily record"),
            Err(err) => warn!(date, "failed to persist new daily record: {err}"),
        }
        Ok(record)
    }

    /// Replaces the entry at `record.date` and writes the full store back.
    pub async fn save(&self, record: &DailyRecord) -> Result<Records, StoreError> {
        check_date_key(&record.date)?;
        let mut records = self.load().await;
        records.insert(record.date.clone(), record.clone());
        self.persist(&records).await?;
        Ok(records)
    }

    /// All records, ascending by date.
    pub async fn list_all(&self) -> Vec<DailyRecord> {
        self.load().await.into_values().collect()
    }

    /// The persisted blob exactly as stored, or `None` if nothing was ever written.
    pub async fn export_blob(&self) -> Option<String> {
        match self.backend.read().await {
            Ok(blob) => blob,
            Err(err) => {
                error!("failed to read records for export: {err}");
                None
            }
        }
    }

    pub async fn import_blob(&self, text: &str) -> bool {
        match self.try_import_blob(text).await {
            Ok(_) => true,
            Err(err) => {
                warn!("rejected backup import: {err}");
                false
            }
        }
    }

    /// Validates `text` and, only if it passes, replaces the whole store with
    /// it. Returns the number of imported records.
    pub async fn try_import_blob(&self, text: &str) -> Result<usize, ImportError> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(ImportError::Parse)?;
        let Some(entries) = value.as_object() else {
            return Err(ImportError::NotAnObject);
        };
        if let Some((key, first)) = entries.iter().next() {
            let has_targets = first
                .as_object()
                .is_some_and(|entry| entry.contains_key("targets"));
            if !has_targets {
                return Err(ImportError::MissingTargets(key.clone()));
            }
        }
        if let Some(key) = entries.keys().find(|key| !is_valid_date_key(key)) {
            return Err(ImportError::InvalidDate(key.clone()));
        }

        let records: Records = serde_json::from_value(value).map_err(ImportError::Shape)?;
        if let Some((key, record)) = records.iter().find(|(key, record)| **key != record.date) {
            return Err(ImportError::DateMismatch {
                key: key.clone(),
                date: record.date.clone(),
            });
        }
        self.persist(&records).await?;
        info!(count = records.len(), "imported backup");
        Ok(records.len())
    }

    async fn persist(&self, records: &Records) -> Result<(), StoreError> {
        let blob = serde_json::to_string_pretty(records)?;
        self.backend.write(&blob).await?;
        Ok(())
    }
}

fn check_date_key(date: &str) -> Result<(), StoreError> {
    if is_valid_date_key(date) {
        Ok(())
    } else {
        Err(StoreError::InvalidDate(date.to_string()))
    }
}

/// Today's key in the local calendar.
pub fn today_key() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}
