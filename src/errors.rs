use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode records: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("record date {0:?} is not a YYYY-MM-DD date")]
    InvalidDate(String),
}

/// Why a backup blob was refused. The store is untouched in every case.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("backup is not valid JSON: {0}")]
    Parse(serde_json::Error),
    #[error("backup must be a JSON object keyed by date")]
    NotAnObject,
    #[error("backup entry {0:?} is not a daily record with targets")]
    MissingTargets(String),
    #[error("backup key {0:?} is not a YYYY-MM-DD date")]
    InvalidDate(String),
    #[error("backup key {key:?} holds a record dated {date:?}")]
    DateMismatch { key: String, date: String },
    #[error("backup records do not match the expected shape: {0}")]
    Shape(serde_json::Error),
    #[error("failed to write imported records: {0}")]
    Write(#[from] StoreError),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        if matches!(err, StoreError::InvalidDate(_)) {
            Self::bad_request(err.to_string())
        } else {
            Self::internal(err)
        }
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Write(err) => Self::internal(err),
            other => Self::bad_request(other.to_string()),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
