use thiserror::Error;

#[derive(Error, Debug)]
pub enum CepError {
    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Postal code already stored: {postal_code}")]
    DuplicateKey { postal_code: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// 錯誤分類，供 HTTP 邊界決定狀態碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

impl CepError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CepError::Validation { .. } => ErrorKind::Validation,
            CepError::NotFound { .. } => ErrorKind::NotFound,
            CepError::Conflict { .. } | CepError::DuplicateKey { .. } => ErrorKind::Conflict,
            _ => ErrorKind::Internal,
        }
    }

    /// 給使用者看的訊息，內部錯誤不外洩細節
    pub fn user_friendly_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => match self {
                CepError::Config { .. } | CepError::InvalidConfigValue { .. } => self.to_string(),
                _ => "Internal server error".to_string(),
            },
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CepError>;
