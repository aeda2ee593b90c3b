use crate::domain::model::{ClientId, ParkingId};
use serde::Serialize;
use thiserror::Error;

/// 存儲層錯誤 (redb / memory adapters)
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Row encoding error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing {table} row: {id}")]
    MissingRow { table: &'static str, id: u64 },

    #[error("Transaction scoped to parking {expected} cannot write parking {actual}")]
    OutOfScope { expected: ParkingId, actual: ParkingId },
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum ParkingError {
    #[error("{message}")]
    NotFound { message: String },

    #[error("Validation error on `{field}`: {reason}")]
    ValidationError { field: String, reason: String },

    #[error("Ineligible client: {reason}")]
    IneligibleClient { reason: String },

    #[error("Parking {parking_id} is closed")]
    ParkingClosed { parking_id: ParkingId },

    #[error("Parking {parking_id} has no available places")]
    CapacityExhausted { parking_id: ParkingId },

    #[error("Client {client_id} already occupies a place at parking {parking_id}")]
    AlreadyParked {
        client_id: ClientId,
        parking_id: ParkingId,
    },

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, ParkingError>;

/// Tag carried across the core/boundary seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFound,
    ValidationError,
    IneligibleClient,
    ParkingClosed,
    CapacityExhausted,
    AlreadyParked,
    Storage,
    Config,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Domain,
    Validation,
    Storage,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// 可重試的暫時性錯誤
    Medium,
    /// 請求被拒絕
    High,
    /// 無法啟動
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ParkingError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ValidationError { .. } => ErrorKind::ValidationError,
            Self::IneligibleClient { .. } => ErrorKind::IneligibleClient,
            Self::ParkingClosed { .. } => ErrorKind::ParkingClosed,
            Self::CapacityExhausted { .. } => ErrorKind::CapacityExhausted,
            Self::AlreadyParked { .. } => ErrorKind::AlreadyParked,
            Self::Storage(_) | Self::IoError(_) => ErrorKind::Storage,
            Self::ConfigError { .. } => ErrorKind::Config,
            Self::SerializationError(_) | Self::ProcessingError { .. } => ErrorKind::Internal,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.kind() {
            ErrorKind::ValidationError => ErrorCategory::Validation,
            ErrorKind::Storage => ErrorCategory::Storage,
            ErrorKind::Config => ErrorCategory::Configuration,
            ErrorKind::Internal => ErrorCategory::System,
            _ => ErrorCategory::Domain,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Storage => ErrorSeverity::Medium,
            ErrorCategory::Domain | ErrorCategory::Validation => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.severity() == ErrorSeverity::Medium
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => "Check the client and parking ids",
            ErrorKind::ValidationError => "Provide every required field with a non-empty value",
            ErrorKind::IneligibleClient => "Register a credit card for the client first",
            ErrorKind::ParkingClosed => "Choose an opened parking",
            ErrorKind::CapacityExhausted => "Wait for a place to free up or choose another parking",
            ErrorKind::AlreadyParked => "Check the client out before starting a new session",
            ErrorKind::Storage => "Retry the request; the storage layer reported a transient failure",
            ErrorKind::Config => "Fix the configuration file or command line flags",
            ErrorKind::Internal => "Run again with --verbose and report the log",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Storage(_) | Self::IoError(_) => {
                "The parking database is temporarily unavailable".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorBody {
                kind: self.kind(),
                message: self.to_string(),
            },
        }
    }
}
