use thiserror::Error;

/// Result type for worker operations
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Closed set of failures the worker can hit while handling a notification.
///
/// Everything except `InvalidConfig` is recoverable: the driving loop logs
/// it and leaves the message on the queue for redelivery. `InvalidConfig`
/// only occurs at startup and aborts the process.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("malformed notification: {0}")]
    MalformedNotification(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("object store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    #[error("failed to decode image: {0}")]
    DecodeError(String),

    #[error("upload rejected: {0}")]
    UploadRejected(String),

    #[error("queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WorkerError {
    /// Stable error-kind label for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::MalformedNotification(_) => "malformed_notification",
            WorkerError::ObjectNotFound(_) => "object_not_found",
            WorkerError::StoreUnavailable(_) => "store_unavailable",
            WorkerError::UnsupportedImageFormat(_) => "unsupported_image_format",
            WorkerError::DecodeError(_) => "decode_error",
            WorkerError::UploadRejected(_) => "upload_rejected",
            WorkerError::QueueUnavailable(_) => "queue_unavailable",
            WorkerError::InvalidConfig(_) => "invalid_config",
        }
    }
}
