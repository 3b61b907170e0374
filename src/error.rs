use thiserror::Error;

/// Failures raised by a `DocumentStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {0} does not exist")]
    Missing(String),

    /// The patch carried an `if_revision` that no longer matches.
    #[error("document {id} is at revision {actual}, patch expected {expected}")]
    RevisionMismatch { id: String, expected: i64, actual: i64 },

    /// A unique field on create is already taken by another document of the same type.
    #[error("{doc_type}.{field} = {value} is already in use")]
    Conflict {
        doc_type: String,
        field: String,
        value: String,
    },

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Malformed(e.to_string())
    }
}

/// Errors surfaced by the inventory mutation path.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Lookup by item id, barcode or member reference found nothing.
    #[error("{0} not found")]
    NotFound(String),

    /// The requested transition is not allowed for the item's current state.
    #[error("{0}")]
    InvalidPrecondition(String),

    /// Optimistic retries were exhausted against concurrent writers.
    #[error("{0} was modified concurrently, please retry")]
    Conflict(String),

    #[error("document store unavailable: {0}")]
    Upstream(#[from] StoreError),
}

impl InventoryError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        InventoryError::InvalidPrecondition(msg.into())
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("unsupported image type '{0}'")]
    UnsupportedType(String),

    #[error("failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}
