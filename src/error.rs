use thiserror::Error;

/// Errors raised by the inventory store, sync engine and session gate.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// A required field was missing or a value was illegal. Raised before any write.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backing document store could not be reached or rejected the request.
    #[error("item store unavailable: {0}")]
    StoreUnavailable(String),

    /// Sign-in was rejected by the identity provider.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The operation needs a signed-in session.
    #[error("no user is signed in")]
    SignedOut,

    /// A stored document could not be decoded.
    #[error("stored document `{key}` is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    /// Compare-and-swap writes kept losing against concurrent writers.
    #[error("item `{name}` still contended after {attempts} attempts")]
    Contention { name: String, attempts: u32 },
}

pub type InventoryResult<T> = Result<T, InventoryError>;

pub(crate) fn validation(message: impl Into<String>) -> InventoryError {
    InventoryError::Validation(message.into())
}

pub(crate) fn corrupt(key: impl Into<String>, reason: impl ToString) -> InventoryError {
    InventoryError::Corrupt {
        key: key.into(),
        reason: reason.to_string(),
    }
}
