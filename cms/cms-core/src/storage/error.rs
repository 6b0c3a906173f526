//! Storage errors

/// Result alias for content store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by [`ContentStore`](super::ContentStore) backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Backend unreachable
    #[error("connection error: {0}")]
    Connection(String),

    /// Read failed
    #[error("read error: {0}")]
    Read(String),

    /// Write failed
    #[error("write error: {0}")]
    Write(String),

    /// Backend returned something it should not have
    #[error("internal error: {0}")]
    Internal(String),

    /// Update or delete of a section that has no document
    #[error("no document stored for section {section}")]
    NotFound {
        /// Section identifier
        section: String,
    },

    /// Stored version moved since the caller last read it
    #[error("version conflict on section {section}: expected {expected:?}, stored {actual:?}")]
    Conflict {
        /// Section identifier
        section: String,
        /// Version the caller based its edit on (`None` = expected no document)
        expected: Option<u64>,
        /// Version currently stored (`None` = no document)
        actual: Option<u64>,
    },

    /// Serialized document exceeds the size limit
    #[error("document for section {section} is {size} bytes, max {max}")]
    TooLarge {
        /// Section identifier
        section: String,
        /// Serialized size
        size: usize,
        /// Limit
        max: usize,
    },
}

impl StoreError {
    /// Connection failure.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Read failure.
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    /// Write failure.
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Internal failure.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error is an optimistic-concurrency conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
