//! Error taxonomy shared by every document store backend.

use thiserror::Error;

/// Failures surfaced by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection failed: {message}")]
    Connection { message: String },

    #[error("index conflict on '{collection}.{index}': {message}")]
    IndexConflict {
        collection: String,
        index: String,
        message: String,
    },

    #[error("unique constraint violated in '{collection}' ({inserted} inserted before failure): {message}")]
    UniqueConstraintViolation {
        collection: String,
        message: String,
        inserted: u64,
    },

    #[error("'{collection}' rejected the operation (code {code}): {message}")]
    Rejected {
        collection: String,
        code: i32,
        message: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn index_conflict(
        collection: impl Into<String>,
        index: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::IndexConflict {
            collection: collection.into(),
            index: index.into(),
            message: message.into(),
        }
    }

    pub fn duplicate(collection: impl Into<String>, message: impl Into<String>, inserted: u64) -> Self {
        Self::UniqueConstraintViolation {
            collection: collection.into(),
            message: message.into(),
            inserted,
        }
    }

    pub fn rejected(collection: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self::Rejected {
            collection: collection.into(),
            code,
            message: message.into(),
        }
    }

    /// True for unique index breaches.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::UniqueConstraintViolation { .. })
    }
}
