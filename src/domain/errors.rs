use thiserror::Error;

use crate::domain::value_objects::{
    business_key::BusinessKey,
    enums::{sync_events::SyncEvent, sync_states::SyncState},
};

#[derive(Debug, Error)]
pub enum RecordStoreError {
    /// A delivery with this business key is already queued or was already sent.
    #[error("delivery already processed: {0}")]
    DuplicateKey(BusinessKey),

    #[error("failed to (de)serialize namespace {namespace}: {source}")]
    Serialization {
        namespace: String,
        source: serde_json::Error,
    },

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request never got an HTTP response (DNS, refused, timeout, TLS).
    Connection,
    /// The backend answered with a non-2xx status.
    Status(u16),
    /// The backend answered but refused to acknowledge the upload.
    Rejected,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Connection,
            message: message.into(),
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Status(status),
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Rejected,
            message: message.into(),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self.kind, TransportErrorKind::Connection)
    }
}

/// An event was applied to a state that does not accept it. Programmer error; never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal sync transition: {event} from {from}")]
pub struct ProtocolViolation {
    pub from: SyncState,
    pub event: SyncEvent,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("delivery already processed: {0}")]
    DuplicateKey(BusinessKey),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    ProtocolViolation(#[from] ProtocolViolation),

    #[error("record store error: {0}")]
    Storage(RecordStoreError),

    /// A sync execution holds the single-flight guard.
    #[error("a sync is in progress")]
    Busy,
}

impl From<RecordStoreError> for SyncError {
    fn from(err: RecordStoreError) -> Self {
        match err {
            RecordStoreError::DuplicateKey(key) => SyncError::DuplicateKey(key),
            other => SyncError::Storage(other),
        }
    }
}
