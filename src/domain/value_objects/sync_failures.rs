use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Storage,
    Interrupted,
    Protocol,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureCause {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureCause {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Last failure recorded on a sync record, tagged with the phase that failed so a
/// later pass knows whether metadata still has to be submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum SyncFailure {
    Metadata {
        cause: FailureCause,
    },
    Artifacts {
        sent: usize,
        total: usize,
        cause: FailureCause,
    },
}

impl SyncFailure {
    pub fn metadata(kind: FailureKind, message: impl Into<String>) -> Self {
        SyncFailure::Metadata {
            cause: FailureCause::new(kind, message),
        }
    }

    pub fn artifacts(sent: usize, total: usize, kind: FailureKind, message: impl Into<String>) -> Self {
        SyncFailure::Artifacts {
            sent,
            total,
            cause: FailureCause::new(kind, message),
        }
    }

    pub fn cause(&self) -> &FailureCause {
        match self {
            SyncFailure::Metadata { cause } => cause,
            SyncFailure::Artifacts { cause, .. } => cause,
        }
    }

    pub fn is_metadata_step(&self) -> bool {
        matches!(self, SyncFailure::Metadata { .. })
    }
}

impl Display for SyncFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncFailure::Metadata { cause } => {
                write!(f, "metadata submission failed: {}", cause.message)
            }
            SyncFailure::Artifacts { sent, total, cause } => write!(
                f,
                "{} of {} images sent: {}",
                sent, total, cause.message
            ),
        }
    }
}
