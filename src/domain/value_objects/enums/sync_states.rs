use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    #[default]
    PendingSend,
    Sending,
    DataSent,
    ImagesPending,
    Complete,
    Error,
}

impl SyncState {
    /// States an automatic pass picks up again.
    pub const RESUMABLE: [SyncState; 3] = [
        SyncState::PendingSend,
        SyncState::Error,
        SyncState::ImagesPending,
    ];

    pub fn is_resumable(&self) -> bool {
        Self::RESUMABLE.contains(self)
    }

    /// States held only while the orchestrator is actively driving the record.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SyncState::Sending | SyncState::DataSent | SyncState::ImagesPending
        )
    }
}

impl Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            SyncState::PendingSend => "PENDING_SEND",
            SyncState::Sending => "SENDING",
            SyncState::DataSent => "DATA_SENT",
            SyncState::ImagesPending => "IMAGES_PENDING",
            SyncState::Complete => "COMPLETE",
            SyncState::Error => "ERROR",
        };
        write!(f, "{}", state)
    }
}
