use std::fmt::Display;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SyncEvent {
    SubmitMetadata,
    MetadataAccepted,
    MetadataRejected,
    BeginArtifacts,
    AllArtifactsSent,
    SomeArtifactsFailed,
    NoArtifacts,
    ArtifactsAborted,
}

impl Display for SyncEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let event = match self {
            SyncEvent::SubmitMetadata => "submit_metadata",
            SyncEvent::MetadataAccepted => "metadata_accepted",
            SyncEvent::MetadataRejected => "metadata_rejected",
            SyncEvent::BeginArtifacts => "begin_artifacts",
            SyncEvent::AllArtifactsSent => "all_artifacts_sent",
            SyncEvent::SomeArtifactsFailed => "some_artifacts_failed",
            SyncEvent::NoArtifacts => "no_artifacts",
            SyncEvent::ArtifactsAborted => "artifacts_aborted",
        };
        write!(f, "{}", event)
    }
}
