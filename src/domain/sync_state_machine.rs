//! Legal lifecycle of a sync record.
//!
//! ```text
//! PENDING_SEND -submit_metadata-> SENDING -metadata_accepted-> DATA_SENT
//! DATA_SENT -no_artifacts-> COMPLETE
//! DATA_SENT -begin_artifacts-> IMAGES_PENDING -all_artifacts_sent-> COMPLETE
//! IMAGES_PENDING -some_artifacts_failed-> IMAGES_PENDING
//! SENDING -metadata_rejected-> ERROR
//! DATA_SENT | IMAGES_PENDING -artifacts_aborted-> ERROR
//! ERROR -submit_metadata-> SENDING        (metadata never accepted)
//! ERROR -begin_artifacts-> IMAGES_PENDING (metadata accepted, images remain)
//! ```
//!
//! Every other pair is a [`ProtocolViolation`].

use crate::domain::{
    errors::ProtocolViolation,
    value_objects::enums::{sync_events::SyncEvent, sync_states::SyncState},
};

pub fn next_state(current: SyncState, event: SyncEvent) -> Result<SyncState, ProtocolViolation> {
    use SyncEvent::*;
    use SyncState::*;

    let next = match (current, event) {
        (PendingSend | Error, SubmitMetadata) => Sending,
        (Sending, MetadataAccepted) => DataSent,
        (Sending, MetadataRejected) => Error,
        (DataSent, NoArtifacts) => Complete,
        (DataSent | ImagesPending | Error, BeginArtifacts) => ImagesPending,
        (ImagesPending, AllArtifactsSent) => Complete,
        (ImagesPending, SomeArtifactsFailed) => ImagesPending,
        (DataSent | ImagesPending, ArtifactsAborted) => Error,
        (from, event) => return Err(ProtocolViolation { from, event }),
    };

    Ok(next)
}
