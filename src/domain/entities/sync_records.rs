use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::deliveries::DeliveryOutcome,
    value_objects::{
        artifacts::DeliveryArtifacts, business_key::BusinessKey,
        enums::sync_states::SyncState, sync_failures::SyncFailure,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncRecord {
    pub id: Uuid,
    pub outcome: DeliveryOutcome,
    pub state: SyncState,
    /// Failed metadata submissions. Artifact failures do not count.
    pub attempts: u32,
    pub last_error: Option<SyncFailure>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncRecord {
    pub fn new(outcome: DeliveryOutcome, state: SyncState) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            outcome,
            state,
            attempts: 0,
            last_error: None,
            accepted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn business_key(&self) -> BusinessKey {
        self.outcome.business_key()
    }

    /// True once the backend accepted the metadata, so only images remain.
    pub fn metadata_accepted(&self) -> bool {
        self.accepted_at.is_some()
            && !self
                .last_error
                .as_ref()
                .is_some_and(SyncFailure::is_metadata_step)
    }

    pub fn apply(&mut self, patch: &SyncRecordPatch) {
        if let Some(state) = patch.state {
            self.state = state;
        }
        if let Some(attempts) = patch.attempts {
            self.attempts = attempts;
        }
        if let Some(last_error) = &patch.last_error {
            self.last_error = last_error.clone();
        }
        if let Some(accepted_at) = patch.accepted_at {
            self.accepted_at = Some(accepted_at);
        }
        if let Some(artifacts) = &patch.artifacts {
            self.outcome.artifacts = artifacts.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update merged into a stored record. `None` leaves the field as is;
/// `last_error: Some(None)` clears the stored failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncRecordPatch {
    pub state: Option<SyncState>,
    pub attempts: Option<u32>,
    pub last_error: Option<Option<SyncFailure>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub artifacts: Option<DeliveryArtifacts>,
}

impl SyncRecordPatch {
    pub fn state(state: SyncState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }

    pub fn artifacts(artifacts: DeliveryArtifacts) -> Self {
        Self {
            artifacts: Some(artifacts),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::deliveries::GeoPoint,
        value_objects::{
            enums::delivery_types::DeliveryType,
            sync_failures::{FailureKind, SyncFailure},
        },
    };

    fn outcome() -> DeliveryOutcome {
        DeliveryOutcome {
            order_id: "PED-1".to_string(),
            folio: "F-1".to_string(),
            delivery_type: DeliveryType::Full,
            line_items: vec![],
            comments: None,
            reporter_name: "Driver".to_string(),
            location: GeoPoint {
                latitude: 19.43,
                longitude: -99.13,
            },
            captured_at: Utc::now(),
            artifacts: DeliveryArtifacts::default(),
        }
    }

    #[test]
    fn apply_merges_only_present_fields() {
        let mut record = SyncRecord::new(outcome(), SyncState::PendingSend);
        record.last_error = Some(SyncFailure::metadata(FailureKind::Transport, "boom"));

        record.apply(&SyncRecordPatch {
            state: Some(SyncState::Error),
            attempts: Some(1),
            ..Default::default()
        });

        assert_eq!(record.state, SyncState::Error);
        assert_eq!(record.attempts, 1);
        assert!(record.last_error.is_some());

        record.apply(&SyncRecordPatch {
            last_error: Some(None),
            ..Default::default()
        });
        assert!(record.last_error.is_none());
    }

    #[test]
    fn metadata_accepted_requires_accepted_at_without_metadata_failure() {
        let mut record = SyncRecord::new(outcome(), SyncState::PendingSend);
        assert!(!record.metadata_accepted());

        record.accepted_at = Some(Utc::now());
        assert!(record.metadata_accepted());

        record.last_error = Some(SyncFailure::metadata(FailureKind::Interrupted, "restart"));
        assert!(!record.metadata_accepted());
    }
}
