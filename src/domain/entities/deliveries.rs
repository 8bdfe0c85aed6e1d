use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{
    artifacts::{ArtifactUploadStatus, DeliveryArtifacts},
    business_key::BusinessKey,
    enums::delivery_types::DeliveryType,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItemQuantity {
    pub product_code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub programmed: f64,
    pub delivered: f64,
}

/// Result of one delivery attempt as captured on the device. Built once by the
/// capture flow; only the artifact `sent` flags change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryOutcome {
    pub order_id: String,
    pub folio: String,
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub line_items: Vec<LineItemQuantity>,
    #[serde(default)]
    pub comments: Option<String>,
    pub reporter_name: String,
    pub location: GeoPoint,
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub artifacts: DeliveryArtifacts,
}

impl DeliveryOutcome {
    pub fn business_key(&self) -> BusinessKey {
        BusinessKey::new(self.order_id.clone(), self.folio.clone())
    }
}

/// Everything about an outcome except the image bytes, as submitted in the
/// metadata step. Artifact names are listed so the backend knows what to expect.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeliveryMetadataPayload {
    pub order_id: String,
    pub folio: String,
    pub delivery_type: DeliveryType,
    pub line_items: Vec<LineItemQuantity>,
    pub comments: Option<String>,
    pub reporter_name: String,
    pub location: GeoPoint,
    pub captured_at: DateTime<Utc>,
    pub evidence_names: Vec<String>,
    pub invoice_names: Vec<String>,
    pub incident_names: Vec<String>,
}

impl From<&DeliveryOutcome> for DeliveryMetadataPayload {
    fn from(outcome: &DeliveryOutcome) -> Self {
        let names = |items: &[ArtifactUploadStatus]| -> Vec<String> {
            items.iter().map(|item| item.name.clone()).collect()
        };

        Self {
            order_id: outcome.order_id.clone(),
            folio: outcome.folio.clone(),
            delivery_type: outcome.delivery_type,
            line_items: outcome.line_items.clone(),
            comments: outcome.comments.clone(),
            reporter_name: outcome.reporter_name.clone(),
            location: outcome.location,
            captured_at: outcome.captured_at,
            evidence_names: names(&outcome.artifacts.evidence),
            invoice_names: names(&outcome.artifacts.invoices),
            incident_names: names(&outcome.artifacts.incidents),
        }
    }
}
