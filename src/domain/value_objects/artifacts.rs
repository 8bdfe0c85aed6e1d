use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::artifact_kinds::ArtifactKind;

/// Upload status of one captured image, persisted with its record so a restart
/// never re-uploads an image the backend already acknowledged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactUploadStatus {
    pub name: String,
    #[serde(default)]
    pub sent: bool,
}

impl ArtifactUploadStatus {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryArtifacts {
    #[serde(default)]
    pub evidence: Vec<ArtifactUploadStatus>,
    #[serde(default)]
    pub invoices: Vec<ArtifactUploadStatus>,
    #[serde(default)]
    pub incidents: Vec<ArtifactUploadStatus>,
}

impl DeliveryArtifacts {
    pub fn list(&self, kind: ArtifactKind) -> &[ArtifactUploadStatus] {
        match kind {
            ArtifactKind::Evidence => &self.evidence,
            ArtifactKind::Invoice => &self.invoices,
            ArtifactKind::Incident => &self.incidents,
        }
    }

    pub fn list_mut(&mut self, kind: ArtifactKind) -> &mut Vec<ArtifactUploadStatus> {
        match kind {
            ArtifactKind::Evidence => &mut self.evidence,
            ArtifactKind::Invoice => &mut self.invoices,
            ArtifactKind::Incident => &mut self.incidents,
        }
    }

    pub fn total(&self) -> usize {
        self.evidence.len() + self.invoices.len() + self.incidents.len()
    }

    pub fn sent_count(&self) -> usize {
        self.iter().filter(|(_, item)| item.sent).count()
    }

    pub fn all_sent(&self) -> bool {
        self.iter().all(|(_, item)| item.sent)
    }

    /// Merged view over the three collections in evidence, invoice, incident order.
    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKind, &ArtifactUploadStatus)> {
        ArtifactKind::ALL
            .into_iter()
            .flat_map(move |kind| self.list(kind).iter().map(move |item| (kind, item)))
    }

    /// Positions of every item that still has to be uploaded.
    pub fn unsent_positions(&self) -> Vec<(ArtifactKind, usize)> {
        ArtifactKind::ALL
            .into_iter()
            .flat_map(|kind| {
                self.list(kind)
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| !item.sent)
                    .map(move |(index, _)| (kind, index))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// Local file backing an artifact, handed to the transport for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    pub name: String,
    pub path: PathBuf,
}

/// Result of one pipeline invocation. `sent_count` includes items that were
/// already sent before the invocation started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub sent_count: usize,
    pub total: usize,
    pub attempted: usize,
    pub failed: usize,
}

impl UploadSummary {
    pub fn is_complete(&self) -> bool {
        self.sent_count == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DeliveryArtifacts {
        DeliveryArtifacts {
            evidence: vec![
                ArtifactUploadStatus::pending("e1.jpg"),
                ArtifactUploadStatus {
                    name: "e2.jpg".to_string(),
                    sent: true,
                },
            ],
            invoices: vec![ArtifactUploadStatus::pending("f1.jpg")],
            incidents: vec![],
        }
    }

    #[test]
    fn counts_sent_and_total_across_collections() {
        let artifacts = sample();
        assert_eq!(artifacts.total(), 3);
        assert_eq!(artifacts.sent_count(), 1);
        assert!(!artifacts.all_sent());
    }

    #[test]
    fn unsent_positions_skip_sent_items() {
        let artifacts = sample();
        assert_eq!(
            artifacts.unsent_positions(),
            vec![(ArtifactKind::Evidence, 0), (ArtifactKind::Invoice, 0)]
        );
    }

    #[test]
    fn missing_sent_flag_defaults_to_false() {
        let item: ArtifactUploadStatus = serde_json::from_str(r#"{"name":"x.jpg"}"#).unwrap();
        assert!(!item.sent);
    }
}
