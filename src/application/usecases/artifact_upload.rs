use tracing::{debug, warn};

use crate::{
    application::interfaces::artifact_uploader::ArtifactUploader,
    domain::value_objects::artifacts::{DeliveryArtifacts, UploadSummary},
};

/// Attempts every item whose `sent` flag is false exactly once, in evidence,
/// invoice, incident order. Already-sent items never reach the uploader. A
/// failed item is logged and the pipeline moves on to the next one.
pub async fn upload_all(
    artifacts: &mut DeliveryArtifacts,
    uploader: &(dyn ArtifactUploader + Send + Sync),
) -> UploadSummary {
    let mut summary = UploadSummary {
        total: artifacts.total(),
        ..Default::default()
    };

    for (kind, index) in artifacts.unsent_positions() {
        summary.attempted += 1;
        let item = artifacts.list(kind)[index].clone();

        match uploader.upload(kind, &item).await {
            Ok(true) => {
                artifacts.list_mut(kind)[index].sent = true;
                debug!(%kind, name = %item.name, "artifact_upload: image acknowledged");

                if let Err(err) = uploader.checkpoint(artifacts).await {
                    warn!(%kind, name = %item.name, error = %err, "artifact_upload: failed to checkpoint sent flag");
                }
            }
            Ok(false) => {
                summary.failed += 1;
                warn!(%kind, name = %item.name, "artifact_upload: backend did not acknowledge image");
            }
            Err(err) => {
                summary.failed += 1;
                warn!(%kind, name = %item.name, error = %err, "artifact_upload: image upload failed");
            }
        }
    }

    summary.sent_count = artifacts.sent_count();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::interfaces::artifact_uploader::MockArtifactUploader,
        domain::{
            errors::TransportError,
            value_objects::{artifacts::ArtifactUploadStatus, enums::artifact_kinds::ArtifactKind},
        },
    };

    fn artifacts(sent: &[&str], unsent: &[&str]) -> DeliveryArtifacts {
        let mut evidence: Vec<ArtifactUploadStatus> = sent
            .iter()
            .map(|name| ArtifactUploadStatus {
                name: name.to_string(),
                sent: true,
            })
            .collect();
        evidence.extend(unsent.iter().map(|name| ArtifactUploadStatus::pending(*name)));
        DeliveryArtifacts {
            evidence,
            invoices: vec![ArtifactUploadStatus::pending("invoice.jpg")],
            incidents: vec![],
        }
    }

    #[tokio::test]
    async fn skips_items_already_sent() {
        let mut items = artifacts(&["e1.jpg", "e2.jpg"], &["e3.jpg"]);

        let mut uploader = MockArtifactUploader::new();
        uploader
            .expect_upload()
            .withf(|_, item: &ArtifactUploadStatus| item.name == "e3.jpg" || item.name == "invoice.jpg")
            .times(2)
            .returning(|_, _| Ok(true));
        uploader.expect_checkpoint().times(2).returning(|_| Ok(()));

        let summary = upload_all(&mut items, &uploader).await;

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.sent_count, 4);
        assert_eq!(summary.total, 4);
        assert!(summary.is_complete());
        assert!(items.all_sent());
    }

    #[tokio::test]
    async fn keeps_going_after_a_failed_item() {
        let mut items = artifacts(&[], &["e1.jpg", "e2.jpg"]);

        let mut uploader = MockArtifactUploader::new();
        uploader
            .expect_upload()
            .times(3)
            .returning(|kind, item| match (kind, item.name.as_str()) {
                (ArtifactKind::Evidence, "e1.jpg") => Err(TransportError::connection("timeout")),
                (ArtifactKind::Evidence, "e2.jpg") => Ok(false),
                _ => Ok(true),
            });
        uploader.expect_checkpoint().times(1).returning(|_| Ok(()));

        let summary = upload_all(&mut items, &uploader).await;

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.sent_count, 1);
        assert!(!summary.is_complete());
        assert!(!items.evidence[0].sent);
        assert!(!items.evidence[1].sent);
        assert!(items.invoices[0].sent);
    }

    #[tokio::test]
    async fn checkpoint_failure_does_not_undo_the_ack() {
        let mut items = artifacts(&[], &[]);

        let mut uploader = MockArtifactUploader::new();
        uploader.expect_upload().returning(|_, _| Ok(true));
        uploader.expect_checkpoint().returning(|_| {
            Err(crate::domain::errors::RecordStoreError::Backend(
                "disk full".to_string(),
            ))
        });

        let summary = upload_all(&mut items, &uploader).await;

        assert!(summary.is_complete());
        assert!(items.invoices[0].sent);
    }
}
