use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::deliveries::DeliveryMetadataPayload,
    errors::TransportError,
    value_objects::{artifacts::ArtifactRef, business_key::BusinessKey},
};

#[automock]
#[async_trait]
pub trait DeliveryTransport {
    /// Fails on anything but a 2xx answer.
    async fn submit_delivery_metadata(
        &self,
        payload: &DeliveryMetadataPayload,
    ) -> Result<(), TransportError>;

    /// `Ok(true)` only when the backend acknowledged the image.
    async fn upload_artifact(
        &self,
        key: &BusinessKey,
        artifact: &ArtifactRef,
    ) -> Result<bool, TransportError>;

    /// Any HTTP answer counts as reachable; only connection failures are errors.
    async fn probe_health(&self) -> Result<(), TransportError>;
}
