use async_trait::async_trait;
use mockall::automock;

#[automock]
#[async_trait]
pub trait ConnectivityCheck {
    /// True only when the backend answered a lightweight probe.
    async fn check_connection(&self) -> bool;
}
