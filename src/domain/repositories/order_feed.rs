use async_trait::async_trait;
use mockall::automock;

use crate::domain::{entities::open_orders::OpenOrderGroup, errors::TransportError};

#[automock]
#[async_trait]
pub trait OrderFeed {
    async fn fetch_open_orders(&self) -> Result<Vec<OpenOrderGroup>, TransportError>;
}
