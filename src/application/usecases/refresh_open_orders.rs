use std::sync::Arc;

use tracing::info;

use crate::domain::{
    entities::open_orders::OpenOrderGroup,
    errors::SyncError,
    repositories::{order_feed::OrderFeed, record_store::RecordStore},
};

pub struct RefreshOpenOrdersUseCase {
    store: Arc<dyn RecordStore + Send + Sync>,
    feed: Arc<dyn OrderFeed + Send + Sync>,
}

impl RefreshOpenOrdersUseCase {
    pub fn new(
        store: Arc<dyn RecordStore + Send + Sync>,
        feed: Arc<dyn OrderFeed + Send + Sync>,
    ) -> Self {
        Self { store, feed }
    }

    /// Pulls the backend feed and folds it into the local cache. Returns the
    /// number of deliveries and line items appended.
    pub async fn refresh(&self) -> Result<usize, SyncError> {
        let incoming = self.feed.fetch_open_orders().await?;
        let groups = incoming.len();
        if groups == 0 {
            return Ok(0);
        }

        let appended = self.store.merge_incoming_orders(incoming).await?;
        info!(groups, appended, "refresh_open_orders: feed merged");
        Ok(appended)
    }

    pub async fn list_open_orders(&self) -> Result<Vec<OpenOrderGroup>, SyncError> {
        Ok(self.store.list_open_orders().await?)
    }
}
