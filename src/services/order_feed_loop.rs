use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tracing::{error, info};

use crate::application::usecases::refresh_open_orders::RefreshOpenOrdersUseCase;

pub async fn run_order_feed_loop(
    usecase: Arc<RefreshOpenOrdersUseCase>,
    interval: Duration,
) -> Result<()> {
    info!(interval_secs = interval.as_secs(), "order_feed: loop started");
    loop {
        match usecase.refresh().await {
            Ok(0) => info!("order_feed: no new open orders"),
            Ok(appended) => info!(appended, "order_feed: open orders refreshed"),
            Err(e) => error!("order_feed: failed to refresh open orders: {}", e),
        }

        tokio::time::sleep(interval).await;
    }
}
