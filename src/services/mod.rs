pub mod connectivity_monitor;
pub mod order_feed_loop;
