pub mod delivery_transport;
pub mod order_feed;
pub mod record_store;
