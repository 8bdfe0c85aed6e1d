pub mod background_sync;
pub mod connectivity;
pub mod deliveries;
pub mod open_orders;
pub mod records;
