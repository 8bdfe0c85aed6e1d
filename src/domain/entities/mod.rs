pub mod deliveries;
pub mod open_orders;
pub mod sync_records;
