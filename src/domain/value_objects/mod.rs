pub mod artifacts;
pub mod business_key;
pub mod connectivity;
pub mod enums;
pub mod sync_failures;
pub mod sync_results;
