pub mod artifact_kinds;
pub mod background_fetch_results;
pub mod delivery_types;
pub mod sync_events;
pub mod sync_states;
