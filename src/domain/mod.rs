pub mod entities;
pub mod errors;
pub mod repositories;
pub mod sync_state_machine;
pub mod value_objects;
