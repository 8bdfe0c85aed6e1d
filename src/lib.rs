pub mod application;
pub mod background_worker;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod observability;
pub mod services;
