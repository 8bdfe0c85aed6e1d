pub mod axum_http;
pub mod http_client;
pub mod kv_store;
pub mod repositories;
