// Library for tests to access modules

pub mod api_client;
pub mod cache_store;
pub mod config;
pub mod context;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod reconciler;
pub mod render;
pub mod scheduler;
pub mod stream;
pub mod ui_state;
pub mod version;
