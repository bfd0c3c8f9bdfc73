//! Caching image proxy with face-aware cover cropping.

pub mod cache;
pub mod config;
pub mod http;
pub mod imaging;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resilience;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use imaging::ImageRole;
pub use lifecycle::Shutdown;
pub use proxy::ImageProxy;
