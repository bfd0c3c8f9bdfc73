//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, handlers)
//!     → request.rs (request ID, query parsing)
//!     → proxy::ImageProxy (cache, fetch, crop)
//!     → response.rs (JPEG, upstream relay, or error mapping)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, ImageQuery, MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
