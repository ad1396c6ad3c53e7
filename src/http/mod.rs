//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, upstream target)
//!     → capture sink (request body)
//!     → upstream via hyper client
//!     → capture sink (response body, optionally redacted)
//!     → response.rs (hop-by-hop stripping, error mapping)
//!     → Send to device
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use response::ProxyError;
pub use server::HttpServer;
