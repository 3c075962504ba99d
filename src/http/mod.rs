//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer stack)
//!     → request.rs (request id for correlation)
//!     → security + auth middleware
//!     → routes.rs / admin
//!     → response.rs (denials rendered as JSON errors)
//! ```

pub mod request;
pub mod response;
pub mod routes;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{error_response, DenialKind, ErrorBody, ErrorResponse};
pub use server::{AppState, HttpServer};
