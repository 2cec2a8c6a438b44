//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, handler)
//!     → request.rs (request ID, caller base, InboundRequest)
//!     → [pipeline forwards upstream]
//!     → headers.rs (exclusion policy both ways)
//!     → content_type.rs (html vs pass-through, charset)
//!     → response.rs (OutboundResponse → axum Response)
//!     → Send to client
//! ```

pub mod content_type;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{InboundRequest, X_REQUEST_ID};
pub use response::OutboundResponse;
pub use server::HttpServer;
