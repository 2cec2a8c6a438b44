//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → origin.rs (caller base → upstream base)
//!     → client.rs (single forwarded call, buffered response)
//!     → UpstreamResponse handed to the content-type router
//! ```
//!
//! # Design Decisions
//! - Exactly one upstream origin per process
//! - URL mapping is prefix substitution, not URL parsing
//! - The client handle is cloned into every request; it holds no
//!   per-request state

pub mod client;
pub mod origin;

pub use client::{UpstreamClient, UpstreamRequest, UpstreamResponse};
pub use origin::UrlRewriter;
