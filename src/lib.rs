//! Tessera - embeddable HTTP/1.x server engine
//!
//! Byte-stream reading, request parsing, transfer codings, routing and
//! response writing for applications that plug in their own handlers.

pub mod config;
pub mod http;
pub mod routing;
pub mod server;
