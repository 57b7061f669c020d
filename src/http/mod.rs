//! HTTP/1.x protocol implementation.
//!
//! # Architecture
//!
//! - **`reader`**: Buffered byte reader with CRLF line reads
//! - **`headers`**: Header map and header block parser
//! - **`body`**: Body stream contracts and plain body streams
//! - **`chunked`**: Chunked transfer coding, both directions
//! - **`encoding`**: Registry of transfer/content codings (`chunked`, `gzip`, `deflate`)
//! - **`parser`**: Request line, headers and body framing
//! - **`request`**: HTTP request representation and accessors
//! - **`response`**: HTTP response representation with builder pattern
//! - **`mime`**: Media types and `Accept` negotiation
//! - **`cookie`**: Request and response cookies
//! - **`preparer`**: Mandatory response headers
//! - **`writer`**: Serializes responses and decides connection persistence
//! - **`connection`**: Per-connection request/response loop
//! - **`error`**: Protocol errors and their status codes
//!
//! # Connection Loop
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Parse request head, attach body stream
//!        └──────┬──────┘
//!               │ Request parsed        (unreadable input → Closed, no response)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Route and run the handler
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Prepare headers, frame and send the body
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → drain body → Reading (same connection)
//!               └─ Close → Closed
//! ```

pub mod body;
pub mod chunked;
pub mod connection;
pub mod cookie;
pub mod encoding;
pub mod error;
pub mod headers;
pub mod mime;
pub mod parser;
pub mod preparer;
pub mod reader;
pub mod request;
pub mod response;
pub mod writer;

pub use error::HttpError;
