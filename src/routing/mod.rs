//! Request routing.
//!
//! - **`path`**: compiles `{param}` path templates into matchers
//! - **`router`**: the routing table and dispatch by method, `Accept` and path

pub mod path;
pub mod router;

pub use path::CompiledPath;
pub use router::{Handler, Router, RoutingEntry, RoutingTable, handler};
