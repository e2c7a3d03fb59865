//! Request handler module
//!
//! Routing dispatch and file resolution for the resource server.

pub mod files;
pub mod router;

pub use router::handle_request;
