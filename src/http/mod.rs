//! HTTP protocol layer module
//!
//! Response builders, content types and cache validators, independent of routing.

pub mod cache;
pub mod mime;
pub mod response;

pub use response::{
    build_304_response, build_404_response, build_405_response, build_500_response,
    build_file_response, build_json_404_response, build_mount_response, HttpResponse,
};
