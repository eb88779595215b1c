//! HTTP API Module
//!
//! Provides the read-only browse endpoint consumed by the web front-end.

mod http;

pub use http::{BrowseQuery, BrowseResponse, ErrorResponse, HttpServer, InvalidFieldResponse};
