//! Listing Module
//!
//! Directory-style, one-page-at-a-time listing over object storage.
//!
//! Pagination is driven by the caller:
//! `Initial (no token) -> HasMore (token) -> ... -> Exhausted (no token)`.
//! Each step is one call to [`ListingService::list_page`] with the token
//! returned by the previous step.

mod page;
mod service;

pub use page::PageResult;
pub use service::ListingService;
