//! Static blog front-end for a headless CMS.
//!
//! [`listing::ListingController`] keeps the incrementally paginated post
//! listing; [`format`] holds date formatting and reading-time estimation.

pub mod catalog;
pub mod config;
pub mod format;
pub mod listing;
pub mod post;
pub mod prismic;
pub mod render;
pub mod richtext;
