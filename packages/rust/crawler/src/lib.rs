//! Web-page fetching and text extraction.
//!
//! This crate provides:
//! - [`engine`] — batched, bounded-concurrency page fetching with SSRF protection
//! - [`extract`] — paragraph and heading text extraction from HTML
//! - [`WebExtractor`] — turns a subject's non-reference URLs into documents

pub mod engine;
pub mod extract;
mod web;

pub use engine::{FetchedPage, Fetcher, normalize_url};
pub use extract::{BLOCK_SEPARATOR, PageText, extract_text};
pub use web::WebExtractor;
