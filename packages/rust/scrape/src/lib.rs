//! Announcement scraping: document retrieval plus row-to-event mapping.
//!
//! This crate provides:
//! - [`row`] — the row parser turning one table row into an [`kyukou_shared::Event`]
//! - [`fetch`] — the HTTP fetch pipeline that selects and maps table rows

pub mod fetch;
pub mod row;

pub use fetch::{RowResult, Scraper, parse_document};
pub use row::{RawRow, RowError, SourceContext, parse_row};
