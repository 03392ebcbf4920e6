//! Data model for the catalog crawl
//!
//! # Components
//!
//! - `api`: shapes of the API responses the crawler decodes
//! - `Artist`, `Album`, `Track`: flat output records
//! - `Provenance`: per-run metadata shared by every record

pub mod api;
mod provenance;
mod records;

pub use provenance::Provenance;
pub use records::{Album, Artist, EntityRef, Track};
