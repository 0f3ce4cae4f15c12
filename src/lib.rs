//! Jewelkeep, a jewelry inventory catalog server.
//!
//! An HTTP catalog of jewelry items with descriptive attributes, an
//! ordered image gallery per item, and shared tags. The core is the
//! image ingestion pipeline: normalize uploaded bytes, persist them
//! under random names in the media store, and keep each item's gallery
//! positions contiguous across appends, reorders, and deletions.

pub mod api;
pub mod catalog;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod media;
pub mod server;
