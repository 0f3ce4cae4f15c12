//! Relational catalog: items, gallery images, shared tags
pub mod gallery;
pub mod items;
pub mod models;
pub mod tags;
