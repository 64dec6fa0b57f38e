//! Tagged clip catalog.
//!
//! This crate provides:
//! - The `ClipRepository` trait the clip selector queries
//! - Filter semantics shared by every backend (tags, entities, signals, scope)
//! - An in-memory catalog for tests and small fixed sets
//! - A SQLite catalog with a reference schema
//! - Semantic ranking against stored clip embeddings
//! - Data directory layout and clip file resolution

pub mod error;
pub mod filter;
pub mod layout;
pub mod memory;
pub mod repository;
pub mod semantic;
pub mod sqlite;

pub use error::{CatalogError, CatalogResult};
pub use layout::DataLayout;
pub use memory::InMemoryCatalog;
pub use repository::{CandidateOrder, CandidateRequest, ClipRepository};
pub use semantic::{cosine_similarity, EmbeddingCache, TextEmbedder};
pub use sqlite::SqliteCatalog;
