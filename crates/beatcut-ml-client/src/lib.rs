//! Client for the text embedding service.
//!
//! Style descriptions are turned into vectors by an external model server;
//! the catalog ranks clips by cosine similarity against those vectors.

pub mod client;
pub mod error;
pub mod types;

pub use client::{EmbeddingClient, EmbeddingClientConfig};
pub use error::{MlError, MlResult};
pub use types::{EmbedRequest, EmbedResponse, HealthResponse};
