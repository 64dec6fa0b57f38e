//! Query embeddings shared between the pipeline and the catalog.
//!
//! The catalog is built once with a [`SharedEmbeddings`] handle attached; the
//! pipeline fills it per run before clip selection starts.

use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use beatcut_catalog::{EmbeddingCache, TextEmbedder};
use beatcut_ml_client::EmbeddingClient;

/// Cloneable handle to one embedding cache.
#[derive(Debug, Clone, Default)]
pub struct SharedEmbeddings {
    inner: Arc<RwLock<EmbeddingCache>>,
}

impl SharedEmbeddings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle suitable for `with_embedder` on a catalog.
    pub fn as_embedder(&self) -> Arc<dyn TextEmbedder + Send + Sync> {
        Arc::new(self.clone())
    }

    /// Cache `vector` for `text`. Returns false when the cache is poisoned
    /// and the vector was dropped.
    pub fn insert(&self, text: &str, vector: Vec<f32>) -> bool {
        match self.inner.write() {
            Ok(mut cache) => {
                cache.insert(text.trim(), vector);
                true
            }
            Err(_) => {
                warn!(text = %text, "Embedding cache lock poisoned, vector dropped");
                false
            }
        }
    }

    pub fn contains(&self, text: &str) -> bool {
        self.inner
            .read()
            .map(|cache| cache.contains(text.trim()))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TextEmbedder for SharedEmbeddings {
    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        self.inner.read().ok()?.embed(text)
    }
}

/// Fetch a vector for every query not cached yet, one request at a time.
///
/// A failed request leaves that query unranked. Returns how many vectors are
/// available for `queries` afterwards.
pub async fn precompute_embeddings(
    client: &EmbeddingClient,
    queries: &[String],
    cache: &SharedEmbeddings,
) -> usize {
    let mut available = 0;
    for query in queries {
        if cache.contains(query) {
            available += 1;
            continue;
        }
        match client.embed_text(query).await {
            Ok(vector) if !vector.is_empty() => {
                debug!(query = %query, dims = vector.len(), "Embedded style description");
                if cache.insert(query, vector) {
                    available += 1;
                }
            }
            Ok(_) => warn!(query = %query, "Embedding service returned an empty vector"),
            Err(e) => warn!(
                query = %query,
                error = %e,
                "Failed to embed style description, falling back to filter-only selection"
            ),
        }
    }
    available
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatcut_ml_client::EmbeddingClientConfig;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_shared_cache_visible_through_embedder() {
        let shared = SharedEmbeddings::new();
        let embedder = shared.as_embedder();
        assert!(embedder.embed("night").is_none());

        assert!(shared.insert(" night ", vec![1.0, 0.0]));
        assert_eq!(embedder.embed("night"), Some(vec![1.0, 0.0]));
        assert!(shared.contains("night"));
        assert_eq!(shared.len(), 1);
    }

    #[tokio::test]
    async fn test_precompute_skips_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed/text"))
            .and(body_json(serde_json::json!({"text": "flashing lights"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"embedding": [0.1, 0.2]})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/embed/text"))
            .and(body_json(serde_json::json!({"text": "quiet chapel"})))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(EmbeddingClientConfig::new(server.uri()).with_max_retries(0)).unwrap();
        let cache = SharedEmbeddings::new();
        let queries = vec!["flashing lights".to_string(), "quiet chapel".to_string()];

        let available = precompute_embeddings(&client, &queries, &cache).await;
        assert_eq!(available, 1);
        assert!(cache.contains("flashing lights"));
        assert!(!cache.contains("quiet chapel"));

        // cached queries are not requested again
        let queries = vec!["flashing lights".to_string()];
        assert_eq!(precompute_embeddings(&client, &queries, &cache).await, 1);
    }

    fn poison(shared: &SharedEmbeddings) {
        let inner = Arc::clone(&shared.inner);
        let result = std::thread::spawn(move || {
            let _guard = inner.write().unwrap();
            panic!("writer panicked while holding the cache");
        })
        .join();
        assert!(result.is_err());
    }

    #[test]
    fn test_insert_into_poisoned_cache_reports_failure() {
        let shared = SharedEmbeddings::new();
        poison(&shared);

        assert!(!shared.insert("night", vec![1.0, 0.0]));
        assert!(!shared.contains("night"));
        assert!(shared.is_empty());
    }

    #[tokio::test]
    async fn test_precompute_does_not_count_dropped_vectors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed/text"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"embedding": [0.1, 0.2]})))
            .expect(1)
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(EmbeddingClientConfig::new(server.uri()).with_max_retries(0)).unwrap();
        let cache = SharedEmbeddings::new();
        poison(&cache);

        let queries = vec!["flashing lights".to_string()];
        assert_eq!(precompute_embeddings(&client, &queries, &cache).await, 0);
    }
}
