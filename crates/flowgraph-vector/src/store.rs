// Vector Store Adapter: a persistent per-collection document sidecar plus
// an in-memory HNSW index rebuilt from it on each query.
//
// We persist the one thing that's expensive to recompute (embeddings) and
// rebuild the graph on load rather than round-tripping hnsw_rs's own graph
// file format, which keeps the on-disk shape a plain, inspectable
// msgpack document instead of an opaque index blob.

use std::path::{Path, PathBuf};

use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CollectionFile {
    chunks: Vec<String>,
    embeddings: Vec<Vec<f32>>,
}

#[derive(Clone)]
pub struct VectorStore {
    base_dir: PathBuf,
}

impl VectorStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn sidecar_path(&self, collection_name: &str) -> PathBuf {
        self.base_dir.join(format!("{collection_name}.msgpack"))
    }

    async fn load(&self, collection_name: &str) -> Result<Option<CollectionFile>> {
        match tokio::fs::read(self.sidecar_path(collection_name)).await {
            Ok(bytes) => Ok(Some(rmp_serde::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Append chunks and their embeddings to `collection_name`, creating it on first use.
    pub async fn ingest(&self, collection_name: &str, chunks: Vec<String>, embeddings: Vec<Vec<f32>>) -> Result<usize> {
        let mut file = self.load(collection_name).await?.unwrap_or_default();
        file.chunks.extend(chunks);
        file.embeddings.extend(embeddings);
        let total = file.chunks.len();

        tokio::fs::create_dir_all(&self.base_dir).await?;
        let bytes = rmp_serde::to_vec(&file)?;
        tokio::fs::write(self.sidecar_path(collection_name), bytes).await?;
        Ok(total)
    }

    /// Top-`top_k` chunks by cosine similarity to `query_embedding`.
    /// A missing collection succeeds with an empty result, not an error.
    pub async fn query(&self, collection_name: &str, query_embedding: &[f32], top_k: usize) -> Result<Vec<(String, f32)>> {
        let Some(file) = self.load(collection_name).await? else {
            return Ok(Vec::new());
        };
        if file.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let hnsw: Hnsw<f32, DistCosine> = Hnsw::new(16, file.embeddings.len(), 16, 200, DistCosine {});
        for (idx, embedding) in file.embeddings.iter().enumerate() {
            hnsw.insert((embedding.as_slice(), idx));
        }

        let k = top_k.min(file.chunks.len()).max(1);
        let neighbours = hnsw.search(query_embedding, k, 64);
        Ok(neighbours
            .into_iter()
            .map(|n| (file.chunks[n.d_id].clone(), 1.0 - n.distance))
            .collect())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn scratch_dir() -> PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        std::env::temp_dir().join(format!("flowgraph-vector-test-{}-{}", std::process::id(), COUNTER.fetch_add(1, Ordering::SeqCst)))
    }

    #[tokio::test]
    async fn query_on_missing_collection_is_empty_not_error() {
        let store = VectorStore::new(scratch_dir());
        let results = store.query("nonexistent", &[0.1, 0.2], 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn ingest_then_query_returns_closest_chunk_first() {
        let store = VectorStore::new(scratch_dir());
        store
            .ingest(
                "docs",
                vec!["about cats".to_string(), "about dogs".to_string(), "about rockets".to_string()],
                vec![vec![1.0, 0.0, 0.0], vec![0.9, 0.1, 0.0], vec![0.0, 0.0, 1.0]],
            )
            .await
            .unwrap();

        let results = store.query("docs", &[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "about cats");
    }

    #[tokio::test]
    async fn ingest_appends_across_calls() {
        let store = VectorStore::new(scratch_dir());
        store.ingest("docs", vec!["first".to_string()], vec![vec![1.0, 0.0]]).await.unwrap();
        let total = store.ingest("docs", vec!["second".to_string()], vec![vec![0.0, 1.0]]).await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn top_k_is_clamped_to_collection_size() {
        let store = VectorStore::new(scratch_dir());
        store.ingest("docs", vec!["only one".to_string()], vec![vec![1.0, 0.0]]).await.unwrap();
        let results = store.query("docs", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
    }
}
