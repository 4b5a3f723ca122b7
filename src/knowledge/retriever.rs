use std::sync::Arc;
use tracing::debug;

use crate::embedding::TextEmbedder;
use crate::error::{Error, Result};
use crate::index::PassageIndex;
use crate::knowledge::{Domain, Passage};

/// Read-only retrieval against a domain's index: embed the query, return the
/// top-`k` passages by similarity. `k` is deployment configuration.
pub struct Retriever {
    index: Arc<dyn PassageIndex>,
    embedder: Arc<dyn TextEmbedder>,
    k: usize,
}

impl Retriever {
    pub fn new(index: Arc<dyn PassageIndex>, embedder: Arc<dyn TextEmbedder>, k: usize) -> Self {
        Self { index, embedder, k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Fewer than `k` passages come back when the index holds fewer; an
    /// empty index yields an empty list, never an error.
    pub async fn retrieve(&self, domain: Domain, query: &str) -> Result<Vec<Passage>> {
        let query_vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| Error::IndexUnavailable(format!("query embedding failed: {e}")))?;

        let passages = self
            .index
            .search(domain, &query_vector, self.k)
            .await
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?;

        debug!(
            domain = %domain,
            k = self.k,
            retrieved = passages.len(),
            "Retrieved passages"
        );

        Ok(passages)
    }
}
