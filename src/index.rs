//! Per-domain passage indexes.
//!
//! The production backend is a Qdrant collection per domain (cosine distance,
//! dense vectors). Ingestion rebuilds a collection wholesale; query time only
//! reads. An in-memory backend exists behind explicit configuration for local
//! development and tests.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, vectors::VectorsOptions, CreateCollection, Distance, PointId,
    PointStruct, SearchPoints, UpsertPoints, Value, Vector, VectorParams, Vectors, VectorsConfig,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::knowledge::{Domain, Passage, PassageMetadata};

/// Points per upsert request during a rebuild.
const UPSERT_BATCH: usize = 256;

/// Per-domain persistent nearest-neighbor store over passage vectors.
/// Built wholesale by ingestion, read-only at query time.
#[async_trait]
pub trait PassageIndex: Send + Sync {
    /// Replace the domain's collection with the given passages. `passages`
    /// and `vectors` are parallel slices; the prior contents are dropped
    /// first so stale passages never survive a rebuild.
    async fn rebuild(
        &self,
        domain: Domain,
        passages: &[Passage],
        vectors: &[Vec<f32>],
    ) -> Result<()>;

    /// Top-`k` passages by similarity to `query_vector`, best first.
    /// An unbuilt or empty collection yields an empty list, not an error.
    async fn search(
        &self,
        domain: Domain,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<Passage>>;
}

/// Connect to Qdrant with a short retry loop to ride out startup ordering
/// (service coming up before Qdrant is ready).
pub async fn connect_qdrant(
    url: &str,
    api_key: Option<String>,
    attempts: u32,
    retry_delay_ms: u64,
) -> Result<Arc<Qdrant>> {
    let client = Qdrant::from_url(url).api_key(api_key).build()?;

    for attempt in 1..=attempts {
        match client.health_check().await {
            Ok(_) => {
                info!(qdrant_url = %url, "Connected to Qdrant");
                return Ok(Arc::new(client));
            }
            Err(e) => {
                warn!(
                    attempt = attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Qdrant health check failed; retrying"
                );
                tokio::time::sleep(Duration::from_millis(retry_delay_ms)).await;
            }
        }
    }

    bail!("Failed to connect to Qdrant at {} after {} attempts", url, attempts)
}

/// Qdrant-backed index: one collection per domain.
pub struct QdrantPassageIndex {
    client: Arc<Qdrant>,
    collections: HashMap<Domain, String>,
    embedding_dim: usize,
}

impl QdrantPassageIndex {
    pub fn new(
        client: Arc<Qdrant>,
        angelone_collection: String,
        insurance_collection: String,
        embedding_dim: usize,
    ) -> Self {
        let mut collections = HashMap::new();
        collections.insert(Domain::AngelOne, angelone_collection);
        collections.insert(Domain::Insurance, insurance_collection);

        Self {
            client,
            collections,
            embedding_dim,
        }
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let collections = self
            .client
            .list_collections()
            .await
            .context("Failed to list collections")?;
        Ok(collections.collections.iter().any(|c| c.name == name))
    }

    /// Drop any prior collection and create a fresh one for this rebuild.
    async fn ensure_fresh_collection(&self, name: &str) -> Result<()> {
        if self.collection_exists(name).await? {
            self.client
                .delete_collection(name)
                .await
                .context("Failed to delete prior collection")?;
        }

        let create_collection = CreateCollection {
            collection_name: name.to_string(),
            vectors_config: Some(VectorsConfig {
                config: Some(qdrant_client::qdrant::vectors_config::Config::Params(
                    VectorParams {
                        size: self.embedding_dim as u64,
                        distance: Distance::Cosine as i32,
                        ..Default::default()
                    },
                )),
            }),
            ..Default::default()
        };

        self.client
            .create_collection(create_collection)
            .await
            .context("Failed to create collection")?;

        Ok(())
    }
}

#[async_trait]
impl PassageIndex for QdrantPassageIndex {
    async fn rebuild(
        &self,
        domain: Domain,
        passages: &[Passage],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        if passages.len() != vectors.len() {
            bail!(
                "passage/vector count mismatch: {} vs {}",
                passages.len(),
                vectors.len()
            );
        }

        let name = self.collections[&domain].clone();
        self.ensure_fresh_collection(&name).await?;

        for (passage_chunk, vector_chunk) in
            passages.chunks(UPSERT_BATCH).zip(vectors.chunks(UPSERT_BATCH))
        {
            let points: Vec<PointStruct> = passage_chunk
                .iter()
                .zip(vector_chunk)
                .map(|(passage, vector)| {
                    let mut payload: HashMap<String, Value> = HashMap::new();
                    payload.insert("content".to_string(), string_value(passage.content.clone()));
                    payload.insert(
                        "source".to_string(),
                        string_value(passage.metadata.source.clone()),
                    );
                    if let Some(kind) = &passage.metadata.kind {
                        payload.insert("type".to_string(), string_value(kind.clone()));
                    }
                    payload.insert(
                        "ingested_at".to_string(),
                        string_value(Utc::now().to_rfc3339()),
                    );

                    PointStruct {
                        id: Some(PointId {
                            point_id_options: Some(PointIdOptions::Uuid(
                                Uuid::new_v4().to_string(),
                            )),
                        }),
                        vectors: Some(Vectors {
                            vectors_options: Some(VectorsOptions::Vector(Vector::new_dense(
                                vector.clone(),
                            ))),
                        }),
                        payload,
                    }
                })
                .collect();

            self.client
                .upsert_points(UpsertPoints {
                    collection_name: name.clone(),
                    points,
                    ..Default::default()
                })
                .await
                .context("Failed to upsert points")?;
        }

        info!(
            domain = %domain,
            collection = %name,
            points = passages.len(),
            "Collection rebuilt"
        );

        Ok(())
    }

    async fn search(
        &self,
        domain: Domain,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<Passage>> {
        let name = &self.collections[&domain];

        // A collection that was never built reads as an empty corpus.
        if !self.collection_exists(name).await? {
            return Ok(Vec::new());
        }

        let search_points = SearchPoints {
            collection_name: name.clone(),
            vector: query_vector.to_vec(),
            limit: k as u64,
            with_payload: Some(true.into()),
            ..Default::default()
        };

        let search_results = self
            .client
            .search_points(search_points)
            .await
            .context("Failed to search points")?;

        let passages = search_results
            .result
            .into_iter()
            .map(|scored_point| {
                let payload = scored_point.payload;
                let content = payload
                    .get("content")
                    .map(extract_string_value)
                    .unwrap_or_default();
                let source = payload
                    .get("source")
                    .map(extract_string_value)
                    .unwrap_or_default();
                let kind = payload.get("type").map(extract_string_value);

                Passage {
                    content,
                    metadata: PassageMetadata { source, kind },
                }
            })
            .collect();

        Ok(passages)
    }
}

fn string_value(s: String) -> Value {
    Value {
        kind: Some(qdrant_client::qdrant::value::Kind::StringValue(s)),
    }
}

fn extract_string_value(value: &Value) -> String {
    use qdrant_client::qdrant::value::Kind;

    match value.kind.as_ref() {
        Some(Kind::StringValue(s)) => s.clone(),
        Some(Kind::IntegerValue(i)) => i.to_string(),
        Some(Kind::DoubleValue(d)) => d.to_string(),
        Some(Kind::BoolValue(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Development/test backend: a cosine scan over passages held in memory.
/// Selected only through explicit configuration, never as a fallback.
#[derive(Default)]
pub struct InMemoryPassageIndex {
    store: RwLock<HashMap<Domain, Vec<(Passage, Vec<f32>)>>>,
}

impl InMemoryPassageIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PassageIndex for InMemoryPassageIndex {
    async fn rebuild(
        &self,
        domain: Domain,
        passages: &[Passage],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        if passages.len() != vectors.len() {
            bail!(
                "passage/vector count mismatch: {} vs {}",
                passages.len(),
                vectors.len()
            );
        }

        let entries: Vec<(Passage, Vec<f32>)> = passages
            .iter()
            .cloned()
            .zip(vectors.iter().cloned())
            .collect();

        self.store.write().await.insert(domain, entries);
        Ok(())
    }

    async fn search(
        &self,
        domain: Domain,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<Passage>> {
        let store = self.store.read().await;
        let Some(entries) = store.get(&domain) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(f32, &Passage)> = entries
            .iter()
            .map(|(passage, vector)| (cosine_similarity(query_vector, vector), passage))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, passage)| passage.clone())
            .collect())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
