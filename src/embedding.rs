//! Text embedding behind a trait so ingestion and retrieval share one vector
//! space and tests can supply a deterministic embedder.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Longest text handed to the model in one call; passages beyond this are
/// truncated at a char boundary.
const MAX_TEXT_CHARS: usize = 8000;

/// Text-to-vector boundary. An implementation must be deterministic for a
/// fixed model so a rebuilt index stays comparable with query vectors.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    fn dim(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Batch embedding used by ingestion; output order matches input order.
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(&text).await?);
        }
        Ok(out)
    }
}

/// Local embedding via fastembed. The model is loaded once and shared;
/// inference is CPU-bound and runs under `spawn_blocking`.
pub struct FastembedEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    dim: usize,
}

impl FastembedEmbedder {
    pub fn new(model_name: &str, dim: usize) -> Result<Self> {
        let model_type: EmbeddingModel = match model_name {
            "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
                EmbeddingModel::AllMiniLML6V2
            }
            "BAAI/bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "BAAI/bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            other => bail!("unsupported embedding model: {}", other),
        };

        let init_options = TextInitOptions::new(model_type).with_show_download_progress(false);
        let model =
            TextEmbedding::try_new(init_options).context("Failed to initialize embedding model")?;

        info!(model = model_name, dim = dim, "Embedding model initialized");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dim,
        })
    }
}

#[async_trait]
impl TextEmbedder for FastembedEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vectors = self.embed_batch(vec![text.to_string()]).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("embedding model returned no vectors"))
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let expected = texts.len();

        let embeddings = tokio::task::spawn_blocking(move || {
            let truncated: Vec<String> =
                texts.iter().map(|t| truncate(t).to_string()).collect();
            let mut model = model.lock().unwrap();
            model
                .embed(truncated, None)
                .map_err(|e| anyhow!("embedding inference failed: {}", e))
        })
        .await
        .context("embedding task join error")??;

        if embeddings.len() != expected {
            bail!(
                "embedding model returned {} vectors for {} inputs",
                embeddings.len(),
                expected
            );
        }
        for embedding in &embeddings {
            if embedding.len() != self.dim {
                bail!(
                    "embedding dimension mismatch: got {}, expected {}",
                    embedding.len(),
                    self.dim
                );
            }
        }

        Ok(embeddings)
    }
}

fn truncate(text: &str) -> &str {
    if text.len() <= MAX_TEXT_CHARS {
        return text;
    }
    let mut end = MAX_TEXT_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
