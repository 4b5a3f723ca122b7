use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use support_rag_service::api::{self, AppState};
use support_rag_service::config::{Config, IndexBackend};
use support_rag_service::embedding::FastembedEmbedder;
use support_rag_service::index::{
    connect_qdrant, InMemoryPassageIndex, PassageIndex, QdrantPassageIndex,
};
use support_rag_service::knowledge::pipeline::QueryPipeline;
use support_rag_service::knowledge::retriever::Retriever;
use support_rag_service::knowledge::router::DomainRouter;
use support_rag_service::knowledge::synthesizer::AnswerSynthesizer;
use support_rag_service::llm::OpenAiCompatClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "support_rag_service=info,axum=info".into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();

    info!(
        port = config.http_port,
        backend = ?config.index_backend,
        retriever_k = config.retriever_k,
        "Initializing support RAG service"
    );

    let index: Arc<dyn PassageIndex> = match config.index_backend {
        IndexBackend::Qdrant => {
            let client = connect_qdrant(
                &config.qdrant_url,
                config.qdrant_api_key.clone(),
                config.qdrant_connect_attempts,
                config.qdrant_connect_retry_delay_ms,
            )
            .await?;
            Arc::new(QdrantPassageIndex::new(
                client,
                config.angelone_collection.clone(),
                config.insurance_collection.clone(),
                config.embedding_dim,
            ))
        }
        IndexBackend::Memory => {
            warn!("Using in-memory index backend; intended for local development only");
            Arc::new(InMemoryPassageIndex::new())
        }
    };

    let embedder = Arc::new(FastembedEmbedder::new(
        &config.embedding_model,
        config.embedding_dim,
    )?);

    let model = Arc::new(OpenAiCompatClient::new(
        config.llm_api_url.clone(),
        config.llm_api_key.clone(),
        config.llm_model.clone(),
        config.llm_timeout_secs,
    ));

    let pipeline = QueryPipeline::new(
        DomainRouter::new(model.clone()),
        Retriever::new(index, embedder, config.retriever_k),
        AnswerSynthesizer::new(model),
    );

    let state = Arc::new(AppState { pipeline });
    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
