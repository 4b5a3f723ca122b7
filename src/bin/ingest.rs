//! Wholesale index rebuild for the support knowledge domains.
//!
//! Reads the raw artifacts produced by the scraping and PDF-extraction
//! pipelines and replaces the per-domain passage collections. Run for one
//! domain or both; any malformed record fails the build for its domain.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tracing::{info, warn};

use support_rag_service::config::{Config, IndexBackend};
use support_rag_service::embedding::FastembedEmbedder;
use support_rag_service::index::{
    connect_qdrant, InMemoryPassageIndex, PassageIndex, QdrantPassageIndex,
};
use support_rag_service::knowledge::builder::{DocumentBuilder, SourcePaths};
use support_rag_service::knowledge::Domain;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DomainArg {
    Angelone,
    Insurance,
}

impl From<DomainArg> for Domain {
    fn from(arg: DomainArg) -> Self {
        match arg {
            DomainArg::Angelone => Domain::AngelOne,
            DomainArg::Insurance => Domain::Insurance,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "ingest",
    about = "Rebuild the per-domain passage indexes from raw source artifacts"
)]
struct Args {
    /// Domain to rebuild; omit to rebuild both.
    #[arg(long, value_enum)]
    domain: Option<DomainArg>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "support_rag_service=info,ingest=info".into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = Config::from_env();

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
            warn!("In-memory index backend selected; the build will not outlive this process");
            Arc::new(InMemoryPassageIndex::new())
        }
    };

    let embedder = Arc::new(FastembedEmbedder::new(
        &config.embedding_model,
        config.embedding_dim,
    )?);

    let builder = DocumentBuilder::new(
        index,
        embedder,
        SourcePaths {
            faq_pairs: config.faq_pairs_path.clone(),
            plans: config.plans_path.clone(),
            notes: config.notes_path.clone(),
        },
    );

    let domains: Vec<Domain> = match args.domain {
        Some(arg) => vec![arg.into()],
        None => Domain::all().to_vec(),
    };

    for domain in domains {
        let summary = builder.build(domain).await?;
        info!(
            domain = %summary.domain,
            passages = summary.passages,
            "Domain index rebuilt"
        );
    }

    Ok(())
}
