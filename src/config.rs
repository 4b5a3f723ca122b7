use std::env;
use std::path::PathBuf;

/// Which backend serves the per-domain passage collections.
///
/// Qdrant is the production backend. The in-memory backend exists for local
/// development without a running Qdrant and is never selected implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBackend {
    Qdrant,
    Memory,
}

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,

    pub index_backend: IndexBackend,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub qdrant_connect_attempts: u32,
    pub qdrant_connect_retry_delay_ms: u64,
    pub angelone_collection: String,
    pub insurance_collection: String,

    pub llm_api_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,

    pub embedding_model: String,
    pub embedding_dim: usize,

    /// Number of passages fetched per query. Deployment-fixed, default 10.
    pub retriever_k: usize,

    pub faq_pairs_path: PathBuf,
    pub plans_path: PathBuf,
    pub notes_path: PathBuf,
}

impl Config {
    /// Read configuration from the environment. Call after `dotenvy::dotenv()`.
    pub fn from_env() -> Self {
        let http_port = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("HTTP_PORT must be a valid port number");

        let index_backend = match env::var("INDEX_BACKEND")
            .unwrap_or_else(|_| "qdrant".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => IndexBackend::Memory,
            _ => IndexBackend::Qdrant,
        };

        // Trim URLs defensively; env vars are easy to set with trailing whitespace.
        let qdrant_url = env::var("QDRANT_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
            .trim()
            .to_string();

        let qdrant_connect_attempts = env::var("QDRANT_CONNECT_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let qdrant_connect_retry_delay_ms = env::var("QDRANT_CONNECT_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1000);

        let llm_api_url = env::var("LLM_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string())
            .trim()
            .to_string();

        let embedding_dim = env::var("EMBEDDING_MODEL_DIM")
            .unwrap_or_else(|_| "384".to_string())
            .parse::<usize>()
            .expect("EMBEDDING_MODEL_DIM must be a valid integer");

        let llm_timeout_secs = env::var("LLM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .expect("LLM_TIMEOUT_SECS must be a valid integer");

        let retriever_k = env::var("RETRIEVER_K")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<usize>()
            .expect("RETRIEVER_K must be a valid integer");

        Self {
            http_port,
            index_backend,
            qdrant_url,
            qdrant_api_key: env::var("QDRANT_API_KEY").ok(),
            qdrant_connect_attempts,
            qdrant_connect_retry_delay_ms,
            angelone_collection: env::var("ANGELONE_COLLECTION")
                .unwrap_or_else(|_| "angelone_passages".to_string()),
            insurance_collection: env::var("INSURANCE_COLLECTION")
                .unwrap_or_else(|_| "insurance_passages".to_string()),
            llm_api_url,
            llm_api_key: env::var("LLM_API_KEY").unwrap_or_default(),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string()),
            llm_timeout_secs,
            embedding_model: env::var("EMBEDDING_MODEL_NAME")
                .unwrap_or_else(|_| "all-MiniLM-L6-v2".to_string()),
            embedding_dim,
            retriever_k,
            faq_pairs_path: PathBuf::from(
                env::var("ANGELONE_FAQ_PAIRS_PATH")
                    .unwrap_or_else(|_| "data/angelone_faq_pairs.json".to_string()),
            ),
            plans_path: PathBuf::from(
                env::var("PLANS_PATH").unwrap_or_else(|_| "data/plans_final.json".to_string()),
            ),
            notes_path: PathBuf::from(
                env::var("ADDITIONAL_NOTES_PATH")
                    .unwrap_or_else(|_| "data/additional_notes.txt".to_string()),
            ),
        }
    }
}
