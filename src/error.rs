use thiserror::Error;

/// Failure taxonomy for ingestion and the query pipeline.
///
/// Every failure reaches the caller as a distinguishable kind; no stage
/// substitutes a default or collapses kinds into a generic failure.
#[derive(Debug, Error)]
pub enum Error {
    /// A raw source record is missing required fields. Fatal to the whole
    /// build; partial indexes are not acceptable.
    #[error("malformed record in {artifact}: {reason}")]
    MalformedRecord { artifact: String, reason: String },

    /// A raw data artifact could not be read.
    #[error("source artifact unavailable at {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },

    /// The domain's embedding index could not be reached.
    #[error("embedding index unavailable: {0}")]
    IndexUnavailable(String),

    /// The gateway failed to produce a well-typed domain classification.
    #[error("domain classification unavailable: {0}")]
    ClassificationUnavailable(String),

    /// The gateway failed to produce an answer completion.
    #[error("answer generation unavailable: {0}")]
    GenerationUnavailable(String),
}

impl Error {
    /// Stable kind tag carried on the HTTP boundary so failures stay
    /// distinguishable on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedRecord { .. } => "malformed_record",
            Error::SourceUnavailable { .. } => "source_unavailable",
            Error::IndexUnavailable(_) => "index_unavailable",
            Error::ClassificationUnavailable(_) => "classification_unavailable",
            Error::GenerationUnavailable(_) => "generation_unavailable",
        }
    }

    /// Query-time failures are retryable from the client's side; ingestion
    /// failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::IndexUnavailable(_)
                | Error::ClassificationUnavailable(_)
                | Error::GenerationUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
