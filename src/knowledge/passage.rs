use serde::{Deserialize, Serialize};

/// Provenance carried by every passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageMetadata {
    /// Origin of the passage: a source URL, "plans", or "additional notes".
    pub source: String,
    /// Finer-grained tag for plan-derived passages.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// A single retrievable unit of grounding text; the unit of index storage.
/// Immutable once created. `content` is human-readable prose, never raw
/// markup or raw JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    pub metadata: PassageMetadata,
}

impl Passage {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: PassageMetadata {
                source: source.into(),
                kind: None,
            },
        }
    }

    pub fn with_kind(
        content: impl Into<String>,
        source: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            metadata: PassageMetadata {
                source: source.into(),
                kind: Some(kind.into()),
            },
        }
    }
}
