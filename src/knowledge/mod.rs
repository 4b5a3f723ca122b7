//! Query routing and retrieval-augmented answering over the two support
//! knowledge domains.

pub mod builder;
pub mod domain;
pub mod passage;
pub mod pipeline;
pub mod retriever;
pub mod router;
pub mod synthesizer;

pub use domain::Domain;
pub use passage::{Passage, PassageMetadata};
