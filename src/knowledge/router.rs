//! Domain classification.
//!
//! One structured completion per query, constrained to a two-way choice.
//! Classification rides a generative model, so identical inputs may route
//! differently across calls; the contract is only that a well-typed
//! [`Domain`] comes back. On failure the caller gets
//! `ClassificationUnavailable` and must not guess a domain.

use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::knowledge::Domain;
use crate::llm::LanguageModel;

/// The two-way classification schema the gateway must satisfy.
#[derive(Debug, Deserialize)]
struct RouteDecision {
    #[serde(rename = "isAngelOne")]
    is_angel_one: bool,
}

pub struct DomainRouter {
    model: Arc<dyn LanguageModel>,
}

impl DomainRouter {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn classify(&self, query: &str) -> Result<Domain> {
        let prompt = classification_prompt(query);
        let value = self
            .model
            .complete_structured(&prompt)
            .await
            .map_err(|e| Error::ClassificationUnavailable(e.to_string()))?;

        let decision: RouteDecision = serde_json::from_value(value).map_err(|e| {
            Error::ClassificationUnavailable(format!("response outside schema: {e}"))
        })?;

        let domain = if decision.is_angel_one {
            Domain::AngelOne
        } else {
            Domain::Insurance
        };

        debug!(domain = %domain, "Classified query");
        Ok(domain)
    }
}

fn classification_prompt(query: &str) -> String {
    format!(
        "You are tasked with determining the category of a given query. The query will either \
         be related to AngelOne, a stock buy and sell platform similar to Robinhood or Zerodha, \
         or it will be related to an insurance plan.\n\
         \n\
         Query: {query}\n\
         \n\
         Instructions:\n\
         1. Analyze the query to determine its context.\n\
         2. If the query is related to stock trading, buying, selling, or any financial \
         transactions typically associated with platforms like AngelOne, classify it as related \
         to AngelOne.\n\
         3. If the query pertains to insurance policies, coverage, claims, or any other \
         insurance-related topics, classify it as related to insurance.\n\
         4. Respond with JSON only: {{\"isAngelOne\": true}} if the query is related to \
         AngelOne, otherwise {{\"isAngelOne\": false}}.\n"
    )
}
