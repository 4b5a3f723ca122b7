//! Query pipeline orchestration.
//!
//! A single pass per query: Classifying → Retrieving → Synthesizing. Each
//! stage is one remote call; a stage failure aborts the pass with that
//! stage's error kind and nothing is retried. The pipeline holds no state
//! across invocations, so concurrent queries are independent.

use tracing::info;

use crate::error::Result;
use crate::knowledge::retriever::Retriever;
use crate::knowledge::router::DomainRouter;
use crate::knowledge::synthesizer::AnswerSynthesizer;

/// Stage labels for tracing; one per remote call.
#[derive(Debug, Clone, Copy)]
enum Stage {
    Classifying,
    Retrieving,
    Synthesizing,
}

pub struct QueryPipeline {
    router: DomainRouter,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
}

impl QueryPipeline {
    pub fn new(
        router: DomainRouter,
        retriever: Retriever,
        synthesizer: AnswerSynthesizer,
    ) -> Self {
        Self {
            router,
            retriever,
            synthesizer,
        }
    }

    /// Resolve the query's domain, fetch grounding passages, and synthesize
    /// the answer. An empty retrieval result is not a failure; the
    /// synthesizer then falls back to "I don't know".
    pub async fn answer(&self, query: &str) -> Result<String> {
        info!(stage = ?Stage::Classifying, "Processing query");
        let domain = self.router.classify(query).await?;

        info!(stage = ?Stage::Retrieving, domain = %domain, "Domain resolved");
        let passages = self.retriever.retrieve(domain, query).await?;

        info!(
            stage = ?Stage::Synthesizing,
            domain = %domain,
            passages = passages.len(),
            "Passages retrieved"
        );
        let answer = self.synthesizer.synthesize(query, &passages).await?;

        info!(domain = %domain, "Query completed");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::HashedBagEmbedder;
    use crate::embedding::TextEmbedder;
    use crate::error::Error;
    use crate::index::{InMemoryPassageIndex, PassageIndex};
    use crate::knowledge::synthesizer::FALLBACK_ANSWER;
    use crate::knowledge::{Domain, Passage};
    use crate::llm::testing::{KeywordGroundedModel, ScriptedFact, UnreachableModel};
    use crate::llm::LanguageModel;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::Arc;

    fn withdrawal_fact() -> ScriptedFact {
        ScriptedFact {
            question_contains: "withdraw",
            context_contains: "funds section",
            answer: "To withdraw, open the funds section and place a withdrawal request.",
        }
    }

    fn copay_fact() -> ScriptedFact {
        ScriptedFact {
            question_contains: "copay",
            context_contains: "$25 copay/visit",
            answer: "The copay for a primary care visit is $25 per visit.",
        }
    }

    async fn seeded_index(embedder: &HashedBagEmbedder) -> Arc<InMemoryPassageIndex> {
        let index = Arc::new(InMemoryPassageIndex::new());

        let angelone = vec![
            Passage::new(
                "Question\nHow can I withdraw my money?\nAnswer\nOpen the funds section and place a withdrawal request.",
                "https://www.angelone.in/support/funds",
            ),
            Passage::new(
                "Question\nHow do I buy shares?\nAnswer\nPlace a buy order from the watchlist.",
                "https://www.angelone.in/support/orders",
            ),
        ];
        let insurance = vec![Passage::with_kind(
            "Start of information for Plan: Silver 70\n\
             \"plan details\": HMO, individual coverage\n\
             \"event\": If you visit a health care provider\n\
             \"service\": Primary care visit to treat an injury or illness\n\
             \"member out of pocket\": $25 copay/visit\n\
             \"limitations and exceptions\": None\n\
             End of information for Plan: Silver 70",
            "plans",
            "medical_events",
        )];

        for (domain, passages) in [(Domain::AngelOne, angelone), (Domain::Insurance, insurance)] {
            let mut vectors = Vec::new();
            for passage in &passages {
                vectors.push(embedder.embed(&passage.content).await.unwrap());
            }
            index.rebuild(domain, &passages, &vectors).await.unwrap();
        }

        index
    }

    fn pipeline_with(
        model: Arc<dyn LanguageModel>,
        index: Arc<dyn PassageIndex>,
        embedder: Arc<dyn TextEmbedder>,
    ) -> QueryPipeline {
        QueryPipeline::new(
            DomainRouter::new(model.clone()),
            Retriever::new(index, embedder, 10),
            AnswerSynthesizer::new(model),
        )
    }

    #[tokio::test]
    async fn withdrawal_query_routes_retrieves_and_answers() {
        let embedder = Arc::new(HashedBagEmbedder::new());
        let index = seeded_index(&embedder).await;

        // The retriever surfaces the withdrawal FAQ among the top hits.
        let retriever = Retriever::new(index.clone(), embedder.clone(), 10);
        let hits = retriever
            .retrieve(Domain::AngelOne, "How can I withdraw my money?")
            .await
            .unwrap();
        assert!(hits.iter().any(|p| p.content.contains("withdraw")));

        let model = Arc::new(KeywordGroundedModel {
            facts: vec![withdrawal_fact(), copay_fact()],
            route_to_angelone: true,
        });
        let pipeline = pipeline_with(model, index, embedder);

        let answer = pipeline.answer("How can I withdraw my money?").await.unwrap();
        assert_ne!(answer, FALLBACK_ANSWER);
        assert!(answer.contains("withdrawal request"));
    }

    #[tokio::test]
    async fn copay_query_answers_from_the_plan_passage() {
        let embedder = Arc::new(HashedBagEmbedder::new());
        let index = seeded_index(&embedder).await;

        let model = Arc::new(KeywordGroundedModel {
            facts: vec![withdrawal_fact(), copay_fact()],
            route_to_angelone: false,
        });
        let pipeline = pipeline_with(model, index, embedder);

        let answer = pipeline
            .answer("What is my copay for a primary care visit?")
            .await
            .unwrap();
        assert!(answer.contains("$25"));
    }

    #[tokio::test]
    async fn unrelated_query_gets_exactly_the_fallback() {
        let embedder = Arc::new(HashedBagEmbedder::new());
        let index = seeded_index(&embedder).await;

        let model = Arc::new(KeywordGroundedModel {
            facts: vec![withdrawal_fact(), copay_fact()],
            route_to_angelone: true,
        });
        let pipeline = pipeline_with(model, index, embedder);

        let answer = pipeline
            .answer("What will the weather be tomorrow?")
            .await
            .unwrap();
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn empty_index_still_answers_with_the_fallback() {
        let embedder = Arc::new(HashedBagEmbedder::new());
        let index = Arc::new(InMemoryPassageIndex::new());

        let model = Arc::new(KeywordGroundedModel {
            facts: vec![withdrawal_fact()],
            route_to_angelone: true,
        });
        let pipeline = pipeline_with(model, index, embedder);

        let answer = pipeline.answer("How can I withdraw my money?").await.unwrap();
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn gateway_failure_aborts_in_the_classifying_stage() {
        let embedder = Arc::new(HashedBagEmbedder::new());
        let index = seeded_index(&embedder).await;

        let pipeline = pipeline_with(Arc::new(UnreachableModel), index, embedder);

        let err = pipeline.answer("How can I withdraw my money?").await.unwrap_err();
        assert!(matches!(err, Error::ClassificationUnavailable(_)));
    }

    struct FailingIndex;

    #[async_trait]
    impl PassageIndex for FailingIndex {
        async fn rebuild(
            &self,
            _domain: Domain,
            _passages: &[Passage],
            _vectors: &[Vec<f32>],
        ) -> anyhow::Result<()> {
            bail!("connection reset")
        }

        async fn search(
            &self,
            _domain: Domain,
            _query_vector: &[f32],
            _k: usize,
        ) -> anyhow::Result<Vec<Passage>> {
            bail!("connection reset")
        }
    }

    #[tokio::test]
    async fn index_failure_aborts_in_the_retrieving_stage() {
        let embedder = Arc::new(HashedBagEmbedder::new());
        let model = Arc::new(KeywordGroundedModel {
            facts: vec![withdrawal_fact()],
            route_to_angelone: true,
        });
        let pipeline = pipeline_with(model, Arc::new(FailingIndex), embedder);

        let err = pipeline.answer("How can I withdraw my money?").await.unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable(_)));
    }
}
