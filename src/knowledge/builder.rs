//! Document ingestion: raw source records in, normalized passages out.
//!
//! The per-source transformations are pure functions composed by
//! [`DocumentBuilder`], which owns the one-time write into a domain's index.
//! Rebuilding from unchanged inputs regenerates the same passage set and
//! replaces the prior index wholesale.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::embedding::TextEmbedder;
use crate::error::{Error, Result};
use crate::index::PassageIndex;
use crate::knowledge::{Domain, Passage};

/// Scraped FAQ page: one record per URL, any number of question/answer pairs.
/// An empty `faq_pairs` list contributes zero passages.
#[derive(Debug, Clone, Deserialize)]
pub struct FaqRecord {
    pub url: String,
    pub faq_pairs: Vec<FaqPair>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaqPair {
    pub question: String,
    pub answer: String,
}

/// Insurance plan extracted from a summary-of-benefits PDF. Field names
/// mirror the extraction output, spaces and all.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanRecord {
    #[serde(rename = "plan details")]
    pub details: PlanDetails,
    #[serde(rename = "important questions")]
    pub important_questions: Vec<ImportantQuestion>,
    #[serde(rename = "common medical events")]
    pub medical_events: Vec<MedicalEvent>,
    #[serde(rename = "excluded services")]
    pub excluded_services: Vec<String>,
    #[serde(rename = "other covered services")]
    pub other_covered_services: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanDetails {
    #[serde(rename = "plan name")]
    pub name: String,
    #[serde(rename = "plan details")]
    pub details: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportantQuestion {
    pub question: String,
    pub answer: String,
    #[serde(rename = "why it matters")]
    pub why_it_matters: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MedicalEvent {
    #[serde(rename = "event category")]
    pub category: String,
    pub services: Vec<PlanService>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanService {
    #[serde(rename = "service name")]
    pub name: String,
    #[serde(rename = "member out of pocket")]
    pub member_out_of_pocket: String,
    #[serde(rename = "limitations and exceptions")]
    pub limitations_and_exceptions: String,
}

/// One passage per FAQ pair, question and answer verbatim.
pub fn faq_passages(record: &FaqRecord) -> Vec<Passage> {
    record
        .faq_pairs
        .iter()
        .map(|faq| {
            Passage::new(
                format!("Question\n{}\nAnswer\n{}", faq.question, faq.answer),
                record.url.clone(),
            )
        })
        .collect()
}

/// Expand a plan into passages: one per important question, one per
/// (event, service) pair, and exactly one excluded/other-covered summary.
/// Every passage is wrapped in plan markers so it stays self-describing
/// out of context.
pub fn plan_passages(plan: &PlanRecord) -> Vec<Passage> {
    let name = &plan.details.name;
    let details = &plan.details.details;
    let mut passages = Vec::new();

    for question in &plan.important_questions {
        let content = format!(
            "Start of information for Plan: {name}\n\
             \"plan details\": {details}\n\
             \"question\": {question}\n\
             \"answer\": {answer}\n\
             \"why it matters\": {why}\n\
             End of information for Plan: {name}",
            question = question.question,
            answer = question.answer,
            why = question.why_it_matters,
        );
        passages.push(Passage::with_kind(content, "plans", "important_questions"));
    }

    for event in &plan.medical_events {
        for service in &event.services {
            let content = format!(
                "Start of information for Plan: {name}\n\
                 \"plan details\": {details}\n\
                 \"event\": {event}\n\
                 \"service\": {service}\n\
                 \"member out of pocket\": {oop}\n\
                 \"limitations and exceptions\": {limits}\n\
                 End of information for Plan: {name}",
                event = event.category,
                service = service.name,
                oop = service.member_out_of_pocket,
                limits = service.limitations_and_exceptions,
            );
            passages.push(Passage::with_kind(content, "plans", "medical_events"));
        }
    }

    let excluded = plan.excluded_services.join(", ");
    let other_covered = plan.other_covered_services.join(", ");
    let content = format!(
        "Start of information for Plan: {name}\n\
         \"plan details\": {details}\n\
         The following services are excluded in the plan: {excluded}\n\
         Other covered services available with plan: {other_covered}\n\
         End of information for Plan: {name}",
    );
    passages.push(Passage::with_kind(content, "plans", "others"));

    passages
}

/// One passage per blank-line-delimited paragraph; empty paragraphs are
/// dropped. Notes are corpus-wide, not plan-scoped.
pub fn note_passages(text: &str) -> Vec<Passage> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(|paragraph| Passage::new(paragraph, "additional notes"))
        .collect()
}

/// File locations of the raw artifacts produced by the scraping and
/// PDF-extraction pipelines.
#[derive(Debug, Clone)]
pub struct SourcePaths {
    pub faq_pairs: PathBuf,
    pub plans: PathBuf,
    pub notes: PathBuf,
}

#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub domain: Domain,
    pub passages: usize,
}

/// Owns the transformation from raw records to passages and the wholesale
/// write into a domain's index.
pub struct DocumentBuilder {
    index: Arc<dyn PassageIndex>,
    embedder: Arc<dyn TextEmbedder>,
    sources: SourcePaths,
}

impl DocumentBuilder {
    pub fn new(
        index: Arc<dyn PassageIndex>,
        embedder: Arc<dyn TextEmbedder>,
        sources: SourcePaths,
    ) -> Self {
        Self {
            index,
            embedder,
            sources,
        }
    }

    /// Regenerate the domain's passage set and replace its index. Any
    /// malformed record fails the whole build; no partial index is written.
    pub async fn build(&self, domain: Domain) -> Result<BuildSummary> {
        let passages = match domain {
            Domain::AngelOne => self.angelone_passages().await?,
            Domain::Insurance => self.insurance_passages().await?,
        };

        info!(
            domain = %domain,
            passages = passages.len(),
            "Transformed source records into passages"
        );

        let contents: Vec<String> = passages.iter().map(|p| p.content.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(contents)
            .await
            .map_err(|e| Error::IndexUnavailable(format!("embedding failed during build: {e}")))?;

        self.index
            .rebuild(domain, &passages, &vectors)
            .await
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?;

        info!(domain = %domain, passages = passages.len(), "Index rebuilt");

        Ok(BuildSummary {
            domain,
            passages: passages.len(),
        })
    }

    async fn angelone_passages(&self) -> Result<Vec<Passage>> {
        let records: Vec<FaqRecord> = read_json_records(&self.sources.faq_pairs).await?;
        Ok(records.iter().flat_map(faq_passages).collect())
    }

    async fn insurance_passages(&self) -> Result<Vec<Passage>> {
        let plans: Vec<PlanRecord> = read_json_records(&self.sources.plans).await?;
        let mut passages: Vec<Passage> = plans.iter().flat_map(plan_passages).collect();

        let notes = read_text(&self.sources.notes).await?;
        passages.extend(note_passages(&notes));

        Ok(passages)
    }
}

async fn read_json_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = read_text(path).await?;
    serde_json::from_str(&raw).map_err(|e| Error::MalformedRecord {
        artifact: path.display().to_string(),
        reason: e.to_string(),
    })
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::SourceUnavailable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}
