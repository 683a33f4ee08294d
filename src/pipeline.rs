//! Prediction-and-enrichment pipeline
//!
//! Holds the process-wide, read-only context (model artifacts, knowledge base,
//! article search) built once at startup. Every request runs
//! encode -> predict -> {lookup, search} -> assemble against that context.

use std::sync::Arc;
use tracing::{Instrument, info, info_span};

use crate::artifacts::ModelArtifacts;
use crate::config::Config;
use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::result::{EnrichedResult, assemble};
use crate::search::ArticleSearch;

#[derive(Clone)]
pub struct DiagnosisPipeline {
    artifacts: Arc<ModelArtifacts>,
    knowledge: Arc<KnowledgeBase>,
    search: ArticleSearch,
}

impl DiagnosisPipeline {
    pub fn new(artifacts: ModelArtifacts, knowledge: KnowledgeBase, search: ArticleSearch) -> Self {
        Self {
            artifacts: Arc::new(artifacts),
            knowledge: Arc::new(knowledge),
            search,
        }
    }

    /// Load artifacts, knowledge base and search provider. Errors here are fatal.
    pub fn from_config(config: &Config) -> Result<Self> {
        let artifacts = ModelArtifacts::load(&config.artifacts)?;
        let knowledge = KnowledgeBase::from_config(config.knowledge.path.as_deref())?;
        let search = ArticleSearch::from_config(config)?;

        let uncurated = artifacts
            .labels()
            .classes()
            .iter()
            .filter(|label| !knowledge.contains(label))
            .count();
        if uncurated > 0 {
            info!(
                "{} of {} diseases have no knowledge base entry",
                uncurated,
                artifacts.labels().len()
            );
        }

        Ok(Self::new(artifacts, knowledge, search))
    }

    pub fn artifacts(&self) -> &ModelArtifacts {
        &self.artifacts
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn search(&self) -> &ArticleSearch {
        &self.search
    }

    /// Predict and enrich. An empty selection is still classified.
    ///
    /// Only configuration or inference errors propagate; search failures
    /// degrade to an empty article list.
    pub async fn diagnose<I, S>(&self, selected: I) -> Result<EnrichedResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let request_id = uuid::Uuid::new_v4();
        let features = self.artifacts.encode(selected);
        let span = info_span!("diagnose", %request_id, active = features.active());

        async move {
            let prediction = self.artifacts.predict(&features)?;
            info!(
                "Predicted '{}' ({:.1}% confident)",
                prediction.disease_label,
                prediction.confidence * 100.0
            );

            let record = self.knowledge.lookup(&prediction.disease_label).clone();
            let articles = self
                .search
                .search_articles(&prediction.disease_label)
                .await
                .into_articles();

            Ok(assemble(prediction, record, articles))
        }
        .instrument(span)
        .await
    }
}
