pub mod artifacts;
pub mod classifier;
pub mod config;
pub mod error;
pub mod feedback;
pub mod http;
pub mod knowledge;
pub mod pipeline;
pub mod result;
pub mod search;
pub mod utils;

pub use artifacts::{FeatureVector, ModelArtifacts, SymptomVocabulary};
pub use classifier::{Classifier, Prediction};
pub use feedback::{FeedbackOutcome, FeedbackSink};
pub use knowledge::{DiseaseRecord, KnowledgeBase};
pub use pipeline::DiagnosisPipeline;
pub use result::EnrichedResult;
pub use search::{Article, ArticleSearch, SearchOutcome};

/// Initialise tracing on stderr with the given filter (RUST_LOG syntax)
pub fn init_tracing(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init();
}
