use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use symptom_insight::artifacts::LabelEncoder;
use symptom_insight::config::SearchConfig;
use symptom_insight::error::Result;
use symptom_insight::search::{ArticleProvider, OrganicResult, SearchError};
use symptom_insight::{
    ArticleSearch, Classifier, DiagnosisPipeline, DiseaseRecord, FeatureVector, KnowledgeBase,
    ModelArtifacts, SymptomVocabulary,
};

/// Always puts the given mass on one class and spreads the rest evenly
struct FixedClassifier {
    features: usize,
    classes: usize,
    winner: usize,
    confidence: f64,
    seen: Mutex<Vec<FeatureVector>>,
}

impl Classifier for FixedClassifier {
    fn n_features(&self) -> usize {
        self.features
    }

    fn n_classes(&self) -> usize {
        self.classes
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        self.seen.lock().unwrap().push(features.clone());
        let rest = (1.0 - self.confidence) / (self.classes - 1) as f64;
        let mut p = vec![rest; self.classes];
        p[self.winner] = self.confidence;
        Ok(p)
    }
}

struct CannedProvider {
    results: Vec<OrganicResult>,
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl ArticleProvider for CannedProvider {
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> std::result::Result<Vec<OrganicResult>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.results.iter().take(limit).cloned().collect())
    }

    fn name(&self) -> &str {
        "canned"
    }
}

struct BrokenProvider;

#[async_trait]
impl ArticleProvider for BrokenProvider {
    async fn search(
        &self,
        _query: &str,
        _limit: usize,
    ) -> std::result::Result<Vec<OrganicResult>, SearchError> {
        Err(SearchError::Transport("connection refused".into()))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

struct HangingProvider;

#[async_trait]
impl ArticleProvider for HangingProvider {
    async fn search(
        &self,
        _query: &str,
        _limit: usize,
    ) -> std::result::Result<Vec<OrganicResult>, SearchError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "hanging"
    }
}

const SYMPTOMS: [&str; 5] = [
    "itching",
    "skin_rash",
    "continuous_sneezing",
    "chills",
    "runny_nose",
];
const LABELS: [&str; 3] = ["Allergy", "Common Cold", "Fungal infection"];

fn organic(n: usize) -> OrganicResult {
    OrganicResult {
        title: Some(format!("Remedy {n}")),
        snippet: Some(format!("Snippet {n}")),
        link: Some(format!("https://example.org/remedy/{n}")),
    }
}

fn pipeline_with(
    winner: &str,
    confidence: f64,
    provider: Arc<dyn ArticleProvider>,
    timeout_ms: u64,
) -> (DiagnosisPipeline, Arc<FixedClassifier>) {
    let vocabulary =
        SymptomVocabulary::new(SYMPTOMS.iter().map(|s| s.to_string()).collect()).unwrap();
    let labels = LabelEncoder::new(LABELS.iter().map(|s| s.to_string()).collect()).unwrap();
    let classifier = Arc::new(FixedClassifier {
        features: SYMPTOMS.len(),
        classes: LABELS.len(),
        winner: labels.encode(winner).unwrap(),
        confidence,
        seen: Mutex::new(Vec::new()),
    });
    let artifacts = ModelArtifacts::from_parts(vocabulary, labels, classifier.clone()).unwrap();
    let search = ArticleSearch::new(
        provider,
        &SearchConfig {
            timeout_ms,
            ..SearchConfig::default()
        },
    );
    let pipeline = DiagnosisPipeline::new(artifacts, KnowledgeBase::builtin().unwrap(), search);
    (pipeline, classifier)
}

#[tokio::test]
async fn test_known_disease_with_articles() {
    let provider = Arc::new(CannedProvider {
        results: (0..2).map(organic).collect(),
        queries: Mutex::new(Vec::new()),
    });
    let (pipeline, classifier) = pipeline_with("Allergy", 0.82, provider.clone(), 1000);

    let result = pipeline
        .diagnose(["itching", "continuous_sneezing"])
        .await
        .unwrap();

    assert_eq!(result.prediction.disease_label, "Allergy");
    assert!((result.prediction.confidence - 0.82).abs() < 1e-9);
    assert_eq!(
        result.disease_record.description,
        "An immune response to non-harmful foreign substances."
    );
    assert_eq!(result.disease_record.resources[0].name, "Mayo Clinic");
    assert_eq!(result.articles.len(), 2);
    assert_eq!(result.articles[1].title.as_deref(), Some("Remedy 1"));
    assert_eq!(
        result.articles[0].url.as_deref(),
        Some("https://example.org/remedy/0")
    );
    assert_eq!(
        provider.queries.lock().unwrap().as_slice(),
        &["Allergy remedy OR treatment".to_string()]
    );

    let seen = classifier.seen.lock().unwrap();
    assert_eq!(seen[0].as_slice(), &[1, 0, 1, 0, 0]);
}

#[tokio::test]
async fn test_uncurated_disease_gets_sentinel_record() {
    let provider = Arc::new(CannedProvider {
        results: (0..5).map(organic).collect(),
        queries: Mutex::new(Vec::new()),
    });
    let (pipeline, _) = pipeline_with("Common Cold", 0.55, provider, 1000);

    let result = pipeline.diagnose(["runny_nose", "chills"]).await.unwrap();

    assert_eq!(result.prediction.disease_label, "Common Cold");
    assert_eq!(result.disease_record, DiseaseRecord::unknown());
    assert_eq!(result.disease_record.description, "No information available.");
    assert_eq!(result.disease_record.severity, "Consult a doctor.");
    assert_eq!(result.articles.len(), 3);
}

#[tokio::test]
async fn test_search_failure_degrades_to_no_articles() {
    let (pipeline, _) = pipeline_with("Fungal infection", 0.9, Arc::new(BrokenProvider), 1000);

    let result = pipeline.diagnose(["itching", "skin_rash"]).await.unwrap();

    assert_eq!(result.prediction.disease_label, "Fungal infection");
    assert!(!result.disease_record.is_unknown());
    assert!(result.articles.is_empty());
    assert!(!result.has_articles());
}

#[tokio::test]
async fn test_search_timeout_is_bounded() {
    let (pipeline, _) = pipeline_with("Allergy", 0.7, Arc::new(HangingProvider), 100);

    let started = std::time::Instant::now();
    let result = pipeline.diagnose(["itching"]).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.prediction.disease_label, "Allergy");
    assert!(result.articles.is_empty());
}

#[tokio::test]
async fn test_empty_and_unknown_selection_still_predicts() {
    let provider = Arc::new(CannedProvider {
        results: Vec::new(),
        queries: Mutex::new(Vec::new()),
    });
    let (pipeline, classifier) = pipeline_with("Allergy", 0.4, provider, 1000);

    let empty = pipeline.diagnose(Vec::<String>::new()).await.unwrap();
    assert_eq!(empty.prediction.disease_label, "Allergy");
    assert!(empty.articles.is_empty());

    let unknown = pipeline.diagnose(["glowing_aura"]).await.unwrap();
    assert_eq!(unknown.prediction, empty.prediction);

    let seen = classifier.seen.lock().unwrap();
    assert!(seen.iter().all(|v| v.active() == 0));
}

#[tokio::test]
async fn test_result_serializes_with_snake_case_fields() {
    let provider = Arc::new(CannedProvider {
        results: vec![OrganicResult {
            title: Some("Only a title".into()),
            snippet: None,
            link: None,
        }],
        queries: Mutex::new(Vec::new()),
    });
    let (pipeline, _) = pipeline_with("Fungal infection", 0.6, provider, 1000);

    let result = pipeline.diagnose(["skin_rash"]).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["prediction"]["disease_label"], "Fungal infection");
    assert!(json["disease_record"]["treatments"].is_string());
    assert_eq!(json["articles"][0]["title"], "Only a title");
    assert!(json["articles"][0]["url"].is_null());
}
