use serde::{Deserialize, Serialize};

use crate::classifier::Prediction;
use crate::config::MAX_ARTICLES;
use crate::knowledge::DiseaseRecord;
use crate::search::Article;

/// Everything returned to the caller for one prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResult {
    pub prediction: Prediction,
    pub disease_record: DiseaseRecord,
    pub articles: Vec<Article>,
}

impl EnrichedResult {
    pub fn has_articles(&self) -> bool {
        !self.articles.is_empty()
    }
}

/// Compose the final result, keeping at most three articles in provider order
pub fn assemble(
    prediction: Prediction,
    disease_record: DiseaseRecord,
    mut articles: Vec<Article>,
) -> EnrichedResult {
    articles.truncate(MAX_ARTICLES);
    EnrichedResult {
        prediction,
        disease_record,
        articles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_to_three_in_order() {
        let articles: Vec<Article> = (0..5)
            .map(|i| Article {
                title: Some(format!("a{i}")),
                ..Article::default()
            })
            .collect();
        let result = assemble(
            Prediction {
                disease_label: "Allergy".into(),
                confidence: 0.82,
            },
            DiseaseRecord::unknown(),
            articles,
        );
        let titles: Vec<_> = result
            .articles
            .iter()
            .filter_map(|a| a.title.as_deref())
            .collect();
        assert_eq!(titles, vec!["a0", "a1", "a2"]);
        assert!(result.has_articles());
    }

    #[test]
    fn serializes_empty_collections_not_nulls() {
        let result = assemble(
            Prediction {
                disease_label: "Dengue".into(),
                confidence: 0.4,
            },
            DiseaseRecord::unknown(),
            Vec::new(),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["articles"], serde_json::json!([]));
        assert_eq!(json["disease_record"]["resources"], serde_json::json!([]));
        assert_eq!(json["prediction"]["disease_label"], "Dengue");
    }
}
