use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use super::task::TaskStatus;

// Decodes an optional field, turning an off-shape value into `None`
// instead of rejecting the whole body.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

// Body of POST /api/research
#[derive(Debug, Serialize)]
pub struct CreateResearchRequest {
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateResearchResponse {
    pub task_id: String,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub message: Option<String>,
}

// Body of GET /api/research/{task_id}
#[derive(Debug, Deserialize, Clone)]
pub struct StatusResponse {
    pub status: TaskStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub report_length: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub sentiment: Option<SentimentSummary>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub document_path: Option<String>,
}

// Error body returned with non-2xx responses
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

// Every field is optional; the presentation layer degrades field by field.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SentimentSummary {
    #[serde(default, deserialize_with = "lenient")]
    pub total_reviews: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub sentiment_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub overall_sentiment: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub confidence: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub breakdown: Option<SentimentBreakdown>,
    #[serde(default, deserialize_with = "lenient")]
    pub categories: Option<CategorySentiment>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SentimentBreakdown {
    #[serde(default, deserialize_with = "lenient")]
    pub very_positive: Option<BucketShare>,
    #[serde(default, deserialize_with = "lenient")]
    pub positive: Option<BucketShare>,
    #[serde(default, deserialize_with = "lenient")]
    pub neutral: Option<BucketShare>,
    #[serde(default, deserialize_with = "lenient")]
    pub negative: Option<BucketShare>,
    #[serde(default, deserialize_with = "lenient")]
    pub very_negative: Option<BucketShare>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct BucketShare {
    #[serde(default, deserialize_with = "lenient")]
    pub percentage: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CategorySentiment {
    #[serde(default, deserialize_with = "lenient")]
    pub product_quality: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub service_quality: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub value_for_money: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub atmosphere: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub convenience: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_response_with_partial_sentiment() {
        let body = json!({
            "status": "completed",
            "report_length": 4200,
            "sentiment": {
                "sentiment_score": 4.2,
                "breakdown": { "positive": { "percentage": 60 } },
                "categories": { "product_quality": "Positive" }
            }
        });

        let resp: StatusResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.status, TaskStatus::Completed);
        assert_eq!(resp.report_length, Some(4200));

        let sentiment = resp.sentiment.unwrap();
        assert_eq!(sentiment.sentiment_score, Some(4.2));
        assert!(sentiment.overall_sentiment.is_none());

        let breakdown = sentiment.breakdown.unwrap();
        assert_eq!(breakdown.positive, Some(BucketShare { percentage: Some(60.0) }));
        assert!(breakdown.very_negative.is_none());

        let categories = sentiment.categories.unwrap();
        assert_eq!(categories.product_quality.as_deref(), Some("Positive"));
        assert!(categories.convenience.is_none());
    }

    #[test]
    fn test_off_shape_sentiment_fields_decode_as_none() {
        let body = json!({
            "status": "completed",
            "report_length": 4200,
            "sentiment": {
                "sentiment_score": "4.2",
                "total_reviews": 1532,
                "breakdown": { "positive": { "percentage": 60 }, "neutral": {} },
                "categories": { "atmosphere": 7, "value_for_money": "Neutral" }
            }
        });

        let resp: StatusResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.status, TaskStatus::Completed);
        assert_eq!(resp.report_length, Some(4200));

        let sentiment = resp.sentiment.unwrap();
        assert!(sentiment.sentiment_score.is_none());
        assert_eq!(sentiment.total_reviews, Some(1532));

        let breakdown = sentiment.breakdown.unwrap();
        assert_eq!(breakdown.positive, Some(BucketShare { percentage: Some(60.0) }));
        assert_eq!(breakdown.neutral, Some(BucketShare { percentage: None }));

        let categories = sentiment.categories.unwrap();
        assert!(categories.atmosphere.is_none());
        assert_eq!(categories.value_for_money.as_deref(), Some("Neutral"));
    }

    #[test]
    fn test_non_object_sentiment_is_dropped() {
        let resp: StatusResponse =
            serde_json::from_value(json!({ "status": "completed", "sentiment": "n/a" })).unwrap();
        assert_eq!(resp.status, TaskStatus::Completed);
        assert!(resp.sentiment.is_none());
    }

    #[test]
    fn test_minimal_status_response() {
        let resp: StatusResponse = serde_json::from_value(json!({ "status": "running" })).unwrap();
        assert_eq!(resp.status, TaskStatus::Running);
        assert!(resp.error.is_none());
        assert!(resp.sentiment.is_none());
    }

    #[test]
    fn test_create_response_ignores_extra_fields() {
        let resp: CreateResearchResponse = serde_json::from_value(json!({
            "task_id": "abc123",
            "status": "pending",
            "message": "Research started",
            "unused": true
        }))
        .unwrap();
        assert_eq!(resp.task_id, "abc123");
        assert_eq!(resp.status, Some(TaskStatus::Pending));
        assert_eq!(resp.message.as_deref(), Some("Research started"));
    }
}
