use crate::models::{SentimentSummary, Task, TaskResult, TaskStatus};
use crate::tracker::{Failure, Session, TrackerState};
use super::progress::{elapsed_minutes_label, format_elapsed, format_grouped, ProgressModel};

// Everything the UI needs to draw the session, derived on demand
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerView {
    pub state: TrackerState,
    pub input_enabled: bool,
    pub task_id: Option<String>,
    pub location: Option<String>,
    pub status_text: Option<String>,
    pub elapsed: String,
    pub progress_percent: f64,
    pub failure: Option<Failure>,
    pub result: Option<ResultView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub report_length: String,
    pub elapsed_minutes: String,
    pub sentiment: Option<SentimentView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentimentView {
    pub score: Option<String>,
    pub label: Option<String>,
    pub label_class: Option<String>,
    pub confidence: Option<String>,
    pub total_reviews: Option<String>,
    pub distribution: Vec<BucketView>,
    pub categories: Vec<CategoryView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentBucket {
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
}

impl SentimentBucket {
    pub fn label(&self) -> &'static str {
        match self {
            SentimentBucket::VeryPositive => "Very positive",
            SentimentBucket::Positive => "Positive",
            SentimentBucket::Neutral => "Neutral",
            SentimentBucket::Negative => "Negative",
            SentimentBucket::VeryNegative => "Very negative",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketView {
    pub bucket: SentimentBucket,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    ProductQuality,
    ServiceQuality,
    Value,
    Atmosphere,
    Convenience,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::ProductQuality => "Product quality",
            Category::ServiceQuality => "Service quality",
            Category::Value => "Value",
            Category::Atmosphere => "Atmosphere",
            Category::Convenience => "Convenience",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryView {
    pub category: Category,
    pub label: String,
    pub label_class: String,
}

pub fn status_text(status: &TaskStatus) -> String {
    match status {
        TaskStatus::Pending => "Queued, waiting for the research agent to start...".to_string(),
        TaskStatus::Running => "Researching reviews across platforms...".to_string(),
        TaskStatus::Processing => "Analyzing sentiment and building the report...".to_string(),
        TaskStatus::Completed => "Research complete".to_string(),
        TaskStatus::Failed => "Research failed".to_string(),
        TaskStatus::Unknown(raw) => raw.clone(),
    }
}

// "Very Positive" -> "very-positive"
pub fn style_class(label: &str) -> String {
    label
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

impl TrackerView {
    pub fn project(session: &Session, progress: &ProgressModel) -> Self {
        let task = session.task();
        let elapsed_secs = session.elapsed_secs();

        let progress_percent = match session.state() {
            TrackerState::Completed => 100.0,
            TrackerState::Polling => progress.estimate(elapsed_secs),
            // Failed keeps the bar where it stopped
            TrackerState::Failed if task.is_some() => progress.estimate(elapsed_secs),
            _ => 0.0,
        };

        let status_text = match session.state() {
            TrackerState::Submitting => Some("Starting research...".to_string()),
            _ => task.map(|t| status_text(&t.status)),
        };

        Self {
            state: session.state(),
            input_enabled: session.input_enabled(),
            task_id: task.map(|t| t.id.clone()),
            location: task.map(|t| t.location.clone()),
            status_text,
            elapsed: format_elapsed(elapsed_secs),
            progress_percent,
            failure: session.failure().cloned(),
            result: task.and_then(|t| ResultView::project(t, elapsed_secs)),
        }
    }
}

impl ResultView {
    fn project(task: &Task, elapsed_secs: u64) -> Option<Self> {
        let TaskResult { report_length, sentiment, .. } = task.result.as_ref()?;
        Some(Self {
            report_length: format_grouped(*report_length),
            elapsed_minutes: elapsed_minutes_label(elapsed_secs),
            sentiment: sentiment.as_ref().map(SentimentView::project),
        })
    }
}

impl SentimentView {
    pub fn project(summary: &SentimentSummary) -> Self {
        let distribution: Vec<BucketView> = summary
            .breakdown
            .as_ref()
            .map(|b| {
                [
                    (SentimentBucket::VeryPositive, &b.very_positive),
                    (SentimentBucket::Positive, &b.positive),
                    (SentimentBucket::Neutral, &b.neutral),
                    (SentimentBucket::Negative, &b.negative),
                    (SentimentBucket::VeryNegative, &b.very_negative),
                ]
                .into_iter()
                .filter_map(|(bucket, share)| {
                    share
                        .as_ref()
                        .and_then(|s| s.percentage)
                        .map(|percent| BucketView { bucket, percent })
                })
                .collect()
            })
            .unwrap_or_default();

        let categories: Vec<CategoryView> = summary
            .categories
            .as_ref()
            .map(|c| {
                [
                    (Category::ProductQuality, &c.product_quality),
                    (Category::ServiceQuality, &c.service_quality),
                    (Category::Value, &c.value_for_money),
                    (Category::Atmosphere, &c.atmosphere),
                    (Category::Convenience, &c.convenience),
                ]
                .into_iter()
                .filter_map(|(category, label)| {
                    label.as_ref().map(|l| CategoryView {
                        category,
                        label: l.clone(),
                        label_class: style_class(l),
                    })
                })
                .collect()
            })
            .unwrap_or_default();

        Self {
            score: summary.sentiment_score.map(|s| format!("{:.1}", s)),
            label: summary.overall_sentiment.clone(),
            label_class: summary.overall_sentiment.as_deref().map(style_class),
            confidence: summary.confidence.clone(),
            total_reviews: summary.total_reviews.map(format_grouped),
            distribution,
            categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BucketShare, CategorySentiment, SentimentBreakdown};

    #[test]
    fn test_status_text_known_and_unknown() {
        assert_eq!(status_text(&TaskStatus::Running), "Researching reviews across platforms...");
        assert_eq!(
            status_text(&TaskStatus::Unknown("warming_up".into())),
            "warming_up"
        );
    }

    #[test]
    fn test_style_class_normalizes_case() {
        assert_eq!(style_class("Positive"), "positive");
        assert_eq!(style_class("Very  Negative"), "very-negative");
        assert_eq!(style_class("MIXED"), "mixed");
    }

    #[test]
    fn test_sentiment_projection_keeps_present_fields_only() {
        let summary = SentimentSummary {
            sentiment_score: Some(4.2),
            overall_sentiment: Some("Positive".into()),
            breakdown: Some(SentimentBreakdown {
                positive: Some(BucketShare { percentage: Some(60.0) }),
                neutral: Some(BucketShare { percentage: None }),
                negative: Some(BucketShare { percentage: Some(5.0) }),
                ..Default::default()
            }),
            categories: Some(CategorySentiment {
                atmosphere: Some("Very Positive".into()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let view = SentimentView::project(&summary);
        assert_eq!(view.score.as_deref(), Some("4.2"));
        assert_eq!(view.label_class.as_deref(), Some("positive"));
        assert!(view.confidence.is_none());
        assert!(view.total_reviews.is_none());

        assert_eq!(view.distribution.len(), 2);
        assert_eq!(view.distribution[0].bucket, SentimentBucket::Positive);
        assert_eq!(view.distribution[1].bucket, SentimentBucket::Negative);

        assert_eq!(view.categories.len(), 1);
        assert_eq!(view.categories[0].category, Category::Atmosphere);
        assert_eq!(view.categories[0].label_class, "very-positive");
    }

    #[test]
    fn test_empty_summary_projects_empty_sections() {
        let view = SentimentView::project(&SentimentSummary::default());
        assert!(view.score.is_none());
        assert!(view.distribution.is_empty());
        assert!(view.categories.is_empty());
    }

    #[test]
    fn test_total_reviews_grouped() {
        let summary = SentimentSummary {
            total_reviews: Some(1532),
            ..Default::default()
        };
        assert_eq!(SentimentView::project(&summary).total_reviews.as_deref(), Some("1,532"));
    }
}
