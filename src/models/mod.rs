mod api;
mod task;

pub use api::{
    CreateResearchRequest, CreateResearchResponse, ErrorBody, HealthResponse, SentimentSummary,
    StatusResponse,
};
#[cfg(test)]
pub use api::{BucketShare, CategorySentiment, SentimentBreakdown};
pub use task::{Task, TaskResult, TaskStatus};
