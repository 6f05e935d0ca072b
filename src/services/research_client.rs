use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;
use tracing;
use crate::config::Config;
use crate::errors::{ApiError, ApiResult};
use crate::models::{
    CreateResearchRequest, CreateResearchResponse, ErrorBody, HealthResponse, StatusResponse,
};

// HTTP contract of the research backend as seen by the tracker
#[async_trait]
pub trait ResearchApi: Send + Sync {
    async fn create_research(&self, location: &str) -> ApiResult<CreateResearchResponse>;

    async fn get_status(&self, task_id: &str) -> ApiResult<StatusResponse>;

    // Opaque link handed to the user; never fetched by the client
    fn download_url(&self, task_id: &str) -> String;
}

pub struct ResearchClient {
    http: Client,
    base_url: Url,
}

impl ResearchClient {
    pub fn new(config: &Config) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        // Joining relative paths only appends when the base ends in '/'
        let mut base = config.server.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        tracing::debug!("Research client configured for {}", base_url);
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn check_health(&self) -> ApiResult<HealthResponse> {
        let url = self.endpoint("health")?;
        tracing::debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        decode_response(resp).await
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn task_path(prefix: &str, task_id: &str) -> String {
        format!("{}/{}", prefix, urlencoding::encode(task_id))
    }
}

#[async_trait]
impl ResearchApi for ResearchClient {
    async fn create_research(&self, location: &str) -> ApiResult<CreateResearchResponse> {
        let url = self.endpoint("api/research")?;
        tracing::debug!("POST {} (location: {})", url, location);

        let resp = self
            .http
            .post(url)
            .json(&CreateResearchRequest {
                location: location.to_string(),
            })
            .send()
            .await?;

        decode_response(resp).await
    }

    async fn get_status(&self, task_id: &str) -> ApiResult<StatusResponse> {
        let url = self.endpoint(&Self::task_path("api/research", task_id))?;
        tracing::trace!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        decode_response(resp).await
    }

    fn download_url(&self, task_id: &str) -> String {
        format!(
            "{}{}",
            self.base_url,
            Self::task_path("api/download", task_id)
        )
    }
}

// Helper function to turn an HTTP response into a typed body or an ApiError.
// Bodies are decoded by hand so malformed JSON surfaces as ApiError::Decode.
async fn decode_response<T: DeserializeOwned>(resp: Response) -> ApiResult<T> {
    let status = resp.status();
    let body = resp.bytes().await?;

    if status.is_success() {
        return Ok(serde_json::from_slice(&body)?);
    }

    let message = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error);

    tracing::debug!("Backend answered {} ({:?})", status, message);

    if status == StatusCode::NOT_FOUND {
        Err(ApiError::NotFound { message })
    } else {
        Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use serde_json::json;
    use tokio_test::assert_ok;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ResearchClient {
        let mut config = Config::load(None).unwrap();
        config.server.base_url = server.uri();
        assert_ok!(ResearchClient::new(&config))
    }

    #[tokio::test]
    async fn test_create_research_posts_location() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/research"))
            .and(body_json(json!({ "location": "COBS Bread, Austin TX" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "task_id": "abc123",
                "status": "pending",
                "message": "Research started"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let resp = assert_ok!(client.create_research("COBS Bread, Austin TX").await);
        assert_eq!(resp.task_id, "abc123");
        assert_eq!(resp.status, Some(TaskStatus::Pending));
    }

    #[tokio::test]
    async fn test_create_research_rejection_keeps_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/research"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": "Google API key not configured."
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.create_research("Vancouver").await.unwrap_err();
        match &err {
            ApiError::Rejected { status, .. } => assert_eq!(*status, 500),
            other => panic!("Expected Rejected, got {:?}", other),
        }
        assert_eq!(err.server_message(), Some("Google API key not configured."));
    }

    #[tokio::test]
    async fn test_get_status_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/research/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": "Task not found. The task may have expired or the server was restarted."
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get_status("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.server_message().unwrap().contains("expired"));
    }

    #[tokio::test]
    async fn test_get_status_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/research/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get_status("abc123").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_get_status_completed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/research/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "task_id": "abc123",
                "status": "completed",
                "location": "COBS Bread, Austin TX",
                "report_length": 4200
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let resp = assert_ok!(client.get_status("abc123").await);
        assert_eq!(resp.status, TaskStatus::Completed);
        assert_eq!(resp.report_length, Some(4200));
        assert_eq!(resp.location.as_deref(), Some("COBS Bread, Austin TX"));
    }

    #[tokio::test]
    async fn test_check_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "healthy" })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let health = assert_ok!(client.check_health().await);
        assert_eq!(health.status, "healthy");
    }

    #[test]
    fn test_download_url_encodes_task_id() {
        let mut config = Config::load(None).unwrap();
        config.server.base_url = "http://localhost:5000".into();
        let client = assert_ok!(ResearchClient::new(&config));

        assert_eq!(
            client.download_url("abc 123"),
            "http://localhost:5000/api/download/abc%20123"
        );
    }

    #[test]
    fn test_base_url_with_prefix_keeps_prefix() {
        let mut config = Config::load(None).unwrap();
        config.server.base_url = "https://example.com/research".into();
        let client = assert_ok!(ResearchClient::new(&config));

        assert_eq!(
            client.download_url("abc123"),
            "https://example.com/research/api/download/abc123"
        );
    }
}
