//! Remote image generation service
//!
//! The service models long-running work as create-then-poll: one call starts
//! a job, further calls read its status by id. Every call is independent and
//! carries the bearer token itself.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::error::ServiceError;
use super::types::{GenerationRequest, Job};

/// Which endpoint image jobs are sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceRoute {
    /// Straight to the provider
    #[default]
    Direct,
    /// Through a proxy exposing the same create/status contract
    Proxied,
}

impl std::fmt::Display for ServiceRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Proxied => write!(f, "proxied"),
        }
    }
}

/// Create and inspect remote generation jobs
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Start a job; the returned job carries the service-assigned id
    async fn create(&self, request: &GenerationRequest, token: &str) -> Result<Job, ServiceError>;

    /// Read the current state of job `id`
    async fn fetch(&self, id: &str, token: &str) -> Result<Job, ServiceError>;
}

/// HTTP implementation of [`GenerationService`]
pub struct HttpGenerationService {
    endpoint: String,
    route: ServiceRoute,
    http: Client,
}

impl HttpGenerationService {
    /// Create a service client for `endpoint`
    pub fn new(endpoint: impl Into<String>, route: ServiceRoute, timeout: Duration) -> Result<Self, ServiceError> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        debug!(%endpoint, %route, ?timeout, "HttpGenerationService::new: called");
        let http = Client::builder().timeout(timeout).build().map_err(ServiceError::Network)?;
        Ok(Self { endpoint, route, http })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn route(&self) -> ServiceRoute {
        self.route
    }

    fn status_url(&self, id: &str) -> String {
        format!("{}/{}", self.endpoint, id)
    }

    async fn read_job(response: reqwest::Response) -> Result<Job, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "read_job: API error");
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    async fn create(&self, request: &GenerationRequest, token: &str) -> Result<Job, ServiceError> {
        debug!(endpoint = %self.endpoint, prompt_len = request.prompt.len(), "create: called");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .header("content-type", "application/json")
            .json(&request.to_body())
            .send()
            .await?;

        let job = Self::read_job(response).await?;
        if job.id.is_empty() {
            debug!("create: response carried no job id");
            return Err(ServiceError::InvalidResponse("no job id in create response".to_string()));
        }
        debug!(id = %job.id, status = %job.status, "create: job started");
        Ok(job)
    }

    async fn fetch(&self, id: &str, token: &str) -> Result<Job, ServiceError> {
        debug!(%id, "fetch: called");
        let response = self.http.get(self.status_url(id)).bearer_auth(token).send().await?;

        let mut job = Self::read_job(response).await?;
        if job.id.is_empty() {
            job.id = id.to_string();
        }
        Ok(job)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::types::JobStatus;
    use serde_json::{Value, json};
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// One HTTP request as seen by [`serve_once`]
    #[derive(Debug)]
    struct Received {
        method: String,
        path: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Received {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Answer a single request on a local port with `status` and `body`
    ///
    /// Returns the base URL and a handle yielding the request received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Received>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);

            let mut request_line = String::new();
            reader.read_line(&mut request_line).await.unwrap();
            let mut parts = request_line.split_whitespace();
            let method = parts.next().unwrap_or_default().to_string();
            let path = parts.next().unwrap_or_default().to_string();

            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    headers.push((name.trim().to_lowercase(), value.trim().to_string()));
                }
            }

            let content_length = headers
                .iter()
                .find(|(n, _)| n == "content-length")
                .and_then(|(_, v)| v.parse::<usize>().ok())
                .unwrap_or(0);
            let mut raw = vec![0u8; content_length];
            reader.read_exact(&mut raw).await.unwrap();

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();

            Received {
                method,
                path,
                headers,
                body: String::from_utf8(raw).unwrap(),
            }
        });
        (base, handle)
    }

    fn service(endpoint: String, route: ServiceRoute) -> HttpGenerationService {
        HttpGenerationService::new(endpoint, route, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_create_posts_request_with_bearer() {
        let (base, server) = serve_once("201 Created", r#"{"id":"job1","status":"starting"}"#).await;
        let service = service(format!("{}/v1/predictions", base), ServiceRoute::Direct);
        let request = GenerationRequest {
            model: "owner/model".to_string(),
            prompt: "a runner at sunrise".to_string(),
            width: 768,
            height: 512,
            num_inference_steps: 25,
        };

        let job = service.create(&request, "r8_test").await.unwrap();
        assert_eq!(job, Job::new("job1", JobStatus::Starting));

        let received = server.await.unwrap();
        assert_eq!(received.method, "POST");
        assert_eq!(received.path, "/v1/predictions");
        assert_eq!(received.header("authorization"), Some("Bearer r8_test"));
        assert!(received.header("content-type").unwrap().starts_with("application/json"));
        let body: Value = serde_json::from_str(&received.body).unwrap();
        assert_eq!(
            body,
            json!({
                "version": "owner/model",
                "input": {
                    "prompt": "a runner at sunrise",
                    "width": 768,
                    "height": 512,
                    "num_inference_steps": 25
                }
            })
        );
    }

    #[tokio::test]
    async fn test_fetch_reads_status_path_through_proxy() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"status":"succeeded","output":["https://example/img.png"]}"#,
        )
        .await;
        let service = service(format!("{}/api/predictions/", base), ServiceRoute::Proxied);

        let job = service.fetch("job1", "proxy-token").await.unwrap();
        assert_eq!(job.id, "job1");
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.first_output().as_deref(), Some("https://example/img.png"));

        let received = server.await.unwrap();
        assert_eq!(received.method, "GET");
        assert_eq!(received.path, "/api/predictions/job1");
        assert_eq!(received.header("authorization"), Some("Bearer proxy-token"));
    }

    #[tokio::test]
    async fn test_fetch_keeps_id_from_body() {
        let (base, server) = serve_once("200 OK", r#"{"id":"job9","status":"processing"}"#).await;
        let service = service(base, ServiceRoute::Direct);

        let job = service.fetch("job1", "tok").await.unwrap();
        assert_eq!(job.id, "job9");
        assert_eq!(server.await.unwrap().path, "/job1");
    }

    #[tokio::test]
    async fn test_error_status_is_api_error() {
        let (base, server) = serve_once("429 Too Many Requests", r#"{"detail":"slow down"}"#).await;
        let service = service(base, ServiceRoute::Direct);

        let err = service.fetch("job1", "tok").await.unwrap_err();
        match &err {
            ServiceError::Api { status, message } => {
                assert_eq!(*status, 429);
                assert!(message.contains("slow down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_retryable());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_create_without_id_is_invalid_response() {
        let (base, server) = serve_once("201 Created", r#"{"status":"starting"}"#).await;
        let service = service(base, ServiceRoute::Proxied);

        let err = service
            .create(&GenerationRequest::new("plank"), "tok")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidResponse(_)));
        assert!(!err.is_retryable());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_error() {
        let (base, server) = serve_once("200 OK", "not json").await;
        let service = service(base, ServiceRoute::Direct);

        let err = service.fetch("job1", "tok").await.unwrap_err();
        assert!(matches!(err, ServiceError::Json(_)));
        server.await.unwrap();
    }

    #[test]
    fn test_route_parsing() {
        let route: ServiceRoute = serde_yaml::from_str("proxied").unwrap();
        assert_eq!(route, ServiceRoute::Proxied);
        let route: ServiceRoute = serde_yaml::from_str("direct").unwrap();
        assert_eq!(route, ServiceRoute::Direct);
        assert_eq!(ServiceRoute::default(), ServiceRoute::Direct);
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let service = HttpGenerationService::new(
            "https://api.replicate.com/v1/predictions/",
            ServiceRoute::Direct,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(service.endpoint(), "https://api.replicate.com/v1/predictions");
        assert_eq!(
            service.status_url("job1"),
            "https://api.replicate.com/v1/predictions/job1"
        );
        assert_eq!(service.route(), ServiceRoute::Direct);
    }

    #[tokio::test]
    async fn test_create_against_unreachable_endpoint_is_network_error() {
        let service =
            HttpGenerationService::new("http://127.0.0.1:9/predictions", ServiceRoute::Proxied, Duration::from_secs(2))
                .unwrap();
        let err = service
            .create(&GenerationRequest::new("a runner"), "token")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Network(_)));
        assert!(err.is_retryable());
    }
}
