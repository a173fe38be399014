//! Databricks model-serving client
//!
//! Implements the LlmClient trait against a serving endpoint's
//! `/invocations` route using the chat-messages payload.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use super::response::parse_body;
use super::{CompletionRequest, CompletionResponse, GatewayError, LlmClient};
use crate::config::GatewayConfig;

/// Build the invocation URL for an endpoint
pub fn invocations_url(host: &str, endpoint: &str) -> String {
    format!("{}/serving-endpoints/{}/invocations", host.trim_end_matches('/'), endpoint)
}

/// Databricks serving-endpoint client
pub struct DatabricksClient {
    url: String,
    token: String,
    http: Client,
}

impl DatabricksClient {
    /// Create a new client from resolved configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        debug!(?config, "from_config: called");

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            debug!(?timeout, "from_config: applying request timeout");
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(GatewayError::Network)?;

        Ok(Self {
            url: invocations_url(&config.host, &config.endpoint),
            token: config.token.clone(),
            http,
        })
    }

    /// Invocation URL this client posts to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build the request body for the invocations route
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(message_count = request.messages.len(), max_tokens = request.max_tokens, "build_request_body: called");
        serde_json::json!({
            "messages": request.messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        })
    }
}

#[async_trait]
impl LlmClient for DatabricksClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, GatewayError> {
        debug!(url = %self.url, "complete: called");
        if request.messages.is_empty() {
            return Err(GatewayError::InvalidRequest("message list is empty".to_string()));
        }

        let body = self.build_request_body(&request);

        let response = self
            .http
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, "complete: network error");
                GatewayError::Network(e)
            })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "complete: API error");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let normalized = parse_body(&text);
        info!(shape = ?normalized.shape, content_len = normalized.content.len(), "LLM call completed");
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionOptions, Message, ResponseShape};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn config(host: &str) -> GatewayConfig {
        GatewayConfig {
            host: host.to_string(),
            token: "dapi-test".to_string(),
            endpoint: "test-endpoint".to_string(),
            timeout: Some(Duration::from_secs(5)),
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            vec![Message::system("Be brief"), Message::user("What is 2+2?")],
            &CompletionOptions::default(),
        )
    }

    /// Read one HTTP request (headers plus content-length body)
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        line.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .and_then(|v| v.trim().parse::<usize>().ok())
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Answer exactly one request with a canned response; yields the raw request
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{}", addr), handle)
    }

    #[test]
    fn test_invocations_url() {
        assert_eq!(
            invocations_url("https://adb-1.azuredatabricks.net/", "llama"),
            "https://adb-1.azuredatabricks.net/serving-endpoints/llama/invocations"
        );
    }

    #[test]
    fn test_build_request_body() {
        let client = DatabricksClient::from_config(&config("http://localhost")).unwrap();
        let body = client.build_request_body(&request());

        assert_eq!(body["max_tokens"], 2048);
        assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "What is 2+2?");
    }

    #[tokio::test]
    async fn test_complete_posts_once_and_normalizes() {
        let (host, server) = serve_once("200 OK", r#"{"choices":[{"message":{"content":"4"}}]}"#).await;
        let client = DatabricksClient::from_config(&config(&host)).unwrap();

        let response = client.complete(request()).await.unwrap();
        assert_eq!(response.content, "4");
        assert_eq!(response.shape, ResponseShape::ChatCompletion);

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /serving-endpoints/test-endpoint/invocations HTTP/1.1"));
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer dapi-test"));
        assert!(raw.contains(r#""max_tokens":2048"#));
    }

    #[tokio::test]
    async fn test_complete_predictions_shape() {
        let (host, server) = serve_once("200 OK", r#"{"predictions":["Y"]}"#).await;
        let client = DatabricksClient::from_config(&config(&host)).unwrap();

        let response = client.complete(request()).await.unwrap();
        assert!(response.content.contains('Y'));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_error() {
        let (host, server) = serve_once("403 Forbidden", r#"{"error_code":"PERMISSION_DENIED"}"#).await;
        let client = DatabricksClient::from_config(&config(&host)).unwrap();

        let err = client.complete(request()).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(err.body().contains("PERMISSION_DENIED"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_complete_surfaces_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = DatabricksClient::from_config(&config(&format!("http://{}", addr))).unwrap();
        let err = client.complete(request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Network(_)));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn test_empty_messages_rejected_before_network() {
        let client = DatabricksClient::from_config(&config("http://127.0.0.1:9")).unwrap();
        let request = CompletionRequest::new(vec![], &CompletionOptions::default());

        let err = client.complete(request).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }
}
