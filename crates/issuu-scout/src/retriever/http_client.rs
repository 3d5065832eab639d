//! Async HTTP client wrapping reqwest.
//!
//! One GET per call, with the configured client
//! identity and a bounded timeout.

use std::time::Duration;

use crate::config::ScrapeContext;
use crate::error::{Result, ScrapeError};

/// Response from an HTTP GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Original requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for the static retrieval path.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client presenting the context's user-agent.
    pub fn new(ctx: &ScrapeContext) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(ctx.http_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(ctx.user_agent.as_str())
            .build()
            .map_err(|e| ScrapeError::RetrievalUnavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout: ctx.http_timeout,
        })
    }

    /// Perform a single GET request. Any HTTP status is returned as-is.
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        let r = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .timeout(self.timeout)
            .send()
            .await?;

        let status = r.status().as_u16();
        let final_url = r.url().to_string();
        let body = r.text().await?;

        Ok(HttpResponse {
            url: url.to_string(),
            final_url,
            status,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(header("user-agent", "scout-test/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = ScrapeContext {
            user_agent: "scout-test/1.0".to_string(),
            ..ScrapeContext::default()
        };
        let client = HttpClient::new(&ctx).unwrap();
        let resp = client.get(&format!("{}/search", server.uri())).await.unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.body, "<html></html>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpClient::new(&ScrapeContext::default()).unwrap();
        let resp = client.get(&server.uri()).await.unwrap();
        assert_eq!(resp.status, 503);
        assert!(!resp.is_success());
    }

    #[tokio::test]
    async fn test_redirect_keeps_requested_and_final_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", "/search?q=Acme"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = HttpClient::new(&ScrapeContext::default()).unwrap();
        let requested = format!("{}/old", server.uri());
        let resp = client.get(&requested).await.unwrap();
        assert_eq!(resp.url, requested);
        assert_eq!(resp.final_url, format!("{}/search?q=Acme", server.uri()));
        assert_eq!(resp.body, "ok");
    }
}
