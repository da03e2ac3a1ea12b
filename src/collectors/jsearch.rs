use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::collectors::{PageFetcher, PageQuery};
use crate::error::FetchError;

pub const DEFAULT_BASE_URL: &str = "https://jsearch.p.rapidapi.com/search";
pub const DEFAULT_API_HOST: &str = "jsearch.p.rapidapi.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

/// JSearch (RapidAPI) search endpoint, one page per request.
pub struct JSearch {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_host: String,
}

impl JSearch {
    pub fn new(base_url: &str, api_key: &str, api_host: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            api_host: api_host.to_string(),
        })
    }
}

#[async_trait]
impl PageFetcher for JSearch {
    fn name(&self) -> &str {
        "jsearch"
    }

    async fn fetch(&self, query: &PageQuery) -> Result<Vec<Value>, FetchError> {
        tracing::info!(
            "Fetching {} | {} | Page {}",
            query.role,
            query.location,
            query.page
        );

        let resp = self
            .client
            .get(&self.base_url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.api_host)
            .query(&request_params(query))
            .send()
            .await?;

        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        let body = resp.text().await?;
        let data: Value = serde_json::from_str(&body)
            .map_err(|e| FetchError::Malformed(format!("Failed to parse response: {e}")))?;

        let items = parse_results(data);
        tracing::info!("Got {} jobs", items.len());
        Ok(items)
    }
}

/// Query string for one page: free text, page, and fixed filters.
fn request_params(query: &PageQuery) -> Vec<(&'static str, String)> {
    vec![
        ("query", query.search_text()),
        ("page", query.page.to_string()),
        ("num_pages", "1".to_string()),
        ("date_posted", "all".to_string()),
        ("country", query.country_code.clone()),
        ("language", "en".to_string()),
    ]
}

/// Items live under the top-level `data` key; anything else is an empty page.
fn parse_results(data: Value) -> Vec<Value> {
    match data {
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    use super::*;

    fn query() -> PageQuery {
        PageQuery {
            role: "Data Analyst".to_string(),
            location: "India".to_string(),
            country_code: "in".to_string(),
            page: 2,
        }
    }

    /// Answers a single HTTP request with `status` and `body`, handing back
    /// the raw request head.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        (format!("http://{addr}/search"), rx)
    }

    #[tokio::test]
    async fn test_fetch_returns_data_items() {
        let (url, request) =
            serve_once("200 OK", r#"{"status":"OK","data":[{"job_id":"a"},{"job_id":"b"}]}"#).await;
        let jsearch = JSearch::new(&url, "secret", "jsearch.test").unwrap();

        let items = jsearch.fetch(&query()).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["job_id"], "b");

        let head = request.await.unwrap().to_lowercase();
        assert!(head.starts_with("get /search?"), "{head}");
        assert!(head.contains("query=data+analyst+in+india"), "{head}");
        assert!(head.contains("page=2"), "{head}");
        assert!(head.contains("x-rapidapi-key: secret"), "{head}");
        assert!(head.contains("x-rapidapi-host: jsearch.test"), "{head}");
    }

    #[tokio::test]
    async fn test_fetch_classifies_failures() {
        let (url, _) = serve_once("429 Too Many Requests", "{}").await;
        let jsearch = JSearch::new(&url, "k", DEFAULT_API_HOST).unwrap();
        assert!(matches!(
            jsearch.fetch(&query()).await,
            Err(FetchError::RateLimited)
        ));

        let (url, _) = serve_once("503 Service Unavailable", "{}").await;
        let jsearch = JSearch::new(&url, "k", DEFAULT_API_HOST).unwrap();
        assert!(matches!(
            jsearch.fetch(&query()).await,
            Err(FetchError::Status(503))
        ));

        let (url, _) = serve_once("200 OK", "<html>not json</html>").await;
        let jsearch = JSearch::new(&url, "k", DEFAULT_API_HOST).unwrap();
        assert!(matches!(
            jsearch.fetch(&query()).await,
            Err(FetchError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{addr}/search");
        let jsearch = JSearch::new(&url, "k", DEFAULT_API_HOST).unwrap();
        assert!(matches!(
            jsearch.fetch(&query()).await,
            Err(FetchError::Transport(_))
        ));
    }

    #[test]
    fn test_request_params() {
        let query = PageQuery {
            role: "Data Analyst".to_string(),
            location: "Bengaluru".to_string(),
            country_code: "in".to_string(),
            page: 3,
        };
        let params = request_params(&query);
        assert_eq!(params[0], ("query", "Data Analyst in Bengaluru".to_string()));
        assert_eq!(params[1], ("page", "3".to_string()));
        assert_eq!(params[2], ("num_pages", "1".to_string()));
        assert_eq!(params[3], ("date_posted", "all".to_string()));
        assert_eq!(params[4], ("country", "in".to_string()));
        assert_eq!(params[5], ("language", "en".to_string()));
    }

    #[test]
    fn test_parse_results() {
        let body = json!({
            "status": "OK",
            "data": [{ "job_id": "a" }, { "job_id": "b" }],
        });
        let items = parse_results(body);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["job_id"], "a");

        assert!(parse_results(json!({ "status": "OK" })).is_empty());
        assert!(parse_results(json!({ "data": "nope" })).is_empty());
        assert!(parse_results(json!([1, 2, 3])).is_empty());
    }
}
