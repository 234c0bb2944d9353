// api_utils.rs
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fs;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::sleep;

/// An explicit retry policy: a bounded number of attempts with exponential backoff
/// and optional jitter. Replaces the sleep-and-retry loops otherwise duplicated
/// across every wrapper.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub jitter_ms: u64,
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            base_delay_ms: 0,
            multiplier: 1.0,
            jitter_ms: 0,
        }
    }

    /// A fixed delay between attempts.
    pub fn fixed(max_attempts: usize, delay_ms: u64) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay_ms: delay_ms,
            multiplier: 1.0,
            jitter_ms: 0,
        }
    }

    /// Exponential backoff with a small jitter.
    pub fn backoff(max_attempts: usize, base_delay_ms: u64) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            multiplier: 2.0,
            jitter_ms: 250,
        }
    }

    /// Delay before retry number `retry_index` (zero-based).
    pub fn delay_for(&self, retry_index: usize) -> Duration {
        let backoff =
            self.base_delay_ms as f64 * self.multiplier.powi(retry_index as i32);
        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(backoff as u64 + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Builds, caches and retries an HTTP API call.
pub struct ApiCallBuilder {
    method: String,
    url: String,
    header_option: Option<JsonValue>,
    payload: Option<JsonValue>,
    cache_duration: Option<u64>,
    cache_path: Option<String>,
    retry: RetryPolicy,
}

impl ApiCallBuilder {
    pub fn call(
        method: &str,
        url: &str,
        header_option: Option<JsonValue>,
        payload: Option<JsonValue>,
    ) -> Self {
        Self {
            method: method.to_uppercase(),
            url: url.to_string(),
            header_option,
            payload,
            cache_duration: None,
            cache_path: None,
            retry: RetryPolicy::none(),
        }
    }

    /// Serves the response from `path` while it is younger than `minutes`; fresh
    /// responses are written back to the same path.
    pub fn maintain_cache(mut self, minutes: u64, path: &str) -> Self {
        self.cache_duration = Some(minutes);
        self.cache_path = Some(path.to_string());
        self
    }

    pub fn retries(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    fn build_request(&self, client: &Client) -> Result<RequestBuilder, Box<dyn StdError>> {
        let reqwest_method = match self.method.as_str() {
            "GET" => reqwest::Method::GET,
            "POST" => reqwest::Method::POST,
            "PUT" => reqwest::Method::PUT,
            "DELETE" => reqwest::Method::DELETE,
            _ => {
                return Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "Invalid HTTP method",
                )))
            }
        };

        let mut request_builder = client.request(reqwest_method, &self.url);
        let mut is_form = false;

        if let Some(ref header_json) = self.header_option {
            let mut header_map = HeaderMap::new();
            for (k, v) in header_json.as_object().unwrap_or(&Map::new()) {
                let value = v.as_str().unwrap_or_default();
                if k == "Content-Type" && value == "application/x-www-form-urlencoded" {
                    is_form = true;
                }
                header_map.insert(HeaderName::from_str(k)?, HeaderValue::from_str(value)?);
            }
            request_builder = request_builder.headers(header_map);
        }

        match self.method.as_str() {
            "GET" | "DELETE" => {
                if let Some(ref query_params_json) = self.payload {
                    let query_params: HashMap<String, String> = query_params_json
                        .as_object()
                        .ok_or("Invalid query parameters format")?
                        .iter()
                        .map(|(k, v)| {
                            let rendered = match v {
                                JsonValue::String(s) => s.clone(),
                                _ => v.to_string(),
                            };
                            (k.clone(), rendered)
                        })
                        .collect();
                    request_builder = request_builder.query(&query_params);
                }
            }
            "POST" | "PUT" => {
                if let Some(ref body_json) = self.payload {
                    if is_form {
                        let form_data: HashMap<String, String> =
                            serde_json::from_value(body_json.clone())
                                .map_err(|e| Box::new(e) as Box<dyn StdError>)?;
                        request_builder = request_builder.form(&form_data);
                    } else {
                        request_builder = request_builder.json(body_json);
                    }
                }
            }
            _ => {}
        }

        Ok(request_builder)
    }

    pub async fn execute(self) -> Result<String, Box<dyn StdError>> {
        async fn try_execute(request_builder: RequestBuilder) -> Result<String, Box<dyn StdError>> {
            let response: Response = request_builder
                .send()
                .await
                .map_err(|e| Box::new(e) as Box<dyn StdError>)?;

            if response.status().is_success() {
                let response_text = response
                    .text()
                    .await
                    .map_err(|e| Box::new(e) as Box<dyn StdError>)?;
                Ok(response_text)
            } else {
                Err(Box::new(response.error_for_status().unwrap_err()) as Box<dyn StdError>)
            }
        }

        if let (Some(cache_path), Some(cache_duration)) = (&self.cache_path, self.cache_duration) {
            if let Ok(metadata) = fs::metadata(cache_path) {
                if let Ok(modified) = metadata.modified() {
                    if let Ok(duration) = modified.elapsed() {
                        if duration.as_secs() / 60 < cache_duration {
                            println!("Fetching data from cache.");
                            return fs::read_to_string(cache_path)
                                .map_err(|e| Box::new(e) as Box<dyn StdError>);
                        }
                    }
                }
            }
        }

        let client = Client::new();
        let mut attempt = 0;

        let final_response_text = loop {
            let request_builder = self.build_request(&client)?;

            match try_execute(request_builder).await {
                Ok(response_text) => break response_text,
                Err(e) if attempt + 1 < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    println!("Error: {}. Retrying in {:?}...", e, delay);
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        if let Some(cache_path) = &self.cache_path {
            fs::write(cache_path, &final_response_text)
                .map_err(|e| Box::new(e) as Box<dyn StdError>)?;
        }

        Ok(final_response_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn get_returns_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/hello");
            then.status(200).body("ok");
        });

        let body = ApiCallBuilder::call("GET", &server.url("/hello"), None, None)
            .execute()
            .await
            .unwrap();

        mock.assert();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn get_payload_becomes_query_params() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/q")
                .query_param("ticker", "ACME");
            then.status(200).body("{}");
        });

        ApiCallBuilder::call(
            "GET",
            &server.url("/q"),
            None,
            Some(json!({"ticker": "ACME"})),
        )
        .execute()
        .await
        .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn form_content_type_posts_form_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/form").body_contains("a=1");
            then.status(200).body("ok");
        });

        ApiCallBuilder::call(
            "POST",
            &server.url("/form"),
            Some(json!({"Content-Type": "application/x-www-form-urlencoded"})),
            Some(json!({"a": "1"})),
        )
        .execute()
        .await
        .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn retries_exhaust_then_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(500);
        });

        let result = ApiCallBuilder::call("GET", &server.url("/flaky"), None, None)
            .retries(RetryPolicy::fixed(3, 1))
            .execute()
            .await;

        assert!(result.is_err());
        assert_eq!(mock.hits(), 3);
    }

    #[tokio::test]
    async fn fresh_cache_skips_network() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/cached");
            then.status(200).body("from network");
        });

        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("resp.json");
        fs::write(&cache_path, "from cache").unwrap();

        let body = ApiCallBuilder::call("GET", &server.url("/cached"), None, None)
            .maintain_cache(10, cache_path.to_str().unwrap())
            .execute()
            .await
            .unwrap();

        assert_eq!(body, "from cache");
        assert_eq!(mock.hits(), 0);
    }

    #[test]
    fn backoff_delays_grow() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 100,
            multiplier: 2.0,
            jitter_ms: 0,
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }
}
