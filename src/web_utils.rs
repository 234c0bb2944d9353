// web_utils.rs
use crate::api_utils::ApiCallBuilder;
use serde_json::{json, Value};
use std::error::Error;

const BITLY_SHORTEN_URL: &str = "https://api-ssl.bitly.com/v4/shorten";

/// Shortens a URL via the Bitly v4 API and returns the parsed response.
pub async fn bitly_url_shortener(
    long_url: &str,
    api_token: &str,
    domain: &str,
) -> Result<Value, Box<dyn Error>> {
    bitly_shorten_at(BITLY_SHORTEN_URL, long_url, api_token, domain).await
}

async fn bitly_shorten_at(
    endpoint: &str,
    long_url: &str,
    api_token: &str,
    domain: &str,
) -> Result<Value, Box<dyn Error>> {
    let body = ApiCallBuilder::call(
        "POST",
        endpoint,
        Some(json!({
            "Authorization": format!("Bearer {}", api_token),
            "Content-Type": "application/json",
        })),
        Some(json!({
            "long_url": long_url,
            "domain": domain,
        })),
    )
    .execute()
    .await?;

    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn shorten_sends_bearer_and_parses_link() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v4/shorten")
                .header("Authorization", "Bearer tok123")
                .json_body_partial(r#"{"long_url": "https://example.com/a/long/path"}"#);
            then.status(200)
                .header("Content-Type", "application/json")
                .body(r#"{"link": "https://bit.ly/xyz", "long_url": "https://example.com/a/long/path"}"#);
        });

        let response = bitly_shorten_at(
            &server.url("/v4/shorten"),
            "https://example.com/a/long/path",
            "tok123",
            "bit.ly",
        )
        .await
        .unwrap();

        mock.assert();
        assert_eq!(response["link"], "https://bit.ly/xyz");
    }
}
