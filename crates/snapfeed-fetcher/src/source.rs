//! HTTP-backed image source.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use snapfeed_core::ImageSource;

use crate::error::{FetchError, FetchResult};

/// Per-request timeout; a hung endpoint only delays one iteration.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `ImageSource` issuing one blocking GET against a fixed resource per call.
///
/// No retries or backoff: a failed request surfaces as an error and the
/// polling loop simply skips that iteration.
pub struct HttpImageSource {
    client: reqwest::Client,
    url: String,
    extension: &'static str,
}

impl HttpImageSource {
    /// Construct a source for the given image URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> FetchResult<Self> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| FetchError::Client {
                operation: "client.build",
                source,
            })?;
        let extension = extension_for(&url);
        Ok(Self {
            client,
            url,
            extension,
        })
    }

    /// The configured resource URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch_image(&self) -> anyhow::Result<Vec<u8>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.url))?
            .error_for_status()
            .with_context(|| format!("non-success status from {}", self.url))?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("failed to read response body from {}", self.url))?;
        Ok(bytes.to_vec())
    }

    fn extension(&self) -> &'static str {
        self.extension
    }
}

fn extension_for(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if path.to_ascii_lowercase().ends_with(".png") {
        "png"
    } else {
        "jpg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn extension_follows_resource_path() {
        assert_eq!(extension_for("https://example.test/cam.png"), "png");
        assert_eq!(extension_for("https://example.test/cam.PNG?size=200"), "png");
        assert_eq!(extension_for("https://example.test/200/300"), "jpg");
    }

    #[tokio::test]
    async fn successful_fetch_returns_body_bytes() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/snap.jpg");
                then.status(200).body(b"jpeg-bytes");
            })
            .await;

        let source = HttpImageSource::new(server.url("/snap.jpg")).expect("build source");
        let bytes = source.fetch_image().await.expect("fetch should succeed");
        assert_eq!(bytes, b"jpeg-bytes");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start_async().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/snap.jpg");
                then.status(503);
            })
            .await;

        let source = HttpImageSource::new(server.url("/snap.jpg")).expect("build source");
        assert!(source.fetch_image().await.is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error_not_a_panic() {
        let source =
            HttpImageSource::new("http://127.0.0.1:1/snap.jpg").expect("build source");
        assert!(source.fetch_image().await.is_err());
    }
}
