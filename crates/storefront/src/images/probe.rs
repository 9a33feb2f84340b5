//! Image load probes.

use std::future::Future;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::debug;

/// Checks whether an image URL actually loads.
pub trait ImageProbe: Send + Sync {
    /// Returns `true` if `url` serves an image.
    fn probe(&self, url: &str) -> impl Future<Output = bool> + Send;
}

/// Probe that issues a `HEAD` request for each candidate URL.
///
/// A probe succeeds on a 2xx status whose `Content-Type` is `image/*`, or
/// which carries no content type at all. Relative URLs never succeed.
#[derive(Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    /// Create a probe with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl ImageProbe for HttpProbe {
    async fn probe(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) if response.status().is_success() => response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_none_or(|content_type| content_type.starts_with("image/")),
            Ok(response) => {
                debug!(url, status = %response.status(), "Image probe miss");
                false
            }
            Err(e) => {
                debug!(url, error = %e, "Image probe failed");
                false
            }
        }
    }
}
