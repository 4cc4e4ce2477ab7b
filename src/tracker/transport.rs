use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::tracker::constants::DISABLE_TRANSPORT_ENV;
use crate::tracker::error::{internal_error, transport_error, TrackerResult};
use crate::tracker::request::OutboundRequest;

/// Delivers a single tracking request to the collector.
///
/// Implementations report any failure as an error; the tracker keeps the request queued and
/// retries it on the next flush.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait CollectorClient: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> TrackerResult<()>;
}

/// Sends requests to a Matomo `matomo.php` endpoint as `GET` requests.
#[derive(Clone, Debug)]
pub struct HttpCollectorClient {
    client: Client,
    endpoint: Url,
}

impl HttpCollectorClient {
    pub fn new(endpoint: Url, timeout: Duration) -> TrackerResult<Self> {
        let client = build_http_client(timeout)?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_url(&self, request: &OutboundRequest) -> String {
        let mut url = self.endpoint.to_string();
        url.push(if self.endpoint.query().is_some() { '&' } else { '?' });
        url.push_str(&request.query_string());
        url
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl CollectorClient for HttpCollectorClient {
    async fn send(&self, request: &OutboundRequest) -> TrackerResult<()> {
        if env::var(DISABLE_TRANSPORT_ENV).is_ok() {
            return Err(transport_error(format!(
                "collector transport disabled via {DISABLE_TRANSPORT_ENV}"
            )));
        }

        let response = self
            .client
            .get(self.request_url(request))
            .send()
            .await
            .map_err(|err| transport_error(format!("failed to send tracking request: {err}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unavailable response body>".to_string());
        Err(transport_error(format!(
            "collector request failed with status {status}. Response: {body}"
        )))
    }
}

// underscore in the variable to prevent #warn unused_variable for non-wasm targets.
fn build_http_client(_timeout: Duration) -> TrackerResult<Client> {
    #[cfg(not(target_arch = "wasm32"))]
    let client = Client::builder()
        .timeout(_timeout)
        .build()
        .map_err(|err| internal_error(format!("failed to build HTTP client: {err}")))?;

    #[cfg(target_arch = "wasm32")]
    let client = Client::builder()
        .build()
        .map_err(|err| internal_error(format!("failed to build HTTP client: {err}")))?;

    Ok(client)
}
