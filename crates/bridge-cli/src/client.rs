//! Thin HTTP client for the bridge-server API.

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use bridge_core::{ErrorKind, Item, Platform, ProfileInfo, SessionStatus};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Started {
    pub session_id: String,
    pub platform: Platform,
    pub status: SessionStatus,
    #[serde(default)]
    pub instructions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub session_id: String,
    pub platform: Platform,
    pub status: SessionStatus,
    pub connected: bool,
    pub profile_info: Option<ProfileInfo>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub status: SessionStatus,
    pub credential: String,
}

#[derive(Debug, Deserialize)]
pub struct Items {
    pub items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub id: String,
    pub platform: Platform,
    pub status: SessionStatus,
    pub idle_secs: u64,
    pub active: bool,
    pub profile_info: Option<ProfileInfo>,
}

#[derive(Debug, Deserialize)]
pub struct Listing {
    pub total: usize,
    pub active: usize,
    pub sessions: Vec<Summary>,
}

#[derive(Debug, Deserialize)]
struct Failure {
    error: ErrorKind,
    message: String,
}

/// Client bound to one server.
pub struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{path}", self.base))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .with_context(|| format!("cannot reach bridge server at {}", self.base))?;
        let status = response.status();
        let body = response.text().await.context("failed to read response body")?;
        debug!(%status, bytes = body.len(), "response received");

        if status.is_success() {
            serde_json::from_str(&body).context("unexpected response from server")
        } else {
            match serde_json::from_str::<Failure>(&body) {
                Ok(f) => Err(anyhow!("{}: {}", f.error, f.message)),
                Err(_) => Err(anyhow!("server returned {status}")),
            }
        }
    }

    pub async fn start(&self, platform: Platform) -> Result<Started> {
        self.send(self.request(Method::POST, &format!("/sessions/{platform}")))
            .await
    }

    pub async fn list(&self) -> Result<Listing> {
        self.send(self.request(Method::GET, "/sessions")).await
    }

    pub async fn status(&self, id: &str) -> Result<Status> {
        self.send(self.request(Method::GET, &format!("/sessions/{id}/status")))
            .await
    }

    pub async fn credential(&self, id: &str) -> Result<Credential> {
        self.send(self.request(Method::GET, &format!("/sessions/{id}/credential")))
            .await
    }

    pub async fn items(&self, id: &str, filter: Option<&str>, limit: Option<usize>) -> Result<Items> {
        let mut request = self.request(Method::GET, &format!("/sessions/{id}/items"));
        if let Some(filter) = filter {
            request = request.query(&[("filter", filter)]);
        }
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        self.send(request).await
    }

    pub async fn close(&self, id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .send(self.request(Method::DELETE, &format!("/sessions/{id}")))
            .await?;
        Ok(())
    }
}

/// Decode a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("not a data URL"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("data URL has no payload"))?;
    if !meta.ends_with(";base64") {
        anyhow::bail!("data URL is not base64 encoded");
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .context("invalid base64 payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_png_data_url() {
        let bytes = decode_data_url("data:image/png;base64,iVBORw0K").unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }

    #[test]
    fn reject_non_data_url() {
        assert!(decode_data_url("https://example.com/qr.png").is_err());
        assert!(decode_data_url("data:text/plain,hello").is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:3030/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base, "http://localhost:3030");
    }

    #[test]
    fn status_body_deserializes() {
        let body = r#"{"success":true,"sessionId":"tg-1-ab","platform":"telegram",
            "status":"connected","connected":true,"profileInfo":{"displayName":"Ada"}}"#;
        let status: Status = serde_json::from_str(body).unwrap();
        assert!(status.connected);
        assert_eq!(status.status, SessionStatus::Connected);
        assert_eq!(status.profile_info.unwrap().display_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn unreachable_server_is_reported() {
        let client = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = client.list().await.unwrap_err();
        assert!(err.to_string().contains("cannot reach bridge server"));
    }
}
