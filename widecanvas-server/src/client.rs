//! HTTP clients for the link update and conversion endpoints.
//!
//! [`LinksClient`] implements [`LinkWriter`] for the editor's save action and
//! [`ConversionClient`] implements [`Converter`] for the export workflow. The
//! server itself uses a [`ConversionClient`] pointed at the AI upstream.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use thiserror::Error;
use url::Url;
use widecanvas_core::{
    ConversionRequest, ConversionResponse, Converter, LinkWriter, PreviewError, PreviewId,
    PreviewResult,
};

/// Path of the link update endpoint.
pub const LINKS_UPDATE_PATH: &str = "/api/links/update";
/// Path of the conversion endpoint.
pub const CONVERT_PATH: &str = "/api/convertFramework";

/// Conversions run a model; allow them plenty of time.
const CONVERT_TIMEOUT: Duration = Duration::from_secs(180);
const UPDATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised by the HTTP clients.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured URL is invalid.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed (connection, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for logs.
        body: String,
    },
}

impl ClientError {
    /// Map onto the preview error taxonomy.
    ///
    /// `on_status` is used for a non-success answer, since its meaning
    /// depends on the endpoint.
    fn into_preview(self, on_status: PreviewError) -> PreviewError {
        match self {
            Self::Http(e) => PreviewError::Transport(e.to_string()),
            Self::InvalidUrl(e) => PreviewError::Unexpected(e),
            Self::Status { .. } => on_status,
        }
    }
}

fn build_http(timeout: Duration) -> Result<Client, ClientError> {
    Ok(Client::builder()
        .user_agent(concat!("widecanvas/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?)
}

/// Resolve `base` to `default_path` when it has no path of its own.
fn endpoint(base: &str, default_path: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(base).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
    if url.path().is_empty() || url.path() == "/" {
        url.set_path(default_path);
    }
    Ok(url)
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    html: &'a str,
}

/// Client for `POST /api/links/update`.
#[derive(Clone)]
pub struct LinksClient {
    inner: Arc<InnerClient>,
}

struct InnerClient {
    http: Client,
    endpoint: Url,
}

impl LinksClient {
    /// Create a client.
    ///
    /// `base_url` may be the endpoint itself or just the host, in which case
    /// `/api/links/update` is appended.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the URL is malformed.
    /// Returns [`ClientError::Http`] if the HTTP client fails to build.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Ok(Self {
            inner: Arc::new(InnerClient {
                http: build_http(UPDATE_TIMEOUT)?,
                endpoint: endpoint(base_url.as_ref(), LINKS_UPDATE_PATH)?,
            }),
        })
    }

    /// Endpoint this client posts to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Persist `html` for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] on transport failure and
    /// [`ClientError::Status`] on a non-success answer.
    pub async fn update(&self, id: &PreviewId, html: &str) -> Result<(), ClientError> {
        let response = self
            .inner
            .http
            .post(self.inner.endpoint.clone())
            .query(&[("id", id.as_str())])
            .json(&UpdateBody { html })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl LinkWriter for LinksClient {
    async fn update_html(&self, id: &PreviewId, html: &str) -> PreviewResult<()> {
        self.update(id, html).await.map_err(|e| {
            tracing::warn!(%id, "link update failed: {e}");
            e.into_preview(PreviewError::Unexpected("Failed to save changes".into()))
        })
    }
}

/// Client for a conversion endpoint speaking `{html, framework, instruction}`.
#[derive(Clone)]
pub struct ConversionClient {
    inner: Arc<InnerClient>,
}

impl ConversionClient {
    /// Create a client.
    ///
    /// `base_url` may be the endpoint itself or just the host, in which case
    /// `/api/convertFramework` is appended.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the URL is malformed.
    /// Returns [`ClientError::Http`] if the HTTP client fails to build.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Ok(Self {
            inner: Arc::new(InnerClient {
                http: build_http(CONVERT_TIMEOUT)?,
                endpoint: endpoint(base_url.as_ref(), CONVERT_PATH)?,
            }),
        })
    }

    /// Endpoint this client posts to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Send a conversion request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] on transport failure or an unreadable
    /// body, and [`ClientError::Status`] on a non-success answer.
    pub async fn request(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionResponse, ClientError> {
        let response = self
            .inner
            .http
            .post(self.inner.endpoint.clone())
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Converter for ConversionClient {
    async fn convert(&self, request: &ConversionRequest) -> PreviewResult<ConversionResponse> {
        self.request(request).await.map_err(|e| {
            tracing::warn!(framework = %request.framework, "conversion request failed: {e}");
            e.into_preview(PreviewError::ConversionFailed)
        })
    }
}
