//! # Widecanvas Server Library
//!
//! HTTP service behind the Widecanvas preview shapes: persists edited HTML,
//! proxies framework conversions and serves the public link and app pages.
//! This library is used by both the binary and integration tests.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use widecanvas_core::{Converter, LinkStore};

pub mod client;
pub mod config;
pub mod health;
pub mod metrics;
pub mod resolver;
pub mod routes;
pub mod validation;

pub use client::{ClientError, ConversionClient, LinksClient};
pub use config::{ServerArgs, ServerConfig, SiteConfig};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Stored link and app records.
    pub links: Arc<dyn LinkStore>,
    /// Conversion upstream, if configured.
    pub converter: Option<Arc<dyn Converter>>,
    /// Public URLs for page rendering.
    pub site: Arc<SiteConfig>,
}

impl AppState {
    /// Create state without a conversion upstream.
    #[must_use]
    pub fn new(links: Arc<dyn LinkStore>, site: SiteConfig) -> Self {
        Self {
            links,
            converter: None,
            site: Arc::new(site),
        }
    }

    /// Attach a conversion upstream.
    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }
}

/// Build the application router: API, health probes and public pages.
///
/// Metrics and the tracing/CORS layers are added by the binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoints (Kubernetes probes)
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/health", get(health::readiness)) // Backward compatible
        .route("/api/links/update", post(routes::update_link))
        .route("/api/convertFramework", post(routes::convert_framework))
        .route("/link/{id}", get(routes::link_page))
        .route("/{app_name}", get(routes::app_page))
        .layer(DefaultBodyLimit::max(validation::MAX_BODY_LEN))
        .with_state(state)
}
