//! Test server harness for integration tests.
//!
//! Spins up the real application router on a random port so tests can talk
//! to it with the HTTP clients.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use widecanvas_core::{LinkStore, MemoryLinkStore};
use widecanvas_server::{build_router, AppState, ConversionClient, SiteConfig};

/// A test server instance with control handles.
pub struct TestServer {
    addr: SocketAddr,
    links: MemoryLinkStore,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with an in-memory store and no conversion upstream.
    pub async fn start() -> Self {
        Self::start_with(MemoryLinkStore::new(), None).await
    }

    /// Start a server over `links`, proxying conversions to `converter_url`.
    ///
    /// # Panics
    ///
    /// Panics if no port is available or server fails to bind.
    pub async fn start_with(links: MemoryLinkStore, converter_url: Option<String>) -> Self {
        let port = portpicker::pick_unused_port().expect("no available port");
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        let store: Arc<dyn LinkStore> = Arc::new(links.clone());
        let mut state = AppState::new(store, SiteConfig::default());
        if let Some(url) = converter_url {
            let client = ConversionClient::new(url).expect("conversion client");
            state = state.with_converter(Arc::new(client));
        }
        let app = build_router(state);

        let listener = TcpListener::bind(addr).await.expect("failed to bind");
        let actual_addr = listener.local_addr().expect("failed to get local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("server error");
        });

        // Give the server a moment to start
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        Self {
            addr: actual_addr,
            links,
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Base URL of the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Full URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    /// The store behind the server (for test assertions).
    #[allow(dead_code)]
    pub fn links(&self) -> &MemoryLinkStore {
        &self.links
    }

    /// Gracefully shut down the server.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(tokio::time::Duration::from_secs(5), self.handle).await;
    }
}
