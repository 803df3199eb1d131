//! Server configuration.
//!
//! - `ServerArgs` - Command-line arguments parsed with clap, with env fallbacks
//! - `ServerConfig` - Resolved configuration for the listener, storage and upstream
//! - `SiteConfig` - Public URLs used when rendering pages and link-outs

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use url::Url;

/// Default port for the widecanvas server.
pub const DEFAULT_PORT: u16 = 9473;
/// Public site that serves `/link/{id}` pages.
pub const DEFAULT_PUBLIC_URL: &str = "https://widecanvas.ai";
/// Home page linked from the shape-link fallback page.
pub const DEFAULT_LINK_HOME: &str = "https://widecanvas.ai";
/// Home page linked from the app fallback page and used for app URLs.
pub const DEFAULT_APP_HOME: &str = "https://zupe.app";
/// Social preview image used when an app has none.
pub const DEFAULT_SOCIAL_IMAGE: &str = "https://zupe.app/social-og.png";

/// Command-line arguments for the widecanvas server.
#[derive(Debug, Clone, Parser)]
#[command(name = "widecanvas")]
#[command(about = "Widecanvas preview link and export server")]
#[command(version)]
pub struct ServerArgs {
    /// Port to listen on
    #[arg(long, env = "WIDECANVAS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind (loopback unless deployed behind a proxy)
    #[arg(long, env = "WIDECANVAS_BIND", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub bind: IpAddr,

    /// Directory for persisted link records (in-memory only if unset)
    #[arg(long, env = "WIDECANVAS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Upstream conversion endpoint (e.g., <https://convert.example.com/api/convertFramework>)
    #[arg(long, env = "WIDECANVAS_CONVERTER_URL")]
    pub converter_url: Option<Url>,

    /// Public base URL used for link-outs
    #[arg(long, env = "WIDECANVAS_PUBLIC_URL", default_value = DEFAULT_PUBLIC_URL)]
    pub public_url: String,

    /// Home page for the link fallback page
    #[arg(long, env = "WIDECANVAS_LINK_HOME", default_value = DEFAULT_LINK_HOME)]
    pub link_home: String,

    /// Home page for the app fallback page
    #[arg(long, env = "WIDECANVAS_APP_HOME", default_value = DEFAULT_APP_HOME)]
    pub app_home: String,

    /// Comma-separated CORS origins (localhost dev origins if unset)
    #[arg(long, env = "WIDECANVAS_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,
}

/// Public URLs used by the page renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// Base URL of the public site, without a trailing slash.
    pub public_url: String,
    /// "Go back" target on the link fallback page, also the lockup target.
    pub link_home: String,
    /// "Go back" target on the app fallback page and base of app URLs.
    pub app_home: String,
    /// Social image used when an app has none.
    pub default_image: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            link_home: DEFAULT_LINK_HOME.to_string(),
            app_home: DEFAULT_APP_HOME.to_string(),
            default_image: DEFAULT_SOCIAL_IMAGE.to_string(),
        }
    }
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listener address.
    pub addr: SocketAddr,
    /// Persistence directory.
    pub data_dir: Option<PathBuf>,
    /// Conversion upstream; the convert endpoint answers 503 without one.
    pub converter_url: Option<Url>,
    /// CORS origins.
    pub allowed_origins: Vec<String>,
    /// Public URLs.
    pub site: SiteConfig,
}

impl ServerConfig {
    /// CORS origins, defaulting to local development servers.
    #[must_use]
    pub fn cors_origins(&self) -> Vec<String> {
        if !self.allowed_origins.is_empty() {
            return self.allowed_origins.clone();
        }
        let port = self.addr.port();
        vec![
            format!("http://localhost:{port}"),
            format!("http://127.0.0.1:{port}"),
            "http://localhost:3000".to_string(),
            "http://localhost:5173".to_string(), // Vite
            "http://127.0.0.1:3000".to_string(),
            "http://127.0.0.1:5173".to_string(),
        ]
    }
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        let trim = |s: String| s.trim_end_matches('/').to_string();
        Self {
            addr: SocketAddr::new(args.bind, args.port),
            data_dir: args.data_dir,
            converter_url: args.converter_url,
            allowed_origins: args
                .allowed_origins
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            site: SiteConfig {
                public_url: trim(args.public_url),
                link_home: args.link_home,
                app_home: trim(args.app_home),
                default_image: DEFAULT_SOCIAL_IMAGE.to_string(),
            },
        }
    }
}
