//! Public pages for published previews and apps.
//!
//! `/link/{id}` and `/{app-name}` serve the stored HTML full-page inside a
//! sandboxing iframe. A missing record, or a store that fails to answer,
//! yields a static fallback page; both outcomes are `200 OK`.

use std::fmt::Write as _;

use widecanvas_core::render::prepend_wallet_bridge;
use widecanvas_core::{LinkKey, LinkRecord, LinkStore};

use crate::config::SiteConfig;

const LINK_NOT_FOUND: &str =
    "Sorry, no link for this one. It must have been made before we added links!";
const APP_NOT_FOUND: &str =
    "Sorry, no app found with this name. It may have been deleted or never existed.";
const APP_SITE_SUFFIX: &str = "Zupe App";
const LINK_PAGE_TITLE: &str = "Widecanvas";

/// Outcome of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPage {
    /// A record exists; `html` already carries the wallet bridge.
    Found {
        /// Document to embed.
        html: String,
        /// Stored record, for metadata.
        record: LinkRecord,
    },
    /// No record, or the store could not be read.
    NotFound,
}

impl ResolvedPage {
    /// Whether a record was found.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Look up `key`. Read failures are logged and reported as [`ResolvedPage::NotFound`].
pub async fn resolve(store: &dyn LinkStore, key: &LinkKey) -> ResolvedPage {
    match store.get(key).await {
        Ok(Some(record)) => ResolvedPage::Found {
            html: prepend_wallet_bridge(&record.html),
            record,
        },
        Ok(None) => {
            tracing::debug!(%key, "no stored record");
            ResolvedPage::NotFound
        }
        Err(e) => {
            tracing::warn!(%key, "failed to read stored record: {e}");
            ResolvedPage::NotFound
        }
    }
}

/// Head metadata of an app page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMetadata {
    /// Page title.
    pub title: String,
    /// Page description.
    pub description: String,
    /// Social preview image.
    pub image_url: String,
    /// Canonical URL.
    pub url: String,
}

impl AppMetadata {
    /// Metadata for `name`, falling back to defaults for missing fields.
    #[must_use]
    pub fn for_app(name: &str, record: Option<&LinkRecord>, site: &SiteConfig) -> Self {
        let pick = |field: Option<&String>| field.filter(|v| !v.is_empty()).cloned();
        Self {
            title: pick(record.and_then(|r| r.title.as_ref())).unwrap_or_else(|| name.to_string()),
            description: pick(record.and_then(|r| r.description.as_ref()))
                .unwrap_or_else(|| format!("Check out {name} built using Widecanvas.ai")),
            image_url: pick(record.and_then(|r| r.image_url.as_ref()))
                .unwrap_or_else(|| site.default_image.clone()),
            url: format!("{}/{name}", site.app_home),
        }
    }

    fn write_head(&self, out: &mut String) {
        let title = escape_html(&self.title);
        let description = escape_html(&self.description);
        let image = escape_html(&self.image_url);
        let url = escape_html(&self.url);
        let _ = write!(
            out,
            "<title>{title}</title>\
             <meta name=\"description\" content=\"{description}\">\
             <meta property=\"og:title\" content=\"{title} - {APP_SITE_SUFFIX}\">\
             <meta property=\"og:description\" content=\"{description}\">\
             <meta property=\"og:type\" content=\"website\">\
             <meta property=\"og:url\" content=\"{url}\">\
             <meta property=\"og:site_name\" content=\"{title}\">\
             <meta property=\"og:image\" content=\"{image}\">\
             <meta name=\"twitter:card\" content=\"summary_large_image\">\
             <meta name=\"twitter:title\" content=\"{title}\">\
             <meta name=\"twitter:description\" content=\"{description}\">\
             <meta name=\"twitter:image\" content=\"{image}\">"
        );
    }
}

/// Render the full response document for `key`.
#[must_use]
pub fn render_page(key: &LinkKey, page: &ResolvedPage, site: &SiteConfig) -> String {
    let mut out = String::from("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    match key {
        LinkKey::Shape(_) => {
            let _ = write!(out, "<title>{LINK_PAGE_TITLE}</title>");
        }
        LinkKey::App(name) => {
            let record = match page {
                ResolvedPage::Found { record, .. } => Some(record),
                ResolvedPage::NotFound => None,
            };
            AppMetadata::for_app(name, record, site).write_head(&mut out);
        }
    }
    out.push_str("</head><body style=\"margin:0\">");

    match (page, key) {
        (ResolvedPage::Found { html, .. }, _) => {
            let _ = write!(
                out,
                "<div><iframe srcdoc=\"{}\" width=\"100%\" height=\"100%\" draggable=\"false\" \
                 style=\"position: fixed; inset: 0; border: 0\"></iframe>",
                escape_html(html)
            );
            if matches!(key, LinkKey::Shape(_)) {
                write_lockup(&mut out, &site.link_home);
            }
            out.push_str("</div>");
        }
        (ResolvedPage::NotFound, LinkKey::Shape(_)) => {
            write_fallback(&mut out, LINK_NOT_FOUND, &site.link_home);
        }
        (ResolvedPage::NotFound, LinkKey::App(_)) => {
            write_fallback(&mut out, APP_NOT_FOUND, &site.app_home);
        }
    }

    out.push_str("</body></html>");
    out
}

fn write_lockup(out: &mut String, home: &str) {
    let _ = write!(
        out,
        "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\" \
         style=\"position: fixed; bottom: 8px; right: 8px; padding: 4px 8px; \
         border-radius: 6px; background: #fff; color: #111; font: 12px sans-serif; \
         text-decoration: none; box-shadow: 0 1px 4px #0003\">made with widecanvas</a>",
        escape_html(home)
    );
}

fn write_fallback(out: &mut String, message: &str, home: &str) {
    let _ = write!(
        out,
        "<div style=\"padding: 12px\">{message} <br /><br />\
         <a style=\"color: blue\" href=\"{}\">Go back</a></div>",
        escape_html(home)
    );
}

/// Escape text for use in HTML content and double- or single-quoted attributes.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / 8);
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
