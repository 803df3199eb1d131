//! Preview entities - canvas shapes that carry a generated HTML document.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PreviewError, PreviewResult};

/// Default width of a newly placed preview shape.
pub const DEFAULT_WIDTH: f64 = 300.0;

/// Default height of a newly placed preview shape.
pub const DEFAULT_HEIGHT: f64 = 500.0;

/// Opaque identifier of a preview shape, assigned by the canvas engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewId(String);

impl PreviewId {
    /// Create a fresh identifier for a newly placed shape.
    #[must_use]
    pub fn new() -> Self {
        Self(format!("shape:{}", Uuid::new_v4()))
    }

    /// Wrap an identifier handed out by the canvas engine.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PreviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PreviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PreviewId {
    fn from(raw: &str) -> Self {
        Self::from_raw(raw)
    }
}

/// A canvas shape carrying an HTML payload and geometry.
///
/// `html` is only ever replaced wholesale. An empty string means the
/// document has not been generated yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewEntity {
    id: PreviewId,
    html: String,
    source: String,
    width: f64,
    height: f64,
}

impl PreviewEntity {
    /// Create an entity with default size and no HTML yet.
    #[must_use]
    pub fn new(id: PreviewId) -> Self {
        Self {
            id,
            html: String::new(),
            source: String::new(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }

    /// Create an entity for a shape the user just placed.
    #[must_use]
    pub fn placed() -> Self {
        Self::new(PreviewId::new())
    }

    /// Set the size, rejecting non-positive or non-finite dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`PreviewError::InvalidDimensions`] for invalid sizes.
    pub fn with_size(mut self, width: f64, height: f64) -> PreviewResult<Self> {
        self.resize(width, height)?;
        Ok(self)
    }

    /// Set the provenance tag.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Resize the entity.
    ///
    /// # Errors
    ///
    /// Returns [`PreviewError::InvalidDimensions`] for invalid sizes; the
    /// entity keeps its previous size.
    pub fn resize(&mut self, width: f64, height: f64) -> PreviewResult<()> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(PreviewError::InvalidDimensions { width, height });
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Replace the HTML document.
    pub fn replace_html(&mut self, html: impl Into<String>) {
        self.html = html.into();
    }

    /// Store the output of a generation path along with its provenance.
    pub fn set_generated(&mut self, html: impl Into<String>, source: impl Into<String>) {
        self.html = html.into();
        self.source = source.into();
    }

    /// Identifier.
    #[must_use]
    pub fn id(&self) -> &PreviewId {
        &self.id
    }

    /// Committed HTML document.
    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Provenance tag.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Width in canvas units.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Height in canvas units.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Whether an HTML document has been generated.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        !self.html.is_empty()
    }
}
