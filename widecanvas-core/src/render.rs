//! Rendering descriptions for preview shapes.
//!
//! The renderer never touches the network. It turns a [`PreviewEntity`] into
//! either a loading placeholder or an isolated document surface, plus the
//! affordances the host draws around it.

use std::borrow::Cow;

use serde::Serialize;

use crate::preview::{PreviewEntity, PreviewId};

/// Script that stops ctrl+wheel (pinch) gestures inside the embedded
/// document from zooming the host canvas.
pub const WHEEL_GUARD_SCRIPT: &str = "<script>document.body.addEventListener('wheel', e => { if (!e.ctrlKey) return; e.preventDefault(); return }, { passive: false })</script>";

/// Script that exposes the parent window's wallet provider to a published
/// document. Retried once after a second in case the parent is still loading.
pub const WALLET_BRIDGE_SCRIPT: &str = r"<script>
function injectEthereum() {
  if (typeof window.ethereum === 'undefined' && window.parent.ethereum) {
    window.ethereum = window.parent.ethereum;
    console.log('Injected parent window ethereum object');
  } else if (typeof window.ethereum === 'undefined') {
    console.log('MetaMask not detected in parent window');
  }
}
injectEthereum();
setTimeout(injectEthereum, 1000);
</script>
";

const BODY_CLOSE: &str = "</body>";

/// Title of the "view code" button.
pub const EDITOR_BUTTON_TITLE: &str = "View code in editor";

/// Insert [`WHEEL_GUARD_SCRIPT`] right before the first `</body>`.
///
/// Documents without a closing body tag are returned unchanged.
#[must_use]
pub fn inject_wheel_guard(html: &str) -> Cow<'_, str> {
    let Some(at) = html.find(BODY_CLOSE) else {
        return Cow::Borrowed(html);
    };
    let mut out = String::with_capacity(html.len() + WHEEL_GUARD_SCRIPT.len());
    out.push_str(&html[..at]);
    out.push_str(WHEEL_GUARD_SCRIPT);
    out.push_str(&html[at..]);
    Cow::Owned(out)
}

/// Prepend [`WALLET_BRIDGE_SCRIPT`] to a published document.
#[must_use]
pub fn prepend_wallet_bridge(html: &str) -> String {
    let mut out = String::with_capacity(WALLET_BRIDGE_SCRIPT.len() + html.len());
    out.push_str(WALLET_BRIDGE_SCRIPT);
    out.push_str(html);
    out
}

/// Hint shown under a generated preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Caption {
    /// The shape is being edited; the embedded document receives input.
    Interactive,
    /// The shape is idle; the document is inspect-only.
    Inspect,
}

impl Caption {
    /// Caption for the host's editing-focus flag.
    #[must_use]
    pub fn for_editing(is_editing: bool) -> Self {
        if is_editing {
            Self::Interactive
        } else {
            Self::Inspect
        }
    }

    /// Hint text.
    #[must_use]
    pub fn text(self) -> &'static str {
        match self {
            Self::Interactive => "Click the canvas to exit",
            Self::Inspect => "Double click to interact",
        }
    }
}

/// Whether the embedded document receives pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerEvents {
    /// Input goes to the embedded document.
    Auto,
    /// Input goes to the canvas.
    None,
}

/// Host-supplied state that influences rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderContext {
    /// The canvas reports this shape as being edited.
    pub is_editing: bool,
    /// Page rotation of the shape, in radians.
    pub rotation: f64,
}

/// Controls drawn around a generated preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Affordances {
    /// Title of the button that opens the code editor.
    pub editor_button_title: &'static str,
    /// Public URL of this preview.
    pub link_url: String,
    /// Hint caption.
    pub caption: Caption,
}

/// An isolated document surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSurface {
    /// Document source, with the wheel guard injected.
    pub srcdoc: String,
    /// Surface width.
    pub width: f64,
    /// Surface height.
    pub height: f64,
    /// Pointer routing.
    pub pointer_events: PointerEvents,
    /// CSS box shadow compensated for the shape's rotation.
    pub box_shadow: String,
    /// Editor, link and caption controls.
    pub affordances: Affordances,
}

/// What to draw for a preview shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderDescription {
    /// The HTML has not been generated yet.
    Loading {
        /// Placeholder width.
        width: f64,
        /// Placeholder height.
        height: f64,
        /// CSS box shadow compensated for the shape's rotation.
        box_shadow: String,
    },
    /// A generated document.
    Document(DocumentSurface),
}

impl RenderDescription {
    /// Whether this is the loading placeholder.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// The document surface, if any.
    #[must_use]
    pub fn surface(&self) -> Option<&DocumentSurface> {
        match self {
            Self::Document(surface) => Some(surface),
            Self::Loading { .. } => None,
        }
    }
}

/// Controls a user can activate on a generated preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    /// The "view code" button.
    EditorButton,
    /// The link-out button.
    LinkButton,
}

/// Result of activating an affordance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderAction {
    /// Open the code editor overlay for this entity.
    OpenEditor(PreviewId),
    /// Open the public page in a new tab.
    OpenLink(String),
}

/// Turns preview entities into render descriptions.
#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    public_base: String,
}

impl PreviewRenderer {
    /// Create a renderer whose link-out URLs point at `public_base`.
    #[must_use]
    pub fn new(public_base: impl Into<String>) -> Self {
        let public_base = public_base.into();
        Self {
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Public URL of a preview.
    #[must_use]
    pub fn link_url(&self, id: &PreviewId) -> String {
        format!("{}/link/{}", self.public_base, id)
    }

    /// Describe how to draw `entity`.
    #[must_use]
    pub fn render(&self, entity: &PreviewEntity, ctx: RenderContext) -> RenderDescription {
        let box_shadow = rotated_box_shadow(ctx.rotation);
        if !entity.is_generated() {
            return RenderDescription::Loading {
                width: entity.width(),
                height: entity.height(),
                box_shadow,
            };
        }

        RenderDescription::Document(DocumentSurface {
            srcdoc: inject_wheel_guard(entity.html()).into_owned(),
            width: entity.width(),
            height: entity.height(),
            pointer_events: if ctx.is_editing {
                PointerEvents::Auto
            } else {
                PointerEvents::None
            },
            box_shadow,
            affordances: Affordances {
                editor_button_title: EDITOR_BUTTON_TITLE,
                link_url: self.link_url(entity.id()),
                caption: Caption::for_editing(ctx.is_editing),
            },
        })
    }

    /// Handle a click or touch on an affordance.
    ///
    /// Returns `None` while the entity has no HTML, since no affordances are
    /// shown then.
    #[must_use]
    pub fn activate(&self, entity: &PreviewEntity, affordance: Affordance) -> Option<RenderAction> {
        if !entity.is_generated() {
            return None;
        }
        Some(match affordance {
            Affordance::EditorButton => RenderAction::OpenEditor(entity.id().clone()),
            Affordance::LinkButton => RenderAction::OpenLink(self.link_url(entity.id())),
        })
    }
}

struct Shadow {
    offset_x: f64,
    offset_y: f64,
    blur: u32,
    spread: i32,
    color: &'static str,
}

const ROTATING_BOX_SHADOWS: [Shadow; 2] = [
    Shadow {
        offset_x: 0.0,
        offset_y: 2.0,
        blur: 4,
        spread: -1,
        color: "#0000003a",
    },
    Shadow {
        offset_x: 0.0,
        offset_y: 3.0,
        blur: 12,
        spread: -2,
        color: "#0000001f",
    },
];

/// CSS box shadow that keeps pointing down the page when the shape rotates.
#[must_use]
pub fn rotated_box_shadow(rotation: f64) -> String {
    let (sin, cos) = (-rotation).sin_cos();
    ROTATING_BOX_SHADOWS
        .iter()
        .map(|s| {
            // + 0.0 folds -0.0 into 0.0
            let x = s.offset_x * cos - s.offset_y * sin + 0.0;
            let y = s.offset_x * sin + s.offset_y * cos + 0.0;
            format!(
                "{x:.2}px {y:.2}px {}px {}px {}",
                s.blur, s.spread, s.color
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}
