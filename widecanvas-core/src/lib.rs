//! # Widecanvas Core
//!
//! Preview-shape lifecycle for the Widecanvas canvas: generated HTML previews,
//! their sandboxed render description, the code editor overlay and the
//! quota-gated framework export.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               widecanvas-core               │
//! ├─────────────────────────────────────────────┤
//! │  Preview          │  Editor Overlay         │
//! │  - Entity         │  - Working copy         │
//! │  - Renderer       │  - Save / in-flight     │
//! ├─────────────────────────────────────────────┤
//! │  Export           │  Storage boundaries     │
//! │  - Catalog        │  - LinkStore/LinkWriter │
//! │  - Quota gate     │  - QuotaStore/Converter │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Network access lives behind the async traits in [`store`], [`quota`] and
//! [`export`]; `widecanvas-server` provides HTTP implementations.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod editor;
pub mod error;
pub mod export;
pub mod guard;
pub mod notify;
pub mod preview;
pub mod quota;
pub mod render;
pub mod store;

pub use catalog::{Framework, FrameworkDescriptor};
pub use editor::{EditorOverlay, KeyAction, KeyChord, SaveOutcome, SaveTicket};
pub use error::{ErrorKind, PreviewError, PreviewResult};
pub use export::{
    ConversionRequest, ConversionResponse, ConvertedSource, Converter, Download, ExportDialog,
    ExportReceipt, ExportRequest, ExportWorkflow,
};
pub use guard::{InFlight, InFlightToken};
pub use notify::{Notification, NotificationLevel, NotificationLog, Notifier};
pub use preview::{PreviewEntity, PreviewId};
pub use quota::{MemoryQuotaStore, QuotaStore, UserId};
pub use render::{
    Affordance, Affordances, Caption, DocumentSurface, PointerEvents, PreviewRenderer,
    RenderAction, RenderContext, RenderDescription,
};
pub use store::{LinkKey, LinkRecord, LinkStore, LinkWriter, MemoryLinkStore};

/// Widecanvas core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
