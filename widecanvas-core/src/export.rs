//! Quota-gated conversion of preview HTML into framework source.
//!
//! [`ExportWorkflow`] owns the business rules: one export per user at a time,
//! no conversion without remaining quota, and the quota is only charged once
//! the converter has succeeded. [`ExportDialog`] layers the dialog state on
//! top (selection, search, loading, error and output).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::{self, Framework, FrameworkDescriptor};
use crate::error::{PreviewError, PreviewResult};
use crate::guard::InFlight;
use crate::preview::PreviewId;
use crate::quota::{QuotaStore, UserId};

/// HTML handed from the editor to the export dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// Entity the HTML came from.
    pub entity_id: PreviewId,
    /// Working copy at the time of the request, saved or not.
    pub html: String,
}

/// Body sent to the conversion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionRequest {
    /// Source HTML.
    pub html: String,
    /// Target framework.
    pub framework: Framework,
    /// Guidance from the catalog.
    pub instruction: String,
}

impl ConversionRequest {
    /// Build a request carrying the catalog instruction for `framework`.
    #[must_use]
    pub fn new(framework: Framework, html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            framework,
            instruction: framework.instruction().to_string(),
        }
    }
}

/// Body returned by the conversion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    /// Generated source code.
    pub converted_code: String,
}

/// Boundary to the AI conversion service.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert HTML into framework source.
    ///
    /// Implementations return [`PreviewError::ConversionFailed`] for a
    /// non-success answer and [`PreviewError::Transport`] when the service
    /// could not be reached.
    async fn convert(&self, request: &ConversionRequest) -> PreviewResult<ConversionResponse>;
}

/// A file offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Suggested file name.
    pub file_name: String,
    /// MIME type.
    pub mime: &'static str,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Converted source for one framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedSource {
    /// Target framework.
    pub framework: Framework,
    /// Generated code.
    pub code: String,
}

impl ConvertedSource {
    /// `exported_<value>.txt`.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.framework.export_file_name()
    }

    /// Text placed on the clipboard.
    #[must_use]
    pub fn clipboard_text(&self) -> &str {
        &self.code
    }

    /// Plain-text download of the code.
    #[must_use]
    pub fn download(&self) -> Download {
        Download {
            file_name: self.file_name(),
            mime: "text/plain",
            bytes: self.code.clone().into_bytes(),
        }
    }
}

/// Successful conversion plus the quota left afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    /// Converted source.
    pub source: ConvertedSource,
    /// Remaining conversions.
    pub usage_left: u32,
}

/// Runs conversions against a quota.
#[derive(Clone)]
pub struct ExportWorkflow {
    quota: Arc<dyn QuotaStore>,
    converter: Arc<dyn Converter>,
    in_flight: InFlight<UserId>,
}

impl ExportWorkflow {
    /// Create a workflow over the given stores.
    #[must_use]
    pub fn new(quota: Arc<dyn QuotaStore>, converter: Arc<dyn Converter>) -> Self {
        Self {
            quota,
            converter,
            in_flight: InFlight::new(),
        }
    }

    /// Quota store backing this workflow.
    #[must_use]
    pub fn quota(&self) -> &Arc<dyn QuotaStore> {
        &self.quota
    }

    /// Convert `html` for `user`, charging one unit of quota on success.
    ///
    /// # Errors
    ///
    /// - [`PreviewError::Busy`] if the user already has an export running.
    /// - [`PreviewError::QuotaExceeded`] if no quota is left; the converter
    ///   is not called.
    /// - Whatever the converter or the quota store returns. The quota is not
    ///   charged in that case.
    pub async fn convert(
        &self,
        user: &UserId,
        framework: Framework,
        html: &str,
    ) -> PreviewResult<ExportReceipt> {
        let _token = self.in_flight.try_acquire(user)?;

        let left = self.quota.usage_left(user).await?.unwrap_or(0);
        if left == 0 {
            tracing::info!(%user, %framework, "conversion refused, quota exhausted");
            return Err(PreviewError::QuotaExceeded);
        }

        let request = ConversionRequest::new(framework, html);
        let response = self.converter.convert(&request).await.map_err(|e| {
            tracing::warn!(%user, %framework, "Error converting code: {e}");
            e
        })?;

        let Some(usage_left) = self.quota.decrement_if_positive(user).await? else {
            return Err(PreviewError::QuotaExceeded);
        };
        tracing::info!(%user, %framework, usage_left, "conversion complete");

        Ok(ExportReceipt {
            source: ConvertedSource {
                framework,
                code: response.converted_code,
            },
            usage_left,
        })
    }
}

impl std::fmt::Debug for ExportWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportWorkflow")
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

/// State of the export dialog.
#[derive(Debug)]
pub struct ExportDialog {
    workflow: ExportWorkflow,
    request: ExportRequest,
    user: Option<UserId>,
    selected: Option<Framework>,
    search: String,
    loading: bool,
    error: Option<String>,
    converted: Option<ConvertedSource>,
    usage_left: Option<u32>,
    full_screen: bool,
}

impl ExportDialog {
    /// Open the dialog for the HTML in `request`.
    #[must_use]
    pub fn new(workflow: ExportWorkflow, request: ExportRequest) -> Self {
        Self {
            workflow,
            request,
            user: None,
            selected: None,
            search: String::new(),
            loading: false,
            error: None,
            converted: None,
            usage_left: None,
            full_screen: false,
        }
    }

    /// Attach a signed-in user, creating their quota record if needed.
    ///
    /// # Errors
    ///
    /// Returns the quota store's error.
    pub async fn sign_in(&mut self, user: UserId) -> PreviewResult<()> {
        let usage_left = self.workflow.quota().ensure_user(&user).await?;
        self.usage_left = Some(usage_left);
        self.user = Some(user);
        Ok(())
    }

    /// Forget the user and their usage counter.
    pub fn sign_out(&mut self) {
        self.user = None;
        self.usage_left = None;
    }

    /// Select a framework by its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PreviewError::UnknownFramework`] for identifiers outside the
    /// catalog; the previous selection is kept.
    pub fn select(&mut self, value: &str) -> PreviewResult<()> {
        self.selected = Some(value.parse()?);
        Ok(())
    }

    /// Selected framework.
    #[must_use]
    pub fn selected(&self) -> Option<Framework> {
        self.selected
    }

    /// Update the search box.
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    /// Catalog entries matching the search box.
    #[must_use]
    pub fn visible_frameworks(&self) -> Vec<&'static FrameworkDescriptor> {
        catalog::search(&self.search)
    }

    /// Whether the convert button is enabled.
    #[must_use]
    pub fn can_convert(&self) -> bool {
        self.user.is_some() && self.selected.is_some() && !self.loading
    }

    /// Convert button label.
    #[must_use]
    pub fn button_label(&self) -> &'static str {
        if self.loading {
            "Converting..."
        } else if self.user.is_some() {
            "Convert"
        } else {
            "Login to Convert"
        }
    }

    /// Run a conversion. Does nothing unless [`Self::can_convert`].
    pub async fn convert(&mut self) {
        let (Some(user), Some(framework)) = (self.user.clone(), self.selected) else {
            return;
        };
        if self.loading {
            return;
        }

        self.error = None;
        self.loading = true;
        let result = self
            .workflow
            .convert(&user, framework, &self.request.html)
            .await;
        self.loading = false;

        match result {
            Ok(receipt) => {
                self.usage_left = Some(receipt.usage_left);
                self.converted = Some(receipt.source);
            }
            Err(err) => self.error = Some(err.user_message()),
        }
    }

    /// Whether a conversion is running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Inline error from the last conversion.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Output of the last successful conversion.
    #[must_use]
    pub fn converted(&self) -> Option<&ConvertedSource> {
        self.converted.as_ref()
    }

    /// Usage counter shown to the signed-in user.
    #[must_use]
    pub fn usage_left(&self) -> Option<u32> {
        self.usage_left
    }

    /// Toggle the full-screen layout and return the new state.
    pub fn toggle_full_screen(&mut self) -> bool {
        self.full_screen = !self.full_screen;
        self.full_screen
    }

    /// Whether the dialog is full screen.
    #[must_use]
    pub fn is_full_screen(&self) -> bool {
        self.full_screen
    }
}
