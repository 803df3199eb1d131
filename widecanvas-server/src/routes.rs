//! API route handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use widecanvas_core::{
    ConversionRequest, ConversionResponse, Framework, LinkKey, PreviewError, PreviewId,
};

use crate::metrics;
use crate::resolver::{render_page, resolve, ResolvedPage};
use crate::validation::{self, ValidationError};
use crate::AppState;

/// Errors returned by the JSON API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A store or upstream operation failed.
    #[error(transparent)]
    Preview(#[from] PreviewError),
    /// No conversion upstream is configured.
    #[error("conversion service is not configured")]
    ConverterUnavailable,
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(ValidationError::HtmlTooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Validation(_) | Self::Preview(PreviewError::UnknownFramework(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Preview(PreviewError::ConversionFailed | PreviewError::Transport(_)) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Preview(PreviewError::Busy(_)) => StatusCode::CONFLICT,
            Self::Preview(PreviewError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Preview(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConverterUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {self}");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn validated<T>(result: Result<T, ValidationError>) -> Result<T, ApiError> {
    result.map_err(|e| {
        tracing::warn!("validation failed: {e}");
        metrics::record_validation_failure(e.label());
        ApiError::from(e)
    })
}

/// Query string of the update endpoint.
#[derive(Debug, Deserialize)]
pub struct UpdateQuery {
    /// Preview ID.
    pub id: String,
}

/// Body of the update endpoint.
#[derive(Debug, Deserialize)]
pub struct UpdateBody {
    /// New HTML document.
    pub html: String,
}

/// `POST /api/links/update?id={id}`: replace the stored HTML of a preview.
#[tracing::instrument(
    name = "update_link",
    skip(state, query, body),
    fields(id = %query.id, bytes = body.html.len())
)]
pub async fn update_link(
    State(state): State<AppState>,
    Query(query): Query<UpdateQuery>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validated(validation::validate_preview_id(&query.id))?;
    validated(validation::validate_html(&body.html))?;

    let key = LinkKey::Shape(PreviewId::from_raw(query.id));
    let result = state.links.upsert_html(&key, body.html).await;
    metrics::record_link_save(result.is_ok());
    result?;

    tracing::info!(%key, "link updated");
    Ok(Json(json!({ "status": "ok" })))
}

/// Body of the conversion endpoint.
#[derive(Debug, Deserialize)]
pub struct ConvertBody {
    /// Source HTML.
    pub html: String,
    /// Target framework identifier.
    pub framework: String,
    /// Guidance; the catalog's instruction is used when absent or empty.
    #[serde(default)]
    pub instruction: Option<String>,
}

/// `POST /api/convertFramework`: proxy a conversion to the configured upstream.
#[tracing::instrument(
    name = "convert_framework",
    skip(state, body),
    fields(framework = %body.framework)
)]
pub async fn convert_framework(
    State(state): State<AppState>,
    Json(body): Json<ConvertBody>,
) -> Result<Json<ConversionResponse>, ApiError> {
    let framework: Framework = body.framework.parse().map_err(|e| {
        metrics::record_validation_failure("framework");
        ApiError::from(e)
    })?;
    validated(validation::validate_html(&body.html))?;
    if let Some(instruction) = &body.instruction {
        validated(validation::validate_instruction(instruction))?;
    }

    let converter = state
        .converter
        .as_ref()
        .ok_or(ApiError::ConverterUnavailable)?;

    let mut request = ConversionRequest::new(framework, body.html);
    if let Some(instruction) = body.instruction.filter(|i| !i.trim().is_empty()) {
        request.instruction = instruction;
    }

    let result = converter.convert(&request).await;
    metrics::record_conversion(framework.value(), result.is_ok());
    Ok(Json(result?))
}

/// `GET /link/{id}`: public page of a preview shape.
#[tracing::instrument(name = "link_page", skip(state))]
pub async fn link_page(State(state): State<AppState>, Path(id): Path<String>) -> Html<String> {
    let key = LinkKey::Shape(PreviewId::from_raw(id.as_str()));
    let page = if validation::validate_preview_id(&id).is_ok() {
        resolve(state.links.as_ref(), &key).await
    } else {
        ResolvedPage::NotFound
    };
    metrics::record_link_resolution("link", page.is_found());
    Html(render_page(&key, &page, &state.site))
}

/// `GET /{app-name}`: public page of a named app.
#[tracing::instrument(name = "app_page", skip(state))]
pub async fn app_page(State(state): State<AppState>, Path(name): Path<String>) -> Html<String> {
    let key = LinkKey::App(name.clone());
    let page = if validation::validate_app_name(&name).is_ok() {
        resolve(state.links.as_ref(), &key).await
    } else {
        ResolvedPage::NotFound
    };
    metrics::record_link_resolution("app", page.is_found());
    Html(render_page(&key, &page, &state.site))
}
