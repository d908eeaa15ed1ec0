use axum::{
    extract::{Path, Query, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use crate::error::AppError;
use crate::models::{QuotationDetail, QuotationInput};
use crate::quotation_doc;
use crate::reconcile::ApplyOutcome;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    pub message: &'static str,
    pub quotation_id: i32,
    pub services: u64,
    pub installments: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub message: &'static str,
    pub quotation_id: i32,
    pub services: ApplyOutcome,
    pub installments: ApplyOutcome,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Json,
    Markdown,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentQuery {
    #[serde(default)]
    pub format: DocumentFormat,
}

/// GET /
pub async fn list_quotations(
    State(state): State<AppState>,
) -> Result<Json<Vec<QuotationDetail>>, AppError> {
    let quotations = state.store.list_quotations().await?;
    Ok(Json(quotations))
}

/// POST /create
pub async fn create_quotation(
    State(state): State<AppState>,
    Json(input): Json<QuotationInput>,
) -> Result<Json<CreateResponse>, AppError> {
    let draft = input.into_draft()?;
    let created = state.store.create_quotation(draft).await?;

    info!(
        quotation_id = created.id,
        services = created.services,
        installments = created.installments,
        "Quotation created"
    );

    Ok(Json(CreateResponse {
        message: "Quotation, Installments, and Services added successfully!",
        quotation_id: created.id,
        services: created.services,
        installments: created.installments,
    }))
}

/// PUT /update/:id
///
/// Rewrites the header and reconciles both child collections: rows sent
/// with an `id` are updated, rows without one are added, and rows the
/// request no longer lists are deleted.
pub async fn update_quotation(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<QuotationInput>,
) -> Result<Json<UpdateResponse>, AppError> {
    let draft = input.into_draft()?;
    let updated = state
        .store
        .update_quotation(id, draft)
        .await?
        .ok_or(AppError::NotFound("Quotation not found"))?;

    info!(
        quotation_id = id,
        services = ?updated.services,
        installments = ?updated.installments,
        "Quotation updated"
    );

    Ok(Json(UpdateResponse {
        message: "Quotation, Installments, and Services updated successfully!",
        quotation_id: id,
        services: updated.services,
        installments: updated.installments,
    }))
}

/// DELETE /delete/:id
pub async fn delete_quotation(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    if !state.store.delete_quotation(id).await? {
        return Err(AppError::NotFound("Quotation not found"));
    }

    info!(quotation_id = id, "Quotation deleted");
    Ok(Json(MessageResponse {
        message: "Quotation, installments, and services deleted successfully",
    }))
}

/// GET /pdf/:id
///
/// Returns the quotation as JSON, or as a Markdown document with
/// `?format=markdown`.
pub async fn get_quotation(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<DocumentQuery>,
) -> Result<Response, AppError> {
    let detail = state
        .store
        .get_quotation(id)
        .await?
        .ok_or(AppError::NotFound("Quotation not found"))?;

    Ok(match query.format {
        DocumentFormat::Json => Json(detail).into_response(),
        DocumentFormat::Markdown => (
            [(CONTENT_TYPE, "text/markdown; charset=utf-8")],
            quotation_doc::generate_markdown(&detail),
        )
            .into_response(),
    })
}
