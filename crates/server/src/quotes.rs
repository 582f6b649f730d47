//! Quote lifecycle endpoints.
//!
//! - `GET/POST /api/quotes`, `GET/PUT/DELETE /api/quotes/{id}`
//! - `POST /api/quotes/{id}/send|accept|reject|duplicate`
//! - `POST /api/quotes/{id}/apply-template`
//! - `POST /api/quotes/{id}/save-as-template`
//! - `GET  /api/quotes/{id}/pdf`
//!
//! Every response exposes a `synced` flag: `false` means the working copy
//! diverged from storage because a persist attempt failed.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use devis_core::lifecycle::{self, QuoteDraft};
use devis_core::{ApplicationError, Quote, QuoteId, QuoteSection, Template, TemplateId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{not_found, persistence_error, ApiError, AppState};
use crate::workspace::WorkingCopy;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/quotes", get(list_quotes).post(create_quote))
        .route("/api/quotes/{id}", get(get_quote).put(update_quote).delete(delete_quote))
        .route("/api/quotes/{id}/send", post(send_quote))
        .route("/api/quotes/{id}/accept", post(accept_quote))
        .route("/api/quotes/{id}/reject", post(reject_quote))
        .route("/api/quotes/{id}/duplicate", post(duplicate_quote))
        .route("/api/quotes/{id}/apply-template", post(apply_template))
        .route("/api/quotes/{id}/save-as-template", post(save_as_template))
        .route("/api/quotes/{id}/pdf", get(export_pdf))
        .with_state(state)
}

/// A quote plus its persistence state.
#[derive(Debug, Serialize)]
pub struct QuoteEnvelope {
    #[serde(flatten)]
    pub quote: Quote,
    pub synced: bool,
}

impl From<WorkingCopy> for QuoteEnvelope {
    fn from(copy: WorkingCopy) -> Self {
        Self { quote: copy.quote, synced: copy.synced }
    }
}

#[derive(Debug, Deserialize)]
pub struct QuoteUpdate {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_email: Option<Option<String>>,
    #[serde(default)]
    pub client_phone: Option<Option<String>>,
    #[serde(default)]
    pub client_address: Option<String>,
    #[serde(default)]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub payment_conditions: Option<Option<String>>,
    #[serde(default)]
    pub validity_days: Option<u32>,
    #[serde(default)]
    pub execution_timeframe: Option<Option<String>>,
    #[serde(default)]
    pub discount_percentage: Option<Decimal>,
    #[serde(default)]
    pub iva_rate: Option<Decimal>,
    #[serde(default)]
    pub sections: Option<Vec<QuoteSection>>,
}

#[derive(Debug, Deserialize)]
pub struct ApplyTemplateRequest {
    pub template_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveAsTemplateRequest {
    pub name: String,
}

pub async fn list_quotes(
    State(state): State<AppState>,
) -> Result<Json<Vec<QuoteEnvelope>>, ApiError> {
    let copies = state.workspace.list().await?;
    Ok(Json(copies.into_iter().map(QuoteEnvelope::from).collect()))
}

pub async fn create_quote(
    State(state): State<AppState>,
    Json(draft): Json<QuoteDraft>,
) -> Result<(StatusCode, Json<QuoteEnvelope>), ApiError> {
    let numbers = state.workspace.quote_numbers().await?;
    let quote_number = lifecycle::next_quote_number(&numbers, Utc::now());
    let defaults = lifecycle::QuoteDefaults::from(&state.company);
    let quote = lifecycle::create(draft, quote_number, &defaults)?;

    info!(
        event_name = "quote.created",
        quote_id = %quote.id.0,
        quote_number = %quote.quote_number,
        "quote created"
    );
    let copy = state.workspace.insert(quote).await;
    Ok((StatusCode::CREATED, Json(copy.into())))
}

pub async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuoteEnvelope>, ApiError> {
    let copy = state.workspace.get(&QuoteId(id)).await?;
    Ok(Json(copy.into()))
}

pub async fn update_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<QuoteUpdate>,
) -> Result<Json<QuoteEnvelope>, ApiError> {
    let copy = state
        .workspace
        .mutate(&QuoteId(id), |quote| {
            quote.ensure_editable()?;
            if let Some(client_name) = update.client_name {
                quote.client_name = client_name;
            }
            if let Some(client_email) = update.client_email {
                quote.client_email = client_email;
            }
            if let Some(client_phone) = update.client_phone {
                quote.client_phone = client_phone;
            }
            if let Some(client_address) = update.client_address {
                quote.client_address = client_address;
            }
            if let Some(notes) = update.notes {
                quote.notes = notes;
            }
            if let Some(payment_conditions) = update.payment_conditions {
                quote.payment_conditions = payment_conditions;
            }
            if let Some(validity_days) = update.validity_days {
                quote.set_validity_days(validity_days)?;
            }
            if let Some(execution_timeframe) = update.execution_timeframe {
                quote.execution_timeframe = execution_timeframe;
            }
            if let Some(discount) = update.discount_percentage {
                quote.set_discount_percentage(discount)?;
            }
            if let Some(iva_rate) = update.iva_rate {
                quote.set_iva_rate(iva_rate)?;
            }
            if let Some(sections) = update.sections {
                for section in &sections {
                    for item in &section.items {
                        item.validate()?;
                    }
                }
                quote.sections = sections;
            }
            Ok(())
        })
        .await?;
    Ok(Json(copy.into()))
}

pub async fn delete_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.workspace.remove(&QuoteId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn send_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuoteEnvelope>, ApiError> {
    let copy = state.workspace.mutate(&QuoteId(id), lifecycle::mark_sent).await?;
    info!(
        event_name = "quote.sent",
        quote_id = %copy.quote.id.0,
        quote_number = %copy.quote.quote_number,
        "quote marked as sent"
    );
    Ok(Json(copy.into()))
}

pub async fn accept_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuoteEnvelope>, ApiError> {
    let copy = state.workspace.mutate(&QuoteId(id), lifecycle::accept).await?;
    info!(
        event_name = "quote.accepted",
        quote_id = %copy.quote.id.0,
        quote_number = %copy.quote.quote_number,
        "quote accepted"
    );
    Ok(Json(copy.into()))
}

pub async fn reject_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuoteEnvelope>, ApiError> {
    let copy = state.workspace.mutate(&QuoteId(id), lifecycle::reject).await?;
    info!(
        event_name = "quote.rejected",
        quote_id = %copy.quote.id.0,
        quote_number = %copy.quote.quote_number,
        "quote rejected"
    );
    Ok(Json(copy.into()))
}

pub async fn duplicate_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<QuoteEnvelope>), ApiError> {
    let source = state.workspace.get(&QuoteId(id)).await?.quote;
    let numbers = state.workspace.quote_numbers().await?;
    let quote_number = lifecycle::next_quote_number(&numbers, Utc::now());
    let duplicate = lifecycle::duplicate(&source, quote_number);

    info!(
        event_name = "quote.duplicated",
        source_quote_id = %source.id.0,
        quote_id = %duplicate.id.0,
        quote_number = %duplicate.quote_number,
        "quote duplicated"
    );
    let copy = state.workspace.insert(duplicate).await;
    Ok((StatusCode::CREATED, Json(copy.into())))
}

pub async fn apply_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ApplyTemplateRequest>,
) -> Result<Json<QuoteEnvelope>, ApiError> {
    let template_id = TemplateId(request.template_id);
    let template = state
        .templates
        .find_by_id(&template_id)
        .await
        .map_err(persistence_error)?
        .ok_or_else(|| not_found("template", &template_id.0))?;

    let copy = state
        .workspace
        .mutate(&QuoteId(id), |quote| lifecycle::apply_template(quote, &template))
        .await?;
    Ok(Json(copy.into()))
}

pub async fn save_as_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SaveAsTemplateRequest>,
) -> Result<(StatusCode, Json<Template>), ApiError> {
    let quote = state.workspace.get(&QuoteId(id)).await?.quote;
    let template = lifecycle::save_as_template(&quote, request.name)?;
    state.templates.save(template.clone()).await.map_err(persistence_error)?;

    info!(
        event_name = "quote.saved_as_template",
        quote_id = %quote.id.0,
        template_id = %template.id.0,
        "quote captured as template"
    );
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn export_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let quote = state.workspace.get(&QuoteId(id)).await?.quote;
    let result = state
        .pdf
        .generate_quote_pdf(&quote, &state.company)
        .await
        .map_err(|e| ApiError(ApplicationError::Configuration(e.to_string())))?;

    let filename = format!("devis-{}.pdf", quote.quote_number);
    Ok(result.into_response(&filename))
}
