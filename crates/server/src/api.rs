//! Shared state and error mapping for the JSON API.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use devis_core::config::{AppConfig, CompanyConfig};
use devis_core::{ApplicationError, DomainError};
use devis_db::repositories::{
    LaborRepository, MaterialRepository, SqlLaborRepository, SqlMaterialRepository,
    SqlQuoteRepository, SqlTemplateRepository, TemplateRepository,
};
use devis_db::DbPool;
use serde::Serialize;
use tracing::warn;

use crate::pdf::PdfGenerator;
use crate::workspace::QuoteWorkspace;

#[derive(Clone)]
pub struct AppState {
    pub materials: Arc<dyn MaterialRepository>,
    pub labor: Arc<dyn LaborRepository>,
    pub templates: Arc<dyn TemplateRepository>,
    pub workspace: Arc<QuoteWorkspace>,
    pub pdf: Arc<PdfGenerator>,
    pub company: CompanyConfig,
}

impl AppState {
    pub fn new(db_pool: DbPool, config: &AppConfig) -> Self {
        let pdf = match PdfGenerator::new(&config.pdf) {
            Ok(generator) => generator,
            Err(error) => {
                warn!(error = %error, "filesystem quote templates unavailable, using embedded template");
                PdfGenerator::with_embedded_templates()
            }
        };

        Self {
            materials: Arc::new(SqlMaterialRepository::new(db_pool.clone())),
            labor: Arc::new(SqlLaborRepository::new(db_pool.clone())),
            templates: Arc::new(SqlTemplateRepository::new(db_pool.clone())),
            workspace: Arc::new(QuoteWorkspace::new(Arc::new(SqlQuoteRepository::new(db_pool)))),
            pdf: Arc::new(pdf),
            company: config.company.clone(),
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State backed by in-memory repositories, for handler tests.
    pub fn in_memory() -> Self {
        use devis_core::Market;
        use devis_db::repositories::{
            InMemoryLaborRepository, InMemoryMaterialRepository, InMemoryQuoteRepository,
            InMemoryTemplateRepository,
        };

        Self {
            materials: Arc::new(InMemoryMaterialRepository::default()),
            labor: Arc::new(InMemoryLaborRepository::default()),
            templates: Arc::new(InMemoryTemplateRepository::default()),
            workspace: Arc::new(QuoteWorkspace::new(Arc::new(
                InMemoryQuoteRepository::default(),
            ))),
            pdf: Arc::new(PdfGenerator::with_embedded_templates()),
            company: CompanyConfig {
                name: "Devis Test".to_string(),
                address: "1 rue du Test".to_string(),
                phone: None,
                email: None,
                vat_number: None,
                default_market: Market::Luxembourg,
                default_iva: rust_decimal::Decimal::new(17, 0),
                default_validity_days: 30,
                default_payment_conditions: None,
                currency: "EUR".to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// API-facing error wrapper. Domain failures map to client status codes,
/// infrastructure failures to 5xx.
#[derive(Debug)]
pub struct ApiError(pub ApplicationError);

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        Self(error)
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self(ApplicationError::Domain(error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ApplicationError::Domain(DomainError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApplicationError::Domain(DomainError::InvalidStatusTransition { .. }) => {
                StatusCode::CONFLICT
            }
            ApplicationError::Domain(DomainError::NotEditable(_)) => StatusCode::CONFLICT,
            ApplicationError::Domain(DomainError::SystemTemplateProtected) => {
                StatusCode::FORBIDDEN
            }
            ApplicationError::NotFound(_) => StatusCode::NOT_FOUND,
            ApplicationError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApplicationError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status.is_server_error() || status == StatusCode::SERVICE_UNAVAILABLE {
            warn!(error = %self.0, "request failed on infrastructure error");
            self.0.user_message().to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub fn persistence_error(error: devis_db::repositories::RepositoryError) -> ApiError {
    ApiError(ApplicationError::Persistence(error.to_string()))
}

pub fn not_found(what: &str, id: &str) -> ApiError {
    ApiError(ApplicationError::NotFound(format!("{what} {id}")))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use devis_core::{ApplicationError, DomainError, QuoteStatus};

    use super::ApiError;

    #[test]
    fn domain_errors_map_to_client_status_codes() {
        let cases = [
            (DomainError::Validation("name must not be blank".to_string()), StatusCode::BAD_REQUEST),
            (
                DomainError::InvalidStatusTransition {
                    from: QuoteStatus::Draft,
                    to: QuoteStatus::Accepted,
                },
                StatusCode::CONFLICT,
            ),
            (DomainError::NotEditable("Q-2026-004".to_string()), StatusCode::CONFLICT),
            (DomainError::SystemTemplateProtected, StatusCode::FORBIDDEN),
        ];

        for (error, expected) in cases {
            let response = ApiError::from(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn infrastructure_errors_hide_details() {
        let response =
            ApiError(ApplicationError::Persistence("disk full at /var/db".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn missing_resources_are_not_found() {
        let response = super::not_found("quote", "q-123").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
