//! Quote template endpoints.
//!
//! System templates ship with the seed catalog and cannot be deleted;
//! user templates are created from scratch here or captured from an
//! existing quote via the quote routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get},
    Router,
};
use devis_core::{QuoteSection, Template, TemplateId};
use serde::Deserialize;

use crate::api::{not_found, persistence_error, ApiError, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/templates", get(list_templates).post(create_template))
        .route("/api/templates/{id}", delete(delete_template))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    #[serde(default)]
    pub sections: Vec<QuoteSection>,
}

pub async fn list_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<Template>>, ApiError> {
    let templates = state.templates.list().await.map_err(persistence_error)?;
    Ok(Json(templates))
}

pub async fn create_template(
    State(state): State<AppState>,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<Template>), ApiError> {
    let template = Template::from_sections(request.name, &request.sections)?;
    state.templates.save(template.clone()).await.map_err(persistence_error)?;
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = TemplateId(id);
    let template = state
        .templates
        .find_by_id(&id)
        .await
        .map_err(persistence_error)?
        .ok_or_else(|| not_found("template", &id.0))?;
    template.ensure_mutable()?;

    let deleted = state.templates.delete(&id).await.map_err(persistence_error)?;
    if !deleted {
        return Err(not_found("template", &id.0));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::Json;
    use devis_core::{QuoteItem, QuoteSection, Template, TemplateId};
    use rust_decimal_macros::dec;

    use super::{create_template, delete_template, list_templates, CreateTemplateRequest};
    use crate::api::AppState;

    fn section() -> QuoteSection {
        let mut section = QuoteSection::new("Cuisine".to_string());
        section.items.push(QuoteItem::manual(
            "Peinture murs".to_string(),
            "m2".to_string(),
            dec!(20),
            dec!(12),
        ));
        section
    }

    #[tokio::test]
    async fn created_template_is_a_user_template_with_fresh_ids() {
        let state = AppState::in_memory();
        let source = section();

        let (status, Json(template)) = create_template(
            State(state.clone()),
            Json(CreateTemplateRequest {
                name: "Cuisine standard".to_string(),
                sections: vec![source.clone()],
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert!(!template.is_system_template);
        assert_ne!(template.sections[0].id, source.id);
        assert_ne!(template.sections[0].items[0].id, source.items[0].id);

        let Json(listed) = list_templates(State(state)).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn blank_template_name_is_rejected() {
        let state = AppState::in_memory();
        let result = create_template(
            State(state),
            Json(CreateTemplateRequest { name: "  ".to_string(), sections: vec![section()] }),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn system_templates_cannot_be_deleted() {
        let state = AppState::in_memory();
        let mut template = Template::from_sections("Salle de bain".to_string(), &[section()])
            .unwrap();
        template.is_system_template = true;
        state.templates.save(template.clone()).await.unwrap();

        let error = delete_template(State(state.clone()), Path(template.id.0.clone()))
            .await
            .unwrap_err();
        assert_eq!(error.into_response().status(), StatusCode::FORBIDDEN);

        let found = state.templates.find_by_id(&template.id).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn user_templates_can_be_deleted() {
        let state = AppState::in_memory();
        let template =
            Template::from_sections("Cuisine".to_string(), &[section()]).unwrap();
        state.templates.save(template.clone()).await.unwrap();

        let status =
            delete_template(State(state.clone()), Path(template.id.0.clone())).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let found = state.templates.find_by_id(&TemplateId(template.id.0)).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn deleting_missing_template_is_not_found() {
        let state = AppState::in_memory();
        let error =
            delete_template(State(state), Path("nope".to_string())).await.unwrap_err();
        assert_eq!(error.into_response().status(), StatusCode::NOT_FOUND);
    }
}
