//! Catalog endpoints for materials and labor rates.
//!
//! - `GET  /api/materials`        — list the material catalog
//! - `POST /api/materials`        — create a material
//! - `PUT  /api/materials/{id}`   — update a material in place
//! - `DELETE /api/materials/{id}` — remove a material
//! - same surface under `/api/labor` for labor rates

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};
use devis_core::{Labor, LaborDraft, LaborId, Material, MaterialDraft, MaterialId};

use crate::api::{not_found, persistence_error, ApiError, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/materials", get(list_materials).post(create_material))
        .route("/api/materials/{id}", put(update_material).delete(delete_material))
        .route("/api/labor", get(list_labor).post(create_labor))
        .route("/api/labor/{id}", put(update_labor).delete(delete_labor))
        .with_state(state)
}

pub async fn list_materials(
    State(state): State<AppState>,
) -> Result<Json<Vec<Material>>, ApiError> {
    let materials = state.materials.list().await.map_err(persistence_error)?;
    Ok(Json(materials))
}

pub async fn create_material(
    State(state): State<AppState>,
    Json(draft): Json<MaterialDraft>,
) -> Result<(StatusCode, Json<Material>), ApiError> {
    let material = draft.build()?;
    state.materials.save(material.clone()).await.map_err(persistence_error)?;
    Ok((StatusCode::CREATED, Json(material)))
}

pub async fn update_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<MaterialDraft>,
) -> Result<Json<Material>, ApiError> {
    let id = MaterialId(id);
    let mut material = state
        .materials
        .find_by_id(&id)
        .await
        .map_err(persistence_error)?
        .ok_or_else(|| not_found("material", &id.0))?;
    draft.apply_to(&mut material)?;
    state.materials.save(material.clone()).await.map_err(persistence_error)?;
    Ok(Json(material))
}

pub async fn delete_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = MaterialId(id);
    let deleted = state.materials.delete(&id).await.map_err(persistence_error)?;
    if !deleted {
        return Err(not_found("material", &id.0));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_labor(State(state): State<AppState>) -> Result<Json<Vec<Labor>>, ApiError> {
    let labor = state.labor.list().await.map_err(persistence_error)?;
    Ok(Json(labor))
}

pub async fn create_labor(
    State(state): State<AppState>,
    Json(draft): Json<LaborDraft>,
) -> Result<(StatusCode, Json<Labor>), ApiError> {
    let labor = draft.build()?;
    state.labor.save(labor.clone()).await.map_err(persistence_error)?;
    Ok((StatusCode::CREATED, Json(labor)))
}

pub async fn update_labor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<LaborDraft>,
) -> Result<Json<Labor>, ApiError> {
    let id = LaborId(id);
    let mut labor = state
        .labor
        .find_by_id(&id)
        .await
        .map_err(persistence_error)?
        .ok_or_else(|| not_found("labor", &id.0))?;
    draft.apply_to(&mut labor)?;
    state.labor.save(labor.clone()).await.map_err(persistence_error)?;
    Ok(Json(labor))
}

pub async fn delete_labor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = LaborId(id);
    let deleted = state.labor.delete(&id).await.map_err(persistence_error)?;
    if !deleted {
        return Err(not_found("labor", &id.0));
    }
    Ok(StatusCode::NO_CONTENT)
}
