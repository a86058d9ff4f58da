//! Insect endpoints: `/insects`, `/insects/{id}`, `/insects/search/{value}`

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use super::Envelope;
use crate::db::repos::{Insect, InsectRepo, InsectSummary};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, EntityId};
use crate::http::server::AppState;
use crate::models::{FieldErrors, InsectFields};

/// Request body for create and update. `fact` is ignored on update.
#[derive(Debug, Default, Deserialize)]
pub struct InsectRequest {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub territory: Option<String>,
    pub millimeters: Option<f64>,
    pub fact: Option<String>,
}

impl InsectRequest {
    pub(super) fn fields(self) -> Result<InsectFields, FieldErrors> {
        InsectFields::new(
            self.name.as_deref(),
            self.description,
            self.territory,
            self.millimeters,
            self.fact,
        )
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/insects", get(list_insects).post(create_insect))
        .route(
            "/insects/{id}",
            get(get_insect).put(update_insect).delete(delete_insect),
        )
        .route("/insects/search/{value}", get(search_insects))
}

async fn list_insects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<InsectSummary>>, ApiError> {
    let insects = InsectRepo::new(&state.pool)
        .list()
        .await
        .map_err(|e| ApiError::db(e, "Could not list insects"))?;
    Ok(Json(insects))
}

async fn get_insect(
    State(state): State<Arc<AppState>>,
    EntityId(id): EntityId,
) -> Result<Json<InsectSummary>, ApiError> {
    let insect = InsectRepo::new(&state.pool)
        .get(id)
        .await
        .map_err(|e| ApiError::db(e, format!("Could not find insect {}", id)))?;
    Ok(Json(insect.into()))
}

async fn create_insect(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<InsectRequest>,
) -> Result<Json<Envelope<Insect>>, ApiError> {
    const FAILED: &str = "Could not create new insect";

    let fields = req.fields().map_err(|e| ApiError::validation(e, FAILED))?;
    let insect = InsectRepo::new(&state.pool)
        .create(&fields)
        .await
        .map_err(|e| ApiError::db(e, FAILED))?;

    Ok(Json(Envelope::success("Successfully created new insect", insect)))
}

async fn update_insect(
    State(state): State<Arc<AppState>>,
    EntityId(id): EntityId,
    ApiJson(req): ApiJson<InsectRequest>,
) -> Result<Json<Envelope<Insect>>, ApiError> {
    let failed = format!("Could not update insect {}", id);

    if let Some(body_id) = req.id.filter(|body_id| *body_id != id) {
        return Err(ApiError::BadRequest {
            message: failed,
            details: format!("{} does not match {}", id, body_id),
        });
    }

    let fields = req
        .fields()
        .map_err(|e| ApiError::validation(e, failed.clone()))?;
    let insect = InsectRepo::new(&state.pool)
        .update(id, &fields)
        .await
        .map_err(|e| ApiError::db(e, failed))?;

    Ok(Json(Envelope::success(
        format!("Successfully updated insect {}", id),
        insect,
    )))
}

async fn delete_insect(
    State(state): State<Arc<AppState>>,
    EntityId(id): EntityId,
) -> Result<Json<Envelope<()>>, ApiError> {
    InsectRepo::new(&state.pool)
        .delete(id)
        .await
        .map_err(|e| ApiError::db(e, format!("Could not remove insect {}", id)))?;

    Ok(Json(Envelope::done(format!(
        "Successfully removed insect {}",
        id
    ))))
}

async fn search_insects(
    State(state): State<Arc<AppState>>,
    Path(value): Path<String>,
) -> Result<Json<Vec<InsectSummary>>, ApiError> {
    let insects = InsectRepo::new(&state.pool)
        .search(&value)
        .await
        .map_err(|e| ApiError::db(e, "Could not search insects"))?;
    Ok(Json(insects))
}
