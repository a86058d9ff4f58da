//! Tree endpoints: `/trees`, `/trees/{id}`, `/trees/search/{value}`

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::Envelope;
use crate::db::repos::{Tree, TreeRepo, TreeSummary};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, EntityId};
use crate::http::server::AppState;
use crate::models::{FieldErrors, TreeFields};

/// Request body for create and update
#[derive(Debug, Default, Deserialize)]
pub struct TreeRequest {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub height: Option<f64>,
    pub size: Option<f64>,
}

impl TreeRequest {
    pub(super) fn fields(self) -> Result<TreeFields, FieldErrors> {
        TreeFields::new(self.name.as_deref(), self.location, self.height, self.size)
    }
}

/// Single-tree projection for `GET /trees/{id}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDetail {
    pub id: i64,
    pub tree: String,
    pub location: Option<String>,
    pub height_ft: Option<f64>,
    pub ground_circumference_ft: Option<f64>,
}

impl From<Tree> for TreeDetail {
    fn from(t: Tree) -> Self {
        Self {
            id: t.id,
            tree: t.tree,
            location: t.location,
            height_ft: t.height_ft,
            ground_circumference_ft: t.ground_circumference_ft,
        }
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trees", get(list_trees).post(create_tree))
        .route(
            "/trees/{id}",
            get(get_tree).put(update_tree).delete(delete_tree),
        )
        .route("/trees/search/{value}", get(search_trees))
}

/// GET /trees - tallest first
async fn list_trees(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TreeSummary>>, ApiError> {
    let trees = TreeRepo::new(&state.pool)
        .list()
        .await
        .map_err(|e| ApiError::db(e, "Could not list trees"))?;
    Ok(Json(trees))
}

/// GET /trees/{id}
async fn get_tree(
    State(state): State<Arc<AppState>>,
    EntityId(id): EntityId,
) -> Result<Json<TreeDetail>, ApiError> {
    let tree = TreeRepo::new(&state.pool)
        .get(id)
        .await
        .map_err(|e| ApiError::db(e, format!("Could not find tree {}", id)))?;
    Ok(Json(tree.into()))
}

/// POST /trees
async fn create_tree(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<TreeRequest>,
) -> Result<Json<Envelope<Tree>>, ApiError> {
    const FAILED: &str = "Could not create new tree";

    let fields = req.fields().map_err(|e| ApiError::validation(e, FAILED))?;
    let tree = TreeRepo::new(&state.pool)
        .create(&fields)
        .await
        .map_err(|e| ApiError::db(e, FAILED))?;

    Ok(Json(Envelope::success("Successfully created new tree", tree)))
}

/// PUT /trees/{id} - full replace
async fn update_tree(
    State(state): State<Arc<AppState>>,
    EntityId(id): EntityId,
    ApiJson(req): ApiJson<TreeRequest>,
) -> Result<Json<Envelope<Tree>>, ApiError> {
    let failed = format!("Could not update tree {}", id);

    if let Some(body_id) = req.id.filter(|body_id| *body_id != id) {
        return Err(ApiError::BadRequest {
            message: failed,
            details: format!("{} does not match {}", id, body_id),
        });
    }

    let fields = req
        .fields()
        .map_err(|e| ApiError::validation(e, failed.clone()))?;
    let tree = TreeRepo::new(&state.pool)
        .update(id, &fields)
        .await
        .map_err(|e| ApiError::db(e, failed))?;

    Ok(Json(Envelope::success(
        format!("Successfully updated tree {}", id),
        tree,
    )))
}

/// DELETE /trees/{id}
async fn delete_tree(
    State(state): State<Arc<AppState>>,
    EntityId(id): EntityId,
) -> Result<Json<Envelope<()>>, ApiError> {
    TreeRepo::new(&state.pool)
        .delete(id)
        .await
        .map_err(|e| ApiError::db(e, format!("Could not remove tree {}", id)))?;

    Ok(Json(Envelope::done(format!("Successfully removed tree {}", id))))
}

/// GET /trees/search/{value}
async fn search_trees(
    State(state): State<Arc<AppState>>,
    Path(value): Path<String>,
) -> Result<Json<Vec<TreeSummary>>, ApiError> {
    let trees = TreeRepo::new(&state.pool)
        .search(&value)
        .await
        .map_err(|e| ApiError::db(e, "Could not search trees"))?;
    Ok(Json(trees))
}
