//! Routes that cross the tree/insect association
//!
//! - `GET /trees-insects`: every tree with its insects, one joined query
//! - `GET /insects-trees`: every insect, then one query per insect for its trees
//! - `POST /associate-tree-insect`: resolve or create both sides, then link them

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::insects::InsectRequest;
use super::trees::TreeRequest;
use super::Envelope;
use crate::db::repos::{
    AssociationRepo, DbError, Insect, InsectRepo, InsectWithTrees, Tree, TreeRepo,
    TreeWithInsects,
};
use crate::http::error::ApiError;
use crate::http::extractors::ApiJson;
use crate::http::server::AppState;

const ASSOCIATE_FAILED: &str = "Could not create association";

/// Body for `POST /associate-tree-insect`.
///
/// Each side is either `{"id": n}` naming an existing record, or the fields
/// of a record to create.
#[derive(Debug, Deserialize)]
pub struct AssociateRequest {
    pub tree: TreeRequest,
    pub insect: InsectRequest,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trees-insects", get(trees_with_insects))
        .route("/insects-trees", get(insects_with_trees))
        .route("/associate-tree-insect", post(associate))
}

/// GET /trees-insects
async fn trees_with_insects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TreeWithInsects>>, ApiError> {
    let trees = AssociationRepo::new(&state.pool)
        .trees_with_insects()
        .await
        .map_err(|e| ApiError::db(e, "Could not load trees with insects"))?;
    Ok(Json(trees))
}

/// GET /insects-trees
async fn insects_with_trees(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<InsectWithTrees>>, ApiError> {
    let insects = AssociationRepo::new(&state.pool)
        .insects_with_trees()
        .await
        .map_err(|e| ApiError::db(e, "Could not load insects with trees"))?;
    Ok(Json(insects))
}

/// POST /associate-tree-insect
///
/// Records created while resolving a side stay in place if a later step
/// fails.
async fn associate(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AssociateRequest>,
) -> Result<Json<Envelope<Tree>>, ApiError> {
    let tree = resolve_tree(&state, req.tree).await?;
    let insect = resolve_insect(&state, req.insect).await?;

    match AssociationRepo::new(&state.pool)
        .create(tree.id, insect.id)
        .await
    {
        Ok(_) => Ok(Json(Envelope::success(
            "Successfully recorded information",
            tree,
        ))),
        Err(e @ DbError::AlreadyAssociated { .. }) => Err(ApiError::Conflict {
            message: format!(
                "Association already exists between {} and {}",
                tree.tree, insect.name
            ),
            details: e.to_string(),
        }),
        Err(e) => Err(ApiError::db(e, ASSOCIATE_FAILED)),
    }
}

async fn resolve_tree(state: &AppState, req: TreeRequest) -> Result<Tree, ApiError> {
    let repo = TreeRepo::new(&state.pool);

    let result = match req.id {
        Some(id) => repo.get(id).await,
        None => {
            let fields = req
                .fields()
                .map_err(|e| ApiError::validation(e, ASSOCIATE_FAILED))?;
            repo.create(&fields).await
        }
    };

    result.map_err(|e| ApiError::db(e, ASSOCIATE_FAILED))
}

async fn resolve_insect(state: &AppState, req: InsectRequest) -> Result<Insect, ApiError> {
    let repo = InsectRepo::new(&state.pool);

    let result = match req.id {
        Some(id) => repo.get(id).await,
        None => {
            let fields = req
                .fields()
                .map_err(|e| ApiError::validation(e, ASSOCIATE_FAILED))?;
            repo.create(&fields).await
        }
    };

    result.map_err(|e| ApiError::db(e, ASSOCIATE_FAILED))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::http::routes::testing::{app, send};

    fn names(items: &Value, key: &str) -> Vec<String> {
        items
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v[key].as_str().unwrap().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn associate_creates_both_sides() {
        let (app, _pool) = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/associate-tree-insect",
            Some(json!({
                "tree": {"name": "Stagg", "location": "Private Land", "height": 243.0, "size": 109.0},
                "insect": {"name": "Patu Digua Spider", "fact": "Smaller than a pinhead"}
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Successfully recorded information");
        assert_eq!(body["data"]["tree"], "Stagg");

        let (_, insects) = send(&app, Method::GET, "/insects-trees", None).await;
        assert_eq!(insects[0]["name"], "Patu Digua Spider");
        assert_eq!(names(&insects[0]["trees"], "tree"), ["Stagg"]);
    }

    #[tokio::test]
    async fn associate_twice_conflicts() {
        let (app, pool) = app().await;
        send(&app, Method::POST, "/trees", Some(json!({"name": "Lincoln"}))).await;
        send(&app, Method::POST, "/insects", Some(json!({"name": "Atlas Moth"}))).await;
        let link = json!({"tree": {"id": 1}, "insect": {"id": 1}});

        let (first, _) = send(&app, Method::POST, "/associate-tree-insect", Some(link.clone())).await;
        assert_eq!(first, StatusCode::OK);

        let (second, body) = send(&app, Method::POST, "/associate-tree-insect", Some(link)).await;
        assert_eq!(second, StatusCode::CONFLICT);
        assert_eq!(body["status"], "error");
        assert_eq!(
            body["message"],
            "Association already exists between Lincoln and Atlas Moth"
        );

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM insect_trees")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn associate_unknown_id_is_not_found() {
        let (app, _pool) = app().await;
        send(&app, Method::POST, "/insects", Some(json!({"name": "Atlas Moth"}))).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/associate-tree-insect",
            Some(json!({"tree": {"id": 99}, "insect": {"id": 1}})),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "not-found");
        assert_eq!(body["message"], "Could not create association");
    }

    #[tokio::test]
    async fn associate_keeps_tree_when_insect_fails() {
        let (app, _pool) = app().await;
        send(&app, Method::POST, "/insects", Some(json!({"name": "Atlas Moth"}))).await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/associate-tree-insect",
            Some(json!({"tree": {"name": "President"}, "insect": {"name": "Atlas Moth"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, trees) = send(&app, Method::GET, "/trees", None).await;
        assert_eq!(names(&trees, "tree"), ["President"]);
    }

    #[tokio::test]
    async fn eager_sorts_trees_and_insects() {
        let (app, _pool) = app().await;
        send(&app, Method::POST, "/trees", Some(json!({"name": "A", "height": 10.0}))).await;
        send(&app, Method::POST, "/trees", Some(json!({"name": "B", "height": 20.0}))).await;
        send(&app, Method::POST, "/trees", Some(json!({"name": "C", "height": 5.0}))).await;

        for (tree, insect) in [(1, "Zebra"), (1, "Alpha"), (2, "Mango")] {
            send(
                &app,
                Method::POST,
                "/associate-tree-insect",
                Some(json!({"tree": {"id": tree}, "insect": {"name": insect}})),
            )
            .await;
        }

        let (status, body) = send(&app, Method::GET, "/trees-insects", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&body, "tree"), ["B", "A", "C"]);
        assert_eq!(names(&body[0]["insects"], "name"), ["Mango"]);
        assert_eq!(names(&body[1]["insects"], "name"), ["Alpha", "Zebra"]);
        assert_eq!(body[2]["insects"], json!([]));
        assert_eq!(body[1]["heightFt"], 10.0);
    }

    #[tokio::test]
    async fn lazy_sorts_insects_and_trees() {
        let (app, _pool) = app().await;
        send(&app, Method::POST, "/trees", Some(json!({"name": "Pine"}))).await;
        send(&app, Method::POST, "/trees", Some(json!({"name": "Oak"}))).await;
        send(&app, Method::POST, "/insects", Some(json!({"name": "X"}))).await;
        send(&app, Method::POST, "/insects", Some(json!({"name": "Ant"}))).await;

        for tree in [1, 2] {
            send(
                &app,
                Method::POST,
                "/associate-tree-insect",
                Some(json!({"tree": {"id": tree}, "insect": {"id": 1}})),
            )
            .await;
        }

        let (status, body) = send(&app, Method::GET, "/insects-trees", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&body, "name"), ["Ant", "X"]);
        assert_eq!(body[0]["trees"], json!([]));
        assert_eq!(names(&body[1]["trees"], "tree"), ["Oak", "Pine"]);
    }
}
