//! Tree repository
//!
//! - create: existence check on the name, then INSERT ... RETURNING
//! - update: full replace in a single UPDATE ... RETURNING
//! - delete: removes association rows and the tree in one transaction

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use super::{associations, is_unique_violation, like_pattern, now_timestamp, DbError};
use crate::models::TreeFields;

const RESOURCE: &str = "Tree";

/// Tree record from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub id: i64,
    pub tree: String,
    pub location: Option<String>,
    pub height_ft: Option<f64>,
    pub ground_circumference_ft: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

/// List/search projection
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSummary {
    pub id: i64,
    pub tree: String,
    pub height_ft: Option<f64>,
}

/// Tree repository
pub struct TreeRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TreeRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// All trees, tallest first.
    pub async fn list(&self) -> Result<Vec<TreeSummary>, DbError> {
        let trees = sqlx::query_as(
            r#"
            SELECT id, tree, height_ft
            FROM trees
            ORDER BY height_ft DESC, id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(trees)
    }

    /// Get a single tree by id.
    pub async fn get(&self, id: i64) -> Result<Tree, DbError> {
        sqlx::query_as(
            r#"
            SELECT id, tree, location, height_ft, ground_circumference_ft, created_at, updated_at
            FROM trees
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(DbError::NotFound {
            resource: RESOURCE,
            id,
        })
    }

    /// Look a tree up by its name.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Tree>, DbError> {
        let tree = sqlx::query_as(
            r#"
            SELECT id, tree, location, height_ft, ground_circumference_ft, created_at, updated_at
            FROM trees
            WHERE tree = ?
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(tree)
    }

    /// Create a tree, rejecting a name that is already taken.
    pub async fn create(&self, fields: &TreeFields) -> Result<Tree, DbError> {
        if self.find_by_name(&fields.name).await?.is_some() {
            return Err(duplicate(&fields.name));
        }

        let now = now_timestamp();
        let tree: Tree = sqlx::query_as(
            r#"
            INSERT INTO trees (tree, location, height_ft, ground_circumference_ft, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, tree, location, height_ft, ground_circumference_ft, created_at, updated_at
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.location)
        .bind(fields.height_ft)
        .bind(fields.ground_circumference_ft)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, &fields.name))?;

        tracing::debug!(id = tree.id, name = %tree.tree, "tree created");
        Ok(tree)
    }

    /// Overwrite every field of an existing tree.
    pub async fn update(&self, id: i64, fields: &TreeFields) -> Result<Tree, DbError> {
        sqlx::query_as(
            r#"
            UPDATE trees
            SET tree = ?, location = ?, height_ft = ?, ground_circumference_ft = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, tree, location, height_ft, ground_circumference_ft, created_at, updated_at
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.location)
        .bind(fields.height_ft)
        .bind(fields.ground_circumference_ft)
        .bind(now_timestamp())
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_write_error(e, &fields.name))?
        .ok_or(DbError::NotFound {
            resource: RESOURCE,
            id,
        })
    }

    /// Delete a tree and every association that references it.
    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        let unlinked = associations::delete_for_tree(&mut *tx, id).await?;

        let result = sqlx::query("DELETE FROM trees WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                resource: RESOURCE,
                id,
            });
        }

        tx.commit().await?;
        tracing::debug!(id, unlinked, "tree deleted");
        Ok(())
    }

    /// Trees whose name contains `value`, tallest first.
    pub async fn search(&self, value: &str) -> Result<Vec<TreeSummary>, DbError> {
        let trees = sqlx::query_as(
            r#"
            SELECT id, tree, height_ft
            FROM trees
            WHERE tree LIKE ? ESCAPE '\'
            ORDER BY height_ft DESC, id ASC
            "#,
        )
        .bind(like_pattern(value))
        .fetch_all(self.pool)
        .await?;

        Ok(trees)
    }
}

fn duplicate(name: &str) -> DbError {
    DbError::Duplicate {
        resource: RESOURCE,
        name: name.to_owned(),
    }
}

fn map_write_error(e: sqlx::Error, name: &str) -> DbError {
    if is_unique_violation(&e) {
        duplicate(name)
    } else {
        DbError::Sqlx(e)
    }
}
