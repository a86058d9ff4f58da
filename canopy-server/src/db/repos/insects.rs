//! Insect repository
//!
//! Mirrors the tree repository: name is the natural key, updates are
//! full replacements, deletes take their association rows with them.

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use super::{associations, is_unique_violation, like_pattern, now_timestamp, DbError};
use crate::models::InsectFields;

const RESOURCE: &str = "Insect";

/// Insect record from database
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insect {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub fact: Option<String>,
    pub territory: Option<String>,
    pub millimeters: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

/// List/get/search projection
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InsectSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub territory: Option<String>,
}

impl From<Insect> for InsectSummary {
    fn from(insect: Insect) -> Self {
        Self {
            id: insect.id,
            name: insect.name,
            description: insect.description,
            territory: insect.territory,
        }
    }
}

/// Insect repository
pub struct InsectRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> InsectRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// All insects in insertion order.
    pub async fn list(&self) -> Result<Vec<InsectSummary>, DbError> {
        let insects = sqlx::query_as(
            r#"
            SELECT id, name, description, territory
            FROM insects
            ORDER BY id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(insects)
    }

    /// Get a single insect by id.
    pub async fn get(&self, id: i64) -> Result<Insect, DbError> {
        sqlx::query_as(
            r#"
            SELECT id, name, description, fact, territory, millimeters, created_at, updated_at
            FROM insects
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

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Insect>, DbError> {
        let insect = sqlx::query_as(
            r#"
            SELECT id, name, description, fact, territory, millimeters, created_at, updated_at
            FROM insects
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(insect)
    }

    /// Create an insect, rejecting a name that is already taken.
    pub async fn create(&self, fields: &InsectFields) -> Result<Insect, DbError> {
        if self.find_by_name(&fields.name).await?.is_some() {
            return Err(duplicate(&fields.name));
        }

        let now = now_timestamp();
        let insect: Insect = sqlx::query_as(
            r#"
            INSERT INTO insects (name, description, fact, territory, millimeters, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, name, description, fact, territory, millimeters, created_at, updated_at
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.fact)
        .bind(&fields.territory)
        .bind(fields.millimeters)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, &fields.name))?;

        tracing::debug!(id = insect.id, name = %insect.name, "insect created");
        Ok(insect)
    }

    /// Overwrite name, description, territory and millimeters.
    pub async fn update(&self, id: i64, fields: &InsectFields) -> Result<Insect, DbError> {
        sqlx::query_as(
            r#"
            UPDATE insects
            SET name = ?, description = ?, territory = ?, millimeters = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, name, description, fact, territory, millimeters, created_at, updated_at
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.territory)
        .bind(fields.millimeters)
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

    /// Delete an insect and every association that references it.
    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        let unlinked = associations::delete_for_insect(&mut *tx, id).await?;

        let result = sqlx::query("DELETE FROM insects WHERE id = ?")
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
        tracing::debug!(id, unlinked, "insect deleted");
        Ok(())
    }

    /// Insects whose name contains `value`, in insertion order.
    pub async fn search(&self, value: &str) -> Result<Vec<InsectSummary>, DbError> {
        let insects = sqlx::query_as(
            r#"
            SELECT id, name, description, territory
            FROM insects
            WHERE name LIKE ? ESCAPE '\'
            ORDER BY id ASC
            "#,
        )
        .bind(like_pattern(value))
        .fetch_all(self.pool)
        .await?;

        Ok(insects)
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
