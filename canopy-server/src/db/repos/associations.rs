//! Association repository and the joined read paths
//!
//! `insect_trees` records which insects were seen near which trees.
//! Two read strategies over it:
//! - eager: one LEFT JOIN over trees, grouped per tree in memory
//! - lazy: fetch insects, then one query per insect for its trees

use serde::Serialize;
use sqlx::{FromRow, Sqlite, SqlitePool};

use super::{is_unique_violation, now_timestamp, DbError};

/// Association row
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub id: i64,
    pub tree_id: i64,
    pub insect_id: i64,
    pub created_at: String,
}

/// Insect as embedded under a tree
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct InsectRef {
    pub id: i64,
    pub name: String,
}

/// Tree as embedded under an insect
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct TreeRef {
    pub id: i64,
    pub tree: String,
}

/// Tree with the insects observed near it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeWithInsects {
    pub id: i64,
    pub tree: String,
    pub location: Option<String>,
    pub height_ft: Option<f64>,
    pub insects: Vec<InsectRef>,
}

/// Insect with the trees it was observed near
#[derive(Debug, Clone, Serialize)]
pub struct InsectWithTrees {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub trees: Vec<TreeRef>,
}

#[derive(FromRow)]
struct TreeInsectRow {
    id: i64,
    tree: String,
    location: Option<String>,
    height_ft: Option<f64>,
    insect_id: Option<i64>,
    insect_name: Option<String>,
}

#[derive(FromRow)]
struct InsectRow {
    id: i64,
    name: String,
    description: Option<String>,
}

/// Association repository
pub struct AssociationRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AssociationRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether the pair is already linked.
    pub async fn exists(&self, tree_id: i64, insect_id: i64) -> Result<bool, DbError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM insect_trees WHERE tree_id = ? AND insect_id = ?)",
        )
        .bind(tree_id)
        .bind(insect_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Link a tree and an insect.
    ///
    /// Fails with `AlreadyAssociated` if the pair exists, whether found by the
    /// pre-check or by the UNIQUE constraint when another writer got there
    /// between the check and the insert.
    pub async fn create(&self, tree_id: i64, insect_id: i64) -> Result<Association, DbError> {
        if self.exists(tree_id, insect_id).await? {
            return Err(DbError::AlreadyAssociated { tree_id, insect_id });
        }

        let association = self.insert(tree_id, insect_id).await?;
        tracing::debug!(tree_id, insect_id, "association created");
        Ok(association)
    }

    /// Unchecked insert. A concurrent writer that won the race surfaces
    /// here as a UNIQUE violation.
    async fn insert(&self, tree_id: i64, insect_id: i64) -> Result<Association, DbError> {
        let now = now_timestamp();
        sqlx::query_as(
            r#"
            INSERT INTO insect_trees (tree_id, insect_id, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, tree_id, insect_id, created_at
            "#,
        )
        .bind(tree_id)
        .bind(insect_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::AlreadyAssociated { tree_id, insect_id }
            } else {
                DbError::Sqlx(e)
            }
        })
    }

    /// Remove a single link. Returns whether a row was removed.
    pub async fn delete(&self, tree_id: i64, insect_id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM insect_trees WHERE tree_id = ? AND insect_id = ?")
            .bind(tree_id)
            .bind(insect_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_tree(&self, tree_id: i64) -> Result<u64, DbError> {
        delete_for_tree(self.pool, tree_id).await
    }

    pub async fn delete_by_insect(&self, insect_id: i64) -> Result<u64, DbError> {
        delete_for_insect(self.pool, insect_id).await
    }

    /// Eager read: every tree with its insects, from a single query.
    ///
    /// Trees come back tallest first. The join rows arrive grouped by tree
    /// but not sorted by insect, so each tree's insects are sorted by name
    /// after grouping.
    pub async fn trees_with_insects(&self) -> Result<Vec<TreeWithInsects>, DbError> {
        let rows: Vec<TreeInsectRow> = sqlx::query_as(
            r#"
            SELECT
                t.id,
                t.tree,
                t.location,
                t.height_ft,
                i.id AS insect_id,
                i.name AS insect_name
            FROM trees t
            LEFT JOIN insect_trees it ON it.tree_id = t.id
            LEFT JOIN insects i ON i.id = it.insect_id
            ORDER BY t.height_ft DESC, t.id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        let mut trees: Vec<TreeWithInsects> = Vec::new();
        for row in rows {
            if trees.last().map(|t| t.id) != Some(row.id) {
                trees.push(TreeWithInsects {
                    id: row.id,
                    tree: row.tree,
                    location: row.location,
                    height_ft: row.height_ft,
                    insects: Vec::new(),
                });
            }

            if let (Some(id), Some(name), Some(current)) =
                (row.insect_id, row.insect_name, trees.last_mut())
            {
                current.insects.push(InsectRef { id, name });
            }
        }

        for tree in &mut trees {
            tree.insects.sort_by(|a, b| a.name.cmp(&b.name));
        }

        Ok(trees)
    }

    /// Lazy read: insects by name, then a separate query per insect for
    /// its trees ordered by tree name.
    pub async fn insects_with_trees(&self) -> Result<Vec<InsectWithTrees>, DbError> {
        let insects: Vec<InsectRow> = sqlx::query_as(
            r#"
            SELECT id, name, description
            FROM insects
            ORDER BY name ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        let mut payload = Vec::with_capacity(insects.len());
        for insect in insects {
            let trees = self.trees_for_insect(insect.id).await?;
            payload.push(InsectWithTrees {
                id: insect.id,
                name: insect.name,
                description: insect.description,
                trees,
            });
        }

        tracing::debug!(insects = payload.len(), "lazy insect/tree load complete");
        Ok(payload)
    }

    /// Trees linked to one insect, ordered by tree name.
    pub async fn trees_for_insect(&self, insect_id: i64) -> Result<Vec<TreeRef>, DbError> {
        let trees = sqlx::query_as(
            r#"
            SELECT t.id, t.tree
            FROM trees t
            JOIN insect_trees it ON it.tree_id = t.id
            WHERE it.insect_id = ?
            ORDER BY t.tree ASC
            "#,
        )
        .bind(insect_id)
        .fetch_all(self.pool)
        .await?;

        Ok(trees)
    }
}

/// Delete every link for a tree on any executor (pool or open transaction).
pub(crate) async fn delete_for_tree<'e, E>(executor: E, tree_id: i64) -> Result<u64, DbError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM insect_trees WHERE tree_id = ?")
        .bind(tree_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Delete every link for an insect on any executor.
pub(crate) async fn delete_for_insect<'e, E>(executor: E, insect_id: i64) -> Result<u64, DbError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM insect_trees WHERE insect_id = ?")
        .bind(insect_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::db::repos::{InsectRepo, TreeRepo};
    use crate::models::{InsectFields, TreeFields};

    async fn tree(pool: &SqlitePool, name: &str, height: f64) -> i64 {
        let fields = TreeFields::new(Some(name), None, Some(height), None).unwrap();
        TreeRepo::new(pool).create(&fields).await.unwrap().id
    }

    async fn insect(pool: &SqlitePool, name: &str) -> i64 {
        let fields = InsectFields::new(Some(name), None, None, None, None).unwrap();
        InsectRepo::new(pool).create(&fields).await.unwrap().id
    }

    async fn link_count(pool: &SqlitePool) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM insect_trees")
            .fetch_one(pool)
            .await
            .unwrap();
        count
    }

    #[tokio::test]
    async fn create_then_duplicate_is_rejected() {
        let pool = open_in_memory().await.unwrap();
        let repo = AssociationRepo::new(&pool);
        let oak = tree(&pool, "Oak", 60.0).await;
        let moth = insect(&pool, "Atlas Moth").await;

        assert!(!repo.exists(oak, moth).await.unwrap());
        repo.create(oak, moth).await.unwrap();
        assert!(repo.exists(oak, moth).await.unwrap());

        let err = repo.create(oak, moth).await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyAssociated { .. }));
        assert_eq!(link_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn unique_constraint_backs_the_check() {
        let pool = open_in_memory().await.unwrap();
        let oak = tree(&pool, "Oak", 60.0).await;
        let moth = insect(&pool, "Atlas Moth").await;
        AssociationRepo::new(&pool).create(oak, moth).await.unwrap();

        let raw = sqlx::query(
            "INSERT INTO insect_trees (tree_id, insect_id, created_at, updated_at) VALUES (?, ?, '', '')",
        )
        .bind(oak)
        .bind(moth)
        .execute(&pool)
        .await
        .unwrap_err();

        assert!(is_unique_violation(&raw));
    }

    #[tokio::test]
    async fn insert_after_lost_race_is_already_associated() {
        let pool = open_in_memory().await.unwrap();
        let oak = tree(&pool, "Oak", 60.0).await;
        let moth = insect(&pool, "Atlas Moth").await;
        let repo = AssociationRepo::new(&pool);

        // both writers pass the pre-check before either inserts
        assert!(!repo.exists(oak, moth).await.unwrap());
        assert!(!repo.exists(oak, moth).await.unwrap());

        repo.insert(oak, moth).await.unwrap();
        let err = repo.insert(oak, moth).await.unwrap_err();

        assert!(matches!(
            err,
            DbError::AlreadyAssociated { tree_id, insect_id } if tree_id == oak && insect_id == moth
        ));
        assert_eq!(
            err.to_string(),
            format!("tree {} is already associated with insect {}", oak, moth)
        );

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM insect_trees")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn concurrent_creates_store_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("race.db").display());
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();

        let oak = tree(&pool, "Oak", 60.0).await;
        let moth = insect(&pool, "Atlas Moth").await;
        let repo = AssociationRepo::new(&pool);

        let (a, b) = tokio::join!(repo.create(oak, moth), repo.create(oak, moth));
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);

        let loser = a.err().or(b.err()).unwrap();
        assert!(matches!(loser, DbError::AlreadyAssociated { .. }));
        assert!(repo.exists(oak, moth).await.unwrap());
    }

    #[tokio::test]
    async fn eager_orders_trees_by_height_and_insects_by_name() {
        let pool = open_in_memory().await.unwrap();
        let repo = AssociationRepo::new(&pool);

        let a = tree(&pool, "A", 10.0).await;
        let b = tree(&pool, "B", 20.0).await;
        let zebra = insect(&pool, "Zebra").await;
        let alpha = insect(&pool, "Alpha").await;
        let mango = insect(&pool, "Mango").await;

        repo.create(a, zebra).await.unwrap();
        repo.create(b, mango).await.unwrap();
        repo.create(a, alpha).await.unwrap();

        let trees = repo.trees_with_insects().await.unwrap();
        let order: Vec<_> = trees.iter().map(|t| t.tree.as_str()).collect();
        assert_eq!(order, ["B", "A"]);

        let a_insects: Vec<_> = trees[1].insects.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(a_insects, ["Alpha", "Zebra"]);
        assert_eq!(trees[0].insects, [InsectRef { id: mango, name: "Mango".into() }]);
    }

    #[tokio::test]
    async fn eager_keeps_trees_without_insects() {
        let pool = open_in_memory().await.unwrap();
        tree(&pool, "Lonely Pine", 30.0).await;

        let trees = AssociationRepo::new(&pool).trees_with_insects().await.unwrap();
        assert_eq!(trees.len(), 1);
        assert!(trees[0].insects.is_empty());
    }

    #[tokio::test]
    async fn lazy_orders_each_insects_trees_by_name() {
        let pool = open_in_memory().await.unwrap();
        let repo = AssociationRepo::new(&pool);

        let pine = tree(&pool, "Pine", 50.0).await;
        let oak = tree(&pool, "Oak", 40.0).await;
        let x = insect(&pool, "X").await;
        insect(&pool, "Beetle").await;

        repo.create(pine, x).await.unwrap();
        repo.create(oak, x).await.unwrap();

        let insects = repo.insects_with_trees().await.unwrap();
        let names: Vec<_> = insects.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Beetle", "X"]);

        assert!(insects[0].trees.is_empty());
        assert_eq!(
            insects[1].trees,
            [
                TreeRef { id: oak, tree: "Oak".into() },
                TreeRef { id: pine, tree: "Pine".into() },
            ]
        );
        assert_eq!(insects[1].id, x);
    }

    #[tokio::test]
    async fn deleting_a_tree_cascades_its_links() {
        let pool = open_in_memory().await.unwrap();
        let repo = AssociationRepo::new(&pool);

        let oak = tree(&pool, "Oak", 40.0).await;
        let pine = tree(&pool, "Pine", 50.0).await;
        let moth = insect(&pool, "Atlas Moth").await;
        repo.create(oak, moth).await.unwrap();
        repo.create(pine, moth).await.unwrap();

        TreeRepo::new(&pool).delete(oak).await.unwrap();

        assert_eq!(link_count(&pool).await, 1);
        assert!(repo.exists(pine, moth).await.unwrap());
        assert_eq!(TreeRepo::new(&pool).list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_an_insect_cascades_its_links() {
        let pool = open_in_memory().await.unwrap();
        let repo = AssociationRepo::new(&pool);

        let oak = tree(&pool, "Oak", 40.0).await;
        let moth = insect(&pool, "Atlas Moth").await;
        let spider = insect(&pool, "Spider").await;
        repo.create(oak, moth).await.unwrap();
        repo.create(oak, spider).await.unwrap();

        InsectRepo::new(&pool).delete(moth).await.unwrap();

        assert_eq!(link_count(&pool).await, 1);
        assert!(repo.exists(oak, spider).await.unwrap());
    }

    #[tokio::test]
    async fn delete_by_side() {
        let pool = open_in_memory().await.unwrap();
        let repo = AssociationRepo::new(&pool);

        let oak = tree(&pool, "Oak", 40.0).await;
        let moth = insect(&pool, "Atlas Moth").await;
        let spider = insect(&pool, "Spider").await;
        repo.create(oak, moth).await.unwrap();
        repo.create(oak, spider).await.unwrap();

        assert_eq!(repo.delete_by_insect(spider).await.unwrap(), 1);
        assert_eq!(repo.delete_by_tree(oak).await.unwrap(), 1);
        assert!(!repo.delete(oak, moth).await.unwrap());
        assert_eq!(link_count(&pool).await, 0);
    }
}
