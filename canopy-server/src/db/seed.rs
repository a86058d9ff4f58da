//! Starter data: famous giant sequoias, a few insects, and the sightings
//! linking them.
//!
//! Seeding is idempotent. Existing names and links are skipped, so it can
//! run against a database that already holds user data.

use sqlx::SqlitePool;

use super::repos::{AssociationRepo, DbError, InsectRepo, TreeRepo};
use crate::models::{InsectFields, TreeFields};

struct SeedTree {
    name: &'static str,
    location: &'static str,
    height_ft: f64,
    ground_circumference_ft: f64,
}

struct SeedInsect {
    name: &'static str,
    description: &'static str,
    fact: &'static str,
    territory: &'static str,
    millimeters: f64,
}

const TREES: &[SeedTree] = &[
    SeedTree {
        name: "General Sherman",
        location: "Sequoia National Park",
        height_ft: 274.9,
        ground_circumference_ft: 102.6,
    },
    SeedTree {
        name: "General Grant",
        location: "Kings Canyon National Park",
        height_ft: 268.1,
        ground_circumference_ft: 107.5,
    },
    SeedTree {
        name: "President",
        location: "Sequoia National Park",
        height_ft: 240.9,
        ground_circumference_ft: 93.0,
    },
    SeedTree {
        name: "Lincoln",
        location: "Sequoia National Park",
        height_ft: 255.8,
        ground_circumference_ft: 98.3,
    },
    SeedTree {
        name: "Stagg",
        location: "Private Land",
        height_ft: 243.0,
        ground_circumference_ft: 109.0,
    },
];

const INSECTS: &[SeedInsect] = &[
    SeedInsect {
        name: "Western Pygmy Blue Butterfly",
        description: "Copper-brown butterfly with a blue base on its wings",
        fact: "One of the smallest butterflies in North America",
        territory: "North America",
        millimeters: 12.0,
    },
    SeedInsect {
        name: "Patu Digua Spider",
        description: "Tiny orb-weaving spider",
        fact: "Its body is smaller than the head of a pin",
        territory: "Colombia",
        millimeters: 0.37,
    },
    SeedInsect {
        name: "Atlas Moth",
        description: "Large saturniid moth with snake-head wing tips",
        fact: "Adults have no mouths and live about a week",
        territory: "Southeast Asia",
        millimeters: 250.0,
    },
];

/// (insect, trees it was seen near)
const SIGHTINGS: &[(&str, &[&str])] = &[
    (
        "Western Pygmy Blue Butterfly",
        &["General Sherman", "General Grant", "Lincoln", "Stagg"],
    ),
    ("Patu Digua Spider", &["Stagg"]),
];

/// What a seeding run changed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub trees_created: usize,
    pub insects_created: usize,
    pub associations_created: usize,
}

/// Insert any missing starter trees, insects and sightings.
pub async fn run(pool: &SqlitePool) -> Result<SeedReport, DbError> {
    let mut report = SeedReport::default();

    let trees = TreeRepo::new(pool);
    for seed in TREES {
        if trees.find_by_name(seed.name).await?.is_some() {
            continue;
        }
        trees.create(&seed_tree_fields(seed)).await?;
        report.trees_created += 1;
    }

    let insects = InsectRepo::new(pool);
    for seed in INSECTS {
        if insects.find_by_name(seed.name).await?.is_some() {
            continue;
        }
        insects.create(&seed_insect_fields(seed)).await?;
        report.insects_created += 1;
    }

    let associations = AssociationRepo::new(pool);
    for (insect_id, tree_id) in sighting_ids(pool).await? {
        if associations.exists(tree_id, insect_id).await? {
            continue;
        }
        associations.create(tree_id, insect_id).await?;
        report.associations_created += 1;
    }

    tracing::info!(
        trees = report.trees_created,
        insects = report.insects_created,
        associations = report.associations_created,
        "seed complete"
    );
    Ok(report)
}

/// Remove the seeded sightings. Trees and insects are left in place.
pub async fn undo(pool: &SqlitePool) -> Result<usize, DbError> {
    let associations = AssociationRepo::new(pool);
    let mut removed = 0;

    for (insect_id, tree_id) in sighting_ids(pool).await? {
        if associations.delete(tree_id, insect_id).await? {
            removed += 1;
        }
    }

    tracing::info!(associations = removed, "seed sightings removed");
    Ok(removed)
}

/// Resolve `SIGHTINGS` to `(insect_id, tree_id)` pairs, skipping names
/// that are not in the database.
async fn sighting_ids(pool: &SqlitePool) -> Result<Vec<(i64, i64)>, DbError> {
    let trees = TreeRepo::new(pool);
    let insects = InsectRepo::new(pool);
    let mut pairs = Vec::new();

    for (insect_name, tree_names) in SIGHTINGS {
        let Some(insect) = insects.find_by_name(insect_name).await? else {
            tracing::warn!(insect = insect_name, "seed insect missing, skipping its sightings");
            continue;
        };

        for tree_name in tree_names.iter() {
            match trees.find_by_name(tree_name).await? {
                Some(tree) => pairs.push((insect.id, tree.id)),
                None => tracing::warn!(tree = tree_name, "seed tree missing, skipping sighting"),
            }
        }
    }

    Ok(pairs)
}

fn seed_tree_fields(seed: &SeedTree) -> TreeFields {
    TreeFields {
        name: seed.name.to_owned(),
        location: Some(seed.location.to_owned()),
        height_ft: Some(seed.height_ft),
        ground_circumference_ft: Some(seed.ground_circumference_ft),
    }
}

fn seed_insect_fields(seed: &SeedInsect) -> InsectFields {
    InsectFields {
        name: seed.name.to_owned(),
        description: Some(seed.description.to_owned()),
        territory: Some(seed.territory.to_owned()),
        millimeters: Some(seed.millimeters),
        fact: Some(seed.fact.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[tokio::test]
    async fn seeds_starter_data() {
        let pool = open_in_memory().await.unwrap();
        let report = run(&pool).await.unwrap();

        assert_eq!(
            report,
            SeedReport {
                trees_created: 5,
                insects_created: 3,
                associations_created: 5,
            }
        );

        let trees = TreeRepo::new(&pool).list().await.unwrap();
        assert_eq!(trees[0].tree, "General Sherman");
    }

    #[tokio::test]
    async fn seeding_twice_changes_nothing() {
        let pool = open_in_memory().await.unwrap();
        run(&pool).await.unwrap();

        let second = run(&pool).await.unwrap();
        assert_eq!(second, SeedReport::default());
    }

    #[tokio::test]
    async fn undo_removes_only_sightings() {
        let pool = open_in_memory().await.unwrap();
        run(&pool).await.unwrap();

        assert_eq!(undo(&pool).await.unwrap(), 5);
        assert_eq!(undo(&pool).await.unwrap(), 0);

        let insects = AssociationRepo::new(&pool).insects_with_trees().await.unwrap();
        assert_eq!(insects.len(), 3);
        assert!(insects.iter().all(|i| i.trees.is_empty()));
    }

    #[tokio::test]
    async fn spider_lives_near_stagg() {
        let pool = open_in_memory().await.unwrap();
        run(&pool).await.unwrap();

        let insects = AssociationRepo::new(&pool).insects_with_trees().await.unwrap();
        let spider = insects.iter().find(|i| i.name == "Patu Digua Spider").unwrap();
        let trees: Vec<_> = spider.trees.iter().map(|t| t.tree.as_str()).collect();
        assert_eq!(trees, ["Stagg"]);
    }
}
