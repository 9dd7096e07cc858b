use anyhow::{Context, Result};
use entity::prelude::ReferenceObject as ReferenceObjectEntity;
use entity::reference_object;
use log::{debug, info};
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveValue::Set, ConnectOptions, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryOrder,
};
use std::fmt::Display;

use crate::estimate::PhysicalSize;

pub const DEFAULT_TOLERANCE_CM: f64 = 1.0;

/// Rows written into an empty catalog, width first. Width is the longer side
/// so the entries line up with what the estimator reports.
const SEED: [(&str, f64, f64); 2] = [("Книга", 21.0, 15.0), ("Смартфон", 15.0, 7.5)];

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceObject {
    pub name: String,
    pub width_cm: f64,
    pub height_cm: f64,
}

impl ReferenceObject {
    pub fn new(name: impl Into<String>, width_cm: f64, height_cm: f64) -> Self {
        Self {
            name: name.into(),
            width_cm,
            height_cm,
        }
    }

    fn fits(&self, width_cm: f64, height_cm: f64, tolerance: f64) -> bool {
        (self.width_cm - width_cm).abs() <= tolerance
            && (self.height_cm - height_cm).abs() <= tolerance
    }
}

impl From<reference_object::Model> for ReferenceObject {
    fn from(model: reference_object::Model) -> Self {
        Self {
            name: model.name,
            width_cm: model.width_cm,
            height_cm: model.height_cm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
}

impl Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Correct => write!(f, "correct"),
            Verdict::Incorrect => write!(f, "incorrect"),
        }
    }
}

/// First catalog entry whose width and height are both within `tolerance` cm.
pub fn find_match(
    catalog: &[ReferenceObject],
    width_cm: f64,
    height_cm: f64,
    tolerance: f64,
) -> Option<&ReferenceObject> {
    catalog
        .iter()
        .find(|entry| entry.fits(width_cm, height_cm, tolerance))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub verdict: Verdict,
    pub matched: Option<String>,
}

/// Verdict for a measured size together with the name of the entry it
/// matched, from a single pass over `catalog`.
pub fn match_dimensions(
    catalog: &[ReferenceObject],
    width_cm: f64,
    height_cm: f64,
    tolerance: f64,
) -> Verification {
    match find_match(catalog, width_cm, height_cm, tolerance) {
        Some(entry) => Verification {
            verdict: Verdict::Correct,
            matched: Some(entry.name.clone()),
        },
        None => Verification {
            verdict: Verdict::Incorrect,
            matched: None,
        },
    }
}

/// Reference catalog backed by an owned database connection. Entries are read
/// once when the catalog is opened.
pub struct ReferenceCatalog {
    db: DatabaseConnection,
    entries: Vec<ReferenceObject>,
}

impl ReferenceCatalog {
    pub async fn open(url: &str) -> Result<Self> {
        info!("Opening reference catalog at {}", url);

        let mut options = ConnectOptions::new(url);
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options)
            .await
            .with_context(|| format!("Failed to connect to {url}"))?;

        Migrator::up(&db, None)
            .await
            .context("Failed to apply catalog migrations")?;

        let mut catalog = Self {
            db,
            entries: Vec::new(),
        };
        catalog.seed_if_empty().await?;
        catalog.entries = catalog.load_entries().await?;
        info!("Loaded {} reference objects", catalog.entries.len());
        Ok(catalog)
    }

    /// Inserts the built-in rows when the table has none. Returns how many
    /// rows were written.
    pub async fn seed_if_empty(&self) -> Result<usize> {
        let existing = ReferenceObjectEntity::find().count(&self.db).await?;
        if existing > 0 {
            debug!("Catalog already holds {} entries, skipping seed", existing);
            return Ok(0);
        }

        let rows = SEED.iter().map(|(name, width, height)| reference_object::ActiveModel {
            name: Set((*name).to_owned()),
            width_cm: Set(*width),
            height_cm: Set(*height),
        });
        ReferenceObjectEntity::insert_many(rows)
            .exec(&self.db)
            .await
            .context("Failed to seed reference catalog")?;

        info!("Seeded reference catalog with {} entries", SEED.len());
        Ok(SEED.len())
    }

    async fn load_entries(&self) -> Result<Vec<ReferenceObject>> {
        let models = ReferenceObjectEntity::find()
            .order_by_asc(reference_object::Column::Name)
            .all(&self.db)
            .await
            .context("Failed to query reference catalog")?;

        Ok(models.into_iter().map(ReferenceObject::from).collect())
    }

    /// Entries ordered by name, as loaded at open.
    pub fn entries(&self) -> &[ReferenceObject] {
        &self.entries
    }

    pub fn verify(&self, size: PhysicalSize, tolerance: f64) -> Verification {
        let verification =
            match_dimensions(&self.entries, size.width_cm, size.height_cm, tolerance);
        debug!(
            "Verified {:.1}x{:.1} cm against {} entries: {} ({:?})",
            size.width_cm,
            size.height_cm,
            self.entries.len(),
            verification.verdict,
            verification.matched
        );
        verification
    }

    pub async fn close(self) -> Result<()> {
        self.db
            .close()
            .await
            .context("Failed to close reference catalog")?;
        info!("Reference catalog closed");
        Ok(())
    }
}
