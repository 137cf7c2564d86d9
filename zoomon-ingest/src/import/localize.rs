//! English/German localization linking
//!
//! The English record is canonical. A German counterpart, once created,
//! carries the English record's `document_id` and is found through that
//! link on later runs instead of being re-created.

use crate::db::dimensions::{self, Category, DimensionRecord};
use anyhow::Result;
use sqlx::SqlitePool;
use tracing::debug;

/// A linked en/de pair; `de` is absent when no German name was supplied
#[derive(Debug, Clone)]
pub struct LocalizedPair {
    pub en: DimensionRecord,
    pub de: Option<DimensionRecord>,
}

/// Find-or-create the English record and, if a German name is supplied,
/// its linked German counterpart. Idempotent: re-running with the same
/// names performs no writes; a changed German name becomes one in-place
/// update, never a duplicate create.
pub async fn link_or_create(
    pool: &SqlitePool,
    category: Category,
    name_en: &str,
    name_de: Option<&str>,
) -> Result<LocalizedPair> {
    let en = match dimensions::find_by_name(pool, category, name_en, Some("en")).await? {
        Some(record) => record,
        None => {
            debug!(category = %category, name = name_en, "Creating English dimension record");
            dimensions::create(pool, category, name_en, Some("en"), None).await?
        }
    };

    let name_de = name_de.filter(|s| !s.is_empty());
    let de = match name_de {
        None => None,
        Some(name_de) => {
            // Walk the English record's localization link before deciding
            // to create
            match dimensions::find_localization(pool, category, &en.document_id, "de").await? {
                Some(existing) if existing.name == name_de => Some(existing),
                Some(existing) => {
                    debug!(
                        category = %category,
                        old = existing.name,
                        new = name_de,
                        "Renaming German dimension record"
                    );
                    dimensions::update_name(pool, existing.id, name_de).await?;
                    Some(DimensionRecord {
                        name: name_de.to_string(),
                        ..existing
                    })
                }
                None => {
                    debug!(category = %category, name = name_de, "Creating German dimension record");
                    Some(
                        dimensions::create(
                            pool,
                            category,
                            name_de,
                            Some("de"),
                            Some(&en.document_id),
                        )
                        .await?,
                    )
                }
            }
        }
    };

    Ok(LocalizedPair { en, de })
}
