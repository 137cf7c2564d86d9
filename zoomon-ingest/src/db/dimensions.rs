//! Dimension (master data) database operations
//!
//! All controlled-vocabulary categories share one table. Localized
//! categories carry 'en'/'de' rows paired by `document_id`; locale-less
//! categories store locale as ''.

use anyhow::Result;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, SqlitePool};
use uuid::Uuid;

/// Controlled-vocabulary categories fact rows reference by foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Microorganism,
    Matrix,
    SamplingStage,
    SamplingContext,
    SampleType,
    AnimalSpecies,
    SampleOrigin,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Microorganism => "microorganism",
            Category::Matrix => "matrix",
            Category::SamplingStage => "sampling_stage",
            Category::SamplingContext => "sampling_context",
            Category::SampleType => "sample_type",
            Category::AnimalSpecies => "animal_species",
            Category::SampleOrigin => "sample_origin",
        }
    }

    /// Ontology-tuple category: matched by opaque `token`, not `name`
    pub fn token_keyed(self) -> bool {
        matches!(self, Category::SampleOrigin)
    }

    /// Localized categories carry paired en/de records
    pub fn localized(self) -> bool {
        matches!(
            self,
            Category::Microorganism | Category::Matrix | Category::AnimalSpecies
        )
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One controlled-vocabulary entry
#[derive(Debug, Clone)]
pub struct DimensionRecord {
    pub id: i64,
    pub category: Category,
    pub name: String,
    pub token: Option<String>,
    /// None for locale-less categories
    pub locale: Option<String>,
    pub document_id: String,
}

fn record_from_row(category: Category, row: &sqlx::sqlite::SqliteRow) -> DimensionRecord {
    let locale: String = row.get("locale");
    DimensionRecord {
        id: row.get("id"),
        category,
        name: row.get("name"),
        token: row.get("token"),
        locale: (!locale.is_empty()).then_some(locale),
        document_id: row.get("document_id"),
    }
}

/// Load every record of a category, all locales
pub async fn find_all(pool: &SqlitePool, category: Category) -> Result<Vec<DimensionRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, token, locale, document_id
        FROM dimensions
        WHERE category = ?
        ORDER BY id
        "#,
    )
    .bind(category.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| record_from_row(category, r)).collect())
}

/// Find one record by exact name match within a category and locale
pub async fn find_by_name(
    pool: &SqlitePool,
    category: Category,
    name: &str,
    locale: Option<&str>,
) -> Result<Option<DimensionRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, token, locale, document_id
        FROM dimensions
        WHERE category = ? AND name = ? AND locale = ?
        "#,
    )
    .bind(category.as_str())
    .bind(name)
    .bind(locale.unwrap_or(""))
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| record_from_row(category, &r)))
}

/// Find the localized counterpart of a record by its shared document id
pub async fn find_localization(
    pool: &SqlitePool,
    category: Category,
    document_id: &str,
    locale: &str,
) -> Result<Option<DimensionRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, token, locale, document_id
        FROM dimensions
        WHERE category = ? AND document_id = ? AND locale = ?
        "#,
    )
    .bind(category.as_str())
    .bind(document_id)
    .bind(locale)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| record_from_row(category, &r)))
}

/// Create a single record
///
/// A missing `document_id` means this record starts a new localization
/// group (or is locale-less); a supplied one links it to an existing group.
pub async fn create(
    pool: &SqlitePool,
    category: Category,
    name: &str,
    locale: Option<&str>,
    document_id: Option<&str>,
) -> Result<DimensionRecord> {
    let now = Utc::now().to_rfc3339();
    let document_id = document_id
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let token = category.token_keyed().then(|| name.to_string());

    let result = sqlx::query(
        r#"
        INSERT INTO dimensions (category, name, token, locale, document_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(category.as_str())
    .bind(name)
    .bind(&token)
    .bind(locale.unwrap_or(""))
    .bind(&document_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(DimensionRecord {
        id: result.last_insert_rowid(),
        category,
        name: name.to_string(),
        token,
        locale: locale.map(str::to_string),
        document_id,
    })
}

/// Bulk-create locale-less records, one INSERT for the whole set
pub async fn create_many(
    pool: &SqlitePool,
    category: Category,
    names: &[String],
) -> Result<Vec<DimensionRecord>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let now = Utc::now().to_rfc3339();
    let mut insert = QueryBuilder::new(
        "INSERT INTO dimensions (category, name, token, locale, document_id, created_at, updated_at) ",
    );
    insert.push_values(names, |mut b, name| {
        b.push_bind(category.as_str())
            .push_bind(name)
            .push_bind(category.token_keyed().then(|| name.clone()))
            .push_bind("")
            .push_bind(Uuid::new_v4().to_string())
            .push_bind(&now)
            .push_bind(&now);
    });
    insert.build().execute(pool).await?;

    // Re-select to pick up the assigned ids
    let mut select = QueryBuilder::new(
        "SELECT id, name, token, locale, document_id FROM dimensions WHERE locale = '' AND category = ",
    );
    select.push_bind(category.as_str());
    select.push(" AND name IN (");
    let mut separated = select.separated(", ");
    for name in names {
        separated.push_bind(name);
    }
    select.push(") ORDER BY id");

    let rows = select.build().fetch_all(pool).await?;
    Ok(rows.iter().map(|r| record_from_row(category, r)).collect())
}

/// Rename a record in place
pub async fn update_name(pool: &SqlitePool, id: i64, name: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE dimensions SET name = ?, updated_at = ? WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Number of records in a category, all locales
pub async fn count(pool: &SqlitePool, category: Category) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM dimensions WHERE category = ?")
        .bind(category.as_str())
        .fetch_one(pool)
        .await?;
    Ok(row.get("n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        crate::db::schema::initialize_schema(&pool)
            .await
            .expect("Schema initialization failed");
        pool
    }

    #[tokio::test]
    async fn test_create_and_find_by_name() {
        let pool = test_pool().await;

        let created = create(&pool, Category::SamplingStage, "Slaughterhouse", None, None)
            .await
            .expect("create failed");

        let found = find_by_name(&pool, Category::SamplingStage, "Slaughterhouse", None)
            .await
            .expect("find failed")
            .expect("record not found");

        assert_eq!(found.id, created.id);
        assert_eq!(found.locale, None);
        // Exact match is case-sensitive
        let miss = find_by_name(&pool, Category::SamplingStage, "slaughterhouse", None)
            .await
            .expect("find failed");
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_create_many_assigns_ids_and_tokens() {
        let pool = test_pool().await;

        let names = vec!["A31".to_string(), "B07".to_string(), "C99".to_string()];
        let created = create_many(&pool, Category::SampleOrigin, &names)
            .await
            .expect("create_many failed");

        assert_eq!(created.len(), 3);
        for record in &created {
            assert!(record.id > 0);
            assert_eq!(record.token.as_deref(), Some(record.name.as_str()));
        }
        assert_eq!(count(&pool, Category::SampleOrigin).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_localization_found_by_document_id() {
        let pool = test_pool().await;

        let en = create(&pool, Category::Matrix, "Chicken meat", Some("en"), None)
            .await
            .unwrap();
        create(
            &pool,
            Category::Matrix,
            "Hähnchenfleisch",
            Some("de"),
            Some(&en.document_id),
        )
        .await
        .unwrap();

        let de = find_localization(&pool, Category::Matrix, &en.document_id, "de")
            .await
            .unwrap()
            .expect("German counterpart not found");
        assert_eq!(de.name, "Hähnchenfleisch");
        assert_eq!(de.document_id, en.document_id);
    }
}
