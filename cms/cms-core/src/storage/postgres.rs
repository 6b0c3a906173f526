//! PostgresContentStore - Production Storage
//!
//! TigerStyle: the hosted backend's `content_sections` table, with a version
//! column added for optimistic concurrency.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS content_sections (
//!     id TEXT PRIMARY KEY,
//!     section_name TEXT NOT NULL UNIQUE,
//!     content JSONB NOT NULL,
//!     version BIGINT NOT NULL DEFAULT 1,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use super::backend::ContentStore;
use super::document::{check_content_size, check_section_id, StoredDocument};
use super::error::{StoreError, StoreResult};
use crate::dst::Clock;

// =============================================================================
// PostgresContentStore
// =============================================================================

/// PostgreSQL content store for production use.
pub struct PostgresContentStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PostgresContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresContentStore").finish_non_exhaustive()
    }
}

impl PostgresContentStore {
    /// Connect and make sure the schema exists.
    ///
    /// # Errors
    /// Returns error if the URL is not a postgres URL, the connection fails or
    /// the schema cannot be created.
    pub async fn new(connection_string: &str, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        if !(connection_string.starts_with("postgres://")
            || connection_string.starts_with("postgresql://"))
        {
            return Err(StoreError::connection("connection string must be a postgres URL"));
        }

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(connection_string)
            .await
            .map_err(|e| StoreError::connection(format!("failed to connect: {e}")))?;

        Self::from_pool(pool, clock).await
    }

    /// Create from an existing pool.
    ///
    /// # Errors
    /// Returns error if the schema cannot be created.
    pub async fn from_pool(pool: PgPool, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let store = Self { pool, clock };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content_sections (
                id TEXT PRIMARY KEY,
                section_name TEXT NOT NULL UNIQUE,
                content JSONB NOT NULL,
                version BIGINT NOT NULL DEFAULT 1,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::internal(format!("failed to create schema: {e}")))?;

        Ok(())
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn stored_version(&self, section: &str) -> StoreResult<Option<u64>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM content_sections WHERE section_name = $1")
                .bind(section)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::read(format!("failed to read version: {e}")))?;
        Ok(version.map(version_from_db))
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

fn version_from_db(version: i64) -> u64 {
    u64::try_from(version).unwrap_or(0)
}

fn version_to_db(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

fn row_to_document(row: &PgRow) -> StoreResult<StoredDocument> {
    let get_err = |e: sqlx::Error| StoreError::internal(e.to_string());

    let id: String = row.try_get("id").map_err(get_err)?;
    let section: String = row.try_get("section_name").map_err(get_err)?;
    let content: Value = row.try_get("content").map_err(get_err)?;
    let version: i64 = row.try_get("version").map_err(get_err)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(get_err)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(get_err)?;

    Ok(StoredDocument {
        id,
        section,
        content,
        version: version_from_db(version),
        created_at,
        updated_at,
    })
}

// =============================================================================
// ContentStore Implementation
// =============================================================================

#[async_trait]
impl ContentStore for PostgresContentStore {
    async fn get(&self, section: &str) -> StoreResult<Option<StoredDocument>> {
        let row = sqlx::query("SELECT * FROM content_sections WHERE section_name = $1")
            .bind(section)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::read(format!("failed to get document: {e}")))?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn insert(&self, section: &str, content: &Value) -> StoreResult<StoredDocument> {
        check_section_id(section)?;
        check_content_size(section, content)?;

        let document = StoredDocument::new(section, content.clone(), self.clock.now());
        let result = sqlx::query(
            r#"
            INSERT INTO content_sections (id, section_name, content, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (section_name) DO NOTHING
            "#,
        )
        .bind(&document.id)
        .bind(&document.section)
        .bind(&document.content)
        .bind(version_to_db(document.version))
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::write(format!("failed to insert document: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict {
                section: section.to_string(),
                expected: None,
                actual: self.stored_version(section).await?,
            });
        }

        Ok(document)
    }

    async fn update(
        &self,
        section: &str,
        content: &Value,
        expected_version: u64,
    ) -> StoreResult<StoredDocument> {
        check_content_size(section, content)?;

        let row = sqlx::query(
            r#"
            UPDATE content_sections
            SET content = $2, version = version + 1, updated_at = $4
            WHERE section_name = $1 AND version = $3
            RETURNING *
            "#,
        )
        .bind(section)
        .bind(content)
        .bind(version_to_db(expected_version))
        .bind(self.clock.now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::write(format!("failed to update document: {e}")))?;

        match row {
            Some(row) => {
                let document = row_to_document(&row)?;
                // Postcondition
                assert_eq!(
                    document.version,
                    expected_version + 1,
                    "update must advance the version by one"
                );
                Ok(document)
            }
            None => match self.stored_version(section).await? {
                None => Err(StoreError::NotFound {
                    section: section.to_string(),
                }),
                actual => Err(StoreError::Conflict {
                    section: section.to_string(),
                    expected: Some(expected_version),
                    actual,
                }),
            },
        }
    }

    async fn delete(&self, section: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM content_sections WHERE section_name = $1")
            .bind(section)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::write(format!("failed to delete document: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> StoreResult<Vec<StoredDocument>> {
        let rows = sqlx::query("SELECT * FROM content_sections ORDER BY section_name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::read(format!("failed to list documents: {e}")))?;

        rows.iter().map(row_to_document).collect()
    }
}

// =============================================================================
// Tests (require running Postgres)
// =============================================================================
