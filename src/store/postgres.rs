//! PostgreSQL backend.
//!
//! The table uses quoted camelCase column names (`"primaryLabel"`, ...). The
//! typed path selects those names exactly; the raw path goes through
//! `to_jsonb(t)` so it sees whatever the columns are actually called.

use super::{RawRecord, TranslationStore};
use crate::config::Config;
use crate::error::StoreError;
use crate::model::{RowDraft, RowId, RowUpdate, TranslationRow, UpdateOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

const SELECT_COLUMNS: &str = r#"id, locale, icon, image, title, visible, "primaryLabel", "primaryFeatures", "secondaryLabel", "secondaryFeatures", "createdAt", "updatedAt""#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    table: String,
}

impl PgStore {
    /// Connect using the configured URL and pool size.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!(table = %config.table, "Connected to catalog database");
        Ok(Self::from_pool(pool, &config.table))
    }

    /// `table` must already be a validated identifier (see `Config`).
    pub fn from_pool(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
        }
    }

    /// Create the table and its lookup indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(&create_table_sql(&self.table))
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to create table {}", self.table))?;

        for statement in create_index_sql(&self.table) {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to create index on {}", self.table))?;
        }

        Ok(())
    }

    fn select_sql(&self, filter: &str) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} ORDER BY id",
            SELECT_COLUMNS, self.table, filter
        )
    }

    fn raw_sql(&self, filter: &str) -> String {
        format!(
            "SELECT to_jsonb(t) AS record FROM {} t WHERE {}",
            self.table, filter
        )
    }

    async fn fetch_raw(&self, sql: &str, value: &str) -> Result<Vec<RawRecord>, StoreError> {
        let values: Vec<serde_json::Value> = sqlx::query_scalar(sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        values
            .into_iter()
            .map(|value| match value {
                serde_json::Value::Object(map) => Ok(map),
                other => Err(StoreError::Decode(format!(
                    "raw record is not an object: {}",
                    other
                ))),
            })
            .collect()
    }
}

fn create_table_sql(table: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {} (
            id BIGSERIAL PRIMARY KEY,
            locale TEXT NOT NULL,
            icon TEXT NOT NULL,
            image TEXT NOT NULL,
            title TEXT,
            visible BOOLEAN NOT NULL DEFAULT FALSE,
            "primaryLabel" TEXT NOT NULL,
            "primaryFeatures" TEXT[],
            "secondaryLabel" TEXT NOT NULL,
            "secondaryFeatures" TEXT[],
            "createdAt" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            "updatedAt" TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
        table
    )
}

fn create_index_sql(table: &str) -> [String; 2] {
    [
        format!(
            "CREATE INDEX IF NOT EXISTS {table}_locale_idx ON {table} (locale)",
            table = table
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {table}_icon_idx ON {table} (icon)",
            table = table
        ),
    ]
}

/// Build the guarded partial UPDATE for `update`. Only supplied fields are
/// written; `updatedAt` is always bumped.
fn build_update(table: &str, id: RowId, update: RowUpdate) -> QueryBuilder<'static, Postgres> {
    let patch = update.patch;
    let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET ", table));
    {
        let mut set = qb.separated(", ");
        if let Some(icon) = patch.icon {
            set.push("icon = ").push_bind_unseparated(icon);
        }
        if let Some(image) = patch.image {
            set.push("image = ").push_bind_unseparated(image);
        }
        if let Some(title) = patch.title {
            set.push("title = ").push_bind_unseparated(title);
        } else if patch.clear_title {
            set.push("title = NULL");
        }
        if let Some(visible) = patch.visible {
            set.push("visible = ").push_bind_unseparated(visible);
        }
        if let Some(label) = patch.primary_label {
            set.push(r#""primaryLabel" = "#).push_bind_unseparated(label);
        }
        if let Some(features) = patch.primary_features {
            set.push(r#""primaryFeatures" = "#)
                .push_bind_unseparated(features);
        }
        if let Some(label) = patch.secondary_label {
            set.push(r#""secondaryLabel" = "#).push_bind_unseparated(label);
        }
        if let Some(features) = patch.secondary_features {
            set.push(r#""secondaryFeatures" = "#)
                .push_bind_unseparated(features);
        }
        set.push(r#""updatedAt" = "#)
            .push_bind_unseparated(update.updated_at);
    }

    qb.push(" WHERE id = ").push_bind(id);
    if let Some(expected) = update.expected_updated_at {
        qb.push(r#" AND "updatedAt" = "#).push_bind(expected);
    }
    qb.push(" RETURNING ").push(SELECT_COLUMNS);
    qb
}

#[async_trait]
impl TranslationStore for PgStore {
    async fn fetch(&self, id: RowId) -> Result<Option<TranslationRow>, StoreError> {
        let row = sqlx::query_as::<_, TranslationRow>(&self.select_sql("id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn fetch_by_locale(&self, locale: &str) -> Result<Vec<TranslationRow>, StoreError> {
        let rows = sqlx::query_as::<_, TranslationRow>(&self.select_sql("locale = $1"))
            .bind(locale)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn fetch_by_icon(&self, icon: &str) -> Result<Vec<TranslationRow>, StoreError> {
        let rows = sqlx::query_as::<_, TranslationRow>(&self.select_sql("icon = $1"))
            .bind(icon)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert(&self, draft: RowDraft) -> Result<TranslationRow, StoreError> {
        let sql = format!(
            r#"INSERT INTO {} (locale, icon, image, title, visible, "primaryLabel", "primaryFeatures", "secondaryLabel", "secondaryFeatures", "createdAt", "updatedAt")
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               RETURNING {}"#,
            self.table, SELECT_COLUMNS
        );

        let row = sqlx::query_as::<_, TranslationRow>(&sql)
            .bind(draft.locale)
            .bind(draft.icon)
            .bind(draft.image)
            .bind(draft.title)
            .bind(draft.visible)
            .bind(draft.primary_label)
            .bind(draft.primary_features)
            .bind(draft.secondary_label)
            .bind(draft.secondary_features)
            .bind(draft.created_at)
            .bind(draft.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update(&self, id: RowId, update: RowUpdate) -> Result<UpdateOutcome, StoreError> {
        let guarded = update.expected_updated_at.is_some();
        let mut qb = build_update(&self.table, id, update);
        let updated = qb
            .build_query_as::<TranslationRow>()
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = updated {
            return Ok(UpdateOutcome::Updated(row));
        }
        if !guarded {
            return Ok(UpdateOutcome::NotFound);
        }

        // Nothing matched the guard: tell a vanished row from a changed one.
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            self.table
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(if exists {
            UpdateOutcome::Stale
        } else {
            UpdateOutcome::NotFound
        })
    }

    async fn delete(&self, id: RowId) -> Result<bool, StoreError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.table))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn raw_by_id(&self, id: RowId) -> Result<Vec<RawRecord>, StoreError> {
        let sql = self.raw_sql("to_jsonb(t)->>'id' = $1");
        self.fetch_raw(&sql, &id.to_string()).await
    }

    async fn raw_by_locale(&self, locale: &str) -> Result<Vec<RawRecord>, StoreError> {
        let sql = self.raw_sql(
            "lower(coalesce(to_jsonb(t)->>'locale', to_jsonb(t)->>'Locale')) = lower($1)",
        );
        self.fetch_raw(&sql, locale).await
    }

    async fn raw_by_icon(&self, icon: &str) -> Result<Vec<RawRecord>, StoreError> {
        let sql = self.raw_sql("coalesce(to_jsonb(t)->>'icon', to_jsonb(t)->>'Icon') = $1");
        self.fetch_raw(&sql, icon).await
    }
}
