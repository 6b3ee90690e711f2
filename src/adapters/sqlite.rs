//! SQLite-backed address store (via `sqlx`).
//!
//! The `addresses` table is created on connect if missing; there are no
//! migrations. Besides the display columns, each row stores lowercased
//! `street_key` / `city_key` columns so that case-insensitive search works for
//! non-ASCII text (SQLite's `LOWER()` only folds ASCII).
//!
//! `postal_code` carries a `UNIQUE` constraint. A violating insert or update is
//! reported as [`CepError::DuplicateKey`]; any other driver failure surfaces as
//! [`CepError::Database`].
//!
//! Sorting uses a fixed allowlist of columns ([`SortField`]), never caller text.

use crate::domain::model::{AddressRecord, Page, PageRequest, SortDirection};
use crate::domain::ports::{AddressStore, Clock, SystemClock};
use crate::utils::error::{CepError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS addresses (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    postal_code         TEXT    NOT NULL UNIQUE,
    street              TEXT    NOT NULL,
    street_key          TEXT    NOT NULL,
    complement          TEXT,
    neighborhood        TEXT    NOT NULL,
    city                TEXT    NOT NULL,
    city_key            TEXT    NOT NULL,
    state_code          TEXT    NOT NULL,
    region_code         TEXT,
    tax_region_code     TEXT,
    area_code           TEXT,
    finance_region_code TEXT,
    created_at          TEXT    NOT NULL,
    updated_at          TEXT
);
CREATE INDEX IF NOT EXISTS idx_addresses_city_key ON addresses (city_key);
"#;

const SELECT_COLUMNS: &str = "id, postal_code, street, complement, neighborhood, city, \
     state_code, region_code, tax_region_code, area_code, finance_region_code, \
     created_at, updated_at";

/// Row shape of the `addresses` table.
#[derive(Debug, Clone, FromRow)]
struct DbAddress {
    id: i64,
    postal_code: String,
    street: String,
    complement: Option<String>,
    neighborhood: String,
    city: String,
    state_code: String,
    region_code: Option<String>,
    tax_region_code: Option<String>,
    area_code: Option<String>,
    finance_region_code: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<DbAddress> for AddressRecord {
    fn from(row: DbAddress) -> Self {
        AddressRecord {
            id: Some(row.id),
            postal_code: row.postal_code,
            street: row.street,
            complement: row.complement,
            neighborhood: row.neighborhood,
            city: row.city,
            state_code: row.state_code,
            region_code: row.region_code,
            tax_region_code: row.tax_region_code,
            area_code: row.area_code,
            finance_region_code: row.finance_region_code,
            created_at: Some(row.created_at),
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    /// Opens (or creates) the database and bootstraps the schema.
    ///
    /// In-memory URLs are pinned to a single long-lived connection, since every
    /// new SQLite connection would otherwise see its own empty database.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        Self::connect_with_clock(database_url, max_connections, Arc::new(SystemClock)).await
    }

    pub async fn connect_with_clock(
        database_url: &str,
        max_connections: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let mut pool_options = SqlitePoolOptions::new();
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            pool_options.max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        tracing::debug!("SQLite store ready (in_memory: {})", in_memory);
        Ok(Self { pool, clock })
    }

    async fn fetch_page(
        &self,
        filter: Option<(&str, String)>,
        page: &PageRequest,
    ) -> Result<Page<AddressRecord>> {
        let where_clause = filter
            .as_ref()
            .map(|(clause, _)| format!("WHERE {}", clause))
            .unwrap_or_default();
        let direction = match page.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };

        let count_sql = format!("SELECT COUNT(*) FROM addresses {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some((_, arg)) = &filter {
            count_query = count_query.bind(arg.clone());
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let select_sql = format!(
            "SELECT {} FROM addresses {} ORDER BY {} {}, id ASC LIMIT ? OFFSET ?",
            SELECT_COLUMNS,
            where_clause,
            page.sort.as_str(),
            direction
        );
        let mut select_query = sqlx::query_as::<_, DbAddress>(&select_sql);
        if let Some((_, arg)) = &filter {
            select_query = select_query.bind(arg.clone());
        }
        let rows = select_query
            .bind(i64::from(page.size))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(AddressRecord::from).collect(),
            page,
            total.max(0) as u64,
        ))
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<AddressRecord>> {
        let sql = format!("SELECT {} FROM addresses WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, DbAddress>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AddressRecord::from))
    }
}

fn map_write_error(err: sqlx::Error, postal_code: &str) -> CepError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return CepError::DuplicateKey {
                postal_code: postal_code.to_string(),
            };
        }
    }
    CepError::Database(err)
}

fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl AddressStore for SqliteStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<AddressRecord>> {
        let sql = format!(
            "SELECT {} FROM addresses WHERE postal_code = ?",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, DbAddress>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(AddressRecord::from))
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM addresses WHERE postal_code = ?")
                .bind(code)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    async fn exists_by_code_excluding_id(&self, code: &str, exclude_id: i64) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM addresses WHERE postal_code = ? AND id != ?",
        )
        .bind(code)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn search_by_street_fragment(
        &self,
        fragment: &str,
        page: &PageRequest,
    ) -> Result<Page<AddressRecord>> {
        let pattern = format!("%{}%", escape_like(&fragment.to_lowercase()));
        self.fetch_page(Some(("street_key LIKE ? ESCAPE '\\'", pattern)), page)
            .await
    }

    async fn search_by_city(&self, city: &str, page: &PageRequest) -> Result<Page<AddressRecord>> {
        self.fetch_page(Some(("city_key = ?", city.to_lowercase())), page)
            .await
    }

    async fn list_all(&self, page: &PageRequest) -> Result<Page<AddressRecord>> {
        self.fetch_page(None, page).await
    }

    async fn save(&self, record: AddressRecord) -> Result<AddressRecord> {
        let now = self.clock.now();

        match record.id {
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO addresses (
                        postal_code, street, street_key, complement, neighborhood,
                        city, city_key, state_code, region_code, tax_region_code,
                        area_code, finance_region_code, created_at, updated_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
                    "#,
                )
                .bind(&record.postal_code)
                .bind(&record.street)
                .bind(record.street.to_lowercase())
                .bind(&record.complement)
                .bind(&record.neighborhood)
                .bind(&record.city)
                .bind(record.city.to_lowercase())
                .bind(&record.state_code)
                .bind(&record.region_code)
                .bind(&record.tax_region_code)
                .bind(&record.area_code)
                .bind(&record.finance_region_code)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(|e| map_write_error(e, &record.postal_code))?;

                Ok(AddressRecord {
                    id: Some(result.last_insert_rowid()),
                    created_at: Some(now),
                    updated_at: None,
                    ..record
                })
            }
            Some(id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE addresses SET
                        postal_code = ?, street = ?, street_key = ?, complement = ?,
                        neighborhood = ?, city = ?, city_key = ?, state_code = ?,
                        region_code = ?, tax_region_code = ?, area_code = ?,
                        finance_region_code = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&record.postal_code)
                .bind(&record.street)
                .bind(record.street.to_lowercase())
                .bind(&record.complement)
                .bind(&record.neighborhood)
                .bind(&record.city)
                .bind(record.city.to_lowercase())
                .bind(&record.state_code)
                .bind(&record.region_code)
                .bind(&record.tax_region_code)
                .bind(&record.area_code)
                .bind(&record.finance_region_code)
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| map_write_error(e, &record.postal_code))?;

                if result.rows_affected() == 0 {
                    return Err(CepError::not_found(format!(
                        "No stored address with id {}",
                        id
                    )));
                }

                // created_at 以資料庫內的值為準
                self.fetch_by_id(id).await?.ok_or_else(|| CepError::Storage {
                    message: format!("Address {} vanished during update", id),
                })
            }
        }
    }

    async fn delete(&self, record: &AddressRecord) -> Result<()> {
        let result = match record.id {
            Some(id) => sqlx::query("DELETE FROM addresses WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?,
            None => sqlx::query("DELETE FROM addresses WHERE postal_code = ?")
                .bind(&record.postal_code)
                .execute(&self.pool)
                .await?,
        };

        if result.rows_affected() == 0 {
            return Err(CepError::not_found(format!(
                "No stored address for postal code {}",
                record.postal_code
            )));
        }
        Ok(())
    }
}
