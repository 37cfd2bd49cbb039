//! Named cache stores for the request-interception worker, persisted in SQLite.
//!
//! A [`CacheStorage`] is the process-wide namespace of stores; a [`CacheStore`]
//! is one named store inside it. Entries are keyed by request identity
//! (method + url) and upserted on every write. Nothing is ever evicted.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use shared::http::{HttpResponse, Method, RequestKey};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

#[derive(Clone)]
pub struct CacheStorage {
    pool: Pool<Sqlite>,
}

#[derive(Clone)]
pub struct CacheStore {
    name: String,
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub cache_name: String,
    pub response: HttpResponse,
    pub stored_at: DateTime<Utc>,
}

impl CacheStorage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // every in-memory connection is its own database
        let max_connections = if is_in_memory(database_url) { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Opens the named store, creating it when missing.
    pub async fn open(&self, name: &str) -> Result<CacheStore> {
        sqlx::query("INSERT INTO caches (name) VALUES (?1) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to open cache store '{name}'"))?;
        Ok(CacheStore {
            name: name.to_string(),
            pool: self.pool.clone(),
        })
    }

    pub async fn has(&self, name: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM caches WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Store names in creation order.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar("SELECT name FROM caches ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    pub async fn delete(&self, name: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM cache_entries WHERE cache_name = ?1")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM caches WHERE name = ?1")
            .bind(name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(removed > 0)
    }

    /// Looks the request up in every store, oldest store first.
    pub async fn match_any(&self, key: &RequestKey) -> Result<Option<CachedResponse>> {
        let row = sqlx::query(
            r#"
            SELECT e.cache_name, e.status, e.headers, e.body, e.stored_at
            FROM cache_entries e
            JOIN caches c ON c.name = e.cache_name
            WHERE e.method = ?1 AND e.url = ?2
            ORDER BY c.id
            LIMIT 1
            "#,
        )
        .bind(key.method.as_str())
        .bind(&key.url)
        .fetch_optional(&self.pool)
        .await?;

        row.map(cached_response_from_row).transpose()
    }
}

impl CacheStore {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn put(&self, key: &RequestKey, response: &HttpResponse) -> Result<()> {
        let headers = serde_json::to_string(&response.headers)?;
        sqlx::query(
            r#"
            INSERT INTO cache_entries (cache_name, method, url, status, headers, body, stored_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(cache_name, method, url) DO UPDATE SET
                status = excluded.status,
                headers = excluded.headers,
                body = excluded.body,
                stored_at = excluded.stored_at
            "#,
        )
        .bind(&self.name)
        .bind(key.method.as_str())
        .bind(&key.url)
        .bind(i64::from(response.status))
        .bind(headers)
        .bind(&response.body)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to store {key} in cache '{}'", self.name))?;
        Ok(())
    }

    pub async fn match_request(&self, key: &RequestKey) -> Result<Option<CachedResponse>> {
        let row = sqlx::query(
            r#"
            SELECT cache_name, status, headers, body, stored_at
            FROM cache_entries
            WHERE cache_name = ?1 AND method = ?2 AND url = ?3
            "#,
        )
        .bind(&self.name)
        .bind(key.method.as_str())
        .bind(&key.url)
        .fetch_optional(&self.pool)
        .await?;

        row.map(cached_response_from_row).transpose()
    }

    pub async fn keys(&self) -> Result<Vec<RequestKey>> {
        let rows = sqlx::query(
            "SELECT method, url FROM cache_entries WHERE cache_name = ?1 ORDER BY rowid",
        )
        .bind(&self.name)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let method: String = row.get("method");
                Ok(RequestKey {
                    method: Method::from_str(&method).map_err(anyhow::Error::msg)?,
                    url: row.get("url"),
                })
            })
            .collect()
    }

    pub async fn delete(&self, key: &RequestKey) -> Result<bool> {
        let removed = sqlx::query(
            "DELETE FROM cache_entries WHERE cache_name = ?1 AND method = ?2 AND url = ?3",
        )
        .bind(&self.name)
        .bind(key.method.as_str())
        .bind(&key.url)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(removed > 0)
    }
}

fn cached_response_from_row(row: SqliteRow) -> Result<CachedResponse> {
    let headers: String = row.get("headers");
    let status: i64 = row.get("status");
    Ok(CachedResponse {
        cache_name: row.get("cache_name"),
        response: HttpResponse {
            status: u16::try_from(status).context("stored status out of range")?,
            headers: serde_json::from_str(&headers).context("corrupt stored headers")?,
            body: row.get::<Vec<u8>, _>("body"),
        },
        stored_at: row.get::<DateTime<Utc>, _>("stored_at"),
    })
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_in_memory(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
