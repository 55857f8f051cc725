//! ASN description lookup cache.
//!
//! A disk-backed key→value store mapping AS numbers to human-readable
//! descriptions. It is warmed once at startup from a CSV table, queried
//! read-only by all enrichment workers, and destroyed (backing storage
//! removed) when the run completes. Ephemeral per invocation, never shared
//! across runs.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{error, info};
use sqlx::SqlitePool;

use crate::error_handling::CacheError;

/// Disk-backed, read-mostly AS number → description store.
///
/// Safe for concurrent reads from any number of tasks; writes happen only
/// during [`LookupCache::warm`], before any lookup occurs.
pub struct LookupCache {
    pool: SqlitePool,
    dir: PathBuf,
}

impl LookupCache {
    /// Opens (creating if necessary) the cache storage under `dir`.
    ///
    /// Enables WAL mode for concurrent reads, following the same setup as
    /// any other SQLite storage in this codebase. Failure here is fatal for
    /// the run: without the cache no enrichment can proceed.
    pub async fn open(dir: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| CacheError::StorageCreation(format!("{}: {e}", dir.display())))?;

        let db_path = dir.join("asn_descriptions.db");
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&db_path)
        {
            Ok(_) => info!("Cache database file created at {}", db_path.display()),
            Err(ref e) if e.kind() == ErrorKind::AlreadyExists => {
                info!("Cache database file already exists, reusing it.")
            }
            Err(e) => {
                error!("Failed to create cache database file: {e}");
                return Err(CacheError::StorageCreation(e.to_string()));
            }
        }

        let pool = SqlitePool::connect(&format!("sqlite:{}", db_path.to_string_lossy())).await?;

        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS as_descriptions (
                asn TEXT PRIMARY KEY,
                description TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(LookupCache {
            pool,
            dir: dir.to_path_buf(),
        })
    }

    /// Loads the two-column ASN CSV (AS number, description) into the cache.
    ///
    /// The header row is skipped. Keys arrive as `AS15169` and are stored as
    /// the bare number; double quotes inside descriptions are normalized to
    /// single quotes. All rows are inserted in one transaction before any
    /// lookup happens.
    ///
    /// Returns the number of rows loaded.
    pub async fn warm(&self, csv_path: &Path) -> Result<usize, CacheError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(csv_path)?;

        let mut tx = self.pool.begin().await?;
        let mut rows = 0usize;
        for result in reader.records() {
            let record = result?;
            if record.len() < 2 {
                continue;
            }
            let asn = record[0].strip_prefix("AS").unwrap_or(&record[0]).trim();
            if asn.is_empty() {
                continue;
            }
            let description = record[1].replace('"', "'");
            sqlx::query("INSERT OR REPLACE INTO as_descriptions (asn, description) VALUES (?, ?)")
                .bind(asn)
                .bind(description)
                .execute(&mut *tx)
                .await?;
            rows += 1;
        }
        tx.commit().await?;

        info!("Lookup cache warmed with {} AS descriptions", rows);
        Ok(rows)
    }

    /// Point lookup of an AS description.
    ///
    /// A miss is `Ok(None)`, never an error: missing descriptions are an
    /// expected condition and the caller leaves the field empty.
    pub async fn get(&self, asn: u32) -> Result<Option<String>, CacheError> {
        let description: Option<String> =
            sqlx::query_scalar("SELECT description FROM as_descriptions WHERE asn = ?")
                .bind(asn.to_string())
                .fetch_optional(&self.pool)
                .await?;
        Ok(description)
    }

    /// Closes the pool and removes the backing storage.
    ///
    /// The cache is ephemeral: each run warms its own copy, so nothing is
    /// kept between invocations.
    pub async fn destroy(self) -> Result<(), CacheError> {
        self.pool.close().await;
        tokio::fs::remove_dir_all(&self.dir).await?;
        info!("Lookup cache removed from {}", self.dir.display());
        Ok(())
    }
}
