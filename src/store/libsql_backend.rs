//! libSQL backend — async `AdRepository` implementation.
//!
//! Supports local file and in-memory databases; migrations run on open.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StorageError;
use crate::store::migrations;
use crate::store::traits::{AdRecord, AdRepository, NewAd};

/// libSQL ad store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlAdStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlAdStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StorageError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StorageError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        info!(path = %path.display(), "Ad database opened");

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StorageError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StorageError::Pool(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StorageError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map a libsql Row to an AdRecord.
///
/// Column order: 0:id, 1:role, 2:source, 3:destination, 4:flight_date,
/// 5:description, 6:author, 7:created_at
fn row_to_ad(row: &libsql::Row) -> Result<AdRecord, libsql::Error> {
    let id_str: String = row.get(0)?;
    let role: String = row.get(1)?;
    let source: String = row.get(2)?;
    let destination: String = row.get(3)?;
    let flight_date: String = row.get(4)?;
    let description: String = row.get(5)?;
    let author: String = row.get(6)?;
    let created_str: String = row.get(7)?;

    Ok(AdRecord {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        role,
        source,
        destination,
        flight_date,
        description,
        author,
        created_at: parse_datetime(&created_str),
    })
}

const AD_COLUMNS: &str = "id, role, source, destination, flight_date, description, author, created_at";

#[async_trait]
impl AdRepository for LibSqlAdStore {
    async fn insert(&self, ad: &NewAd) -> Result<AdRecord, StorageError> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        self.conn
            .execute(
                "INSERT INTO ads (id, role, source, destination, flight_date, description, author, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.to_string(),
                    ad.role.clone(),
                    ad.source.clone(),
                    ad.destination.clone(),
                    ad.flight_date.clone(),
                    ad.description.clone(),
                    ad.author.clone(),
                    created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StorageError::Query(format!("Failed to insert ad: {e}")))?;

        debug!(%id, author = %ad.author, "Ad stored");

        Ok(AdRecord {
            id,
            role: ad.role.clone(),
            source: ad.source.clone(),
            destination: ad.destination.clone(),
            flight_date: ad.flight_date.clone(),
            description: ad.description.clone(),
            author: ad.author.clone(),
            created_at,
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<AdRecord>, StorageError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {AD_COLUMNS} FROM ads WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| StorageError::Query(format!("Failed to query ad: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StorageError::Query(format!("Failed to read ad row: {e}")))?;

        match row {
            Some(row) => row_to_ad(&row)
                .map(Some)
                .map_err(|e| StorageError::Query(format!("Failed to parse ad row: {e}"))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ad() -> NewAd {
        NewAd {
            role: "Passenger".into(),
            source: "Baku".into(),
            destination: "Istanbul".into(),
            flight_date: "2025-07-10".into(),
            description: "2 bags, flexible dates".into(),
            author: "traveler".into(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let store = LibSqlAdStore::new_memory().await.unwrap();
        let record = store.insert(&sample_ad()).await.unwrap();

        assert!(!record.id.is_nil());
        assert_eq!(record.role, "Passenger");
        assert_eq!(record.flight_date, "2025-07-10");
        let age = Utc::now() - record.created_at;
        assert!(age.num_seconds() < 10);
    }

    #[tokio::test]
    async fn insert_then_get_roundtrip() {
        let store = LibSqlAdStore::new_memory().await.unwrap();
        let inserted = store.insert(&sample_ad()).await.unwrap();

        let fetched = store.get(inserted.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, inserted.id);
        assert_eq!(fetched.source, "Baku");
        assert_eq!(fetched.destination, "Istanbul");
        assert_eq!(fetched.description, "2 bags, flexible dates");
        assert_eq!(fetched.author, "traveler");
        assert_eq!(
            fetched.created_at.timestamp(),
            inserted.created_at.timestamp()
        );
    }

    #[tokio::test]
    async fn get_unknown_id_returns_none() {
        let store = LibSqlAdStore::new_memory().await.unwrap();
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn inserts_get_distinct_ids() {
        let store = LibSqlAdStore::new_memory().await.unwrap();
        let a = store.insert(&sample_ad()).await.unwrap();
        let b = store.insert(&sample_ad()).await.unwrap();
        assert_ne!(a.id, b.id);
    }
}
