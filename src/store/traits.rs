//! `AdRepository` trait — persistence seam for finished ads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StorageError;

/// A fully collected ad, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAd {
    pub role: String,
    pub source: String,
    pub destination: String,
    /// ISO date string (`YYYY-MM-DD`).
    pub flight_date: String,
    pub description: String,
    /// Resolved public handle or numeric identifier of the submitter.
    pub author: String,
}

/// A persisted ad with its server-assigned identity.
///
/// Immutable once created; there is no update or delete path.
#[derive(Debug, Clone)]
pub struct AdRecord {
    pub id: Uuid,
    pub role: String,
    pub source: String,
    pub destination: String,
    pub flight_date: String,
    pub description: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic ad persistence.
#[async_trait]
pub trait AdRepository: Send + Sync {
    /// Insert a new ad, returning the stored record.
    async fn insert(&self, ad: &NewAd) -> Result<AdRecord, StorageError>;

    /// Look up an ad by its identifier.
    async fn get(&self, id: Uuid) -> Result<Option<AdRecord>, StorageError>;
}
