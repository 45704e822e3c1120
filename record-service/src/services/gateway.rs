//! Document gateway: the seam between HTTP handlers and the document store.
//!
//! Implementations translate record operations into store primitives and
//! report store failures as [`GatewayError`]. They hold no business rules.

use crate::models::{Fields, Record};
use async_trait::async_trait;
use futures::stream::BoxStream;
use service_core::error::AppError;
use thiserror::Error;

/// Lazy sequence of records produced by a single query.
///
/// Dropping the stream releases the underlying cursor. Calling
/// [`RecordGateway::find`] again issues a fresh query.
pub type RecordStream = BoxStream<'static, Result<Record, GatewayError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("document store unavailable: {0}")]
    Unavailable(anyhow::Error),

    #[error("constraint violation: {0}")]
    Conflict(anyhow::Error),

    #[error("invalid document: {0}")]
    InvalidDocument(anyhow::Error),

    #[error("document store error: {0}")]
    Store(anyhow::Error),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(e) => AppError::StoreUnavailable(e),
            GatewayError::Conflict(e) => AppError::Conflict(e),
            GatewayError::InvalidDocument(e) => AppError::BadRequest(e),
            GatewayError::Store(e) => AppError::DatabaseError(e),
        }
    }
}

#[async_trait]
pub trait RecordGateway: Send + Sync {
    /// Round-trip to the store.
    async fn health_check(&self) -> Result<(), GatewayError>;

    /// Store `fields` under a newly generated identifier and return the
    /// record as persisted.
    async fn insert(&self, fields: Fields) -> Result<Record, GatewayError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Record>, GatewayError>;

    /// At most `page.limit` records after skipping `page.offset`, in the
    /// store's natural order.
    async fn find(&self, page: Page) -> Result<RecordStream, GatewayError>;

    /// Overwrite every field of `id` with `fields`. `None` when absent.
    async fn replace(&self, id: &str, fields: Fields) -> Result<Option<Record>, GatewayError>;

    /// Set only the given fields of `id`, keeping the rest. `None` when absent.
    async fn update_fields(
        &self,
        id: &str,
        fields: Fields,
    ) -> Result<Option<Record>, GatewayError>;

    /// `true` if a record was removed.
    async fn delete(&self, id: &str) -> Result<bool, GatewayError>;

    /// Release store connections. Called once, after the server stops.
    async fn shutdown(&self) {}
}
