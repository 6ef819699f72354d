mod rest;

pub use rest::RestTableStore;

use async_trait::async_trait;
use serde_json::Value;

/// Errors coming back from the remote table store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store returned {status}: {body}")]
    Store { status: u16, body: String },
    #[error("undecodable store response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Row-filtering contract of the remote table store: select all rows with
/// ordering, select/update/delete by id, insert one. Rows travel as JSON
/// objects; column-name translation is the caller's concern.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn select_all(&self, table: &str, order: &str) -> Result<Vec<Value>, StoreError>;
    async fn select_by_id(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError>;
    /// Inserts one row and returns it as stored (with the assigned id).
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError>;
    /// Applies `patch` to the row with the given id; `None` when no row matched.
    async fn update_by_id(
        &self,
        table: &str,
        id: &str,
        patch: Value,
    ) -> Result<Option<Value>, StoreError>;
    /// True when a row existed and was removed.
    async fn delete_by_id(&self, table: &str, id: &str) -> Result<bool, StoreError>;
}
