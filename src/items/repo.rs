use std::sync::Arc;

use anyhow::Context;
use time::OffsetDateTime;
use tracing::warn;

use crate::store::{RestTableStore, TableStore};

use super::fallback::FallbackSet;
use super::row::{self, Item, ItemPatch, NewItem, CREATED_AT_COLUMN};

/// What to do when the remote store fails: serve/mutate the fallback set, or
/// hand the error to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Degrade,
    Propagate,
}

impl FailurePolicy {
    pub fn from_env_value(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "propagate" => Self::Propagate,
            "degrade" => Self::Degrade,
            other => {
                warn!(value = other, "unknown failure policy, using degrade");
                Self::Degrade
            }
        }
    }
}

/// Sole point of contact between the application and persisted item data.
///
/// Owns the translation between the application `Item` shape and the remote
/// row shape, and the degrade-to-fallback behavior: under the default policy
/// no read or write surfaces a store error, the caller always gets a usable
/// (possibly stale or synthetic) result.
#[derive(Clone)]
pub struct ItemRepository {
    store: Option<Arc<dyn TableStore>>,
    table: String,
    fallback: FallbackSet,
    policy: FailurePolicy,
}

impl ItemRepository {
    pub fn new(
        store: Option<Arc<dyn TableStore>>,
        table: impl Into<String>,
        fallback: FallbackSet,
        policy: FailurePolicy,
    ) -> Self {
        if store.is_none() {
            // Missing credentials behave like a permanent store outage.
            warn!("catalog store not configured, serving fallback data only");
        }
        Self {
            store,
            table: table.into(),
            fallback,
            policy,
        }
    }

    pub fn from_config(cfg: &crate::config::CatalogConfig) -> anyhow::Result<Self> {
        let store: Option<Arc<dyn TableStore>> = match (&cfg.api_url, &cfg.api_key) {
            (Some(url), Some(key)) => Some(Arc::new(RestTableStore::new(url, key)?)),
            _ => None,
        };
        Ok(Self::new(
            store,
            cfg.table.clone(),
            FallbackSet::seeded(),
            cfg.failure_policy,
        ))
    }

    fn store(&self) -> anyhow::Result<&dyn TableStore> {
        self.store
            .as_deref()
            .context("catalog store is not configured")
    }

    fn order() -> String {
        format!("{}.desc", CREATED_AT_COLUMN)
    }

    /// All items, newest first. Never fails under the degrade policy.
    pub async fn list(&self) -> anyhow::Result<Vec<Item>> {
        match self.list_remote().await {
            Ok(items) => Ok(items),
            Err(err) => match self.policy {
                FailurePolicy::Degrade => {
                    warn!(error = %err, "item list failed, serving fallback set");
                    Ok(self.fallback.list())
                }
                FailurePolicy::Propagate => Err(err),
            },
        }
    }

    async fn list_remote(&self) -> anyhow::Result<Vec<Item>> {
        let rows = self.store()?.select_all(&self.table, &Self::order()).await?;
        rows.into_iter().map(row::row_to_item).collect()
    }

    /// One item, or `None` when neither source has it. Ids that follow the
    /// fallback set's naming are served from it without a store round-trip.
    pub async fn get(&self, id: &str) -> anyhow::Result<Option<Item>> {
        if FallbackSet::owns_id(id) {
            return Ok(self.fallback.get(id));
        }
        match self.get_remote(id).await {
            Ok(found) => Ok(found),
            Err(err) => match self.policy {
                FailurePolicy::Degrade => {
                    warn!(error = %err, id, "item fetch failed, consulting fallback set");
                    Ok(self.fallback.get(id))
                }
                FailurePolicy::Propagate => Err(err),
            },
        }
    }

    async fn get_remote(&self, id: &str) -> anyhow::Result<Option<Item>> {
        match self.store()?.select_by_id(&self.table, id).await? {
            Some(row) => Ok(Some(row::row_to_item(row)?)),
            None => Ok(None),
        }
    }

    /// Persists a new item, stamping `created_at` here and letting the store
    /// assign the id. The degraded path appends to the fallback set instead;
    /// that write does not survive a restart.
    pub async fn create(&self, new: NewItem) -> anyhow::Result<Item> {
        let created_at = OffsetDateTime::now_utc();
        match self.create_remote(&new, created_at).await {
            Ok(item) => Ok(item),
            Err(err) => match self.policy {
                FailurePolicy::Degrade => {
                    warn!(error = %err, name = %new.name, "item create failed, recording in fallback set");
                    Ok(self.fallback.append_new(&new, created_at))
                }
                FailurePolicy::Propagate => Err(err),
            },
        }
    }

    async fn create_remote(&self, new: &NewItem, created_at: OffsetDateTime) -> anyhow::Result<Item> {
        let row = row::insert_row(new, created_at)?;
        let stored = self.store()?.insert(&self.table, row).await?;
        row::row_to_item(stored)
    }

    /// Partial update; `id` and `created_at` are not part of the patchable
    /// set. `None` when no record matched anywhere.
    pub async fn update(&self, id: &str, patch: ItemPatch) -> anyhow::Result<Option<Item>> {
        match self.update_remote(id, &patch).await {
            Ok(found) => Ok(found),
            Err(err) => match self.policy {
                FailurePolicy::Degrade => {
                    warn!(error = %err, id, "item update failed, merging into fallback set");
                    Ok(self.fallback.merge(id, &patch))
                }
                FailurePolicy::Propagate => Err(err),
            },
        }
    }

    async fn update_remote(&self, id: &str, patch: &ItemPatch) -> anyhow::Result<Option<Item>> {
        match self
            .store()?
            .update_by_id(&self.table, id, row::patch_row(patch))
            .await?
        {
            Some(row) => Ok(Some(row::row_to_item(row)?)),
            None => Ok(None),
        }
    }

    /// True when a record existed and was removed, on either path.
    pub async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        match self.delete_remote(id).await {
            Ok(deleted) => Ok(deleted),
            Err(err) => match self.policy {
                FailurePolicy::Degrade => {
                    warn!(error = %err, id, "item delete failed, removing from fallback set");
                    Ok(self.fallback.remove(id))
                }
                FailurePolicy::Propagate => Err(err),
            },
        }
    }

    async fn delete_remote(&self, id: &str) -> anyhow::Result<bool> {
        Ok(self.store()?.delete_by_id(&self.table, id).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;
    use uuid::Uuid;

    use crate::store::StoreError;

    use super::*;

    /// Table store over a plain vector, close enough to the hosted API for
    /// repository tests.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<Value>>,
    }

    fn created_at_of(row: &Value) -> String {
        row.get("createdAt")
            .or_else(|| row.get("createdat"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    #[async_trait]
    impl TableStore for MemoryStore {
        async fn select_all(&self, _table: &str, _order: &str) -> Result<Vec<Value>, StoreError> {
            let mut rows = self.rows.lock().unwrap().clone();
            rows.sort_by(|a, b| created_at_of(b).cmp(&created_at_of(a)));
            Ok(rows)
        }

        async fn select_by_id(&self, _table: &str, id: &str) -> Result<Option<Value>, StoreError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|row| row["id"] == id)
                .cloned())
        }

        async fn insert(&self, _table: &str, mut row: Value) -> Result<Value, StoreError> {
            row["id"] = Value::String(Uuid::new_v4().to_string());
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn update_by_id(
            &self,
            _table: &str,
            id: &str,
            patch: Value,
        ) -> Result<Option<Value>, StoreError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.iter_mut().find(|row| row["id"] == id);
            let Some(row) = row else { return Ok(None) };
            for (column, value) in patch.as_object().unwrap() {
                row[column.as_str()] = value.clone();
            }
            Ok(Some(row.clone()))
        }

        async fn delete_by_id(&self, _table: &str, id: &str) -> Result<bool, StoreError> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|row| row["id"] != id);
            Ok(rows.len() < before)
        }
    }

    /// Every call fails with a store-side error.
    struct FailingStore;

    fn unavailable() -> StoreError {
        StoreError::Store {
            status: 503,
            body: "service unavailable".into(),
        }
    }

    #[async_trait]
    impl TableStore for FailingStore {
        async fn select_all(&self, _t: &str, _o: &str) -> Result<Vec<Value>, StoreError> {
            Err(unavailable())
        }
        async fn select_by_id(&self, _t: &str, _id: &str) -> Result<Option<Value>, StoreError> {
            Err(unavailable())
        }
        async fn insert(&self, _t: &str, _row: Value) -> Result<Value, StoreError> {
            Err(unavailable())
        }
        async fn update_by_id(
            &self,
            _t: &str,
            _id: &str,
            _patch: Value,
        ) -> Result<Option<Value>, StoreError> {
            Err(unavailable())
        }
        async fn delete_by_id(&self, _t: &str, _id: &str) -> Result<bool, StoreError> {
            Err(unavailable())
        }
    }

    /// Counts calls before failing, to prove short-circuits never reach it.
    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    impl CountingStore {
        fn bump(&self) -> StoreError {
            self.calls.fetch_add(1, Ordering::SeqCst);
            unavailable()
        }
    }

    #[async_trait]
    impl TableStore for CountingStore {
        async fn select_all(&self, _t: &str, _o: &str) -> Result<Vec<Value>, StoreError> {
            Err(self.bump())
        }
        async fn select_by_id(&self, _t: &str, _id: &str) -> Result<Option<Value>, StoreError> {
            Err(self.bump())
        }
        async fn insert(&self, _t: &str, _row: Value) -> Result<Value, StoreError> {
            Err(self.bump())
        }
        async fn update_by_id(
            &self,
            _t: &str,
            _id: &str,
            _patch: Value,
        ) -> Result<Option<Value>, StoreError> {
            Err(self.bump())
        }
        async fn delete_by_id(&self, _t: &str, _id: &str) -> Result<bool, StoreError> {
            Err(self.bump())
        }
    }

    fn repo_with(store: Arc<dyn TableStore>, policy: FailurePolicy) -> ItemRepository {
        ItemRepository::new(Some(store), "items", FallbackSet::seeded(), policy)
    }

    fn new_item() -> NewItem {
        NewItem {
            name: "Oak Shelf".into(),
            description: "Wall-mounted oak shelf".into(),
            price: 59.0,
            image_url: "https://example.com/shelf.jpg".into(),
        }
    }

    #[tokio::test]
    async fn create_then_get_roundtrips() {
        let repo = repo_with(Arc::new(MemoryStore::default()), FailurePolicy::Degrade);
        let created = repo.create(new_item()).await.expect("create");
        assert!(!created.id.is_empty());
        assert_eq!(created.name, "Oak Shelf");
        assert_eq!(created.price, 59.0);

        let fetched = repo.get(&created.id).await.expect("get").expect("present");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn update_changes_only_price() {
        let repo = repo_with(Arc::new(MemoryStore::default()), FailurePolicy::Degrade);
        let created = repo.create(new_item()).await.unwrap();

        let patch = ItemPatch {
            price: Some(45.0),
            ..Default::default()
        };
        let updated = repo.update(&created.id, patch).await.unwrap().expect("present");
        assert_eq!(updated.price, 45.0);
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.image_url, created.image_url);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn delete_then_get_is_absent() {
        let repo = repo_with(Arc::new(MemoryStore::default()), FailurePolicy::Degrade);
        let created = repo.create(new_item()).await.unwrap();

        assert!(repo.delete(&created.id).await.unwrap());
        assert_eq!(repo.get(&created.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_serves_fallback_when_store_fails() {
        let repo = repo_with(Arc::new(FailingStore), FailurePolicy::Degrade);
        let items = repo.list().await.expect("list never fails under degrade");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].name, "Ceramic Vase");
    }

    #[tokio::test]
    async fn list_serves_fallback_when_store_is_unconfigured() {
        let repo = ItemRepository::new(None, "items", FallbackSet::seeded(), FailurePolicy::Degrade);
        let items = repo.list().await.unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn fallback_ids_never_reach_the_store() {
        let store = Arc::new(CountingStore::default());
        let repo = repo_with(store.clone(), FailurePolicy::Degrade);

        let item = repo.get("2").await.unwrap().expect("seeded item");
        assert_eq!(item.name, "Modern Desk Lamp");
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delete_of_unknown_id_on_store_error_is_false() {
        let repo = repo_with(Arc::new(FailingStore), FailurePolicy::Degrade);
        assert!(!repo.delete("99").await.unwrap());
    }

    #[tokio::test]
    async fn degraded_create_appends_to_fallback() {
        let repo = repo_with(Arc::new(FailingStore), FailurePolicy::Degrade);
        let created = repo.create(new_item()).await.unwrap();
        assert_eq!(created.id, "4");
        assert_eq!(repo.get("4").await.unwrap().unwrap().name, "Oak Shelf");
    }

    #[tokio::test]
    async fn degraded_update_merges_into_fallback() {
        let repo = repo_with(Arc::new(FailingStore), FailurePolicy::Degrade);
        let patch = ItemPatch {
            price: Some(111.0),
            ..Default::default()
        };
        // "1" would short-circuit on get, but update always tries the store
        // first; the failure lands in the fallback merge.
        let updated = repo.update("1", patch).await.unwrap().expect("seeded item");
        assert_eq!(updated.price, 111.0);
        assert_eq!(updated.name, "Minimalist Chair");
    }

    #[tokio::test]
    async fn propagate_policy_surfaces_store_errors() {
        let repo = repo_with(Arc::new(FailingStore), FailurePolicy::Propagate);
        assert!(repo.list().await.is_err());
        assert!(repo.create(new_item()).await.is_err());
        assert!(repo.get("not-a-fallback-id").await.is_err());
    }

    #[test]
    fn failure_policy_parses_env_values() {
        assert_eq!(FailurePolicy::from_env_value("propagate"), FailurePolicy::Propagate);
        assert_eq!(FailurePolicy::from_env_value("Degrade"), FailurePolicy::Degrade);
        assert_eq!(FailurePolicy::from_env_value("bogus"), FailurePolicy::Degrade);
    }
}
