use std::sync::{Arc, Mutex, MutexGuard};

use time::macros::datetime;
use time::OffsetDateTime;

use super::row::{Item, ItemPatch, NewItem};

/// In-memory item set served when the remote store is unavailable.
///
/// Owned and injected into the repository at construction so tests can seed
/// or empty it. A single mutex keeps individual mutations whole; there is
/// deliberately no coordination across operations, so two concurrent
/// degraded writes may interleave. Degraded writes do not survive a restart.
#[derive(Clone)]
pub struct FallbackSet {
    items: Arc<Mutex<Vec<Item>>>,
}

impl FallbackSet {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items)),
        }
    }

    /// The demo catalog the application shipped with.
    pub fn seeded() -> Self {
        Self::new(vec![
            Item {
                id: "1".into(),
                name: "Minimalist Chair".into(),
                description: "Elegant chair with a sleek design that combines simplicity \
                              with comfort. Perfect for modern living spaces."
                    .into(),
                price: 299.99,
                image_url: "https://images.unsplash.com/photo-1567538096630-e0c55bd6374c?ixlib=rb-4.0.3&auto=format&fit=crop&w=1000&q=80".into(),
                created_at: datetime!(2023-06-15 0:00 UTC),
            },
            Item {
                id: "2".into(),
                name: "Modern Desk Lamp".into(),
                description: "A beautiful desk lamp with adjustable brightness and color \
                              temperature. Designed for focus and comfort."
                    .into(),
                price: 129.99,
                image_url: "https://images.unsplash.com/photo-1534073828943-f801091bb18e?ixlib=rb-4.0.3&auto=format&fit=crop&w=1000&q=80".into(),
                created_at: datetime!(2023-07-22 0:00 UTC),
            },
            Item {
                id: "3".into(),
                name: "Ceramic Vase".into(),
                description: "Handcrafted ceramic vase with a unique glaze finish. Each \
                              piece is one-of-a-kind and perfect for displaying fresh or \
                              dried flowers."
                    .into(),
                price: 79.99,
                image_url: "https://images.unsplash.com/photo-1612196808214-b8e1d6145a8c?ixlib=rb-4.0.3&auto=format&fit=crop&w=1000&q=80".into(),
                created_at: datetime!(2023-08-10 0:00 UTC),
            },
        ])
    }

    /// Whether an id follows the fallback set's naming: plain decimal, as
    /// opposed to the UUIDs the remote store assigns.
    pub fn owns_id(id: &str) -> bool {
        !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Item>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn list(&self) -> Vec<Item> {
        let mut items = self.lock().clone();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    pub fn get(&self, id: &str) -> Option<Item> {
        self.lock().iter().find(|item| item.id == id).cloned()
    }

    /// Degraded create: synthesizes an id one past the current size.
    pub fn append_new(&self, new: &NewItem, created_at: OffsetDateTime) -> Item {
        let mut items = self.lock();
        let item = Item {
            id: (items.len() + 1).to_string(),
            name: new.name.clone(),
            description: new.description.clone(),
            price: new.price,
            image_url: new.image_url.clone(),
            created_at,
        };
        items.push(item.clone());
        item
    }

    pub fn merge(&self, id: &str, patch: &ItemPatch) -> Option<Item> {
        let mut items = self.lock();
        let item = items.iter_mut().find(|item| item.id == id)?;
        patch.apply_to(item);
        Some(item.clone())
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut items = self.lock();
        let before = items.len();
        items.retain(|item| item.id != id);
        items.len() < before
    }
}
