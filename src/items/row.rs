use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Catalog item as the rest of the application sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: String,
    pub created_at: OffsetDateTime,
}

/// Caller-supplied fields for a create. `id` and `created_at` are assigned
/// by the store and the repository, never by the caller.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: String,
}

/// Partial update; only present fields are touched.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
    }

    /// Merge into an existing item, leaving absent fields alone.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(image_url) = &self.image_url {
            item.image_url = image_url.clone();
        }
    }
}

/// Column the store orders lists by.
pub const CREATED_AT_COLUMN: &str = "createdAt";

/// Wire shape of an item row in the remote table.
///
/// The remote schema does not match the application shape: the description
/// column is misspelled `descripition`, and the image/creation-time columns
/// exist in two casing variants out there. Reads accept every observed
/// variant (plus the correctly-spelled `description`); writes always use the
/// canonical names so stored rows stay uniform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRow {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(rename = "descripition", alias = "description")]
    pub description: String,
    pub price: f64,
    #[serde(rename = "imageUrl", alias = "imageurl", default)]
    pub image_url: String,
    #[serde(
        rename = "createdAt",
        alias = "createdat",
        with = "time::serde::rfc3339"
    )]
    pub created_at: OffsetDateTime,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            image_url: row.image_url,
            created_at: row.created_at,
        }
    }
}

/// Row payload for an insert: no id (the store assigns one).
pub fn insert_row(new: &NewItem, created_at: OffsetDateTime) -> anyhow::Result<Value> {
    let row = ItemRow {
        id: String::new(),
        name: new.name.clone(),
        description: new.description.clone(),
        price: new.price,
        image_url: new.image_url.clone(),
        created_at,
    };
    Ok(serde_json::to_value(row)?)
}

/// Patch payload with only the supplied columns, under their canonical names.
pub fn patch_row(patch: &ItemPatch) -> Value {
    let mut row = serde_json::Map::new();
    if let Some(name) = &patch.name {
        row.insert("name".into(), Value::String(name.clone()));
    }
    if let Some(description) = &patch.description {
        row.insert("descripition".into(), Value::String(description.clone()));
    }
    if let Some(price) = patch.price {
        row.insert("price".into(), serde_json::json!(price));
    }
    if let Some(image_url) = &patch.image_url {
        row.insert("imageUrl".into(), Value::String(image_url.clone()));
    }
    Value::Object(row)
}

pub fn row_to_item(row: Value) -> anyhow::Result<Item> {
    let row: ItemRow = serde_json::from_value(row)?;
    Ok(row.into())
}
