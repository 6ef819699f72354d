use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::row::{Item, ItemPatch, NewItem};

/// Item as the frontend consumes it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            price: item.price,
            image_url: item.image_url,
            created_at: item.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub image_url: String,
}

impl From<CreateItemRequest> for NewItem {
    fn from(req: CreateItemRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            price: req.price,
            image_url: req.image_url,
        }
    }
}

/// Absent fields are left untouched; `id` and `createdAt` are not accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
}

impl From<UpdateItemRequest> for ItemPatch {
    fn from(req: UpdateItemRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            price: req.price,
            image_url: req.image_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn item_response_uses_camel_case() {
        let response = ItemResponse {
            id: "1".into(),
            name: "Lamp".into(),
            description: "desc".into(),
            price: 129.99,
            image_url: "https://example.com/lamp.jpg".into(),
            created_at: datetime!(2023-07-22 0:00 UTC),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["imageUrl"], "https://example.com/lamp.jpg");
        assert_eq!(json["createdAt"], "2023-07-22T00:00:00Z");
        assert!(json.get("image_url").is_none());
    }

    #[test]
    fn update_request_defaults_to_empty_patch() {
        let req: UpdateItemRequest = serde_json::from_str("{}").unwrap();
        let patch: ItemPatch = req.into();
        assert!(patch.is_empty());
    }
}
