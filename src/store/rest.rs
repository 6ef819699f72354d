use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use tracing::debug;

use super::{StoreError, TableStore};

/// Client for a PostgREST-style hosted table API. Filters are query
/// parameters (`id=eq.<v>`), writes ask for the stored representation back.
#[derive(Clone)]
pub struct RestTableStore {
    client: reqwest::Client,
    base_url: String,
}

impl RestTableStore {
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)?;
        key.set_sensitive(true);
        headers.insert("apikey", key);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    async fn decode_rows(resp: reqwest::Response) -> Result<Vec<Value>, StoreError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(StoreError::Store {
                status: status.as_u16(),
                body,
            });
        }
        if body.is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&body).map_err(StoreError::Decode)? {
            Value::Array(rows) => Ok(rows),
            row => Ok(vec![row]),
        }
    }
}

#[async_trait]
impl TableStore for RestTableStore {
    async fn select_all(&self, table: &str, order: &str) -> Result<Vec<Value>, StoreError> {
        let resp = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*"), ("order", order)])
            .send()
            .await?;
        let rows = Self::decode_rows(resp).await?;
        debug!(table, rows = rows.len(), "select_all");
        Ok(rows)
    }

    async fn select_by_id(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let filter = format!("eq.{}", id);
        let resp = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*"), ("id", filter.as_str())])
            .send()
            .await?;
        let rows = Self::decode_rows(resp).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let resp = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let mut rows = Self::decode_rows(resp).await?;
        rows.pop().ok_or_else(|| StoreError::Store {
            status: 200,
            body: "insert returned no representation".into(),
        })
    }

    async fn update_by_id(
        &self,
        table: &str,
        id: &str,
        patch: Value,
    ) -> Result<Option<Value>, StoreError> {
        let filter = format!("eq.{}", id);
        let resp = self
            .client
            .patch(self.table_url(table))
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        let rows = Self::decode_rows(resp).await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> Result<bool, StoreError> {
        let filter = format!("eq.{}", id);
        let resp = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let rows = Self::decode_rows(resp).await?;
        Ok(!rows.is_empty())
    }
}
