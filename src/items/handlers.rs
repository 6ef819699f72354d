use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, patch, post},
    Json, Router,
};
use tracing::instrument;

use crate::{auth::services::AuthUser, state::AppState};

use super::dto::{CreateItemRequest, ItemResponse, UpdateItemRequest};
use super::row::{ItemPatch, NewItem};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items))
        .route("/items/:id", get(get_item))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/items", post(create_item))
        .route("/items/:id", patch(update_item))
        .route("/items/:id", delete(delete_item))
}

#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> Result<Json<Vec<ItemResponse>>, (StatusCode, String)> {
    let items = state.items.list().await.map_err(internal)?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_item(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, (StatusCode, String)> {
    match state.items.get(&id).await.map_err(internal)? {
        Some(item) => Ok(Json(item.into())),
        None => Err((StatusCode::NOT_FOUND, "Item not found".into())),
    }
}

#[instrument(skip(state, payload))]
pub async fn create_item(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(payload): Json<CreateItemRequest>,
) -> Result<(StatusCode, HeaderMap, Json<ItemResponse>), (StatusCode, String)> {
    if payload.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "name must not be empty".into()));
    }
    if !payload.price.is_finite() || payload.price < 0.0 {
        return Err((StatusCode::BAD_REQUEST, "price must be non-negative".into()));
    }

    let new: NewItem = payload.into();
    let item = state.items.create(new).await.map_err(internal)?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/items/{}", item.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, headers, Json(item.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, (StatusCode, String)> {
    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return Err((StatusCode::BAD_REQUEST, "name must not be empty".into()));
        }
    }
    if let Some(price) = payload.price {
        if !price.is_finite() || price < 0.0 {
            return Err((StatusCode::BAD_REQUEST, "price must be non-negative".into()));
        }
    }

    let patch: ItemPatch = payload.into();
    // An empty patch has nothing to write (and the store rejects an empty
    // PATCH body); answer with the current record instead.
    let result = if patch.is_empty() {
        state.items.get(&id).await
    } else {
        state.items.update(&id, patch).await
    };
    match result.map_err(internal)? {
        Some(item) => Ok(Json(item.into())),
        None => Err((StatusCode::NOT_FOUND, "Item not found".into())),
    }
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.items.delete(&id).await.map_err(internal)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Item not found".into()))
    }
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
