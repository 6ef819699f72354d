mod dto;
pub mod fallback;
pub mod handlers;
pub mod repo;
pub mod row;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
