pub mod check;
mod dto;
pub mod handlers;
pub mod identity;
pub mod qr;
pub mod repo_types;
pub mod scan;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::ticket_routes())
        .merge(handlers::scan_routes())
}
