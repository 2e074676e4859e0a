use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::warn;

use super::{request_locale, AppState};
use crate::logentry;

/// Payment events recorded on the order, rendered for display
pub async fn order_log(
    State(state): State<AppState>,
    Path((code, secret)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, StatusCode> {
    match state.store.find_by_code(&code).await {
        Ok(Some(order)) if order.secret == secret => {}
        Ok(_) => return Err(StatusCode::NOT_FOUND),
        Err(e) => {
            warn!("Order lookup failed for {}: {}", code, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    let locale = request_locale(&headers);
    let entries = state.store.log_entries(&code).await.map_err(|e| {
        warn!("Could not read log of order {}: {}", code, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(
        entries
            .iter()
            .filter_map(|entry| logentry::display(entry, locale))
            .collect(),
    ))
}
