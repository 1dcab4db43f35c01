use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{caller::Caller, AppState};
use crate::error::{AppError, Result};
use crate::models::card::CardRecord;
use crate::models::entry_log::EntryLog;
use crate::models::lost_scan::LostCardScan;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    /// Keyset cursor: return rows with `seq` strictly below this value.
    pub before: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationParams {
    fn page_size(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

async fn require_card(state: &AppState, card_id: Uuid) -> Result<CardRecord> {
    CardRecord::find_by_id(&state.pool, card_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Card not found".to_string()))
}

async fn card_entries(
    State(state): State<AppState>,
    caller: Caller,
    Path(card_id): Path<Uuid>,
) -> Result<Json<Vec<EntryLog>>> {
    if !caller.can_view(card_id) {
        return Err(AppError::Forbidden);
    }

    let card = require_card(&state, card_id).await?;
    let entries = EntryLog::list_for_card(&state.pool, card.id).await?;
    Ok(Json(entries))
}

async fn card_lost_scans(
    State(state): State<AppState>,
    caller: Caller,
    Path(card_id): Path<Uuid>,
) -> Result<Json<Vec<LostCardScan>>> {
    if !caller.can_view(card_id) {
        return Err(AppError::Forbidden);
    }

    let card = require_card(&state, card_id).await?;
    let scans = LostCardScan::list_for_card(&state.pool, card.id).await?;
    Ok(Json(scans))
}

async fn recent_entries(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<EntryLog>>> {
    if !caller.is_staff() {
        return Err(AppError::Forbidden);
    }

    let entries = EntryLog::list_recent(&state.pool, params.before, params.page_size()).await?;
    Ok(Json(entries))
}

async fn recent_lost_scans(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<LostCardScan>>> {
    if !caller.is_staff() {
        return Err(AppError::Forbidden);
    }

    let scans = LostCardScan::list_recent(&state.pool, params.before, params.page_size()).await?;
    Ok(Json(scans))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cards/:id/entries", get(card_entries))
        .route("/cards/:id/lost-scans", get(card_lost_scans))
        .route("/entries", get(recent_entries))
        .route("/lost-scans", get(recent_lost_scans))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_clamped() {
        let params = PaginationParams {
            before: None,
            limit: None,
        };
        assert_eq!(params.page_size(), DEFAULT_PAGE_SIZE);

        let params = PaginationParams {
            before: None,
            limit: Some(10_000),
        };
        assert_eq!(params.page_size(), MAX_PAGE_SIZE);

        let params = PaginationParams {
            before: None,
            limit: Some(0),
        };
        assert_eq!(params.page_size(), 1);
    }
}
