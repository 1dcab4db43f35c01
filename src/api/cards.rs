use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{caller::Caller, AppState};
use crate::error::{AppError, Result};
use crate::models::card::CardRecord;
use crate::models::entry_log::EntryLog;
use crate::services::{card_service, qr_generator, token};

#[derive(Debug, Deserialize)]
pub struct CreateCardRequest {
    pub holder_name: String,
    pub holder_email: String,
    pub admission_number: String,
}

#[derive(Debug, Serialize)]
pub struct CardDetailResponse {
    #[serde(flatten)]
    pub card: CardRecord,
    pub entry_count: i64,
}

async fn create_card(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<CardRecord>)> {
    if !caller.is_admin() {
        return Err(AppError::Forbidden);
    }

    let holder_name = request.holder_name.trim().to_string();
    let holder_email = request.holder_email.trim().to_string();
    let admission_number = request.admission_number.trim().to_string();

    if holder_name.is_empty() || admission_number.is_empty() {
        return Err(AppError::Validation(
            "holder_name and admission_number are required".to_string(),
        ));
    }
    if !holder_email.contains('@') {
        return Err(AppError::Validation(
            "holder_email is not a valid email address".to_string(),
        ));
    }

    let card = card_service::create_card(
        &state.pool,
        card_service::CreateCardRequest {
            holder_name,
            holder_email,
            admission_number,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(card)))
}

async fn get_card_by_admission(
    State(state): State<AppState>,
    caller: Caller,
    Path(admission_number): Path<String>,
) -> Result<Json<CardRecord>> {
    if !caller.is_staff() {
        return Err(AppError::Forbidden);
    }

    let card = CardRecord::find_by_admission_number(&state.pool, &admission_number)
        .await?
        .ok_or_else(|| AppError::NotFound("Card not found".to_string()))?;

    Ok(Json(card))
}

async fn get_card(
    State(state): State<AppState>,
    caller: Caller,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardDetailResponse>> {
    if !caller.can_view(card_id) {
        return Err(AppError::Forbidden);
    }

    let card = CardRecord::find_by_id(&state.pool, card_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Card not found".to_string()))?;

    let entry_count = EntryLog::count_for_card(&state.pool, card.id).await?;

    Ok(Json(CardDetailResponse { card, entry_count }))
}

/// Encodes the card's current token into the signed QR payload string.
fn qr_payload(state: &AppState, card: &CardRecord) -> Result<String> {
    token::encode(
        card.id,
        card.token,
        state.config.signing_key.expose_secret().as_bytes(),
    )
    .map_err(|e| AppError::Internal(anyhow::Error::from(e)))
}

async fn card_qr_svg(
    State(state): State<AppState>,
    caller: Caller,
    Path(card_id): Path<Uuid>,
) -> Result<Response> {
    if !caller.can_view(card_id) {
        return Err(AppError::Forbidden);
    }

    let card = CardRecord::find_by_id(&state.pool, card_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Card not found".to_string()))?;

    let payload = qr_payload(&state, &card)?;
    let svg = qr_generator::generate_qr_svg(&payload)
        .map_err(|e| AppError::Internal(anyhow::Error::from(e)))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/svg+xml")],
        svg,
    )
        .into_response())
}

async fn card_qr_png(
    State(state): State<AppState>,
    caller: Caller,
    Path(card_id): Path<Uuid>,
) -> Result<Response> {
    if !caller.can_view(card_id) {
        return Err(AppError::Forbidden);
    }

    let card = CardRecord::find_by_id(&state.pool, card_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Card not found".to_string()))?;

    let payload = qr_payload(&state, &card)?;
    let png = qr_generator::generate_qr_png(&payload)
        .map_err(|e| AppError::Internal(anyhow::Error::from(e)))?;

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], png).into_response())
}

async fn report_lost(
    State(state): State<AppState>,
    caller: Caller,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardRecord>> {
    if !caller.can_manage(card_id) {
        return Err(AppError::Forbidden);
    }

    let card = card_service::report_lost(&state.pool, &state.notifier, card_id).await?;
    Ok(Json(card))
}

async fn deactivate(
    State(state): State<AppState>,
    caller: Caller,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardRecord>> {
    if !caller.is_admin() {
        return Err(AppError::Forbidden);
    }

    let card = card_service::deactivate(&state.pool, card_id).await?;
    Ok(Json(card))
}

async fn recover(
    State(state): State<AppState>,
    caller: Caller,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardRecord>> {
    if !caller.is_admin() {
        return Err(AppError::Forbidden);
    }

    let card = card_service::recover(&state.pool, card_id).await?;
    Ok(Json(card))
}

async fn expire(
    State(state): State<AppState>,
    caller: Caller,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardRecord>> {
    if !caller.is_admin() {
        return Err(AppError::Forbidden);
    }

    let card = card_service::expire(&state.pool, &state.notifier, card_id).await?;
    Ok(Json(card))
}

async fn reissue(
    State(state): State<AppState>,
    caller: Caller,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardRecord>> {
    if !caller.can_manage(card_id) {
        return Err(AppError::Forbidden);
    }

    let card = card_service::reissue(&state.pool, &state.notifier, card_id).await?;
    Ok(Json(card))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cards", post(create_card))
        .route("/cards/by-admission/:admission_number", get(get_card_by_admission))
        .route("/cards/:id", get(get_card))
        .route("/cards/:id/qr", get(card_qr_svg))
        .route("/cards/:id/qr.png", get(card_qr_png))
        .route("/cards/:id/report-lost", post(report_lost))
        .route("/cards/:id/deactivate", post(deactivate))
        .route("/cards/:id/recover", post(recover))
        .route("/cards/:id/expire", post(expire))
        .route("/cards/:id/reissue", post(reissue))
}
