use sqlx::PgPool;
use uuid::Uuid;

use crate::models::card::{CardRecord, NewCard};
use crate::services::lifecycle::{self, LifecycleOp, Transition, TransitionError};
use crate::services::notifier::Notifier;
use crate::services::token;

#[derive(thiserror::Error, Debug)]
pub enum CardServiceError {
    #[error("a card already exists for admission number {0}")]
    DuplicateAdmissionNumber(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("card not found")]
    CardNotFound,

    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct CreateCardRequest {
    pub holder_name: String,
    pub holder_email: String,
    pub admission_number: String,
}

/// Creates a card with a freshly minted identity token.
#[tracing::instrument(skip(pool, request), fields(admission_number = %request.admission_number))]
pub async fn create_card(
    pool: &PgPool,
    request: CreateCardRequest,
) -> Result<CardRecord, CardServiceError> {
    let admission_number = request.admission_number.clone();

    match CardRecord::create(
        pool,
        NewCard {
            holder_name: request.holder_name,
            holder_email: request.holder_email,
            admission_number: request.admission_number,
            token: token::mint(),
        },
    )
    .await
    {
        Ok(card) => {
            tracing::info!(card_id = %card.id, "card created");
            Ok(card)
        }
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            Err(CardServiceError::DuplicateAdmissionNumber(admission_number))
        }
        Err(e) => Err(e.into()),
    }
}

/// Runs one lifecycle operation as an atomic read-modify-write on the
/// card row. An illegal transition rolls back with the card untouched.
async fn transition(
    pool: &PgPool,
    card_id: Uuid,
    op: LifecycleOp,
) -> Result<CardRecord, CardServiceError> {
    let mut tx = pool.begin().await?;

    let card = CardRecord::fetch_for_update(&mut tx, card_id)
        .await?
        .ok_or(CardServiceError::CardNotFound)?;

    let card = match lifecycle::apply(card.status, op)? {
        Transition::Unchanged => card,
        Transition::To(_) if op == LifecycleOp::Reissue => {
            CardRecord::rotate_token(&mut tx, card.id, token::mint()).await?
        }
        Transition::To(next) => CardRecord::set_status(&mut tx, card.id, next).await?,
    };

    tx.commit().await?;
    Ok(card)
}

#[tracing::instrument(skip(pool, notifier))]
pub async fn report_lost(
    pool: &PgPool,
    notifier: &Notifier,
    card_id: Uuid,
) -> Result<CardRecord, CardServiceError> {
    let card = transition(pool, card_id, LifecycleOp::ReportLost).await?;
    tracing::info!(card_id = %card.id, "card reported lost");

    send_or_log(
        notifier,
        &card,
        "ID Card Reported Lost",
        "Your ID card has been reported as lost. If this was not done by you, \
         please contact the security office immediately.",
    )
    .await;

    Ok(card)
}

#[tracing::instrument(skip(pool))]
pub async fn deactivate(pool: &PgPool, card_id: Uuid) -> Result<CardRecord, CardServiceError> {
    let card = transition(pool, card_id, LifecycleOp::Deactivate).await?;
    tracing::info!(card_id = %card.id, "card deactivated");
    Ok(card)
}

/// Restores a lost or deactivated card to `active`. The existing token
/// stays valid: recovery unlocks the same physical card, it does not
/// replace it.
#[tracing::instrument(skip(pool))]
pub async fn recover(pool: &PgPool, card_id: Uuid) -> Result<CardRecord, CardServiceError> {
    let card = transition(pool, card_id, LifecycleOp::Recover).await?;
    tracing::info!(card_id = %card.id, token_version = card.token_version, "card recovered");
    Ok(card)
}

#[tracing::instrument(skip(pool, notifier))]
pub async fn expire(
    pool: &PgPool,
    notifier: &Notifier,
    card_id: Uuid,
) -> Result<CardRecord, CardServiceError> {
    let card = transition(pool, card_id, LifecycleOp::Expire).await?;
    tracing::info!(card_id = %card.id, "card expired");

    send_or_log(
        notifier,
        &card,
        "ID Card Expired",
        "Your ID card has been marked as expired. Please contact the \
         administration to renew your ID card.",
    )
    .await;

    Ok(card)
}

/// Replaces the physical card: mints a new token, bumps `token_version`
/// and forces the card back to `active`. The previous QR code stops
/// verifying the moment this commits.
#[tracing::instrument(skip(pool, notifier))]
pub async fn reissue(
    pool: &PgPool,
    notifier: &Notifier,
    card_id: Uuid,
) -> Result<CardRecord, CardServiceError> {
    let card = transition(pool, card_id, LifecycleOp::Reissue).await?;
    tracing::info!(card_id = %card.id, token_version = card.token_version, "card reissued");

    send_or_log(
        notifier,
        &card,
        "New ID Card Generated",
        "A new ID card has been generated for you. Please visit the \
         security office to collect it.",
    )
    .await;

    Ok(card)
}

/// Notification delivery is best-effort; failures are logged and never
/// affect the lifecycle operation's outcome.
async fn send_or_log(notifier: &Notifier, card: &CardRecord, subject: &str, body: &str) {
    if let Err(e) = notifier.notify(&card.holder_email, subject, body).await {
        tracing::warn!(card_id = %card.id, error = %e, "notification delivery failed");
    }
}
