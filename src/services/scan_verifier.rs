use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::card::{CardRecord, CardStatus};
use crate::models::entry_log::EntryLog;
use crate::models::lost_scan::LostCardScan;
use crate::services::token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Malformed,
    UnknownCard,
    Lost,
    Expired,
    Deactivated,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Malformed => "malformed",
            RejectReason::UnknownCard => "unknown_card",
            RejectReason::Lost => "lost",
            RejectReason::Expired => "expired",
            RejectReason::Deactivated => "deactivated",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ScanOutcome {
    Accepted {
        card: CardRecord,
        entry: EntryLog,
    },
    Rejected {
        reason: RejectReason,
        card: Option<CardRecord>,
    },
}

impl ScanOutcome {
    /// Returns the outcome as a string for logging
    pub fn result_type(&self) -> &'static str {
        match self {
            ScanOutcome::Accepted { .. } => "accept",
            ScanOutcome::Rejected { reason, .. } => reason.as_str(),
        }
    }
}

/// What the verifier decided for a card that exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    RejectLost,
    RejectExpired,
    RejectDeactivated,
    RejectStaleToken,
}

/// The audit row a verdict requires, written in the same transaction as
/// the status read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    RecordEntry,
    RecordLostScan,
    Nothing,
}

impl Verdict {
    pub fn audit_action(&self) -> AuditAction {
        match self {
            Verdict::Accept => AuditAction::RecordEntry,
            Verdict::RejectLost => AuditAction::RecordLostScan,
            Verdict::RejectExpired | Verdict::RejectDeactivated | Verdict::RejectStaleToken => {
                AuditAction::Nothing
            }
        }
    }
}

/// The scan decision table. Token identity is checked before status: a
/// superseded token must never grant access, whatever state the card is
/// in, and must not leak that the card exists.
pub fn decide(card: &CardRecord, presented_token: Uuid) -> Verdict {
    if presented_token != card.token {
        return Verdict::RejectStaleToken;
    }
    match card.status {
        CardStatus::Lost => Verdict::RejectLost,
        CardStatus::Expired => Verdict::RejectExpired,
        CardStatus::Deactivated => Verdict::RejectDeactivated,
        CardStatus::Active => Verdict::Accept,
    }
}

/// Verifies a scanned QR payload at an access point.
///
/// 1. Decode and authenticate the payload; failure rejects without
///    touching the database.
/// 2. Look up the card under its row lock.
/// 3. Apply [`decide`] and write the required audit row in the same
///    transaction.
///
/// Every rejection here is an ordinary outcome; `Err` is reserved for
/// storage faults.
#[tracing::instrument(skip(pool, signing_key, raw_payload))]
pub async fn verify(
    pool: &PgPool,
    signing_key: &[u8],
    raw_payload: &str,
    location: &str,
    scanned_at: DateTime<Utc>,
) -> Result<ScanOutcome, sqlx::Error> {
    let payload = match token::decode(raw_payload, signing_key) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting scan with undecodable payload");
            return Ok(ScanOutcome::Rejected {
                reason: RejectReason::Malformed,
                card: None,
            });
        }
    };

    let mut tx = pool.begin().await?;

    let Some(card) = CardRecord::fetch_for_update(&mut tx, payload.card_id).await? else {
        tracing::warn!(card_id = %payload.card_id, "scan for unknown card");
        return Ok(ScanOutcome::Rejected {
            reason: RejectReason::UnknownCard,
            card: None,
        });
    };

    let outcome = match decide(&card, payload.token) {
        Verdict::Accept => {
            let entry = EntryLog::record(&mut tx, card.id, location, true, scanned_at).await?;
            tx.commit().await?;
            tracing::info!(card_id = %card.id, %location, "access granted");
            ScanOutcome::Accepted { card, entry }
        }
        Verdict::RejectLost => {
            LostCardScan::record(&mut tx, card.id, location, scanned_at).await?;
            tx.commit().await?;
            tracing::warn!(card_id = %card.id, %location, "lost card presented");
            ScanOutcome::Rejected {
                reason: RejectReason::Lost,
                card: Some(card),
            }
        }
        Verdict::RejectExpired => {
            tracing::info!(card_id = %card.id, "expired card presented");
            ScanOutcome::Rejected {
                reason: RejectReason::Expired,
                card: Some(card),
            }
        }
        Verdict::RejectDeactivated => {
            tracing::info!(card_id = %card.id, "deactivated card presented");
            ScanOutcome::Rejected {
                reason: RejectReason::Deactivated,
                card: Some(card),
            }
        }
        Verdict::RejectStaleToken => {
            tracing::warn!(
                card_id = %card.id,
                token_version = card.token_version,
                "scan with superseded token"
            );
            ScanOutcome::Rejected {
                reason: RejectReason::UnknownCard,
                card: None,
            }
        }
    };

    Ok(outcome)
}
