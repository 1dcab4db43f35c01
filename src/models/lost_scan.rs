use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// A presentation of a card that was flagged lost. Each scan appends one
/// row; repeated presentations are deliberately not deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LostCardScan {
    pub id: Uuid,
    pub seq: i64,
    pub card_id: Uuid,
    pub location: String,
    pub scanned_at: DateTime<Utc>,
}

impl LostCardScan {
    pub async fn record(
        tx: &mut Transaction<'_, Postgres>,
        card_id: Uuid,
        location: &str,
        scanned_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let scan = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO lost_card_scans (card_id, location, scanned_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(card_id)
        .bind(location)
        .bind(scanned_at)
        .fetch_one(&mut **tx)
        .await?;

        Ok(scan)
    }

    pub async fn list_for_card(pool: &PgPool, card_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let scans = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM lost_card_scans
            WHERE card_id = $1
            ORDER BY scanned_at DESC, seq DESC
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await?;

        Ok(scans)
    }

    pub async fn list_recent(
        pool: &PgPool,
        before_seq: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let scans = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM lost_card_scans
            WHERE ($1::BIGINT IS NULL OR seq < $1)
            ORDER BY scanned_at DESC, seq DESC
            LIMIT $2
            "#,
        )
        .bind(before_seq)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(scans)
    }
}
