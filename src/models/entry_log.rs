use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// One granted entry at a gate. Append-only: rows are never updated or
/// deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EntryLog {
    pub id: Uuid,
    pub seq: i64,
    pub card_id: Uuid,
    pub location: String,
    pub successful: bool,
    pub entered_at: DateTime<Utc>,
}

impl EntryLog {
    /// Appends an entry record inside the verification transaction so the
    /// logged status can never be stale relative to the card row.
    pub async fn record(
        tx: &mut Transaction<'_, Postgres>,
        card_id: Uuid,
        location: &str,
        successful: bool,
        entered_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let entry = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO entry_logs (card_id, location, successful, entered_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(card_id)
        .bind(location)
        .bind(successful)
        .bind(entered_at)
        .fetch_one(&mut **tx)
        .await?;

        Ok(entry)
    }

    /// Entries for one card, newest first, ties broken by insertion order.
    pub async fn list_for_card(pool: &PgPool, card_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let entries = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM entry_logs
            WHERE card_id = $1
            ORDER BY entered_at DESC, seq DESC
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await?;

        Ok(entries)
    }

    /// Recent entries across all cards with a keyset cursor on `seq`.
    pub async fn list_recent(
        pool: &PgPool,
        before_seq: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let entries = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM entry_logs
            WHERE ($1::BIGINT IS NULL OR seq < $1)
            ORDER BY entered_at DESC, seq DESC
            LIMIT $2
            "#,
        )
        .bind(before_seq)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(entries)
    }

    pub async fn count_for_card(pool: &PgPool, card_id: Uuid) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM entry_logs WHERE card_id = $1
            "#,
        )
        .bind(card_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}
