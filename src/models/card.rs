use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "card_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Lost,
    Deactivated,
    Expired,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "active",
            CardStatus::Lost => "lost",
            CardStatus::Deactivated => "deactivated",
            CardStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CardRecord {
    pub id: Uuid,
    pub holder_name: String,
    pub holder_email: String,
    pub admission_number: String,
    pub status: CardStatus,
    /// Current identity token embedded in the holder's QR code.
    /// Replaced (and `token_version` bumped) on every reissue.
    pub token: Uuid,
    pub token_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCard {
    pub holder_name: String,
    pub holder_email: String,
    pub admission_number: String,
    pub token: Uuid,
}

impl CardRecord {
    /// Inserts a new card with `status = active` and `token_version = 1`.
    ///
    /// The unique constraint on `admission_number` is enforced by the
    /// database; callers translate the unique violation into a
    /// duplicate-admission-number error.
    pub async fn create(pool: &PgPool, data: NewCard) -> Result<Self, sqlx::Error> {
        let card = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO cards (holder_name, holder_email, admission_number, token)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&data.holder_name)
        .bind(&data.holder_email)
        .bind(&data.admission_number)
        .bind(data.token)
        .fetch_one(pool)
        .await?;

        Ok(card)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let card = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM cards WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(card)
    }

    pub async fn find_by_admission_number(
        pool: &PgPool,
        admission_number: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let card = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM cards WHERE admission_number = $1
            "#,
        )
        .bind(admission_number)
        .fetch_optional(pool)
        .await?;

        Ok(card)
    }

    /// Loads a card inside a transaction, taking the row lock.
    ///
    /// Lifecycle mutations and scan verification on the same card must
    /// serialize; both go through this lock so a status read can never
    /// interleave with a concurrent transition or token rotation.
    pub async fn fetch_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let card = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM cards WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(card)
    }

    /// Moves the card to a new status. Caller validates the transition.
    pub async fn set_status(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: CardStatus,
    ) -> Result<Self, sqlx::Error> {
        let card = sqlx::query_as::<_, Self>(
            r#"
            UPDATE cards
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(&mut **tx)
        .await?;

        Ok(card)
    }

    /// Replaces the identity token, bumps `token_version` and forces the
    /// card back to `active`. The superseded token never verifies again.
    pub async fn rotate_token(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        token: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let card = sqlx::query_as::<_, Self>(
            r#"
            UPDATE cards
            SET token = $2, token_version = token_version + 1, status = 'active', updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(token)
        .fetch_one(&mut **tx)
        .await?;

        Ok(card)
    }
}
