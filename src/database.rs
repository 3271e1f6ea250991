use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Instant;
use uuid::Uuid;

use crate::log_db_operation;
use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

/// Fixed-width UTC timestamps so that `ORDER BY created_at` is chronological.
fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid stored timestamp '{}'", raw))?
        .with_timezone(&Utc))
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let db = Database { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS flashcards (
                id TEXT PRIMARY KEY,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'General',
                difficulty TEXT NOT NULL DEFAULT 'Medium'
                    CHECK (difficulty IN ('Easy', 'Medium', 'Hard')),
                created_at TEXT NOT NULL,
                last_reviewed TEXT NOT NULL,
                review_count INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_flashcards_category ON flashcards(category)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_flashcards_created_at ON flashcards(created_at)")
            .execute(&self.pool)
            .await?;

        log_db_operation!(info, "migrate", "flashcards schema ready");
        Ok(())
    }

    pub async fn create_flashcard(&self, fields: FlashcardFields) -> Result<Flashcard> {
        let now = Utc::now().trunc_subsecs(6);
        let card = Flashcard {
            id: Uuid::new_v4(),
            question: fields.question,
            answer: fields.answer,
            category: fields.category,
            difficulty: fields.difficulty,
            created_at: now,
            last_reviewed: now,
            review_count: 0,
        };

        sqlx::query(
            r#"
            INSERT INTO flashcards (id, question, answer, category, difficulty,
                                    created_at, last_reviewed, review_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(card.id.to_string())
        .bind(&card.question)
        .bind(&card.answer)
        .bind(&card.category)
        .bind(card.difficulty.as_str())
        .bind(encode_timestamp(card.created_at))
        .bind(encode_timestamp(card.last_reviewed))
        .bind(card.review_count)
        .execute(&self.pool)
        .await?;

        self.get_flashcard(card.id)
            .await?
            .context("flashcard vanished immediately after insert")
    }

    pub async fn get_flashcard(&self, id: Uuid) -> Result<Option<Flashcard>> {
        let row = sqlx::query("SELECT * FROM flashcards WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_flashcard(&row)).transpose()
    }

    pub async fn get_all_flashcards(&self) -> Result<Vec<Flashcard>> {
        let started = Instant::now();
        let rows = sqlx::query("SELECT * FROM flashcards ORDER BY created_at DESC, rowid DESC")
            .fetch_all(&self.pool)
            .await?;

        log_db_operation!(
            debug,
            "select_all_flashcards",
            count = rows.len(),
            duration_ms = started.elapsed().as_millis() as u64
        );
        rows_to_flashcards(rows)
    }

    pub async fn get_flashcards_by_category(&self, category: &str) -> Result<Vec<Flashcard>> {
        let rows = sqlx::query(
            "SELECT * FROM flashcards WHERE category = ?1 ORDER BY created_at DESC, rowid DESC",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        rows_to_flashcards(rows)
    }

    /// Overwrites the editable fields only; an unset category or difficulty
    /// keeps the stored value. Returns `None` when no row has `id`.
    pub async fn update_flashcard(
        &self,
        id: Uuid,
        changes: FlashcardChanges,
    ) -> Result<Option<Flashcard>> {
        let row = sqlx::query(
            r#"
            UPDATE flashcards
            SET question = ?1,
                answer = ?2,
                category = COALESCE(?3, category),
                difficulty = COALESCE(?4, difficulty)
            WHERE id = ?5
            RETURNING *
            "#,
        )
        .bind(&changes.question)
        .bind(&changes.answer)
        .bind(changes.category.as_deref())
        .bind(changes.difficulty.map(|d| d.as_str()))
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .next();

        row.map(|row| row_to_flashcard(&row)).transpose()
    }

    pub async fn delete_flashcard(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM flashcards WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bumps `review_count` and moves `last_reviewed` forward. The write is
    /// conditional on the timestamp read just before it and is retried when
    /// another increment of the same row lands in between.
    pub async fn increment_review(&self, id: Uuid) -> Result<Option<Flashcard>> {
        let mut attempts = 0u32;
        loop {
            let row = sqlx::query("SELECT last_reviewed FROM flashcards WHERE id = ?1")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

            let Some(row) = row else {
                return Ok(None);
            };

            let stored: String = row.get("last_reviewed");
            let reviewed_at = next_review_timestamp(decode_timestamp(&stored)?, Utc::now());

            let updated = sqlx::query(
                r#"
                UPDATE flashcards
                SET review_count = review_count + 1, last_reviewed = ?1
                WHERE id = ?2 AND last_reviewed = ?3
                RETURNING *
                "#,
            )
            .bind(encode_timestamp(reviewed_at))
            .bind(id.to_string())
            .bind(&stored)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .next();

            if let Some(row) = updated {
                if attempts > 0 {
                    log_db_operation!(debug, "increment_review", flashcard_id = id, retries = attempts);
                }
                return row_to_flashcard(&row).map(Some);
            }
            attempts += 1;
        }
    }

    pub async fn get_distinct_categories(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT category FROM flashcards ORDER BY category")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get::<String, _>("category")).collect())
    }
}

/// Strictly after `previous`, even when the clock has not moved past the
/// stored microsecond resolution.
fn next_review_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(6);
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

fn row_to_flashcard(row: &SqliteRow) -> Result<Flashcard> {
    let difficulty: String = row.get("difficulty");
    Ok(Flashcard {
        id: Uuid::parse_str(&row.get::<String, _>("id"))?,
        question: row.get("question"),
        answer: row.get("answer"),
        category: row.get("category"),
        difficulty: difficulty.parse()?,
        created_at: decode_timestamp(&row.get::<String, _>("created_at"))?,
        last_reviewed: decode_timestamp(&row.get::<String, _>("last_reviewed"))?,
        review_count: row.get("review_count"),
    })
}

fn rows_to_flashcards(rows: Vec<SqliteRow>) -> Result<Vec<Flashcard>> {
    rows.iter().map(row_to_flashcard).collect()
}
