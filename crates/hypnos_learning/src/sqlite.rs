//! SQLite reference implementation of the [`Storage`] contract.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hypnos_core::{ExampleRecord, FeedbackRecord};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;

use crate::store::{CourseRecord, NewFeedback, Storage};

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON").execute(conn).await?;
                    Ok(())
                })
            })
            .connect(&db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prompt TEXT NOT NULL,
                response TEXT NOT NULL,
                implicit_score REAL NOT NULL,
                emotional_score REAL NOT NULL,
                combined_score REAL NOT NULL,
                context TEXT,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create feedback table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS important_examples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prompt TEXT NOT NULL,
                response TEXT NOT NULL,
                score REAL NOT NULL,
                context TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create important_examples table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_important_examples_score \
             ON important_examples(score DESC)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create important_examples score index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS courses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'not_started',
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create courses table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS course_examples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course_id INTEGER NOT NULL,
                prompt TEXT NOT NULL,
                response TEXT NOT NULL,
                score REAL NOT NULL,
                context TEXT NOT NULL DEFAULT '',
                FOREIGN KEY(course_id) REFERENCES courses(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create course_examples table")?;

        Ok(())
    }

    // Course ingestion belongs to the surrounding system; these inherent
    // helpers exist so deployments and tests can seed the tables without
    // widening the Storage contract.

    pub async fn insert_course(&self, name: &str, status: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO courses (name, status, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(status)
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .context("Failed to insert course")?;
        Ok(result.last_insert_rowid())
    }

    pub async fn insert_course_example(
        &self,
        course_id: i64,
        example: &ExampleRecord,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO course_examples (course_id, prompt, response, score, context) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(course_id)
        .bind(&example.prompt)
        .bind(&example.response)
        .bind(example.score)
        .bind(&example.context)
        .execute(&self.pool)
        .await
        .context("Failed to insert course example")?;
        Ok(result.last_insert_rowid())
    }
}

fn timestamp_to_utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

fn example_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ExampleRecord> {
    Ok(ExampleRecord {
        prompt: row.try_get("prompt")?,
        response: row.try_get("response")?,
        score: row.try_get("score")?,
        context: row.try_get("context")?,
    })
}

#[async_trait]
impl Storage for SqliteStore {
    async fn store_feedback(&self, feedback: NewFeedback) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO feedback \
             (prompt, response, implicit_score, emotional_score, combined_score, context, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&feedback.prompt)
        .bind(&feedback.response)
        .bind(feedback.implicit_score)
        .bind(feedback.emotional_score)
        .bind(feedback.combined_score)
        .bind(&feedback.context)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to store feedback")?;
        Ok(result.last_insert_rowid())
    }

    async fn get_all_feedbacks(&self) -> Result<Vec<FeedbackRecord>> {
        let rows = sqlx::query(
            "SELECT id, prompt, response, implicit_score, emotional_score, combined_score, \
             context, created_at FROM feedback ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch feedback")?;

        rows.iter()
            .map(|row| {
                Ok(FeedbackRecord {
                    id: row.try_get("id")?,
                    prompt: row.try_get("prompt")?,
                    response: row.try_get("response")?,
                    implicit_score: row.try_get("implicit_score")?,
                    emotional_score: row.try_get("emotional_score")?,
                    combined_score: row.try_get("combined_score")?,
                    context: row.try_get("context")?,
                    created_at: timestamp_to_utc(row.try_get("created_at")?),
                })
            })
            .collect()
    }

    async fn get_important_examples(&self, limit: i64) -> Result<Vec<ExampleRecord>> {
        let rows = sqlx::query(
            "SELECT prompt, response, score, context FROM important_examples \
             ORDER BY score DESC, id LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch important examples")?;

        rows.iter().map(example_from_row).collect()
    }

    async fn add_important_example(&self, example: &ExampleRecord) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO important_examples (prompt, response, score, context, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&example.prompt)
        .bind(&example.response)
        .bind(example.score)
        .bind(&example.context)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to add important example")?;
        Ok(result.last_insert_rowid())
    }

    async fn get_validated_courses(&self) -> Result<Vec<CourseRecord>> {
        let rows = sqlx::query("SELECT id, name FROM courses WHERE status = 'validated' ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch validated courses")?;

        rows.iter()
            .map(|row| {
                Ok(CourseRecord {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn get_course_examples(&self, course_id: i64, limit: i64) -> Result<Vec<ExampleRecord>> {
        let rows = sqlx::query(
            "SELECT prompt, response, score, context FROM course_examples \
             WHERE course_id = ? ORDER BY score DESC, id LIMIT ?",
        )
        .bind(course_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch course examples")?;

        rows.iter().map(example_from_row).collect()
    }
}
