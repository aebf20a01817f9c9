use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Apply the schema to an already-connected pool. Idempotent.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Documentation corpus read by the search oracle
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documentation (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            tags_json TEXT NOT NULL DEFAULT '[]',
            keywords_json TEXT NOT NULL DEFAULT '[]',
            category TEXT,
            priority INTEGER,
            source TEXT,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Activity log of inbound context events
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activities (
            id TEXT PRIMARY KEY,
            subject_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            data TEXT NOT NULL,
            recorded_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Suggestion log; feedback/status mutated by the feedback recorder only
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS suggestions (
            id TEXT PRIMARY KEY,
            subject_id TEXT NOT NULL,
            documentation_id TEXT NOT NULL,
            context_json TEXT NOT NULL,
            relevance_score REAL NOT NULL,
            feedback TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Short-lived feedback records for downstream learning
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback_log (
            id TEXT PRIMARY KEY,
            suggestion_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            verdict TEXT NOT NULL,
            recorded_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 virtual tables are not idempotent to create, so check first
    let docs_fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='docs_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !docs_fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE docs_fts USING fts5(
                doc_id UNINDEXED,
                title,
                content,
                tags,
                keywords
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    let context_fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='context_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !context_fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE context_fts USING fts5(
                activity_id UNINDEXED,
                subject_id UNINDEXED,
                kind UNINDEXED,
                text
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_activities_subject ON activities(subject_id, recorded_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_suggestions_subject ON suggestions(subject_id, created_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_suggestions_created ON suggestions(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}
