//! Documentation corpus import.
//!
//! `docsense load` reads a JSON array of corpus entries and upserts them
//! into the `documentation` table plus the `docs_fts` search index. The
//! whole import runs in one transaction so a malformed entry never leaves
//! the index half-updated.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::CorpusEntry;

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Read a corpus file and import every entry.
pub async fn load_corpus(pool: &SqlitePool, path: &Path) -> Result<ImportSummary> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    let entries: Vec<CorpusEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse corpus file: {}", path.display()))?;

    import_entries(pool, &entries).await
}

/// Upsert corpus entries and rebuild their FTS rows, atomically.
pub async fn import_entries(pool: &SqlitePool, entries: &[CorpusEntry]) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let mut tx = pool.begin().await?;
    let now = Utc::now().timestamp();

    for entry in entries {
        if entry.id.trim().is_empty() || entry.title.trim().is_empty() {
            anyhow::bail!("Corpus entry missing id or title");
        }

        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM documentation WHERE id = ?")
                .bind(&entry.id)
                .fetch_optional(&mut *tx)
                .await?;

        sqlx::query(
            r#"
            INSERT INTO documentation
                (id, title, content, tags_json, keywords_json, category, priority, source, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                tags_json = excluded.tags_json,
                keywords_json = excluded.keywords_json,
                category = excluded.category,
                priority = excluded.priority,
                source = excluded.source,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.title)
        .bind(&entry.content)
        .bind(serde_json::to_string(&entry.tags)?)
        .bind(serde_json::to_string(&entry.keywords)?)
        .bind(&entry.category)
        .bind(entry.priority)
        .bind(&entry.source)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Replace the FTS row rather than mutating it in place
        sqlx::query("DELETE FROM docs_fts WHERE doc_id = ?")
            .bind(&entry.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO docs_fts (doc_id, title, content, tags, keywords) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(&entry.title)
        .bind(&entry.content)
        .bind(entry.tags.join(" "))
        .bind(entry.keywords.join(" "))
        .execute(&mut *tx)
        .await?;

        if existing.is_some() {
            summary.updated += 1;
        } else {
            summary.inserted += 1;
        }
    }

    tx.commit().await?;
    Ok(summary)
}
