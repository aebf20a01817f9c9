//! Search-index oracle contract and its SQLite FTS5 implementation.
//!
//! The ranker only ever talks to the corpus through [`SearchOracle`]:
//! `search(query) -> ranked hits with per-hit score`. An empty query yields
//! an empty hit list rather than an error. Production uses [`FtsOracle`]
//! over the `docs_fts` virtual table; tests substitute doubles.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::models::DocHit;

#[async_trait]
pub trait SearchOracle: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<DocHit>>;
}

/// Builds an FTS5 MATCH expression from vector keywords: each term quoted
/// (so extensions like `nginx.conf` survive the bar tokenizer) and
/// OR-joined, mirroring the multi-field any-term search the ranker expects.
pub fn build_match_query<'a, I: IntoIterator<Item = &'a str>>(terms: I) -> String {
    terms
        .into_iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// FTS5-backed oracle over the documentation corpus.
pub struct FtsOracle {
    pool: SqlitePool,
    candidate_limit: i64,
}

impl FtsOracle {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            candidate_limit: 50,
        }
    }
}

#[async_trait]
impl SearchOracle for FtsOracle {
    async fn search(&self, query: &str) -> Result<Vec<DocHit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT d.id, d.title, d.content, d.tags_json, d.keywords_json,
                   d.category, d.priority, d.source, f.rank
            FROM docs_fts f
            JOIN documentation d ON d.id = f.doc_id
            WHERE docs_fts MATCH ?
            ORDER BY rank
            LIMIT ?
            "#,
        )
        .bind(query)
        .bind(self.candidate_limit)
        .fetch_all(&self.pool)
        .await?;

        let hits = rows
            .iter()
            .map(|row| {
                let rank: f64 = row.get("rank");
                let tags: Vec<String> =
                    serde_json::from_str(row.get::<String, _>("tags_json").as_str())
                        .unwrap_or_default();
                let keywords: Vec<String> =
                    serde_json::from_str(row.get::<String, _>("keywords_json").as_str())
                        .unwrap_or_default();
                DocHit {
                    id: row.get("id"),
                    score: -rank, // negate bm25 so higher = better
                    title: row.get("title"),
                    content: row.get("content"),
                    tags,
                    keywords,
                    category: row.get("category"),
                    priority: row.get("priority"),
                    source: row.get("source"),
                }
            })
            .collect();

        Ok(hits)
    }
}
