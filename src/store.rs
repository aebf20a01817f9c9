//! Durable records behind the distributor.
//!
//! Thin sqlx layer over the activity log, the suggestion log, short-lived
//! feedback records, and the context FTS index. Every function is scoped to
//! one request: failures surface to the caller and there is no built-in
//! retry (losing an audit record silently is not acceptable; the caller
//! decides what to do).

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{ActivityRecord, ContextEvent, Feedback, Suggestion, SuggestionRecord};
use crate::oracle::build_match_query;

/// How long a feedback-log record stays interesting for downstream
/// learning (24 hours).
const FEEDBACK_RECORD_TTL_SECS: i64 = 86_400;

/// Persist one inbound event to the activity log. Returns the activity id.
pub async fn record_activity(
    pool: &SqlitePool,
    subject_id: &str,
    event: &ContextEvent,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let data = serde_json::to_string(event)?;

    sqlx::query(
        "INSERT INTO activities (id, subject_id, kind, data, recorded_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(subject_id)
    .bind(event.kind.as_str())
    .bind(&data)
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await?;

    Ok(id)
}

/// Index an event's free text into the context FTS table so past activity
/// stays searchable.
pub async fn index_context(
    pool: &SqlitePool,
    activity_id: &str,
    subject_id: &str,
    event: &ContextEvent,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO context_fts (activity_id, subject_id, kind, text) VALUES (?, ?, ?, ?)",
    )
    .bind(activity_id)
    .bind(subject_id)
    .bind(event.kind.as_str())
    .bind(event_text(event))
    .execute(pool)
    .await?;

    Ok(())
}

/// Flatten an event's textual payload for FTS indexing.
fn event_text(event: &ContextEvent) -> String {
    let mut parts: Vec<String> = Vec::new();
    parts.extend(event.commands.iter().cloned());
    parts.extend(event.file.iter().cloned());
    parts.extend(event.files.iter().cloned());
    parts.extend(event.processes.iter().map(|p| p.command.clone()));
    parts.extend(event.entries.iter().map(|e| e.message.clone()));
    parts.extend(
        event
            .connections
            .iter()
            .flat_map(|c| [c.remote.clone(), c.state.clone()])
            .flatten(),
    );
    parts.join("\n")
}

/// Paged activity history for one subject, newest first.
pub async fn activity_history(
    pool: &SqlitePool,
    subject_id: &str,
    limit: i64,
    offset: i64,
    kind: Option<&str>,
) -> Result<Vec<ActivityRecord>> {
    let rows = if let Some(kind) = kind {
        sqlx::query(
            r#"
            SELECT id, subject_id, kind, data, recorded_at FROM activities
            WHERE subject_id = ? AND kind = ?
            ORDER BY recorded_at DESC LIMIT ? OFFSET ?
            "#,
        )
        .bind(subject_id)
        .bind(kind)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query(
            r#"
            SELECT id, subject_id, kind, data, recorded_at FROM activities
            WHERE subject_id = ?
            ORDER BY recorded_at DESC LIMIT ? OFFSET ?
            "#,
        )
        .bind(subject_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?
    };

    Ok(rows.iter().map(activity_from_row).collect())
}

/// Full-text search over indexed context activity.
pub async fn search_context(
    pool: &SqlitePool,
    query: &str,
    subject_id: Option<&str>,
    kind: Option<&str>,
) -> Result<Vec<ActivityRecord>> {
    let match_expr = build_match_query(query.split_whitespace());
    if match_expr.is_empty() {
        return Ok(Vec::new());
    }

    // Filters must be part of the query itself so the LIMIT applies to the
    // filtered set, not the other way around.
    let rows = sqlx::query(
        r#"
        SELECT a.id, a.subject_id, a.kind, a.data, a.recorded_at
        FROM context_fts f
        JOIN activities a ON a.id = f.activity_id
        WHERE context_fts MATCH ?
          AND (? IS NULL OR a.subject_id = ?)
          AND (? IS NULL OR a.kind = ?)
        ORDER BY a.recorded_at DESC
        LIMIT 50
        "#,
    )
    .bind(&match_expr)
    .bind(subject_id)
    .bind(subject_id)
    .bind(kind)
    .bind(kind)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(activity_from_row).collect())
}

fn activity_from_row(row: &sqlx::sqlite::SqliteRow) -> ActivityRecord {
    let data: String = row.get("data");
    ActivityRecord {
        id: row.get("id"),
        subject_id: row.get("subject_id"),
        kind: row.get("kind"),
        data: serde_json::from_str(&data).unwrap_or(serde_json::Value::Null),
        recorded_at: row.get("recorded_at"),
    }
}

/// Persist the surfaced suggestions of one analysis, atomically. Returns
/// the number of rows written.
pub async fn insert_suggestions(
    pool: &SqlitePool,
    subject_id: &str,
    event: &ContextEvent,
    suggestions: &[Suggestion],
) -> Result<u64> {
    let context_json = serde_json::to_string(event)?;
    let now = Utc::now().timestamp();
    let mut written = 0u64;
    let mut tx = pool.begin().await?;

    for suggestion in suggestions {
        sqlx::query(
            r#"
            INSERT INTO suggestions
                (id, subject_id, documentation_id, context_json, relevance_score, status, created_at)
            VALUES (?, ?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(subject_id)
        .bind(&suggestion.id)
        .bind(&context_json)
        .bind(suggestion.relevance_score)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        written += 1;
    }

    tx.commit().await?;
    Ok(written)
}

/// Paged suggestion history for one subject, newest first.
pub async fn suggestion_history(
    pool: &SqlitePool,
    subject_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<SuggestionRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, subject_id, documentation_id, relevance_score, feedback, status, created_at
        FROM suggestions
        WHERE subject_id = ?
        ORDER BY created_at DESC LIMIT ? OFFSET ?
        "#,
    )
    .bind(subject_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let feedback: Option<String> = row.get("feedback");
            SuggestionRecord {
                id: row.get("id"),
                subject_id: row.get("subject_id"),
                documentation_id: row.get("documentation_id"),
                relevance_score: row.get("relevance_score"),
                feedback: feedback.as_deref().and_then(parse_feedback),
                status: row.get("status"),
                created_at: row.get("created_at"),
            }
        })
        .collect())
}

fn parse_feedback(s: &str) -> Option<Feedback> {
    match s {
        "helpful" => Some(Feedback::Helpful),
        "not_helpful" => Some(Feedback::NotHelpful),
        "irrelevant" => Some(Feedback::Irrelevant),
        _ => None,
    }
}

/// Record a feedback verdict against a stored suggestion and keep a
/// short-lived feedback record for downstream learning. Returns false when
/// no suggestion with that id exists (nothing is written in that case).
pub async fn record_feedback(
    pool: &SqlitePool,
    suggestion_id: &str,
    subject_id: &str,
    verdict: Feedback,
) -> Result<bool> {
    let updated = sqlx::query("UPDATE suggestions SET feedback = ?, status = 'reviewed' WHERE id = ?")
        .bind(verdict.as_str())
        .bind(suggestion_id)
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Ok(false);
    }

    let now = Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO feedback_log (id, suggestion_id, subject_id, verdict, recorded_at, expires_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(suggestion_id)
    .bind(subject_id)
    .bind(verdict.as_str())
    .bind(now)
    .bind(now + FEEDBACK_RECORD_TTL_SECS)
    .execute(pool)
    .await?;

    Ok(true)
}

// ============ Analytics ============

/// Rolling-window reporting view over the suggestion log.
#[derive(Debug, Serialize)]
pub struct AnalyticsReport {
    pub total_suggestions: i64,
    pub avg_relevance: Option<f64>,
    pub helpful_count: i64,
    pub not_helpful_count: i64,
    pub irrelevant_count: i64,
    pub top_categories: Vec<CategoryCount>,
}

#[derive(Debug, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Aggregate suggestion counts by feedback verdict and category over the
/// last 7 days.
pub async fn suggestion_analytics(pool: &SqlitePool) -> Result<AnalyticsReport> {
    let window_start = Utc::now().timestamp() - 7 * 86_400;

    let overview = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total,
            AVG(relevance_score) AS avg_relevance,
            COUNT(CASE WHEN feedback = 'helpful' THEN 1 END) AS helpful,
            COUNT(CASE WHEN feedback = 'not_helpful' THEN 1 END) AS not_helpful,
            COUNT(CASE WHEN feedback = 'irrelevant' THEN 1 END) AS irrelevant
        FROM suggestions
        WHERE created_at > ?
        "#,
    )
    .bind(window_start)
    .fetch_one(pool)
    .await?;

    let category_rows = sqlx::query(
        r#"
        SELECT d.category AS category, COUNT(*) AS suggestion_count
        FROM suggestions s
        JOIN documentation d ON d.id = s.documentation_id
        WHERE s.created_at > ? AND d.category IS NOT NULL
        GROUP BY d.category
        ORDER BY suggestion_count DESC
        LIMIT 10
        "#,
    )
    .bind(window_start)
    .fetch_all(pool)
    .await?;

    Ok(AnalyticsReport {
        total_suggestions: overview.get("total"),
        avg_relevance: overview.get("avg_relevance"),
        helpful_count: overview.get("helpful"),
        not_helpful_count: overview.get("not_helpful"),
        irrelevant_count: overview.get("irrelevant"),
        top_categories: category_rows
            .iter()
            .map(|row| CategoryCount {
                category: row.get("category"),
                count: row.get("suggestion_count"),
            })
            .collect(),
    })
}

/// Per-subject view over the activity log: what one subject has been doing,
/// broken down by event kind and by day.
#[derive(Debug, Serialize)]
pub struct ActivityReport {
    pub subject_id: String,
    pub total_activities: i64,
    pub by_kind: Vec<KindCount>,
    pub by_day: Vec<DayCount>,
}

#[derive(Debug, Serialize)]
pub struct KindCount {
    pub kind: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DayCount {
    pub day: String,
    pub count: i64,
}

/// Aggregate one subject's activity over the last `days` days.
pub async fn activity_analytics(
    pool: &SqlitePool,
    subject_id: &str,
    days: i64,
) -> Result<ActivityReport> {
    let window_start = Utc::now().timestamp() - days.max(1) * 86_400;

    let total_activities: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM activities WHERE subject_id = ? AND recorded_at > ?",
    )
    .bind(subject_id)
    .bind(window_start)
    .fetch_one(pool)
    .await?;

    let kind_rows = sqlx::query(
        r#"
        SELECT kind, COUNT(*) AS kind_count
        FROM activities
        WHERE subject_id = ? AND recorded_at > ?
        GROUP BY kind
        ORDER BY kind_count DESC
        "#,
    )
    .bind(subject_id)
    .bind(window_start)
    .fetch_all(pool)
    .await?;

    let day_rows = sqlx::query(
        r#"
        SELECT date(recorded_at, 'unixepoch') AS day, COUNT(*) AS day_count
        FROM activities
        WHERE subject_id = ? AND recorded_at > ?
        GROUP BY day
        ORDER BY day DESC
        "#,
    )
    .bind(subject_id)
    .bind(window_start)
    .fetch_all(pool)
    .await?;

    Ok(ActivityReport {
        subject_id: subject_id.to_string(),
        total_activities,
        by_kind: kind_rows
            .iter()
            .map(|row| KindCount {
                kind: row.get("kind"),
                count: row.get("kind_count"),
            })
            .collect(),
        by_day: day_rows
            .iter()
            .map(|row| DayCount {
                day: row.get("day"),
                count: row.get("day_count"),
            })
            .collect(),
    })
}
