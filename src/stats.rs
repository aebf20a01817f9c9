//! Database statistics overview.
//!
//! Quick summary of what the engine has seen: corpus size, activity volume,
//! suggestion counts, and the feedback breakdown. Used by `docsense stats`
//! to give confidence that ingestion and ranking are working.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_docs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documentation")
        .fetch_one(&pool)
        .await?;

    let total_activities: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activities")
        .fetch_one(&pool)
        .await?;

    let subjects: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT subject_id) FROM activities")
        .fetch_one(&pool)
        .await?;

    let total_suggestions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suggestions")
        .fetch_one(&pool)
        .await?;

    let reviewed: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM suggestions WHERE status = 'reviewed'")
            .fetch_one(&pool)
            .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Docsense — Database Stats");
    println!("=========================");
    println!();
    println!("  Database:      {}", config.db.path.display());
    println!("  Size:          {}", format_bytes(db_size));
    println!();
    println!("  Documentation: {}", total_docs);
    println!("  Activities:    {} ({} subjects)", total_activities, subjects);
    println!(
        "  Suggestions:   {} ({} reviewed, {}%)",
        total_suggestions,
        reviewed,
        if total_suggestions > 0 {
            (reviewed * 100) / total_suggestions
        } else {
            0
        }
    );

    // Feedback breakdown
    let feedback_rows = sqlx::query(
        r#"
        SELECT feedback, COUNT(*) AS verdict_count
        FROM suggestions
        WHERE feedback IS NOT NULL
        GROUP BY feedback
        ORDER BY verdict_count DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    if !feedback_rows.is_empty() {
        println!();
        println!("  Feedback:");
        for row in &feedback_rows {
            let verdict: String = row.get("feedback");
            let count: i64 = row.get("verdict_count");
            println!("    {:<14} {}", verdict, count);
        }
    }

    // Activity breakdown by event kind
    let kind_rows = sqlx::query(
        r#"
        SELECT kind, COUNT(*) AS kind_count
        FROM activities
        GROUP BY kind
        ORDER BY kind_count DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    if !kind_rows.is_empty() {
        println!();
        println!("  By event kind:");
        println!("  {:<24} {:>8}", "KIND", "EVENTS");
        println!("  {}", "-".repeat(34));
        for row in &kind_rows {
            let kind: String = row.get("kind");
            let count: i64 = row.get("kind_count");
            println!("  {:<24} {:>8}", kind, count);
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
