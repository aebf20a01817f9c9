//! Core data types used throughout docsense.
//!
//! These types represent the context events, keyword signatures, and
//! suggestions that flow through the analysis and distribution pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Kind discriminant for inbound context events.
///
/// Producers may send kinds this build does not know about; those map to
/// [`EventKind::Unknown`] and are accepted (they extract to an empty
/// keyword set rather than erroring).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CommandExecution,
    FileModification,
    ProcessAnalysis,
    NetworkActivity,
    LogUpdate,
    ContextSummary,
    #[serde(other)]
    #[default]
    Unknown,
}

impl EventKind {
    /// Stable string form used for DB storage and filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CommandExecution => "command_execution",
            EventKind::FileModification => "file_modification",
            EventKind::ProcessAnalysis => "process_analysis",
            EventKind::NetworkActivity => "network_activity",
            EventKind::LogUpdate => "log_update",
            EventKind::ContextSummary => "context_summary",
            EventKind::Unknown => "unknown",
        }
    }
}

/// One observation about a monitored subject, as produced by a host-side
/// watcher. Immutable once created. The payload fields are kind-specific
/// but producers are not required to zero out the others.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContextEvent {
    #[serde(rename = "type", default)]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processes: Vec<ProcessSample>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<ConnectionSample>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<LogEntry>,
}

/// One process row from a process snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProcessSample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<f64>,
}

/// One connection row from a network snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConnectionSample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// One log line from a log tail.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LogEntry {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Normalized keyword signature of one event. Ordered so that repeated
/// extraction of the same event is byte-for-byte identical.
pub type KeywordSet = BTreeSet<String>;

/// Keyword → positive weight. Ordering is irrelevant for scoring but a
/// sorted map keeps serialized forms deterministic.
pub type ContextVector = BTreeMap<String, f64>;

/// One ranked hit returned by the search oracle, carrying the matching
/// documentation entry's declared metadata.
#[derive(Debug, Clone)]
pub struct DocHit {
    pub id: String,
    /// Oracle relevance score; higher is better. Scale is oracle-specific.
    pub score: f64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    pub category: Option<String>,
    pub priority: Option<i64>,
    pub source: Option<String>,
}

/// Origin of a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Documentation,
    RuleBased,
}

/// A ranked documentation suggestion surfaced to a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Documentation entry id, or the fixed rule id for rule-based hits.
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Always within [0, 1].
    pub relevance_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_score: Option<f64>,
    pub matched_keywords: Vec<String>,
    pub kind: SuggestionKind,
}

/// Feedback verdict on a surfaced suggestion. Serde rejects anything
/// outside the three-value enum, which is how malformed feedback requests
/// are refused before any side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Helpful,
    NotHelpful,
    Irrelevant,
}

impl Feedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feedback::Helpful => "helpful",
            Feedback::NotHelpful => "not_helpful",
            Feedback::Irrelevant => "irrelevant",
        }
    }
}

/// Full output of one ranking pass over a context event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub keywords: Vec<String>,
    pub context_vector: ContextVector,
    pub suggestions: Vec<Suggestion>,
}

/// One documentation corpus entry as imported by `docsense load`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Durable activity-log row.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRecord {
    pub id: String,
    pub subject_id: String,
    pub kind: String,
    pub data: serde_json::Value,
    pub recorded_at: i64,
}

/// Durable suggestion-log row. Mutated only by the feedback recorder.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionRecord {
    pub id: String,
    pub subject_id: String,
    pub documentation_id: String,
    pub relevance_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    pub status: String,
    pub created_at: i64,
}
