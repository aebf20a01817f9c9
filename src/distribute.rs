//! Context distribution pipeline.
//!
//! The distributor is the write path of the engine. A submitted event is
//! persisted to the activity log first (failures surface to the caller —
//! an unrecorded event must not look accepted), mirrored into the live
//! context cache and the context FTS index, announced as `new-context`,
//! and finally queued for background ranking. Ranking completion publishes
//! `suggestions-update` for the subject and appends to the suggestion log.
//!
//! The ranking queue is bounded. When it is full the submission itself
//! still succeeds; only the ranking pass is dropped, with a warning.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cache::{fingerprint, LiveContextCache, SuggestionCache};
use crate::config::EngineConfig;
use crate::events::{Broadcaster, RealtimeEvent};
use crate::models::{Analysis, ContextEvent, Feedback};
use crate::rank::Ranker;
use crate::store;

/// Outcome of one event submission.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub activity_id: String,
    /// False when the ranking queue was full and the pass was dropped.
    pub ranking_queued: bool,
}

/// Outcome of one on-demand analysis.
pub struct GeneratedAnalysis {
    pub analysis: Analysis,
    pub fingerprint: String,
    /// True when the analysis came from the suggestion cache.
    pub cached: bool,
}

struct RankJob {
    subject_id: String,
    event: ContextEvent,
}

struct Inner {
    pool: SqlitePool,
    ranker: Ranker,
    suggestion_cache: SuggestionCache,
    live_context: LiveContextCache,
    broadcaster: Broadcaster,
}

/// Shared handle over the distribution pipeline. Cheap to clone.
#[derive(Clone)]
pub struct Distributor {
    inner: Arc<Inner>,
    rank_tx: mpsc::Sender<RankJob>,
}

impl Distributor {
    /// Build the pipeline and spawn its background ranking worker.
    pub fn new(
        pool: SqlitePool,
        ranker: Ranker,
        broadcaster: Broadcaster,
        engine: &EngineConfig,
    ) -> Self {
        let inner = Arc::new(Inner {
            pool,
            ranker,
            suggestion_cache: SuggestionCache::new(Duration::from_secs(engine.cache_ttl_secs)),
            live_context: LiveContextCache::new(Duration::from_secs(engine.live_context_ttl_secs)),
            broadcaster,
        });

        let (rank_tx, rank_rx) = mpsc::channel(engine.rank_queue_capacity);
        tokio::spawn(rank_worker(Arc::clone(&inner), rank_rx));

        Self { inner, rank_tx }
    }

    /// Ingest one context event for a subject.
    pub async fn submit(
        &self,
        subject_id: &str,
        origin_session: Option<&str>,
        event: ContextEvent,
    ) -> Result<SubmitOutcome> {
        let activity_id = store::record_activity(&self.inner.pool, subject_id, &event).await?;
        store::index_context(&self.inner.pool, &activity_id, subject_id, &event).await?;
        self.inner.live_context.put(subject_id, event.clone()).await;

        self.inner.broadcaster.publish(
            origin_session.map(|s| s.to_string()),
            RealtimeEvent::NewContext {
                subject_id: subject_id.to_string(),
                event: event.clone(),
            },
        );

        let ranking_queued = match self.rank_tx.try_send(RankJob {
            subject_id: subject_id.to_string(),
            event,
        }) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(subject_id, "ranking queue full, dropping ranking pass");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(subject_id, "ranking worker gone, dropping ranking pass");
                false
            }
        };

        Ok(SubmitOutcome {
            activity_id,
            ranking_queued,
        })
    }

    /// On-demand analysis of an event, deduplicated through the suggestion
    /// cache by (subject, fingerprint).
    ///
    /// A cache miss is a full pass: the event is recorded to the activity
    /// log and the surfaced suggestions are appended to the suggestion log,
    /// so feedback can target them later. A cache hit persists nothing.
    pub async fn generate(
        &self,
        subject_id: &str,
        event: &ContextEvent,
    ) -> Result<GeneratedAnalysis> {
        let fp = fingerprint(event);

        if let Some(analysis) = self.inner.suggestion_cache.get(subject_id, &fp).await {
            debug!(subject_id, fingerprint = %fp, "suggestion cache hit");
            return Ok(GeneratedAnalysis {
                analysis,
                fingerprint: fp,
                cached: true,
            });
        }

        let activity_id = store::record_activity(&self.inner.pool, subject_id, event).await?;
        store::index_context(&self.inner.pool, &activity_id, subject_id, event).await?;

        let analysis = self.inner.ranker.analyze(event).await;
        store::insert_suggestions(&self.inner.pool, subject_id, event, &analysis.suggestions)
            .await?;
        self.inner
            .suggestion_cache
            .put(subject_id, &fp, analysis.clone())
            .await;

        Ok(GeneratedAnalysis {
            analysis,
            fingerprint: fp,
            cached: false,
        })
    }

    /// Record a feedback verdict. Returns false when the suggestion id is
    /// unknown. Cached analyses are never touched; feedback influences
    /// future learning, not already-computed rankings.
    pub async fn feedback(
        &self,
        suggestion_id: &str,
        subject_id: &str,
        verdict: Feedback,
    ) -> Result<bool> {
        store::record_feedback(&self.inner.pool, suggestion_id, subject_id, verdict).await
    }

    /// Most recent live context for a subject, if still within TTL.
    pub async fn current_context(&self, subject_id: &str) -> Option<ContextEvent> {
        self.inner.live_context.get(subject_id).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.inner.broadcaster
    }
}

/// Consumes ranking jobs sequentially: analyze, persist the surfaced
/// suggestions, publish `suggestions-update`. Per-job failures are logged
/// and skipped; the worker itself never stops while the channel is open.
async fn rank_worker(inner: Arc<Inner>, mut rx: mpsc::Receiver<RankJob>) {
    while let Some(job) = rx.recv().await {
        let fp = fingerprint(&job.event);
        let analysis = match inner.suggestion_cache.get(&job.subject_id, &fp).await {
            Some(hit) => hit,
            None => {
                let analysis = inner.ranker.analyze(&job.event).await;
                inner
                    .suggestion_cache
                    .put(&job.subject_id, &fp, analysis.clone())
                    .await;
                analysis
            }
        };

        if let Err(err) =
            store::insert_suggestions(&inner.pool, &job.subject_id, &job.event, &analysis.suggestions)
                .await
        {
            warn!(subject_id = %job.subject_id, error = %err, "failed to persist suggestions");
            continue;
        }

        inner.broadcaster.publish(
            None,
            RealtimeEvent::SuggestionsUpdate {
                subject_id: job.subject_id,
                suggestions: analysis.suggestions,
            },
        );
    }
}
