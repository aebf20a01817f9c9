//! TTL caches in front of the ranker.
//!
//! Two small in-process caches: [`SuggestionCache`] deduplicates ranking
//! work per (subject, fingerprint), and [`LiveContextCache`] holds the most
//! recent event per subject for real-time reads. Entries expire passively;
//! there is no explicit invalidation (feedback mutates the durable store
//! only, never these caches).

use std::collections::HashMap;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::models::{Analysis, ContextEvent};

/// Deterministic digest of an event's content, truncated to 16 bytes of
/// hex. Derived solely from the payload — the timestamp is stripped first —
/// so identical events always produce identical cache keys.
pub fn fingerprint(event: &ContextEvent) -> String {
    let mut value = serde_json::to_value(event).unwrap_or_default();
    if let Some(map) = value.as_object_mut() {
        map.remove("timestamp");
    }
    let canonical = value.to_string();

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)[..32].to_string()
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Generic keyed TTL map. Overwrites silently on key collision; expired
/// entries are dropped on read and purged opportunistically on write.
struct TtlMap<V> {
    entries: RwLock<HashMap<(String, String), Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlMap<V> {
    fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    async fn get(&self, key: &(String, String)) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone())
    }

    async fn put(&self, key: (String, String), value: V) {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }
}

/// Cache of ranked analyses keyed by (subject, fingerprint).
pub struct SuggestionCache {
    inner: TtlMap<Analysis>,
}

impl SuggestionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: TtlMap::new(ttl),
        }
    }

    pub async fn get(&self, subject_id: &str, fingerprint: &str) -> Option<Analysis> {
        self.inner
            .get(&(subject_id.to_string(), fingerprint.to_string()))
            .await
    }

    pub async fn put(&self, subject_id: &str, fingerprint: &str, analysis: Analysis) {
        self.inner
            .put((subject_id.to_string(), fingerprint.to_string()), analysis)
            .await
    }
}

/// Most recent context event per subject, with a short TTL.
pub struct LiveContextCache {
    inner: TtlMap<ContextEvent>,
}

impl LiveContextCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: TtlMap::new(ttl),
        }
    }

    pub async fn get(&self, subject_id: &str) -> Option<ContextEvent> {
        self.inner
            .get(&(subject_id.to_string(), String::new()))
            .await
    }

    pub async fn put(&self, subject_id: &str, event: ContextEvent) {
        self.inner
            .put((subject_id.to_string(), String::new()), event)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventKind;
    use chrono::Utc;

    fn event(commands: &[&str]) -> ContextEvent {
        ContextEvent {
            kind: EventKind::CommandExecution,
            commands: commands.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    fn analysis() -> Analysis {
        Analysis {
            keywords: vec!["kubectl".to_string()],
            context_vector: [("kubectl".to_string(), 3.0)].into_iter().collect(),
            suggestions: Vec::new(),
        }
    }

    #[test]
    fn fingerprint_is_content_derived_and_stable() {
        let a = event(&["kubectl get pods"]);
        let b = event(&["kubectl get pods"]);
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 32);
    }

    #[test]
    fn fingerprint_ignores_timestamps() {
        let mut a = event(&["kubectl get pods"]);
        let mut b = event(&["kubectl get pods"]);
        a.timestamp = Some(Utc::now());
        b.timestamp = Some(Utc::now() - chrono::Duration::hours(6));
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_differs_for_different_payloads() {
        assert_ne!(
            fingerprint(&event(&["kubectl get pods"])),
            fingerprint(&event(&["docker ps"]))
        );
    }

    #[tokio::test]
    async fn hit_within_ttl_returns_stored_value() {
        let cache = SuggestionCache::new(Duration::from_secs(60));
        cache.put("host-1", "fp", analysis()).await;
        let hit = cache.get("host-1", "fp").await.expect("hit");
        assert_eq!(hit.keywords, vec!["kubectl"]);
    }

    #[tokio::test]
    async fn miss_for_unknown_key_and_other_subject() {
        let cache = SuggestionCache::new(Duration::from_secs(60));
        cache.put("host-1", "fp", analysis()).await;
        assert!(cache.get("host-1", "other").await.is_none());
        assert!(cache.get("host-2", "fp").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = SuggestionCache::new(Duration::from_secs(300));
        cache.put("host-1", "fp", analysis()).await;
        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(cache.get("host-1", "fp").await.is_none());
    }

    #[tokio::test]
    async fn put_overwrites_silently() {
        let cache = SuggestionCache::new(Duration::from_secs(60));
        cache.put("host-1", "fp", analysis()).await;
        let mut second = analysis();
        second.keywords = vec!["docker".to_string()];
        cache.put("host-1", "fp", second).await;
        assert_eq!(
            cache.get("host-1", "fp").await.unwrap().keywords,
            vec!["docker"]
        );
    }

    #[tokio::test]
    async fn live_context_tracks_latest_event() {
        let cache = LiveContextCache::new(Duration::from_secs(60));
        assert!(cache.get("host-1").await.is_none());
        cache.put("host-1", event(&["terraform plan"])).await;
        let current = cache.get("host-1").await.unwrap();
        assert_eq!(current.commands, vec!["terraform plan"]);
    }
}
