//! Hybrid relevance ranking.
//!
//! Merges two signals into one ranked suggestion list: the search oracle's
//! full-text score and a domain-weighted overlap between the context vector
//! and each hit's declared keywords/tags/title/content. Rule-based
//! suggestions are appended with their fixed scores, then everything is
//! sorted, truncated, and (by default) threshold-filtered.
//!
//! Ranking never raises to the caller: an unavailable or slow oracle
//! degrades to rule-based suggestions only.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use crate::config::EngineConfig;
use crate::extract::KeywordExtractor;
use crate::models::{Analysis, ContextEvent, ContextVector, DocHit, Suggestion, SuggestionKind};
use crate::oracle::{build_match_query, SearchOracle};
use crate::rules::RuleEngine;
use crate::vector::Vectorizer;

/// Weight of a vector keyword appearing in each hit field.
const KEYWORD_FACTOR: f64 = 0.4;
const TAG_FACTOR: f64 = 0.3;
const TITLE_FACTOR: f64 = 0.2;
const CONTENT_FACTOR: f64 = 0.1;

/// Suggestion content is cut to this many chars before being surfaced.
const CONTENT_PREVIEW_CHARS: usize = 300;

pub struct Ranker {
    extractor: KeywordExtractor,
    vectorizer: Vectorizer,
    rules: RuleEngine,
    oracle: Arc<dyn SearchOracle>,
    threshold: f64,
    max_suggestions: usize,
    oracle_timeout: Duration,
}

impl Ranker {
    pub fn new(oracle: Arc<dyn SearchOracle>, engine: &EngineConfig) -> Self {
        Self {
            extractor: KeywordExtractor::default(),
            vectorizer: Vectorizer::default(),
            rules: RuleEngine::default(),
            oracle,
            threshold: engine.suggestion_threshold,
            max_suggestions: engine.max_suggestions,
            oracle_timeout: Duration::from_secs(engine.oracle_timeout_secs),
        }
    }

    /// Full analysis with the default contract: only suggestions at or
    /// above the configured threshold are surfaced.
    pub async fn analyze(&self, event: &ContextEvent) -> Analysis {
        let mut analysis = self.analyze_unfiltered(event).await;
        analysis
            .suggestions
            .retain(|s| s.relevance_score >= self.threshold);
        analysis
    }

    /// Analysis without the threshold filter. Callers wanting the raw
    /// ranked list must ask for it explicitly.
    pub async fn analyze_unfiltered(&self, event: &ContextEvent) -> Analysis {
        let keywords = self.extractor.extract(event);
        let vector = self.vectorizer.vectorize(&keywords);

        let mut suggestions: Vec<Suggestion> = Vec::new();

        if !vector.is_empty() {
            let query = build_match_query(vector.keys().map(|k| k.as_str()));
            match timeout(self.oracle_timeout, self.oracle.search(&query)).await {
                Ok(Ok(hits)) => {
                    suggestions.extend(hits.into_iter().map(|hit| score_hit(&vector, hit)));
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "search oracle unavailable, using rule-based suggestions only");
                }
                Err(_) => {
                    warn!(
                        timeout_secs = self.oracle_timeout.as_secs(),
                        "search oracle timed out, using rule-based suggestions only"
                    );
                }
            }
        }

        suggestions.extend(self.rules.evaluate(event));

        suggestions.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        suggestions.truncate(self.max_suggestions);

        Analysis {
            keywords: keywords.into_iter().collect(),
            context_vector: vector,
            suggestions,
        }
    }
}

/// Rescale one oracle hit against the context vector.
///
/// Accumulates `weight * factor` for every vector keyword found in the
/// hit's keywords, tags, title, or content, then combines with the match
/// count and the oracle's own score. The [0,1] clamp is the authoritative
/// contract; the intermediate arithmetic follows the original formula.
fn score_hit(vector: &ContextVector, hit: DocHit) -> Suggestion {
    let title_lower = hit.title.to_lowercase();
    let content_lower = hit.content.to_lowercase();

    let mut score = 0.0;
    let mut match_count = 0u32;
    let mut matched_keywords = Vec::new();

    for (keyword, weight) in vector {
        let mut matched = false;

        if hit.keywords.iter().any(|k| k == keyword) {
            score += weight * KEYWORD_FACTOR;
            match_count += 1;
            matched = true;
        }
        if hit.tags.iter().any(|t| t == keyword) {
            score += weight * TAG_FACTOR;
            match_count += 1;
            matched = true;
        }
        if title_lower.contains(keyword.as_str()) {
            score += weight * TITLE_FACTOR;
            match_count += 1;
            matched = true;
        }
        if content_lower.contains(keyword.as_str()) {
            score += weight * CONTENT_FACTOR;
            match_count += 1;
            matched = true;
        }

        if matched {
            matched_keywords.push(keyword.clone());
        }
    }

    let raw = (score * match_count as f64 * hit.score) / 100.0 / vector.len() as f64;
    let relevance_score = raw.clamp(0.0, 1.0);

    let mut content: String = hit.content.chars().take(CONTENT_PREVIEW_CHARS).collect();
    content.push_str("...");

    Suggestion {
        id: hit.id,
        title: hit.title,
        content,
        source: hit.source,
        category: hit.category,
        tags: hit.tags,
        relevance_score,
        oracle_score: Some(hit.score),
        matched_keywords,
        kind: SuggestionKind::Documentation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct StubOracle {
        hits: Vec<DocHit>,
    }

    #[async_trait]
    impl SearchOracle for StubOracle {
        async fn search(&self, query: &str) -> anyhow::Result<Vec<DocHit>> {
            if query.trim().is_empty() {
                return Ok(Vec::new());
            }
            Ok(self.hits.clone())
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl SearchOracle for FailingOracle {
        async fn search(&self, _query: &str) -> anyhow::Result<Vec<DocHit>> {
            bail!("index unreachable")
        }
    }

    struct SlowOracle;

    #[async_trait]
    impl SearchOracle for SlowOracle {
        async fn search(&self, _query: &str) -> anyhow::Result<Vec<DocHit>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    fn doc_hit(id: &str, score: f64, title: &str, keywords: &[&str], tags: &[&str]) -> DocHit {
        DocHit {
            id: id.to_string(),
            score,
            title: title.to_string(),
            content: "kubectl debugging walkthrough for broken pods".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            category: Some("troubleshooting".to_string()),
            priority: None,
            source: Some("wiki".to_string()),
        }
    }

    fn kubectl_event() -> ContextEvent {
        ContextEvent {
            commands: vec!["kubectl get pods".to_string()],
            ..Default::default()
        }
    }

    fn engine_config() -> EngineConfig {
        EngineConfig::default()
    }

    fn ranker_with(oracle: Arc<dyn SearchOracle>) -> Ranker {
        Ranker::new(oracle, &engine_config())
    }

    #[test]
    fn hit_scores_stay_in_unit_interval_under_extreme_inputs() {
        let mut vector: ContextVector = BTreeMap::new();
        for i in 0..50 {
            vector.insert(format!("kw{}", i), 3.0);
        }
        vector.insert("kubectl".to_string(), 3.0);

        // Absurdly large oracle score must still clamp to 1.0
        let huge = score_hit(
            &vector,
            doc_hit("d1", 1e9, "kubectl kubectl", &["kubectl"], &["kubectl"]),
        );
        assert!(huge.relevance_score <= 1.0);

        // Negative oracle score must clamp to 0.0
        let negative = score_hit(&vector, doc_hit("d2", -5.0, "kubectl", &["kubectl"], &[]));
        assert!(negative.relevance_score >= 0.0);
    }

    #[test]
    fn matched_keywords_cover_all_four_fields() {
        let vector: ContextVector = [
            ("kubectl".to_string(), 3.0),
            ("pod".to_string(), 1.0),
            ("absent".to_string(), 1.0),
        ]
        .into_iter()
        .collect();

        let suggestion = score_hit(
            &vector,
            doc_hit("d1", 2.0, "Kubectl Guide", &["pod"], &["kubectl"]),
        );
        assert!(suggestion.matched_keywords.contains(&"kubectl".to_string()));
        assert!(suggestion.matched_keywords.contains(&"pod".to_string()));
        assert!(!suggestion.matched_keywords.contains(&"absent".to_string()));
    }

    #[test]
    fn no_overlap_scores_zero() {
        let vector: ContextVector = [("zzz".to_string(), 1.0)].into_iter().collect();
        let suggestion = score_hit(&vector, doc_hit("d1", 10.0, "Unrelated", &[], &[]));
        assert_eq!(suggestion.relevance_score, 0.0);
        assert!(suggestion.matched_keywords.is_empty());
    }

    #[test]
    fn content_preview_is_truncated() {
        let vector: ContextVector = [("kubectl".to_string(), 3.0)].into_iter().collect();
        let mut hit = doc_hit("d1", 1.0, "Guide", &[], &[]);
        hit.content = "x".repeat(1000);
        let suggestion = score_hit(&vector, hit);
        assert_eq!(suggestion.content.len(), CONTENT_PREVIEW_CHARS + 3);
        assert!(suggestion.content.ends_with("..."));
    }

    #[tokio::test]
    async fn results_are_sorted_and_capped() {
        let hits: Vec<DocHit> = (0..20)
            .map(|i| {
                doc_hit(
                    &format!("d{}", i),
                    (i + 1) as f64 * 10.0,
                    "kubectl pods troubleshooting",
                    &["kubectl", "pod"],
                    &["kubernetes"],
                )
            })
            .collect();
        let ranker = ranker_with(Arc::new(StubOracle { hits }));
        let analysis = ranker.analyze_unfiltered(&kubectl_event()).await;

        assert!(analysis.suggestions.len() <= 10);
        for pair in analysis.suggestions.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
        for suggestion in &analysis.suggestions {
            assert!((0.0..=1.0).contains(&suggestion.relevance_score));
        }
    }

    #[tokio::test]
    async fn default_contract_filters_below_threshold() {
        let ranker = ranker_with(Arc::new(StubOracle {
            hits: vec![doc_hit("weak", 0.01, "barely related pods", &[], &[])],
        }));
        let analysis = ranker.analyze(&kubectl_event()).await;
        // The weak doc hit is filtered; the k8s rule (0.9) survives.
        assert!(analysis.suggestions.iter().all(|s| s.relevance_score >= 0.7));
        assert!(analysis
            .suggestions
            .iter()
            .any(|s| s.id == "rule-k8s-troubleshooting"));
        assert!(!analysis.suggestions.iter().any(|s| s.id == "weak"));
    }

    #[tokio::test]
    async fn oracle_failure_degrades_to_rules_only() {
        let ranker = ranker_with(Arc::new(FailingOracle));
        let analysis = ranker.analyze(&kubectl_event()).await;
        assert!(analysis
            .suggestions
            .iter()
            .all(|s| s.kind == SuggestionKind::RuleBased));
        assert!(analysis
            .suggestions
            .iter()
            .any(|s| s.id == "rule-k8s-troubleshooting" && s.relevance_score == 0.9));
    }

    #[tokio::test(start_paused = true)]
    async fn oracle_timeout_degrades_to_rules_only() {
        let mut engine = engine_config();
        engine.oracle_timeout_secs = 1;
        let ranker = Ranker::new(Arc::new(SlowOracle), &engine);
        let analysis = ranker.analyze(&kubectl_event()).await;
        assert!(analysis
            .suggestions
            .iter()
            .all(|s| s.kind == SuggestionKind::RuleBased));
    }

    #[tokio::test]
    async fn empty_event_yields_empty_analysis() {
        let ranker = ranker_with(Arc::new(StubOracle { hits: Vec::new() }));
        let analysis = ranker.analyze(&ContextEvent::default()).await;
        assert!(analysis.keywords.is_empty());
        assert!(analysis.context_vector.is_empty());
        assert!(analysis.suggestions.is_empty());
    }
}
