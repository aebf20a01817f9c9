//! Domain-weighted context vector construction.
//!
//! Maps a [`KeywordSet`] to a [`ContextVector`] using a fixed weight table:
//! infrastructure tooling and troubleshooting markers count more than
//! generic tokens. Every input keyword appears exactly once in the output
//! with a weight of at least 1.

use crate::models::{ContextVector, KeywordSet};
use std::collections::BTreeMap;

/// (keyword, weight) pairs for domain-significant terms. Everything else
/// defaults to weight 1.
const WEIGHT_TABLE: &[(&str, f64)] = &[
    // Infrastructure tools
    ("kubernetes", 3.0),
    ("k8s", 3.0),
    ("kubectl", 3.0),
    ("docker", 3.0),
    ("terraform", 3.0),
    ("ansible", 3.0),
    ("helm", 3.0),
    // Cloud providers
    ("aws", 2.0),
    ("azure", 2.0),
    ("gcp", 2.0),
    ("ec2", 2.0),
    ("s3", 2.0),
    // Databases
    ("mysql", 2.0),
    ("postgres", 2.0),
    ("redis", 2.0),
    ("mongodb", 2.0),
    // Web servers
    ("nginx", 2.0),
    ("apache", 2.0),
    ("haproxy", 2.0),
    // CI/CD
    ("jenkins", 2.0),
    ("gitlab", 2.0),
    ("github", 2.0),
    ("actions", 2.0),
    // Monitoring
    ("prometheus", 2.0),
    ("grafana", 2.0),
    ("elk", 2.0),
    ("splunk", 2.0),
    // System administration
    ("systemctl", 2.0),
    ("service", 2.0),
    ("cron", 2.0),
    ("ssh", 2.0),
    // Error-related
    ("troubleshooting", 3.0),
    ("error", 2.0),
    ("debug", 2.0),
    ("fix", 2.0),
];

/// Builds weighted context vectors from keyword sets.
pub struct Vectorizer {
    weights: BTreeMap<String, f64>,
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self::new(
            WEIGHT_TABLE
                .iter()
                .map(|(k, w)| (k.to_string(), *w))
                .collect(),
        )
    }
}

impl Vectorizer {
    pub fn new(weights: BTreeMap<String, f64>) -> Self {
        Self { weights }
    }

    /// Every keyword in the input appears exactly once in the output with
    /// weight ≥ 1; unknown keywords get the default weight 1.
    pub fn vectorize(&self, keywords: &KeywordSet) -> ContextVector {
        keywords
            .iter()
            .map(|keyword| {
                let weight = self.weights.get(keyword).copied().unwrap_or(1.0).max(1.0);
                (keyword.clone(), weight)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn keyword_set(words: &[&str]) -> KeywordSet {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn domain_terms_get_table_weights() {
        let vector = Vectorizer::default().vectorize(&keyword_set(&[
            "kubectl",
            "nginx",
            "troubleshooting",
            "widget",
        ]));
        assert_eq!(vector["kubectl"], 3.0);
        assert_eq!(vector["nginx"], 2.0);
        assert_eq!(vector["troubleshooting"], 3.0);
        assert_eq!(vector["widget"], 1.0);
    }

    #[test]
    fn every_keyword_appears_exactly_once() {
        let keywords = keyword_set(&["alpha", "beta", "docker"]);
        let vector = Vectorizer::default().vectorize(&keywords);
        assert_eq!(vector.len(), keywords.len());
        for keyword in &keywords {
            assert!(vector.contains_key(keyword));
        }
    }

    #[test]
    fn weights_are_never_below_one() {
        // A substituted table with a degenerate weight must still floor at 1.
        let table: BTreeMap<String, f64> = [("bogus".to_string(), 0.0)].into_iter().collect();
        let vector = Vectorizer::new(table).vectorize(&keyword_set(&["bogus", "other"]));
        for weight in vector.values() {
            assert!(*weight >= 1.0);
        }
    }

    #[test]
    fn empty_set_yields_empty_vector() {
        let vector = Vectorizer::default().vectorize(&BTreeSet::new());
        assert!(vector.is_empty());
    }
}
