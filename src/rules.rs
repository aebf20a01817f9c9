//! Rule-based override suggestions for well-known operational patterns.
//!
//! Rules are data, not control flow: each one pairs a containment predicate
//! over the serialized event with a fixed suggestion, so extending the
//! catalogue never touches the ranker. Every rule is independent and all
//! matching rules fire; ordering is imposed later by the ranker.

use crate::models::{ContextEvent, Suggestion, SuggestionKind};

/// One predicate → suggestion rule.
///
/// `requires` is a conjunction of keyword groups: the rule fires when every
/// group has at least one of its literals present (case-insensitive) in the
/// serialized event.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: &'static str,
    pub title: &'static str,
    pub content: &'static str,
    pub category: &'static str,
    pub tags: &'static [&'static str],
    pub score: f64,
    pub matched_keywords: &'static [&'static str],
    pub requires: &'static [&'static [&'static str]],
}

/// The built-in rule catalogue.
pub const DEFAULT_RULES: &[Rule] = &[
    Rule {
        id: "rule-k8s-troubleshooting",
        title: "Kubernetes Troubleshooting Guide",
        content: "Common Kubernetes debugging commands and troubleshooting steps...",
        category: "troubleshooting",
        tags: &["kubernetes", "kubectl", "debugging"],
        score: 0.9,
        matched_keywords: &["kubernetes", "kubectl"],
        requires: &[&["kubectl", "kubernetes", "k8s"]],
    },
    Rule {
        id: "rule-docker-errors",
        title: "Docker Common Errors and Solutions",
        content: "Solutions for common Docker build and runtime errors...",
        category: "troubleshooting",
        tags: &["docker", "errors", "troubleshooting"],
        score: 0.85,
        matched_keywords: &["docker", "error"],
        requires: &[&["docker"], &["error", "failed"]],
    },
    Rule {
        id: "rule-ssh-connection",
        title: "SSH Connection Troubleshooting",
        content: "Steps to diagnose and fix SSH connection problems...",
        category: "networking",
        tags: &["ssh", "connection", "networking"],
        score: 0.8,
        matched_keywords: &["ssh", "connection"],
        requires: &[&["ssh"], &["connection", "refused", "timeout"]],
    },
];

/// Evaluates the rule catalogue against raw context events.
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }
}

impl RuleEngine {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Returns the union of all matching rules' suggestions, unordered.
    pub fn evaluate(&self, event: &ContextEvent) -> Vec<Suggestion> {
        let serialized = serde_json::to_string(event)
            .unwrap_or_default()
            .to_lowercase();

        self.rules
            .iter()
            .filter(|rule| rule_matches(rule, &serialized))
            .map(|rule| Suggestion {
                id: rule.id.to_string(),
                title: rule.title.to_string(),
                content: rule.content.to_string(),
                source: Some("built-in".to_string()),
                category: Some(rule.category.to_string()),
                tags: rule.tags.iter().map(|t| t.to_string()).collect(),
                relevance_score: rule.score,
                oracle_score: None,
                matched_keywords: rule.matched_keywords.iter().map(|k| k.to_string()).collect(),
                kind: SuggestionKind::RuleBased,
            })
            .collect()
    }
}

fn rule_matches(rule: &Rule, serialized: &str) -> bool {
    rule.requires
        .iter()
        .all(|group| group.iter().any(|keyword| serialized.contains(keyword)))
}
