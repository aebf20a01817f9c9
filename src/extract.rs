//! Keyword extraction from raw context events.
//!
//! Turns one [`ContextEvent`] into a normalized [`KeywordSet`]: free text is
//! tokenized, lowercased, stop-word filtered, and stemmed; known tool names
//! are matched literally and added verbatim; file paths contribute their
//! segments and extensions; log lines matching failure patterns contribute
//! the `error` / `troubleshooting` markers.
//!
//! Extraction is a pure function of the event. The stop-word list, tool
//! catalogue, and failure patterns are construction data so tests can
//! substitute their own.

use crate::models::{ContextEvent, KeywordSet};
use std::collections::BTreeSet;

/// Literal tool and technology names matched as case-insensitive substrings
/// inside command text. Matches are added verbatim, not stemmed.
const TOOL_CATALOGUE: &[&str] = &[
    "kubectl",
    "docker",
    "terraform",
    "ansible",
    "jenkins",
    "nginx",
    "apache",
    "mysql",
    "postgres",
    "redis",
    "kubernetes",
    "k8s",
    "aws",
    "azure",
    "gcp",
    "git",
    "ssh",
    "systemctl",
    "service",
    "cron",
];

/// Substrings that mark a log line as failure-indicating.
const FAILURE_PATTERNS: &[&str] = &[
    "error",
    "failed",
    "exception",
    "timeout",
    "connection refused",
    "permission denied",
    "not found",
    "cannot",
    "unable",
];

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will", "would",
    "could", "should",
];

/// Extracts normalized keyword signatures from context events.
pub struct KeywordExtractor {
    stop_words: BTreeSet<String>,
    tool_catalogue: Vec<String>,
    failure_patterns: Vec<String>,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(
            STOP_WORDS.iter().map(|s| s.to_string()).collect(),
            TOOL_CATALOGUE.iter().map(|s| s.to_string()).collect(),
            FAILURE_PATTERNS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl KeywordExtractor {
    pub fn new(
        stop_words: BTreeSet<String>,
        tool_catalogue: Vec<String>,
        failure_patterns: Vec<String>,
    ) -> Self {
        Self {
            stop_words,
            tool_catalogue,
            failure_patterns,
        }
    }

    /// Derive the keyword set for one event. Pure: no I/O, no clock, no
    /// randomness, so identical events always produce identical sets.
    pub fn extract(&self, event: &ContextEvent) -> KeywordSet {
        let mut keywords = BTreeSet::new();

        for command in &event.commands {
            let lower = command.to_lowercase();
            for token in tokenize(&lower) {
                if token.len() > 2 && !self.stop_words.contains(token) {
                    keywords.insert(stem(token));
                }
            }
            for tool in &self.tool_catalogue {
                if lower.contains(tool.as_str()) {
                    keywords.insert(tool.clone());
                }
            }
        }

        for path in event.file.iter().chain(event.files.iter()) {
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                let lower = segment.to_lowercase();
                if let Some(ext) = lower.rsplit('.').next() {
                    if lower.contains('.') && !ext.is_empty() {
                        keywords.insert(ext.to_string());
                    }
                }
                keywords.insert(lower);
            }
        }

        for process in &event.processes {
            if let Some(name) = process.command.split_whitespace().next() {
                keywords.insert(name.to_lowercase());
            }
        }

        for entry in &event.entries {
            let lower = entry.message.to_lowercase();
            if self.failure_patterns.iter().any(|p| lower.contains(p.as_str())) {
                keywords.insert("error".to_string());
                keywords.insert("troubleshooting".to_string());
            }
        }

        keywords
    }
}

/// Split lowercased text on word boundaries (runs of ASCII alphanumerics).
fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
}

// ============ Porter-style stemmer ============

/// Stem one lowercase token. Implements Porter steps 1a, 1b (with the
/// at/bl/iz, double-consonant, and cvc repairs), and 1c, which covers the
/// plural and participle forms operational text actually produces.
pub fn stem(token: &str) -> String {
    if !token.is_ascii() || token.len() <= 2 {
        return token.to_string();
    }
    let mut word = token.to_string();
    step_1a(&mut word);
    step_1b(&mut word);
    step_1c(&mut word);
    word
}

fn step_1a(word: &mut String) {
    if word.ends_with("sses") {
        word.truncate(word.len() - 2);
    } else if word.ends_with("ies") {
        word.truncate(word.len() - 2);
    } else if word.ends_with("ss") {
        // keep
    } else if word.ends_with('s') && word.len() > 1 {
        word.pop();
    }
}

fn step_1b(word: &mut String) {
    if word.ends_with("eed") {
        if measure(&word.as_bytes()[..word.len() - 3]) > 0 {
            word.pop();
        }
        return;
    }

    let stripped = if word.ends_with("ed") && has_vowel(&word.as_bytes()[..word.len() - 2]) {
        word.truncate(word.len() - 2);
        true
    } else if word.ends_with("ing") && has_vowel(&word.as_bytes()[..word.len() - 3]) {
        word.truncate(word.len() - 3);
        true
    } else {
        false
    };

    if stripped {
        if word.ends_with("at") || word.ends_with("bl") || word.ends_with("iz") {
            word.push('e');
        } else if ends_double_consonant(word.as_bytes())
            && !matches!(word.as_bytes()[word.len() - 1], b'l' | b's' | b'z')
        {
            word.pop();
        } else if measure(word.as_bytes()) == 1 && ends_cvc(word.as_bytes()) {
            word.push('e');
        }
    }
}

fn step_1c(word: &mut String) {
    if word.ends_with('y') && has_vowel(&word.as_bytes()[..word.len() - 1]) {
        word.pop();
        word.push('i');
    }
}

/// True when position `i` holds a consonant under Porter's definition
/// (`y` is a consonant at position 0 or after a vowel).
fn is_consonant(word: &[u8], i: usize) -> bool {
    match word[i] {
        b'a' | b'e' | b'i' | b'o' | b'u' => false,
        b'y' => i == 0 || !is_consonant(word, i - 1),
        _ => true,
    }
}

/// Porter's measure: the number of vowel→consonant transitions.
fn measure(word: &[u8]) -> usize {
    let mut m = 0;
    let mut prev_vowel = false;
    for i in 0..word.len() {
        let cons = is_consonant(word, i);
        if prev_vowel && cons {
            m += 1;
        }
        prev_vowel = !cons;
    }
    m
}

fn has_vowel(word: &[u8]) -> bool {
    (0..word.len()).any(|i| !is_consonant(word, i))
}

fn ends_double_consonant(word: &[u8]) -> bool {
    let n = word.len();
    n >= 2 && word[n - 1] == word[n - 2] && is_consonant(word, n - 1)
}

/// consonant-vowel-consonant ending where the final consonant is not
/// `w`, `x`, or `y`.
fn ends_cvc(word: &[u8]) -> bool {
    let n = word.len();
    n >= 3
        && is_consonant(word, n - 3)
        && !is_consonant(word, n - 2)
        && is_consonant(word, n - 1)
        && !matches!(word[n - 1], b'w' | b'x' | b'y')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventKind, LogEntry, ProcessSample};

    fn extractor() -> KeywordExtractor {
        KeywordExtractor::default()
    }

    #[test]
    fn stems_plurals_and_participles() {
        assert_eq!(stem("pods"), "pod");
        assert_eq!(stem("services"), "service");
        assert_eq!(stem("caresses"), "caress");
        assert_eq!(stem("ponies"), "poni");
        assert_eq!(stem("failed"), "fail");
        assert_eq!(stem("deployed"), "deploi");
        assert_eq!(stem("running"), "run");
        assert_eq!(stem("filing"), "file");
        assert_eq!(stem("agreed"), "agree");
        assert_eq!(stem("troubleshooting"), "troubleshoot");
        assert_eq!(stem("happy"), "happi");
        assert_eq!(stem("sky"), "sky");
    }

    #[test]
    fn short_and_non_ascii_tokens_pass_through() {
        assert_eq!(stem("ls"), "ls");
        assert_eq!(stem("héllos"), "héllos");
    }

    #[test]
    fn command_extraction_stems_and_matches_tools() {
        let event = ContextEvent {
            kind: EventKind::CommandExecution,
            commands: vec!["kubectl get pods".to_string()],
            ..Default::default()
        };
        let keywords = extractor().extract(&event);
        assert!(keywords.contains("kubectl"));
        assert!(keywords.contains("pod"));
        assert!(keywords.contains("get"));
        // "pods" itself must not survive unstemmed
        assert!(!keywords.contains("pods"));
    }

    #[test]
    fn stop_words_and_short_tokens_are_dropped() {
        let event = ContextEvent {
            commands: vec!["do the ls for me and restart".to_string()],
            ..Default::default()
        };
        let keywords = extractor().extract(&event);
        assert!(!keywords.contains("the"));
        assert!(!keywords.contains("and"));
        assert!(!keywords.contains("ls"));
        assert!(!keywords.contains("do"));
        assert!(keywords.contains("restart"));
    }

    #[test]
    fn tool_names_embedded_in_commands_match_as_substrings() {
        let event = ContextEvent {
            commands: vec!["sudo systemctl restart nginx.service".to_string()],
            ..Default::default()
        };
        let keywords = extractor().extract(&event);
        assert!(keywords.contains("systemctl"));
        assert!(keywords.contains("nginx"));
        assert!(keywords.contains("service"));
    }

    #[test]
    fn file_paths_emit_segments_and_extensions() {
        let event = ContextEvent {
            kind: EventKind::FileModification,
            file: Some("/etc/nginx/nginx.conf".to_string()),
            ..Default::default()
        };
        let keywords = extractor().extract(&event);
        assert!(keywords.contains("etc"));
        assert!(keywords.contains("nginx"));
        assert!(keywords.contains("nginx.conf"));
        assert!(keywords.contains("conf"));
    }

    #[test]
    fn processes_emit_first_command_token() {
        let event = ContextEvent {
            kind: EventKind::ProcessAnalysis,
            processes: vec![ProcessSample {
                command: "PostgreS -D /var/lib/postgresql".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let keywords = extractor().extract(&event);
        assert!(keywords.contains("postgres"));
    }

    #[test]
    fn failure_log_lines_add_error_markers() {
        let event = ContextEvent {
            kind: EventKind::LogUpdate,
            entries: vec![LogEntry {
                message: "upstream Connection Refused while reading response".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let keywords = extractor().extract(&event);
        assert!(keywords.contains("error"));
        assert!(keywords.contains("troubleshooting"));
    }

    #[test]
    fn healthy_log_lines_add_nothing() {
        let event = ContextEvent {
            kind: EventKind::LogUpdate,
            entries: vec![LogEntry {
                message: "listening on 0.0.0.0:443".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(extractor().extract(&event).is_empty());
    }

    #[test]
    fn unknown_kind_with_no_payload_extracts_nothing() {
        let event = ContextEvent::default();
        assert!(extractor().extract(&event).is_empty());
    }

    #[test]
    fn extraction_is_deterministic() {
        let event = ContextEvent {
            commands: vec!["docker build -t web . && docker push web".to_string()],
            entries: vec![LogEntry {
                message: "Error: failed to solve".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let first = extractor().extract(&event);
        for _ in 0..10 {
            assert_eq!(extractor().extract(&event), first);
        }
    }
}
