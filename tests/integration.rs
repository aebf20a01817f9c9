use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn docsense_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("docsense");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    // Small corpus covering two domains
    fs::write(
        root.join("corpus.json"),
        r#"[
  {
    "id": "doc-k8s-pods",
    "title": "Debugging Kubernetes Pods",
    "content": "Use kubectl describe pod and kubectl logs to debug pods stuck in CrashLoopBackOff. Check events and container exit codes.",
    "tags": ["kubernetes", "troubleshooting"],
    "keywords": ["kubectl", "pod", "crashloopbackoff"],
    "category": "troubleshooting",
    "priority": 1
  },
  {
    "id": "doc-nginx-tuning",
    "title": "Nginx Performance Tuning",
    "content": "Tuning worker_processes and keepalive settings in nginx for high-throughput deployments.",
    "tags": ["nginx", "performance"],
    "keywords": ["nginx", "worker"],
    "category": "operations",
    "priority": 2
  }
]"#,
    )
    .unwrap();

    // A kubectl command event
    fs::write(
        root.join("event.json"),
        r#"{
  "type": "command_execution",
  "commands": ["kubectl get pods --all-namespaces", "kubectl describe pod web-7f9c"]
}"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/docsense.sqlite"

[engine]
suggestion_threshold = 0.7
max_suggestions = 10

[server]
bind = "127.0.0.1:8421"
"#,
        root.display()
    );

    let config_path = config_dir.join("docsense.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_docsense(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docsense_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docsense binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_docsense(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_docsense(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_docsense(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_load_imports_corpus() {
    let (tmp, config_path) = setup_test_env();

    run_docsense(&config_path, &["init"]);
    let corpus = tmp.path().join("corpus.json");
    let (stdout, stderr, success) =
        run_docsense(&config_path, &["load", corpus.to_str().unwrap()]);
    assert!(success, "load failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("2 inserted"));
    assert!(stdout.contains("0 updated"));
}

#[test]
fn test_reload_updates_instead_of_duplicating() {
    let (tmp, config_path) = setup_test_env();

    run_docsense(&config_path, &["init"]);
    let corpus = tmp.path().join("corpus.json");
    run_docsense(&config_path, &["load", corpus.to_str().unwrap()]);
    let (stdout, _, success) = run_docsense(&config_path, &["load", corpus.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("0 inserted"));
    assert!(stdout.contains("2 updated"));
}

#[test]
fn test_analyze_surfaces_relevant_suggestions() {
    let (tmp, config_path) = setup_test_env();

    run_docsense(&config_path, &["init"]);
    let corpus = tmp.path().join("corpus.json");
    run_docsense(&config_path, &["load", corpus.to_str().unwrap()]);

    let event = tmp.path().join("event.json");
    let (stdout, stderr, success) =
        run_docsense(&config_path, &["analyze", event.to_str().unwrap()]);
    assert!(
        success,
        "analyze failed: stdout={}, stderr={}",
        stdout, stderr
    );

    let analysis: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    // kubectl survives extraction and vectorization
    let keywords = analysis["keywords"].as_array().unwrap();
    assert!(keywords.iter().any(|k| k == "kubectl"));
    assert!(analysis["context_vector"]["kubectl"].as_f64().unwrap() >= 3.0 - 1e-9);

    // the k8s troubleshooting rule fires for a kubectl command
    let suggestions = analysis["suggestions"].as_array().unwrap();
    assert!(suggestions
        .iter()
        .any(|s| s["id"] == "rule-k8s-troubleshooting"));

    // everything surfaced respects the configured threshold
    for s in suggestions {
        let score = s["relevance_score"].as_f64().unwrap();
        assert!((0.7..=1.0).contains(&score), "score out of range: {}", score);
    }
}

#[test]
fn test_analyze_all_includes_below_threshold() {
    let (tmp, config_path) = setup_test_env();

    run_docsense(&config_path, &["init"]);
    let corpus = tmp.path().join("corpus.json");
    run_docsense(&config_path, &["load", corpus.to_str().unwrap()]);

    let event = tmp.path().join("event.json");
    let (stdout, _, success) =
        run_docsense(&config_path, &["analyze", event.to_str().unwrap(), "--all"]);
    assert!(success);

    let analysis: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let all = analysis["suggestions"].as_array().unwrap().len();

    let (filtered_stdout, _, _) =
        run_docsense(&config_path, &["analyze", event.to_str().unwrap()]);
    let filtered: serde_json::Value = serde_json::from_str(&filtered_stdout).unwrap();
    let surfaced = filtered["suggestions"].as_array().unwrap().len();

    assert!(all >= surfaced);
}

#[test]
fn test_analyze_unrelated_event_yields_no_rule_hits() {
    let (tmp, config_path) = setup_test_env();

    run_docsense(&config_path, &["init"]);

    let event = tmp.path().join("quiet.json");
    fs::write(
        &event,
        r#"{"type": "command_execution", "commands": ["ls -la /var/tmp"]}"#,
    )
    .unwrap();

    let (stdout, _, success) =
        run_docsense(&config_path, &["analyze", event.to_str().unwrap()]);
    assert!(success);

    let analysis: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let suggestions = analysis["suggestions"].as_array().unwrap();
    assert!(suggestions.is_empty());
}

#[test]
fn test_stats_reports_corpus_counts() {
    let (tmp, config_path) = setup_test_env();

    run_docsense(&config_path, &["init"]);
    let corpus = tmp.path().join("corpus.json");
    run_docsense(&config_path, &["load", corpus.to_str().unwrap()]);

    let (stdout, stderr, success) = run_docsense(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Documentation: 2"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(
        &config_path,
        "[db]\npath = \"/tmp/x.db\"\n[engine]\nsuggestion_threshold = 2.0\n",
    )
    .unwrap();

    let (_, stderr, success) = run_docsense(&config_path, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("suggestion_threshold"));
}
