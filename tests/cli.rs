use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn analyzer_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("analyzer");
    path
}

fn setup_test_env() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let docs = root.join("Forskning");
    fs::create_dir_all(docs.join("sub")).unwrap();
    fs::write(
        docs.join("alpha.txt"),
        "Alpha handlar om församlingsliv och diakoni under efterkrigstiden. ".repeat(10),
    )
    .unwrap();
    fs::write(
        docs.join("sub/beta.txt"),
        "Beta är en predikan om hopp och tröst i svåra tider. ".repeat(10),
    )
    .unwrap();
    fs::write(docs.join("notes.csv"), "a,b,c\n").unwrap();

    let config_content = format!(
        r#"folders = ["{docs}"]
extensions = [".txt", ".docx"]
default_author = "Org X"

[output]
ledger = "{root}/data/processed.json"

[anthropic]
model = "claude-sonnet-4-5"
"#,
        docs = docs.display(),
        root = root.display(),
    );
    let config_path = config_dir.join("analyzer.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path, docs)
}

fn run_analyzer(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = analyzer_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("ANTHROPIC_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run analyzer binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn dry_run_lists_new_files_without_api_key() {
    let (tmp, config_path, _docs) = setup_test_env();

    let (stdout, stderr, success) = run_analyzer(&config_path, &["run", "--dry-run"]);
    assert!(success, "dry run failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("new files:         2"));
    assert!(stdout.contains("alpha.txt"));
    assert!(stdout.contains("beta.txt"));
    assert!(!stdout.contains("notes.csv"));
    assert!(!tmp.path().join("data/processed.json").exists());
}

#[test]
fn dry_run_respects_limit() {
    let (_tmp, config_path, _docs) = setup_test_env();

    let (stdout, _, success) = run_analyzer(&config_path, &["run", "--dry-run", "--limit", "1"]);
    assert!(success);
    assert!(stdout.contains("new files:         1"));
}

#[test]
fn run_without_api_key_fails() {
    let (_tmp, config_path, _docs) = setup_test_env();

    let (_, stderr, success) = run_analyzer(&config_path, &["run", "--progress", "off"]);
    assert!(!success);
    assert!(stderr.contains("ANTHROPIC_API_KEY"));
}

#[test]
fn status_on_empty_ledger() {
    let (_tmp, config_path, _docs) = setup_test_env();

    let (stdout, stderr, success) = run_analyzer(&config_path, &["status"]);
    assert!(success, "status failed: stderr={}", stderr);
    assert!(stdout.contains("Records:      0"));
}

#[test]
fn report_from_existing_ledger() {
    let (tmp, config_path, docs) = setup_test_env();

    let alpha = docs.join("alpha.txt");
    let ledger = serde_json::json!({
        alpha.display().to_string(): {
            "processed_at": "2024-03-01T10:00:00",
            "title": "Alpha",
            "author": "Doe, Jane",
            "analysis": {
                "title": "Alpha",
                "author": "Doe, Jane",
                "summary": "Om diakoni.",
                "type": "artikel",
                "year": 1952,
                "date_full": null,
                "is_citable": true,
                "publication": "Kyrkohistorisk årsskrift",
                "filepath": alpha.display().to_string()
            }
        }
    });
    fs::create_dir_all(tmp.path().join("data")).unwrap();
    fs::write(
        tmp.path().join("data/processed.json"),
        serde_json::to_string_pretty(&ledger).unwrap(),
    )
    .unwrap();

    let (stdout, stderr, success) = run_analyzer(&config_path, &["report"]);
    assert!(success, "report failed: stdout={}, stderr={}", stdout, stderr);

    let report = docs.join("analyzer/analysis-Forskning.docx");
    let ris = docs.join("analyzer/analysis-Forskning.ris");
    assert!(report.exists());
    let ris_text = fs::read_to_string(&ris).unwrap();
    assert!(ris_text.starts_with("TY  - JOUR\n"));
    assert!(ris_text.contains("JO  - Kyrkohistorisk årsskrift\n"));

    let (stdout, _, _) = run_analyzer(&config_path, &["status"]);
    assert!(stdout.contains("Records:      1"));
    assert!(stdout.contains("Citable:      1"));

    // generated outputs are never picked up as input
    let (stdout, _, _) = run_analyzer(&config_path, &["run", "--dry-run"]);
    assert!(stdout.contains("already processed: 1"));
    assert!(stdout.contains("new files:         1"));
}

#[test]
fn report_without_export_writes_only_docx() {
    let (_tmp, config_path, docs) = setup_test_env();

    let (_, stderr, success) = run_analyzer(&config_path, &["report", "--no-export"]);
    assert!(success, "report failed: stderr={}", stderr);
    assert!(docs.join("analyzer/analysis-Forskning.docx").exists());
    assert!(!docs.join("analyzer/analysis-Forskning.ris").exists());
}
