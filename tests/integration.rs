use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ckb_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ckb");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let data_dir = root.join("documents");
    fs::create_dir_all(&data_dir).unwrap();

    fs::write(
        data_dir.join("agenda.json"),
        r#"{
  "name": "Agenda del Congreso Nacional",
  "agenda": {
    "dia_uno": "La plenaria inaugural del congreso de palmicultores comienza a las nueve de la mañana con la intervención del presidente del gremio.",
    "dia_dos": "Charlas comerciales sobre aceite de palma alto oleico y nutrición de cultivos durante toda la jornada del segundo día del evento."
  }
}"#,
    )
    .unwrap();

    fs::write(
        data_dir.join("dao.json"),
        r#"{
  "name": "DAO Comercializadora",
  "perfil": "DAO es la comercializadora internacional de aceite de palma alto oleico del grupo empresarial, con operaciones de exportación hacia Europa y Norteamérica."
}"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[corpus]
data_dir = "{}/documents"
collection = "FEDEPALMA"

[retrieval]
limit = 3
threshold = 0.2

[server]
bind = "127.0.0.1:7610"
"#,
        root.display()
    );

    let config_path = root.join("ckb.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ckb(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ckb_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ckb binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_load_prints_chunk_summary() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ckb(&config_path, &["load"]);
    assert!(success, "load failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Loaded 2 chunks"));
    assert!(stdout.contains("agenda.json_agenda_0"));
    assert!(stdout.contains("Agenda del Congreso Nacional - agenda"));
}

#[test]
fn test_load_categorizes_documents() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_ckb(&config_path, &["load"]);
    assert!(success);
    // agenda.json matches the events rules, dao.json the company rules
    assert!(stdout.contains("events"));
    assert!(stdout.contains("company"));
}

#[test]
fn test_load_missing_directory_is_empty_not_an_error() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("ckb.toml");
    fs::write(
        &config_path,
        format!(
            r#"[corpus]
data_dir = "{}/does-not-exist"

[server]
bind = "127.0.0.1:7610"
"#,
            tmp.path().display()
        ),
    )
    .unwrap();

    let (stdout, _, success) = run_ckb(&config_path, &["load"]);
    assert!(success);
    assert!(stdout.contains("No chunks loaded"));
}

#[test]
fn test_keyword_search_ranks_matching_chunk() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ckb(
        &config_path,
        &["search", "plenaria del congreso", "--mode", "keyword"],
    );
    assert!(
        success,
        "search failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("result(s)"));
    assert!(stdout.contains("Agenda del Congreso Nacional - agenda"));
}

#[test]
fn test_search_respects_limit() {
    let (_tmp, config_path) = setup_test_env();

    // "aceite" appears in both documents; limit 1 keeps only the best.
    let (stdout, _, success) = run_ckb(
        &config_path,
        &[
            "search",
            "aceite de palma",
            "--mode",
            "keyword",
            "--limit",
            "1",
        ],
    );
    assert!(success);
    assert!(stdout.contains("1 result(s)"));
}

#[test]
fn test_search_no_results_for_off_topic_query() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_ckb(
        &config_path,
        &["search", "astronomía galaxias", "--mode", "keyword"],
    );
    assert!(success);
    assert!(stdout.contains("No results"));
}

#[test]
fn test_search_rejects_unknown_mode() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_ckb(&config_path, &["search", "congreso", "--mode", "hybrid"]);
    assert!(!success);
    assert!(stderr.contains("unknown search mode"));
}

#[test]
fn test_search_rejects_out_of_range_threshold() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_ckb(
        &config_path,
        &["search", "congreso", "--threshold", "1.5"],
    );
    assert!(!success);
    assert!(stderr.contains("threshold must be between 0 and 1"));
}

#[test]
fn test_missing_config_file_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("absent.toml");

    let (_, stderr, success) = run_ckb(&config_path, &["load"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
