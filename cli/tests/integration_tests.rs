use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path =
            std::env::temp_dir().join(format!("hypercube_cli_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Config with relative paths, resolved against the temp dir. The base URIs
/// point nowhere so an accidental fetch fails fast.
fn write_config(dir: &TempDir) -> PathBuf {
    let yaml = r#"database: hypercube.sqlite
blob_dir: ugc
staging_dir: tmp
english_base: http://127.0.0.1:9/en-gb/
welsh_base: http://127.0.0.1:9/cy-gb/
"#;
    let path = dir.join("hypercube.yml");
    fs::write(&path, yaml).expect("failed to write config");
    path
}

fn hypercube(config: &PathBuf, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hypercube"))
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("failed to run hypercube")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn init_creates_database_and_directories() {
    let dir = TempDir::new("init");
    let config = write_config(&dir);

    let output = hypercube(&config, &["init"]);

    assert!(output.status.success(), "init failed: {}", stderr(&output));
    assert!(dir.join("hypercube.sqlite").is_file());
    assert!(dir.join("ugc").is_dir());
    assert!(dir.join("tmp").is_dir());
    assert!(stdout(&output).contains("Initialised"));
}

#[test]
fn init_writes_effective_config() {
    let dir = TempDir::new("init_write_config");
    let config = write_config(&dir);
    let written = dir.join("effective.yml");

    let output = hypercube(&config, &["init", "--write-config", written.to_str().unwrap()]);

    assert!(output.status.success(), "init failed: {}", stderr(&output));
    let yaml = fs::read_to_string(&written).unwrap();
    assert!(yaml.contains("127.0.0.1:9/en-gb/"));
    assert!(yaml.contains("initial_secs: 64"));
}

#[test]
fn status_reports_current_schema() {
    let dir = TempDir::new("status");
    let config = write_config(&dir);

    let output = hypercube(&config, &["status", "--json"]);

    assert!(output.status.success(), "status failed: {}", stderr(&output));
    let status: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(status["current"], true);
    assert_eq!(status["cache_entries"], 0);
    assert_eq!(status["schema_version"], status["known_steps"]);
}

#[test]
fn check_passes_on_empty_database() {
    let dir = TempDir::new("check");
    let config = write_config(&dir);

    let output = hypercube(&config, &["check"]);

    assert!(output.status.success(), "check failed: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("check_dataset_collection"));
    assert!(text.contains("odata_metadata_tag_duplicates"));
    assert!(!text.contains("FAIL"));
}

#[test]
fn verify_cache_on_empty_cache() {
    let dir = TempDir::new("verify_cache");
    let config = write_config(&dir);

    let output = hypercube(&config, &["verify-cache"]);

    assert!(output.status.success(), "verify-cache failed: {}", stderr(&output));
    assert!(stdout(&output).contains("Verified 0 blob(s), 0 bad."));
}

#[test]
fn purge_keeps_schema_current() {
    let dir = TempDir::new("purge");
    let config = write_config(&dir);

    assert!(hypercube(&config, &["init"]).status.success());
    let output = hypercube(&config, &["purge"]);
    assert!(output.status.success(), "purge failed: {}", stderr(&output));

    let status = hypercube(&config, &["status", "--json"]);
    let status: serde_json::Value = serde_json::from_str(&stdout(&status)).unwrap();
    assert_eq!(status["current"], true);
}

#[test]
fn load_rejects_unknown_loader() {
    let dir = TempDir::new("load_unknown");
    let config = write_config(&dir);

    let output = hypercube(&config, &["load", "--only", "nope"]);

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("unknown loader 'nope'"));
    assert!(err.contains("dataset_collections"));
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = TempDir::new("missing_config");
    let output = hypercube(&dir.join("absent.yml"), &["status"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to load config"));
}
