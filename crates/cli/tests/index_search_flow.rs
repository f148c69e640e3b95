use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{TempDir, tempdir};

struct Env {
    _tmp: TempDir,
    config: PathBuf,
    store: PathBuf,
}

impl Env {
    fn new() -> Self {
        let tmp = tempdir().unwrap();
        let store = tmp.path().join("store");
        let config = tmp.path().join("config.toml");
        fs::write(
            &config,
            format!(
                "version = 1\n[profiles.default]\nstorage_root = \"{}\"\ndefault_index = \"docs\"\n\n[logging]\nlevel = \"warn\"\n",
                store.display()
            ),
        )
        .unwrap();
        Self { _tmp: tmp, config, store }
    }

    fn sdb(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("sdb"));
        cmd.arg("--config").arg(&self.config);
        cmd
    }

    fn info_dir(&self) -> PathBuf {
        self.store.join("index_info")
    }
}

fn file_count(dir: &Path) -> usize {
    fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[test]
fn index_run_search_remove() {
    let env = Env::new();

    env.sdb()
        .args(["index", "mod1", "fileA", "--boost", "2", "--weight0", "hello world", "--title", "Doc A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Queued mod1/fileA for index 'docs'"));
    assert_eq!(file_count(&env.info_dir()), 1);

    env.sdb()
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("succeeded:    1"))
        .stdout(predicate::str::contains("Jobs remaining: 0"));
    assert_eq!(file_count(&env.info_dir()), 0);
    assert!(env.store.join("docs.sqlite").exists());

    env.sdb()
        .args(["search", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mod1/fileA"))
        .stdout(predicate::str::contains("Doc A"));

    env.sdb().args(["remove", "mod1", "fileA", "--now"]).assert().success();

    env.sdb()
        .args(["search", "hello", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn search_json_output() {
    let env = Env::new();
    env.sdb()
        .args(["index", "m", "a", "--weight1", "hello help", "--type", "article", "--now"])
        .assert()
        .success();

    let output = env.sdb().args(["search", "hel", "--json"]).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["results"][0]["item_id"], "a");
    assert_eq!(json["results"][0]["type"], "article");
    assert_eq!(json["suggestions"], serde_json::json!(["hello", "help"]));
}

#[test]
fn invalid_index_request_writes_nothing() {
    let env = Env::new();

    env.sdb()
        .args(["index", "m", "a", "--language", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error queueing item"));
    env.sdb().args(["index", "m", "a"]).assert().failure();

    assert_eq!(file_count(&env.info_dir()), 0);
    env.sdb()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("(no queued jobs)"))
        .stdout(predicate::str::contains("pending descriptors: 0"));
}

#[test]
fn search_unknown_index_fails() {
    let env = Env::new();
    env.sdb()
        .args(["search", "hello", "--index", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown index 'nope'"));
}

#[test]
fn status_lists_queued_jobs() {
    let env = Env::new();
    env.sdb().args(["index", "m", "a", "--weight0", "x"]).assert().success();
    env.sdb().args(["remove", "m", "b"]).assert().success();

    let output = env.sdb().args(["status", "--json"]).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let tasks = json["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["action"], "index");
    assert_eq!(tasks[1]["action"], "remove");
    assert_eq!(json["pending_descriptors"], 1);
}
