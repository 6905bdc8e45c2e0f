//! End-to-end tests driving the `folio` binary.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::{json, Value};
use tempfile::TempDir;

use folio::blob::{BlobStore, FsBlobStore};
use folio::model::{Artifact, Category, CoverAssignment, Project};
use folio::storage::SqliteStorage;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\ncli-photo";

struct Site {
    _home: TempDir,
    root: PathBuf,
}

impl Site {
    fn new() -> Self {
        let home = TempDir::new().unwrap();
        let root = home.path().to_path_buf();
        Self { _home: home, root }
    }

    fn db(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.db"))
    }

    fn blobs(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}-blobs"))
    }

    fn folio(&self, store: &str) -> Command {
        let mut cmd = Command::cargo_bin("folio").unwrap();
        cmd.env("HOME", &self.root)
            .env_remove("FOLIO_DB")
            .env_remove("FOLIO_BLOB_DIR")
            .env_remove("FOLIO_TEST_DB")
            .env_remove("FOLIO_BLOB_PREFIX")
            .env_remove("FOLIO_PROXY_PATH")
            .env_remove("RUST_LOG")
            .arg("--db")
            .arg(self.db(store))
            .arg("--blobs")
            .arg(self.blobs(store))
            .args(["--actor", "tester", "--json"]);
        cmd
    }

    fn init(&self, store: &str) {
        let output = self.folio(store).arg("init").output().unwrap();
        assert!(output.status.success(), "init failed: {output:?}");
    }

    fn seed_chair(&self, store: &str) {
        let mut storage = SqliteStorage::open(&self.db(store)).unwrap();
        let blobs = FsBlobStore::open(self.blobs(store)).unwrap();

        let category = Category::new("wood", "Wood", true);
        storage.create_category(&category, "seed").unwrap();
        let project = Project::new("chair", "Chair");
        storage.create_project(&project, "seed").unwrap();
        storage
            .link_project_category(&project.id, &category.id, "seed")
            .unwrap();

        blobs.put("artifacts/chair.png", PNG, "image/png").unwrap();
        let artifact = Artifact::new(&project.id, "image-v1", json!({"imageUrl": "/artifacts/chair.png"}));
        storage.insert_artifact(&artifact, "seed").unwrap();
        storage
            .set_cover(
                &CoverAssignment::with_defaults(&project.id, &artifact.id, None, None, None),
                "seed",
            )
            .unwrap();
    }
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

fn stderr_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stderr).unwrap()
}

fn export(site: &Site, store: &str, path: &Path) -> Value {
    let output = site
        .folio(store)
        .args(["export", "-o"])
        .arg(path)
        .output()
        .unwrap();
    assert!(output.status.success(), "export failed: {output:?}");
    stdout_json(&output)
}

#[test]
fn test_version_json() {
    let site = Site::new();
    let output = site.folio("a").arg("version").output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["manifest_version"], 1);
}

#[test]
fn test_commands_require_init() {
    let site = Site::new();
    let output = site.folio("a").args(["gc", "--dry-run"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stderr_json(&output)["error"]["code"], "NOT_INITIALIZED");
}

#[test]
fn test_init_twice_needs_force() {
    let site = Site::new();
    site.init("a");

    let output = site.folio("a").arg("init").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stderr_json(&output)["error"]["code"], "ALREADY_INITIALIZED");

    let output = site.folio("a").args(["init", "--force"]).output().unwrap();
    assert!(output.status.success());
}

#[test]
fn test_export_then_import_into_fresh_store() {
    let site = Site::new();
    site.init("source");
    site.seed_chair("source");
    site.init("target");

    let archive = site.root.join("out/site.zip");
    let exported = export(&site, "source", &archive);
    assert_eq!(exported["stats"]["projects"], 1);
    assert_eq!(exported["stats"]["mediaWritten"], 1);
    assert!(archive.exists());
    assert!(!site.root.join("out/site.zip.partial").exists());

    let output = site.folio("target").arg("import").arg(&archive).output().unwrap();
    assert!(output.status.success(), "import failed: {output:?}");
    let summary = &stdout_json(&output)["summary"];
    assert_eq!(summary["projectsCreated"], 1);
    assert_eq!(summary["artifactsCreated"], 1);
    assert_eq!(summary["imagesUploaded"], 1);
    assert_eq!(summary["warnings"], json!([]));

    let storage = SqliteStorage::open(&site.db("target")).unwrap();
    let chair = storage.get_project_by_name("chair").unwrap().unwrap();
    let artifacts = storage.get_artifacts(&chair.id).unwrap();
    let key = artifacts[0].data_blob["imageUrl"]
        .as_str()
        .unwrap()
        .trim_start_matches('/')
        .to_string();
    let blobs = FsBlobStore::open(site.blobs("target")).unwrap();
    assert_eq!(blobs.get_bytes(&key).unwrap(), PNG);
}

#[test]
fn test_reimport_with_merge_is_idempotent() {
    let site = Site::new();
    site.init("a");
    site.seed_chair("a");
    let archive = site.root.join("site.zip");
    export(&site, "a", &archive);

    let output = site
        .folio("a")
        .arg("import")
        .arg(&archive)
        .args(["--default", "upsert"])
        .output()
        .unwrap();
    assert!(output.status.success(), "import failed: {output:?}");
    let summary = &stdout_json(&output)["summary"];
    assert_eq!(summary["projectsMerged"], 1);
    assert_eq!(summary["artifactsCreated"], 0);
    assert_eq!(summary["imagesUploaded"], 0);
}

#[test]
fn test_preview_marks_existing_projects() {
    let site = Site::new();
    site.init("a");
    site.seed_chair("a");
    let archive = site.root.join("site.zip");
    export(&site, "a", &archive);

    let output = site.folio("a").arg("preview").arg(&archive).output().unwrap();
    assert!(output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["hashedManifest"], true);
    assert_eq!(report["projects"][0]["name"], "chair");
    assert_eq!(report["projects"][0]["exists"], true);
}

#[test]
fn test_import_errors_map_to_exit_codes() {
    let site = Site::new();
    site.init("a");

    let missing = site.folio("a").args(["import", "nope.zip"]).output().unwrap();
    assert_eq!(missing.status.code(), Some(3));
    assert_eq!(stderr_json(&missing)["error"]["code"], "ARCHIVE_NOT_FOUND");

    let not_zip = site.root.join("notes.zip");
    std::fs::write(&not_zip, b"plain text").unwrap();
    let invalid = site.folio("a").arg("import").arg(&not_zip).output().unwrap();
    assert_eq!(invalid.status.code(), Some(6));
    assert_eq!(stderr_json(&invalid)["error"]["code"], "INVALID_ARCHIVE");

    let typo = site
        .folio("a")
        .arg("import")
        .arg(&not_zip)
        .args(["--default", "mrege"])
        .output()
        .unwrap();
    assert_eq!(typo.status.code(), Some(4));
    let error = &stderr_json(&typo)["error"];
    assert_eq!(error["code"], "INVALID_RESOLUTION");
    assert!(error["hint"].as_str().unwrap().contains("merge"));
}

#[test]
fn test_gc_removes_unreferenced_blobs() {
    let site = Site::new();
    site.init("a");
    site.seed_chair("a");
    let blobs = FsBlobStore::open(site.blobs("a")).unwrap();
    blobs.put("artifacts/stale.png", PNG, "image/png").unwrap();

    let dry = site.folio("a").args(["gc", "--dry-run"]).output().unwrap();
    assert!(dry.status.success());
    let stats = stdout_json(&dry);
    assert_eq!(stats["orphaned"], 1);
    assert_eq!(stats["deleted"], 0);

    let output = site.folio("a").arg("gc").output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["deleted"], 1);
    assert!(blobs.get("artifacts/stale.png").is_err());
    assert!(blobs.get("artifacts/chair.png").is_ok());
}
