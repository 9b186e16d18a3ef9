//! Shared fixtures: phrase tables, package archives and a local index.
#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

pub const METADATA_FILE: &str = "metadata.json";
pub const PHRASES_FILE: &str = "phrases.db";

pub fn metadata_json(from: &str, to: &str) -> String {
    serde_json::json!({
        "from_code": from,
        "from_name": "From",
        "to_code": to,
        "to_name": "To",
        "package_version": "1.0"
    })
    .to_string()
}

pub fn phrase_db(path: &Path, rows: &[(&str, &str)]) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute(
        "CREATE TABLE phrases (source TEXT PRIMARY KEY, target TEXT NOT NULL)",
        [],
    )
    .unwrap();
    for (source, target) in rows {
        conn.execute("INSERT INTO phrases VALUES (?1, ?2)", [source, target])
            .unwrap();
    }
}

/// Lay out an installed package directly under `<data>/packages/<from>_<to>`.
pub fn install(data: &Path, from: &str, to: &str, rows: &[(&str, &str)]) {
    let dir = data.join("packages").join(format!("{}_{}", from, to));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(METADATA_FILE), metadata_json(from, to)).unwrap();
    phrase_db(&dir.join(PHRASES_FILE), rows);
}

/// Build a downloadable package archive.
pub fn package_zip(path: &Path, from: &str, to: &str, rows: &[(&str, &str)]) {
    let scratch = tempfile::tempdir().unwrap();
    let db = scratch.path().join(PHRASES_FILE);
    phrase_db(&db, rows);

    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let prefix = format!("translate-{}_{}", from, to);
    zip.start_file(format!("{}/{}", prefix, METADATA_FILE), SimpleFileOptions::default())
        .unwrap();
    zip.write_all(metadata_json(from, to).as_bytes()).unwrap();
    zip.start_file(format!("{}/{}", prefix, PHRASES_FILE), SimpleFileOptions::default())
        .unwrap();
    zip.write_all(&std::fs::read(&db).unwrap()).unwrap();
    zip.finish().unwrap();
}

/// A scratch environment: empty config, data dir and a mirror with an index.
pub struct Sandbox {
    pub root: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("config.toml"), "").unwrap();
        std::fs::create_dir_all(root.path().join("mirror")).unwrap();
        std::fs::write(root.path().join("mirror").join("index.json"), "[]").unwrap();
        Self { root }
    }

    pub fn config(&self) -> PathBuf {
        self.root.path().join("config.toml")
    }

    pub fn data(&self) -> PathBuf {
        self.root.path().join("data")
    }

    pub fn index(&self) -> PathBuf {
        self.root.path().join("mirror").join("index.json")
    }

    /// Publish one archive for `from -> to` in the mirror index.
    pub fn publish(&self, from: &str, to: &str, rows: &[(&str, &str)]) {
        let archive = self
            .root
            .path()
            .join("mirror")
            .join(format!("{}_{}.zip", from, to));
        package_zip(&archive, from, to, rows);
        let index = serde_json::json!([{
            "from_code": from,
            "to_code": to,
            "package_version": "1.0",
            "links": [archive.display().to_string()]
        }]);
        std::fs::write(self.index(), index.to_string()).unwrap();
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            "--config".to_string(),
            self.config().display().to_string(),
            "--data-dir".to_string(),
            self.data().display().to_string(),
            "--index-url".to_string(),
            self.index().display().to_string(),
        ]
    }
}

/// Parse every stdout line as JSON.
pub fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
