use crate::domain::error::BridgeError;
use std::path::{Path, PathBuf};

pub const METADATA_FILE: &str = "metadata.json";

/// Extract `zip_path` into `dest` on a blocking thread.
pub async fn extract_zip(zip_path: &Path, dest: &Path) -> Result<usize, BridgeError> {
    let zip_path = zip_path.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<usize, BridgeError> {
        use std::fs::File as StdFile;

        let file = StdFile::open(&zip_path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        let mut written = 0;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            // 跳过越出目标目录的条目
            let Some(relative) = entry.enclosed_name() else {
                tracing::warn!("Skipping unsafe archive entry: {}", entry.name());
                continue;
            };
            let outpath = dest.join(relative);

            if entry.is_dir() {
                std::fs::create_dir_all(&outpath)?;
            } else {
                if let Some(p) = outpath.parent() {
                    std::fs::create_dir_all(p)?;
                }
                let mut outfile = StdFile::create(&outpath)?;
                std::io::copy(&mut entry, &mut outfile)?;
                written += 1;
            }
        }
        Ok(written)
    })
    .await
    .map_err(|e| BridgeError::Io(std::io::Error::other(format!("Task join error: {}", e))))?
}

/// Locate the package root inside an extracted archive.
///
/// Packages either carry `metadata.json` at the archive root or inside a
/// single top-level directory.
pub fn find_package_root(extracted: &Path) -> Result<PathBuf, BridgeError> {
    if extracted.join(METADATA_FILE).is_file() {
        return Ok(extracted.to_path_buf());
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(extracted)? {
        let path = entry?.path();
        if path.is_dir() && path.join(METADATA_FILE).is_file() {
            candidates.push(path);
        }
    }

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        0 => Err(BridgeError::Package(format!(
            "No {} found in archive",
            METADATA_FILE
        ))),
        n => Err(BridgeError::Package(format!(
            "Archive contains {} package directories, expected one",
            n
        ))),
    }
}
