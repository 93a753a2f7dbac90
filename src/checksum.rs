//! Content-hash manifests for a directory tree
//!
//! A manifest maps each regular file's path (relative to the scanned root,
//! forward slashes) to the SHA-256 of its bytes. It is an integrity and
//! staleness signal, computed fresh on every run and never diffed here.

use crate::checks::display_relative;
use crate::error::ChecksumError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const ALGORITHM: &str = "sha256";
pub const DEFAULT_MANIFEST_FILE: &str = "asset_checksums.json";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumManifest {
    pub files: BTreeMap<String, String>,
    /// Entries that could not be hashed, with the reason
    pub skipped: Vec<(String, String)>,
}

impl ChecksumManifest {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }
}

/// On-disk shape of a persisted manifest
#[derive(Serialize)]
struct ManifestDocument<'a> {
    algorithm: &'static str,
    file_count: usize,
    files: &'a BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumStore;

impl ChecksumStore {
    pub fn new() -> Self {
        Self
    }

    /// Hashes every regular file under `root`. A missing root yields an empty
    /// manifest; unreadable entries are skipped with a warning.
    pub fn compute_manifest(&self, root: &Path) -> ChecksumManifest {
        let mut manifest = ChecksumManifest::default();
        if !root.is_dir() {
            tracing::warn!(root = %root.display(), "checksum root not found");
            return manifest;
        }

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let label = err
                        .path()
                        .map(|p| display_relative(p, root))
                        .unwrap_or_default();
                    tracing::warn!(path = %label, error = %err, "skipping unreadable entry");
                    manifest.skipped.push((label, err.to_string()));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let label = display_relative(entry.path(), root);
            match hash_file(entry.path()) {
                Ok(digest) => {
                    manifest.files.insert(label, digest);
                }
                Err(err) => {
                    tracing::warn!(path = %label, error = %err, "skipping file");
                    manifest.skipped.push((label, err.to_string()));
                }
            }
        }

        tracing::debug!(
            root = %root.display(),
            files = manifest.len(),
            skipped = manifest.skipped.len(),
            "checksum manifest computed"
        );
        manifest
    }

    /// Writes `manifest` as pretty JSON, creating parent directories
    pub fn persist(&self, manifest: &ChecksumManifest, dest: &Path) -> Result<(), ChecksumError> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ChecksumError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let document = ManifestDocument {
            algorithm: ALGORITHM,
            file_count: manifest.files.len(),
            files: &manifest.files,
        };
        let mut body = serde_json::to_string_pretty(&document)?;
        body.push('\n');

        fs::write(dest, body).map_err(|source| ChecksumError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %dest.display(), files = manifest.files.len(), "checksums saved");
        Ok(())
    }

    /// Default destination under the configured temp directory
    pub fn default_destination(temp_dir: &Path) -> PathBuf {
        temp_dir.join(DEFAULT_MANIFEST_FILE)
    }
}

fn hash_file(path: &Path) -> std::io::Result<String> {
    let contents = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&contents);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("textures")).unwrap();
        fs::write(dir.path().join("textures/ship.png"), b"\x89PNG ship").unwrap();
        fs::write(dir.path().join("theme.ogg"), b"OggS").unwrap();
        dir
    }

    #[test]
    fn manifest_is_keyed_by_relative_path() {
        let dir = tree();
        let manifest = ChecksumStore::new().compute_manifest(dir.path());
        let keys: Vec<_> = manifest.files.keys().cloned().collect();
        assert_eq!(keys, vec!["textures/ship.png", "theme.ogg"]);
        assert!(manifest.files.values().all(|h| h.len() == 64));
    }

    #[test]
    fn known_digest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("empty.bin"), b"").unwrap();
        let manifest = ChecksumStore::new().compute_manifest(dir.path());
        assert_eq!(
            manifest.get("empty.bin"),
            Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
    }

    #[test]
    fn missing_root_is_empty() {
        let manifest = ChecksumStore::new().compute_manifest(Path::new("/nonexistent/assets"));
        assert!(manifest.is_empty());
        assert!(manifest.skipped.is_empty());
    }

    #[test]
    fn persisted_document_has_header_fields() {
        let dir = tree();
        let store = ChecksumStore::new();
        let manifest = store.compute_manifest(dir.path());
        let dest = dir.path().join("out/nested/asset_checksums.json");
        store.persist(&manifest, &dest).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
        assert_eq!(value["algorithm"], "sha256");
        assert_eq!(value["file_count"], 2);
        assert_eq!(
            value["files"]["theme.ogg"].as_str(),
            manifest.get("theme.ogg")
        );
    }
}
