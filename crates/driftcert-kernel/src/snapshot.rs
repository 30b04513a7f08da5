//! Materialized file-tree snapshots: `relative path -> (bytes, content hash)`.
//!
//! The engine never reaches into version control. Callers hand over two
//! snapshots; `Snapshot::from_dir` is a convenience for trees already
//! checked out on disk.

use crate::error::KernelError;
use crate::hash::ContentHash;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Raw file content plus its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub bytes: Vec<u8>,
    pub hash: ContentHash,
}

impl FileBlob {
    /// Hash the bytes with sha256.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let hash = ContentHash::from_bytes(&bytes);
        Self { bytes, hash }
    }

    /// Use a hash supplied by the caller.
    pub fn with_hash(bytes: impl Into<Vec<u8>>, hash: ContentHash) -> Self {
        Self {
            bytes: bytes.into(),
            hash,
        }
    }
}

/// A file tree keyed by forward-slash relative path, iterated in path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<String, FileBlob>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<str>, blob: FileBlob) {
        self.files.insert(normalize_rel_path(path.as_ref()), blob);
    }

    /// Insert text content, hashing it.
    pub fn insert_text(&mut self, path: impl AsRef<str>, text: &str) {
        self.insert(path, FileBlob::new(text.as_bytes()));
    }

    pub fn get(&self, path: &str) -> Option<&FileBlob> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FileBlob)> {
        self.files.iter()
    }

    /// The `path -> hash` view consumed by the structural differ.
    pub fn hash_index(&self) -> BTreeMap<String, ContentHash> {
        self.files
            .iter()
            .map(|(path, blob)| (path.clone(), blob.hash.clone()))
            .collect()
    }

    /// Read every regular file under `root`.
    ///
    /// Hidden entries (any path component starting with `.`, which covers
    /// `.git/`) are skipped.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self, KernelError> {
        let root = root.as_ref();
        let mut snapshot = Snapshot::new();
        walk(root, root, &mut snapshot)?;
        tracing::debug!(root = %root.display(), files = snapshot.len(), "snapshot loaded");
        Ok(snapshot)
    }
}

impl FromIterator<(String, FileBlob)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (String, FileBlob)>>(iter: T) -> Self {
        let mut snapshot = Snapshot::new();
        for (path, blob) in iter {
            snapshot.insert(path, blob);
        }
        snapshot
    }
}

fn walk(root: &Path, dir: &Path, snapshot: &mut Snapshot) -> Result<(), KernelError> {
    let io_err = |source| KernelError::Snapshot {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir)
        .map_err(io_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type().map_err(|source| KernelError::Snapshot {
            path: path.clone(),
            source,
        })?;
        if file_type.is_dir() {
            walk(root, &path, snapshot)?;
        } else if file_type.is_file() {
            let rel = path
                .strip_prefix(root)
                .map_err(|_| KernelError::InvalidPath(path.display().to_string()))?;
            let rel = rel
                .to_str()
                .ok_or_else(|| KernelError::InvalidPath(rel.display().to_string()))?;
            let bytes = fs::read(&path).map_err(|source| KernelError::Snapshot {
                path: path.clone(),
                source,
            })?;
            snapshot.insert(rel, FileBlob::new(bytes));
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_normalized() {
        let mut snap = Snapshot::new();
        snap.insert_text("./config\\app.yml", "a: 1\n");
        assert!(snap.get("config/app.yml").is_some());
    }

    #[test]
    fn hash_index_matches_blob_hashes() {
        let mut snap = Snapshot::new();
        snap.insert_text("b.yml", "x");
        snap.insert_text("a.yml", "x");
        let index = snap.hash_index();
        let paths: Vec<&String> = index.keys().collect();
        assert_eq!(paths, ["a.yml", "b.yml"]);
        assert_eq!(index["a.yml"], index["b.yml"]);
    }

    #[test]
    fn caller_supplied_hash_is_kept() {
        let blob = FileBlob::with_hash(b"abc".to_vec(), ContentHash("h1".into()));
        assert_eq!(blob.hash.as_str(), "h1");
    }
}
