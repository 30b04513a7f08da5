//! Metadata deltas for binary files, zip archives and tarballs.

use crate::delta::{Category, ChangeType, Delta};
use crate::hash::ContentHash;
use crate::locator::Locator;
use flate2::read::GzDecoder;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const GZIP_MAGIC: &[u8] = b"\x1f\x8b";
const TAR_MAGIC: &[u8] = b"ustar";
const TAR_MAGIC_OFFSET: usize = 257;
const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

fn describe(bytes: &[u8]) -> String {
    format!(
        "size={} sha256={}",
        bytes.len(),
        ContentHash::from_bytes(bytes).as_str()
    )
}

/// A `binary_meta` delta, plus an `archive_delta` when both sides are
/// readable zip or tar archives whose members differ. Zips also get one
/// `archive_manifest` delta per changed `META-INF/MANIFEST.MF` attribute.
pub fn diff_binary(file: &str, golden: &[u8], candidate: &[u8]) -> Vec<Delta> {
    let mut out = vec![Delta::new(
        Category::BinaryMeta,
        file,
        Locator::path([file]),
        ChangeType::Modified,
        Some(describe(golden)),
        Some(describe(candidate)),
    )];

    if golden.starts_with(ZIP_MAGIC) && candidate.starts_with(ZIP_MAGIC) {
        if let (Some(old), Some(new)) = (read_zip(file, golden), read_zip(file, candidate)) {
            out.extend(member_delta(file, &old.entries, &new.entries));
            out.extend(manifest_deltas(file, &old.manifest, &new.manifest));
        }
    } else if let (Some(old), Some(new)) = (read_tar(file, golden), read_tar(file, candidate)) {
        out.extend(member_delta(file, &old, &new));
    }
    out
}

/// Member name → size on each side, summarized as added, removed and
/// resized counts.
fn member_delta(file: &str, old: &BTreeMap<String, u64>, new: &BTreeMap<String, u64>) -> Option<Delta> {
    let added = new.keys().filter(|k| !old.contains_key(*k)).count();
    let removed = old.keys().filter(|k| !new.contains_key(*k)).count();
    let changed = old
        .iter()
        .filter(|(k, size)| new.get(*k).is_some_and(|s| s != *size))
        .count();
    (added + removed + changed > 0).then(|| {
        Delta::new(
            Category::ArchiveDelta,
            file,
            Locator::path([file]),
            ChangeType::Modified,
            Some(format!("entries={}", old.len())),
            Some(format!("entries={} (+{added} -{removed} ~{changed})", new.len())),
        )
    })
}

fn manifest_deltas(
    file: &str,
    old: &BTreeMap<String, String>,
    new: &BTreeMap<String, String>,
) -> Vec<Delta> {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    let mut out = Vec::new();
    for key in keys {
        let before = old.get(key);
        let after = new.get(key);
        if before == after {
            continue;
        }
        let change_type = match (before, after) {
            (None, Some(_)) => ChangeType::Added,
            (Some(_), None) => ChangeType::Removed,
            _ => ChangeType::Modified,
        };
        out.push(Delta::new(
            Category::ArchiveManifest,
            file,
            Locator::path(["MANIFEST", key.as_str()]),
            change_type,
            before.cloned(),
            after.cloned(),
        ));
    }
    out
}

struct ZipContents {
    entries: BTreeMap<String, u64>,
    manifest: BTreeMap<String, String>,
}

fn read_zip(file: &str, bytes: &[u8]) -> Option<ZipContents> {
    let mut archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(err) => {
            tracing::debug!(file, error = %err, "not a readable zip archive");
            return None;
        }
    };
    let mut entries = BTreeMap::new();
    for index in 0..archive.len() {
        if let Ok(entry) = archive.by_index(index) {
            entries.insert(entry.name().to_string(), entry.size());
        }
    }
    let mut manifest = BTreeMap::new();
    if let Ok(mut entry) = archive.by_name(MANIFEST_PATH) {
        let mut raw = Vec::new();
        if entry.read_to_end(&mut raw).is_ok() {
            for line in String::from_utf8_lossy(&raw).lines() {
                if let Some((key, value)) = line.split_once(':') {
                    manifest.insert(key.trim().to_string(), value.trim().to_string());
                }
            }
        }
    }
    Some(ZipContents { entries, manifest })
}

fn is_tar(bytes: &[u8]) -> bool {
    bytes.get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len()) == Some(TAR_MAGIC)
}

/// Raw tar bytes, inflating a gzip wrapper first.
fn tar_bytes<'a>(file: &str, bytes: &'a [u8]) -> Option<Cow<'a, [u8]>> {
    if bytes.starts_with(GZIP_MAGIC) {
        let mut raw = Vec::new();
        if let Err(err) = GzDecoder::new(bytes).read_to_end(&mut raw) {
            tracing::debug!(file, error = %err, "not a readable gzip stream");
            return None;
        }
        return is_tar(&raw).then_some(Cow::Owned(raw));
    }
    is_tar(bytes).then_some(Cow::Borrowed(bytes))
}

/// Regular-file members of a tar archive with their sizes.
fn read_tar(file: &str, bytes: &[u8]) -> Option<BTreeMap<String, u64>> {
    let bytes = tar_bytes(file, bytes)?;
    let mut archive = tar::Archive::new(Cursor::new(bytes.as_ref()));
    let entries = match archive.entries() {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(file, error = %err, "not a readable tar archive");
            return None;
        }
    };
    let mut members = BTreeMap::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(file, error = %err, "truncated tar archive");
                return None;
            }
        };
        if !entry.header().entry_type().is_file() {
            continue;
        }
        if let Ok(path) = entry.path() {
            members.insert(path.to_string_lossy().into_owned(), entry.size());
        }
    }
    Some(members)
}
