//! Vector persistence: a pluggable backend trait and the default
//! JSON-file implementation with cosine nearest-neighbor lookup.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::models::IndexRecord;

/// Durable chunk → (vector, metadata) store for one repository namespace.
/// Implementations must be safe for concurrent upserts.
pub trait VectorBackend: Send + Sync {
    /// Fetch the record for a (file path, content hash) pair, if present.
    fn get(&self, file_path: &str, content_hash: &str) -> Option<IndexRecord>;

    /// Insert or replace the record keyed by (file path, content hash).
    fn upsert(&self, record: IndexRecord);

    /// Nearest-neighbor lookup: the `k` embedded records closest to
    /// `embedding`, ascending by distance (`1.0 - cosine`), ties broken by
    /// shorter chunk content. Unembedded records never appear.
    fn query(&self, embedding: &[f32], k: usize) -> Vec<(IndexRecord, f32)>;

    /// Drop records whose path is absent from `known`, or whose hash is no
    /// longer among that path's current chunk hashes. Returns the number
    /// of records removed.
    fn garbage_collect(&self, known: &HashMap<String, HashSet<String>>) -> usize;

    /// Remove every record in the namespace.
    fn wipe(&self);

    /// Flush to durable storage.
    fn persist(&self) -> Result<()>;

    fn record_count(&self) -> usize;
}

#[derive(Serialize, Deserialize)]
struct NamespaceFile {
    indexed_at: DateTime<Utc>,
    records: Vec<IndexRecord>,
}

/// Default backend: one JSON file per repository namespace, held in
/// memory behind a lock and written atomically (temp file + rename).
pub struct JsonVectorStore {
    records: RwLock<Vec<IndexRecord>>,
    path: PathBuf,
}

impl JsonVectorStore {
    pub fn open_or_create(index_dir: &Path, namespace: &str) -> Result<Self> {
        std::fs::create_dir_all(index_dir)
            .with_context(|| format!("Failed to create index dir {}", index_dir.display()))?;
        let path = index_dir.join(format!("{namespace}.json"));

        let records = if path.exists() {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read index namespace {}", path.display()))?;
            serde_json::from_str::<NamespaceFile>(&data)
                .map(|f| f.records)
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        Ok(Self {
            records: RwLock::new(records),
            path,
        })
    }
}

impl VectorBackend for JsonVectorStore {
    fn get(&self, file_path: &str, content_hash: &str) -> Option<IndexRecord> {
        self.records
            .read()
            .iter()
            .find(|r| r.file_path == file_path && r.content_hash == content_hash)
            .cloned()
    }

    fn upsert(&self, record: IndexRecord) {
        let mut records = self.records.write();
        if let Some(existing) = records
            .iter_mut()
            .find(|r| r.file_path == record.file_path && r.content_hash == record.content_hash)
        {
            *existing = record;
        } else {
            records.push(record);
        }
    }

    fn query(&self, embedding: &[f32], k: usize) -> Vec<(IndexRecord, f32)> {
        let records = self.records.read();

        let mut scored: Vec<(f32, &IndexRecord)> = records
            .iter()
            .filter_map(|r| {
                r.embedding
                    .as_deref()
                    .map(|e| (1.0 - cosine_similarity(embedding, e), r))
            })
            .collect();

        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.content.len().cmp(&b.1.content.len()))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(distance, r)| (r.clone(), distance))
            .collect()
    }

    fn garbage_collect(&self, known: &HashMap<String, HashSet<String>>) -> usize {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| {
            known
                .get(&r.file_path)
                .map(|hashes| hashes.contains(&r.content_hash))
                .unwrap_or(false)
        });
        before - records.len()
    }

    fn wipe(&self) {
        self.records.write().clear();
    }

    fn persist(&self) -> Result<()> {
        let file = NamespaceFile {
            indexed_at: Utc::now(),
            records: self.records.read().clone(),
        };
        let data = serde_json::to_string(&file)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &data)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    fn record_count(&self) -> usize {
        self.records.read().len()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, hash: &str, content: &str, embedding: Option<Vec<f32>>) -> IndexRecord {
        IndexRecord {
            file_path: path.to_string(),
            start_line: 1,
            end_line: 5,
            symbols: Vec::new(),
            content: content.to_string(),
            content_hash: hash.to_string(),
            embedding,
        }
    }

    fn open(dir: &Path) -> JsonVectorStore {
        JsonVectorStore::open_or_create(dir, "testns").unwrap()
    }

    #[test]
    fn test_upsert_replaces_same_path_and_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.upsert(record("a.rs", "h1", "old", None));
        store.upsert(record("a.rs", "h1", "new", Some(vec![1.0, 0.0])));
        assert_eq!(store.record_count(), 1);
        assert!(store.get("a.rs", "h1").unwrap().embedding.is_some());
    }

    #[test]
    fn test_query_orders_by_distance() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.upsert(record("far.rs", "h1", "aaaa", Some(vec![0.0, 1.0])));
        store.upsert(record("near.rs", "h2", "bbbb", Some(vec![1.0, 0.0])));

        let hits = store.query(&[1.0, 0.0], 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.file_path, "near.rs");
        assert!(hits[0].1 < hits[1].1);
    }

    #[test]
    fn test_query_tie_broken_by_shorter_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.upsert(record("long.rs", "h1", "a longer chunk body", Some(vec![1.0, 0.0])));
        store.upsert(record("short.rs", "h2", "short", Some(vec![1.0, 0.0])));

        let hits = store.query(&[1.0, 0.0], 10);
        assert_eq!(hits[0].0.file_path, "short.rs");
    }

    #[test]
    fn test_query_excludes_unembedded_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.upsert(record("bad.rs", "h1", "x", None));
        store.upsert(record("good.rs", "h2", "y", Some(vec![1.0, 0.0])));

        let hits = store.query(&[1.0, 0.0], 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.file_path, "good.rs");
    }

    #[test]
    fn test_garbage_collect_drops_deleted_and_edited() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.upsert(record("kept.rs", "h1", "x", None));
        store.upsert(record("edited.rs", "h2", "y", None));
        store.upsert(record("deleted.rs", "h3", "z", None));

        let mut known = HashMap::new();
        known.insert("kept.rs".to_string(), HashSet::from(["h1".to_string()]));
        known.insert("edited.rs".to_string(), HashSet::from(["h2-new".to_string()]));

        let removed = store.garbage_collect(&known);
        assert_eq!(removed, 2);
        assert!(store.get("kept.rs", "h1").is_some());
        assert!(store.get("edited.rs", "h2").is_none());
        assert!(store.get("deleted.rs", "h3").is_none());
    }

    #[test]
    fn test_persist_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open(dir.path());
            store.upsert(record("a.rs", "h1", "body", Some(vec![0.5, 0.5])));
            store.persist().unwrap();
        }
        let reopened = open(dir.path());
        assert_eq!(reopened.record_count(), 1);
        assert!(reopened.get("a.rs", "h1").is_some());
    }

    #[test]
    fn test_wipe_clears_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.upsert(record("a.rs", "h1", "body", None));
        store.wipe();
        assert_eq!(store.record_count(), 0);
    }
}
