use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A file discovered in the repository, surviving the ignore filter.
#[derive(Debug, Clone)]
pub struct RepoFile {
    pub relative_path: String,
    pub language: String,
    pub content: String,
    pub content_hash: String,
}

/// A line-bounded, symbol-annotated segment of a source file.
/// Chunks from one file are gap-free and cover `[1, last_line]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeChunk {
    pub file_path: String,
    /// 1-based start line in the original file.
    pub start_line: usize,
    /// 1-based end line in the original file (inclusive).
    pub end_line: usize,
    /// Declared symbol names found in this chunk; empty when structured
    /// extraction found nothing (window fallback, continuation sub-chunks).
    pub symbols: Vec<String>,
    pub content: String,
    pub content_hash: String,
}

/// A persisted chunk → vector mapping within a repository namespace.
/// `embedding == None` marks a chunk whose embedding call failed; it is
/// excluded from retrieval and retried on the next incremental run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub symbols: Vec<String>,
    pub content: String,
    pub content_hash: String,
    pub embedding: Option<Vec<f32>>,
}

impl IndexRecord {
    pub fn from_chunk(chunk: &CodeChunk, embedding: Option<Vec<f32>>) -> Self {
        Self {
            file_path: chunk.file_path.clone(),
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            symbols: chunk.symbols.clone(),
            content: chunk.content.clone(),
            content_hash: chunk.content_hash.clone(),
            embedding,
        }
    }
}

/// A retrieved chunk annotated with its rank score; ephemeral, produced
/// per retrieval call.
#[derive(Debug, Clone, Serialize)]
pub struct ContextSnippet {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub symbols: Vec<String>,
    pub content: String,
    /// Raw cosine similarity to the query embedding.
    pub similarity: f32,
    /// `1.0 - similarity`.
    pub distance: f32,
    /// Combined rerank score (similarity + directory + symbol signals).
    pub score: f32,
}

/// What a single review task covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetUnit {
    WholeFile,
    DiffHunk { start_line: usize },
}

/// One unit of review work: a file or diff hunk plus its retrieved context.
#[derive(Debug, Clone)]
pub struct ReviewTask {
    pub unit: TargetUnit,
    pub file_path: String,
    pub content: String,
    pub context: Vec<ContextSnippet>,
}

/// Ordinal severity of a finding. Declaration order is the sort order:
/// Critical sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// A single review comment produced by a specialist invocation.
/// Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewFinding {
    pub file: String,
    /// 1-based line; 0 means a file-level comment.
    pub line: usize,
    pub category: String,
    pub severity: Severity,
    pub comment: String,
    pub example_code: Option<String>,
}

/// A (task, category) pair that produced no findings due to failure.
#[derive(Debug, Clone, Serialize)]
pub struct FailedPair {
    pub file: String,
    pub category: String,
    pub reason: String,
}

/// The final review output: the severity-sorted flat list, the same data
/// grouped by file, and the coverage gaps.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewReport {
    pub findings: Vec<ReviewFinding>,
    pub by_file: BTreeMap<String, Vec<ReviewFinding>>,
    pub failed: Vec<FailedPair>,
}

/// Counters reported by one indexing run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub files_scanned: usize,
    pub chunks_indexed: usize,
    pub chunks_skipped: usize,
    pub chunks_failed: usize,
}

/// SHA-256 content hash, hex-encoded.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
