//! Boundary-aware code chunking.
//!
//! Three tiers, in order:
//! 1. Structured boundary detection via tree-sitter ([`ast`])
//! 2. Declaration-line heuristics ([`heuristic`])
//! 3. A fixed-size sliding line window, so every file is still indexed
//!
//! Each boundary opens a candidate chunk running to the line before the
//! next boundary; a preamble chunk covers anything before the first
//! boundary. Candidates over the size budget are split along line
//! boundaries, the first sub-chunk keeping the symbols. Chunking never
//! fails; an empty file yields zero chunks.

pub mod ast;
pub mod heuristic;

use crate::models::{content_hash, CodeChunk};

pub use heuristic::{BoundaryDetector, HeuristicDetector};

/// A candidate chunk start: 0-based line row plus the declared symbol, if
/// detection recovered one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub row: usize,
    pub symbol: Option<String>,
}

/// Size knobs for one chunking pass.
#[derive(Debug, Clone, Copy)]
pub struct ChunkOptions {
    /// Maximum non-whitespace characters per chunk.
    pub char_budget: usize,
    /// Lines per window in the last-resort fallback.
    pub window_lines: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            char_budget: 1_500,
            window_lines: 100,
        }
    }
}

/// Languages with tree-sitter support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Rust,
    JavaScript,
    TypeScript,
    Tsx,
    Python,
    Go,
    Unknown,
}

impl Language {
    /// Map a language hint string to a Language variant.
    pub fn from_hint(hint: &str) -> Self {
        match hint.to_lowercase().as_str() {
            "rust" | "rs" => Language::Rust,
            "javascript" | "js" | "jsx" => Language::JavaScript,
            "typescript" | "ts" => Language::TypeScript,
            "tsx" => Language::Tsx,
            "python" | "py" => Language::Python,
            "go" => Language::Go,
            _ => Language::Unknown,
        }
    }

    /// The tree-sitter grammar for this variant, or None if unsupported.
    pub fn tree_sitter_language(&self) -> Option<tree_sitter::Language> {
        match self {
            Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::Tsx => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
            Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Language::Go => Some(tree_sitter_go::LANGUAGE.into()),
            Language::Unknown => None,
        }
    }
}

/// Chunk one file. The result is gap-free over `[1, last_line]` for any
/// file with non-whitespace content.
pub fn chunk_file(
    file_path: &str,
    content: &str,
    language_hint: &str,
    opts: ChunkOptions,
) -> Vec<CodeChunk> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = content.lines().collect();
    let language = Language::from_hint(language_hint);

    let mut boundaries = ast::detect_boundaries(content, language)
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| HeuristicDetector.detect(content));
    boundaries.retain(|b| b.row < lines.len());

    let candidates = if boundaries.is_empty() {
        window_candidates(lines.len(), opts.window_lines)
    } else {
        boundary_candidates(&boundaries, lines.len())
    };

    let mut chunks = Vec::new();
    for candidate in candidates {
        emit(file_path, &lines, candidate, opts.char_budget, &mut chunks);
    }
    chunks
}

/// A contiguous 0-based line range `[start, end]` with its symbols.
struct Candidate {
    start: usize,
    end: usize,
    symbols: Vec<String>,
}

/// Turn sorted boundaries into candidates covering every line: a preamble
/// before the first boundary, then one candidate per boundary running to
/// the line before the next.
fn boundary_candidates(boundaries: &[Boundary], line_count: usize) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    if boundaries[0].row > 0 {
        candidates.push(Candidate {
            start: 0,
            end: boundaries[0].row - 1,
            symbols: Vec::new(),
        });
    }

    for (i, boundary) in boundaries.iter().enumerate() {
        if boundary.row >= line_count {
            break;
        }
        let end = boundaries
            .get(i + 1)
            .map(|next| next.row.min(line_count) - 1)
            .unwrap_or(line_count - 1);
        candidates.push(Candidate {
            start: boundary.row,
            end,
            symbols: boundary.symbol.iter().cloned().collect(),
        });
    }

    candidates
}

/// Fixed-size non-overlapping line windows.
fn window_candidates(line_count: usize, window_lines: usize) -> Vec<Candidate> {
    let window = window_lines.max(1);
    (0..line_count)
        .step_by(window)
        .map(|start| Candidate {
            start,
            end: (start + window - 1).min(line_count - 1),
            symbols: Vec::new(),
        })
        .collect()
}

/// Emit a candidate as one chunk, or several sub-chunks when it exceeds
/// the budget. Symbols stay on the first sub-chunk only.
fn emit(
    file_path: &str,
    lines: &[&str],
    candidate: Candidate,
    char_budget: usize,
    chunks: &mut Vec<CodeChunk>,
) {
    if non_ws_chars(lines, candidate.start, candidate.end) <= char_budget {
        push_chunk(file_path, lines, candidate.start, candidate.end, candidate.symbols, chunks);
        return;
    }

    let mut sub_start = candidate.start;
    let mut chars = 0usize;
    let mut symbols = candidate.symbols;

    for row in candidate.start..=candidate.end {
        let line_chars = non_ws_chars(lines, row, row);
        if chars + line_chars > char_budget && row > sub_start {
            push_chunk(file_path, lines, sub_start, row - 1, std::mem::take(&mut symbols), chunks);
            sub_start = row;
            chars = line_chars;
        } else {
            chars += line_chars;
        }
    }

    push_chunk(file_path, lines, sub_start, candidate.end, symbols, chunks);
}

fn push_chunk(
    file_path: &str,
    lines: &[&str],
    start: usize,
    end: usize,
    symbols: Vec<String>,
    chunks: &mut Vec<CodeChunk>,
) {
    let content = lines[start..=end].join("\n");
    let hash = content_hash(&content);
    chunks.push(CodeChunk {
        file_path: file_path.to_string(),
        start_line: start + 1,
        end_line: end + 1,
        symbols,
        content,
        content_hash: hash,
    });
}

/// Count non-whitespace characters in a 0-based inclusive line range.
fn non_ws_chars(lines: &[&str], start: usize, end: usize) -> usize {
    (start..=end)
        .filter_map(|i| lines.get(i))
        .flat_map(|line| line.chars())
        .filter(|c| !c.is_whitespace())
        .count()
}
