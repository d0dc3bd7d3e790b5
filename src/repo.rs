//! Repository scanning: walk the tree, apply the ignore filter, detect
//! languages, and hash file contents.

use std::path::Path;

use walkdir::WalkDir;

use crate::filter::IgnoreFilter;
use crate::models::{content_hash, RepoFile};

/// Files larger than this are skipped outright.
const MAX_FILE_BYTES: u64 = 1_048_576; // 1 MB

/// Walk all text files under `repo_root` that survive the ignore filter.
/// Hidden entries and files that are not valid UTF-8 are skipped.
pub fn scan_repo_files(repo_root: &Path, filter: &IgnoreFilter) -> Vec<RepoFile> {
    let mut files = Vec::new();

    let walker = WalkDir::new(repo_root).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 {
            return true;
        }
        if is_hidden(entry) {
            return false;
        }
        // Prune excluded directories early so their subtrees are never read
        relative_path(repo_root, entry.path())
            .map(|rel| filter.included(&rel))
            .unwrap_or(false)
    });

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();

        if let Ok(meta) = std::fs::metadata(path) {
            if meta.len() > MAX_FILE_BYTES {
                continue;
            }
        }

        let Some(relative) = relative_path(repo_root, path) else {
            continue;
        };

        match std::fs::read_to_string(path) {
            Ok(content) => {
                let language = detect_language(path);
                let content_hash = content_hash(&content);
                files.push(RepoFile {
                    relative_path: relative,
                    language,
                    content,
                    content_hash,
                });
            }
            Err(_) => {
                // Not UTF-8 text; skip
                continue;
            }
        }
    }

    files
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let s = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Map a file extension to a language hint for the chunker.
pub fn detect_language(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "rs" => "rust",
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" => "typescript",
        "tsx" => "tsx",
        "go" => "go",
        "java" => "java",
        "c" => "c",
        "cpp" | "cc" | "h" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "lua" => "lua",
        "sh" | "bash" | "zsh" | "fish" => "shell",
        "sql" => "sql",
        "html" => "html",
        "css" | "scss" | "less" => "css",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "md" | "rst" | "txt" => "text",
        "proto" => "protobuf",
        "zig" => "zig",
        "dart" => "dart",
        "ex" | "exs" => "elixir",
        "hs" => "haskell",
        _ => "text",
    }
    .to_string()
}
