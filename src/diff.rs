//! Minimal unified-diff parsing for incremental review: enough to split a
//! diff into per-file hunks with new-side line numbers. Deleted-only files
//! produce no hunks.

/// One hunk of a unified diff, new side only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub file_path: String,
    /// 1-based first line of the hunk on the new side.
    pub start_line: usize,
    /// Added and context lines, prefixes stripped.
    pub content: String,
}

/// Parse a unified diff into hunks. Unrecognized lines are skipped rather
/// than rejected, so hand-built "virtual" diffs parse too.
pub fn parse_hunks(diff: &str) -> Vec<DiffHunk> {
    let mut hunks = Vec::new();
    let mut current_file: Option<String> = None;
    let mut current: Option<(usize, Vec<String>)> = None;

    for line in diff.lines() {
        if line.starts_with("diff --git ") || line.starts_with("+++ b/") {
            flush(&mut hunks, &current_file, &mut current);
            if let Some(path) = file_path_of(line) {
                current_file = Some(path);
            }
        } else if let Some(header) = line.strip_prefix("@@") {
            flush(&mut hunks, &current_file, &mut current);
            if let Some(start) = new_start_of(header) {
                current = Some((start, Vec::new()));
            }
        } else if let Some((_, lines)) = current.as_mut() {
            if let Some(added) = line.strip_prefix('+') {
                lines.push(added.to_string());
            } else if let Some(context) = line.strip_prefix(' ') {
                lines.push(context.to_string());
            }
            // '-' lines belong to the old side; "\ No newline" markers and
            // stray headers are skipped
        }
    }

    flush(&mut hunks, &current_file, &mut current);
    hunks
}

/// All file paths named in a diff, in first-seen order.
pub fn modified_files(diff: &str) -> Vec<String> {
    let mut files = Vec::new();
    for line in diff.lines() {
        if line.starts_with("diff --git ") || line.starts_with("+++ b/") {
            if let Some(path) = file_path_of(line) {
                if !files.contains(&path) {
                    files.push(path);
                }
            }
        }
    }
    files
}

fn flush(
    hunks: &mut Vec<DiffHunk>,
    file: &Option<String>,
    current: &mut Option<(usize, Vec<String>)>,
) {
    if let (Some(file), Some((start, lines))) = (file, current.take()) {
        if !lines.is_empty() {
            hunks.push(DiffHunk {
                file_path: file.clone(),
                start_line: start,
                content: lines.join("\n"),
            });
        }
    }
}

fn file_path_of(line: &str) -> Option<String> {
    if let Some(rest) = line.strip_prefix("+++ b/") {
        return Some(rest.trim().to_string());
    }
    if line.starts_with("diff --git ") {
        // "diff --git a/path b/path"
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 4 {
            return Some(parts[2].trim_start_matches("a/").to_string());
        }
    }
    None
}

/// Parse "+c,d" (or "+c") out of a "@@ -a,b +c,d @@" header body.
fn new_start_of(header: &str) -> Option<usize> {
    let plus = header.split_whitespace().find(|p| p.starts_with('+'))?;
    let num = plus[1..].split(',').next()?;
    num.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
diff --git a/src/app.py b/src/app.py
index 0000000..aaaaaaa
--- a/src/app.py
+++ b/src/app.py
@@ -1,3 +1,4 @@
 import os
+import sys
 def main():
     pass
@@ -10,2 +11,3 @@
 def helper():
+    return 42
diff --git a/README.md b/README.md
--- a/README.md
+++ b/README.md
@@ -0,0 +1,2 @@
+# Title
+Body
";

    #[test]
    fn test_two_hunks_for_one_file() {
        let hunks = parse_hunks(SAMPLE);
        assert_eq!(hunks.len(), 3);
        assert_eq!(hunks[0].file_path, "src/app.py");
        assert_eq!(hunks[0].start_line, 1);
        assert!(hunks[0].content.contains("import sys"));
        assert!(hunks[0].content.contains("import os"));
        assert_eq!(hunks[1].start_line, 11);
        assert!(hunks[1].content.contains("return 42"));
    }

    #[test]
    fn test_new_file_hunk() {
        let hunks = parse_hunks(SAMPLE);
        assert_eq!(hunks[2].file_path, "README.md");
        assert_eq!(hunks[2].start_line, 1);
        assert_eq!(hunks[2].content, "# Title\nBody");
    }

    #[test]
    fn test_modified_files_deduplicated_in_order() {
        let files = modified_files(SAMPLE);
        assert_eq!(files, vec!["src/app.py", "README.md"]);
    }

    #[test]
    fn test_garbage_yields_no_hunks() {
        assert!(parse_hunks("not a diff at all\njust text\n").is_empty());
        assert!(parse_hunks("").is_empty());
    }

    #[test]
    fn test_deletion_only_hunk_is_dropped() {
        let diff = "\
diff --git a/gone.py b/gone.py
--- a/gone.py
+++ b/gone.py
@@ -1,2 +0,0 @@
-line one
-line two
";
        assert!(parse_hunks(diff).is_empty());
    }
}
