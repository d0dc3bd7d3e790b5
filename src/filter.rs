//! Ignore-pattern filtering: decides which paths participate in indexing
//! and review.
//!
//! Two rule kinds: extension rules match a file's final suffix
//! case-sensitively; glob rules match path segments. A glob without a
//! separator matches if any single segment matches it; a glob with
//! separators is anchored at the first segment, and a match on a proper
//! prefix of the path's segments excludes the entire subtree.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

/// How an ignore pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreKind {
    Extension,
    Glob,
}

/// An ignore pattern, loaded once per run.
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    pub pattern: String,
    pub kind: IgnoreKind,
}

impl IgnoreRule {
    /// Extension rule; accepts "pyc", ".pyc", or "*.pyc".
    pub fn extension(pattern: &str) -> Self {
        let normalized = pattern.trim_start_matches('*').trim_start_matches('.');
        Self {
            pattern: normalized.to_string(),
            kind: IgnoreKind::Extension,
        }
    }

    pub fn glob(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            kind: IgnoreKind::Glob,
        }
    }
}

enum CompiledRule {
    /// Final-suffix match, case-sensitive.
    Extension(String),
    /// Separator-free pattern: matches any one path segment.
    AnySegment(GlobMatcher),
    /// Pattern with separators: pieces match the leading consecutive
    /// segments; a proper-prefix match excludes the subtree.
    Anchored(Vec<GlobMatcher>),
}

/// Compiled rule set. A path is excluded if any rule matches; rule order
/// is irrelevant.
pub struct IgnoreFilter {
    rules: Vec<CompiledRule>,
}

impl IgnoreFilter {
    /// Compile the rule set. A malformed glob is a configuration error and
    /// aborts the run before any indexing.
    pub fn new(rules: &[IgnoreRule]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());

        for rule in rules {
            match rule.kind {
                IgnoreKind::Extension => {
                    if rule.pattern.is_empty() {
                        anyhow::bail!("Empty extension ignore rule");
                    }
                    compiled.push(CompiledRule::Extension(rule.pattern.clone()));
                }
                IgnoreKind::Glob => {
                    let pattern = rule.pattern.trim_end_matches('/');
                    if pattern.is_empty() {
                        anyhow::bail!("Empty glob ignore rule");
                    }
                    if pattern.contains('/') {
                        let pieces = pattern
                            .split('/')
                            .map(compile_segment)
                            .collect::<Result<Vec<_>>>()
                            .with_context(|| format!("Bad ignore pattern: {pattern}"))?;
                        compiled.push(CompiledRule::Anchored(pieces));
                    } else {
                        let matcher = compile_segment(pattern)
                            .with_context(|| format!("Bad ignore pattern: {pattern}"))?;
                        compiled.push(CompiledRule::AnySegment(matcher));
                    }
                }
            }
        }

        Ok(Self { rules: compiled })
    }

    /// True when `relative_path` (slash-separated, repo-relative) should
    /// participate in indexing and review.
    pub fn included(&self, relative_path: &str) -> bool {
        !self.excluded(relative_path)
    }

    fn excluded(&self, relative_path: &str) -> bool {
        let segments: Vec<&str> = relative_path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            return false;
        }

        self.rules.iter().any(|rule| match rule {
            CompiledRule::Extension(ext) => {
                let name = segments.last().unwrap();
                name.rsplit_once('.').map(|(_, suffix)| suffix) == Some(ext.as_str())
            }
            CompiledRule::AnySegment(matcher) => segments.iter().any(|s| matcher.is_match(s)),
            CompiledRule::Anchored(pieces) => {
                pieces.len() <= segments.len()
                    && pieces
                        .iter()
                        .zip(segments.iter())
                        .all(|(piece, segment)| piece.is_match(segment))
            }
        })
    }
}

/// Compile one slash-delimited piece. `*` and `?` never cross a separator
/// because matching is per-segment; `[seq]` and `[!seq]` come with the
/// glob syntax.
fn compile_segment(piece: &str) -> Result<GlobMatcher> {
    Ok(GlobBuilder::new(piece)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}
