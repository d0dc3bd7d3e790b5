//! Pattern-based boundary detection for languages without a grammar here,
//! behind the `BoundaryDetector` capability so a real parser can replace
//! it per language without touching the rest of the chunker.

use once_cell::sync::Lazy;
use regex::Regex;

use super::Boundary;

/// Finds candidate chunk boundaries in raw text.
pub trait BoundaryDetector: Send + Sync {
    fn detect(&self, content: &str) -> Vec<Boundary>;
}

/// Declaration-like line patterns, each with one capture for the declared
/// name. Moderately indented `def`/`class` count so class bodies split at
/// method granularity.
static DECLARATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Rust
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+([A-Za-z_]\w*)",
        r"^(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait|union)\s+([A-Za-z_]\w*)",
        r"^impl(?:<[^>]*>)?\s+([A-Za-z_]\w*)",
        // Python / Ruby
        r"^\s{0,8}(?:async\s+)?def\s+([A-Za-z_]\w*)",
        r"^\s{0,8}class\s+([A-Za-z_]\w*)",
        r"^module\s+([A-Z]\w*)",
        // JavaScript / TypeScript
        r"^(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$]\w*)",
        r"^(?:export\s+)?(?:abstract\s+)?class\s+([A-Za-z_$]\w*)",
        r"^(?:export\s+)?interface\s+([A-Za-z_$]\w*)",
        r"^(?:export\s+)?(?:const|let)\s+([A-Za-z_$]\w*)\s*=.*=>",
        // Go
        r"^func\s+(?:\([^)]*\)\s*)?([A-Za-z_]\w*)",
        r"^type\s+([A-Za-z_]\w*)\s",
        // Java / C# / Kotlin method-ish lines
        r"^\s{0,8}(?:public|private|protected|internal)\s+(?:static\s+)?(?:final\s+)?[\w<>,\[\]]+\s+([A-Za-z_]\w*)\s*\(",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("declaration pattern"))
    .collect()
});

/// Default regex-table implementation of [`BoundaryDetector`].
#[derive(Debug, Default)]
pub struct HeuristicDetector;

impl BoundaryDetector for HeuristicDetector {
    fn detect(&self, content: &str) -> Vec<Boundary> {
        let mut boundaries = Vec::new();

        for (row, line) in content.lines().enumerate() {
            for pattern in DECLARATION_PATTERNS.iter() {
                if let Some(caps) = pattern.captures(line) {
                    boundaries.push(Boundary {
                        row,
                        symbol: caps.get(1).map(|m| m.as_str().to_string()),
                    });
                    break;
                }
            }
        }

        boundaries
    }
}
