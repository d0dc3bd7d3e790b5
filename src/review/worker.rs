//! One specialist invocation: prompt assembly and lenient parsing of the
//! model's findings.
//!
//! Models return findings as a JSON array, but rarely cleanly: the array
//! arrives bare, fenced, or buried in prose, with field names that drift
//! (`file` / `file_name` / `filename`, `comment` / `issue` / ...). Parsing
//! accepts all of it; a response with no recoverable structure is an
//! error the orchestrator records as a failed pair.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::categories::CategorySpec;
use crate::models::{ReviewFinding, ReviewTask, Severity, TargetUnit};

/// System prompt: reviewer persona, category focus, output contract.
pub fn system_prompt(category: &CategorySpec) -> String {
    format!(
        "You are a code review specialist for the {name} dimension.\n\
         {focus}\n\n\
         Respond with ONLY a JSON array of findings. Each finding is an object:\n\
         {{\"file\": \"<path>\", \"line\": <number>, \"severity\": \
         \"Critical|High|Medium|Low\", \"comment\": \"<specific, actionable issue>\", \
         \"example_code\": \"<optional corrected code>\"}}\n\
         Only report genuine {name} issues in the code under review. \
         Respond with [] when nothing warrants a comment.",
        name = category.name,
        focus = category.prompt,
    )
}

/// User prompt: the code under review with `path:line|` prefixes, plus the
/// retrieved context block.
pub fn user_prompt(task: &ReviewTask) -> String {
    let first_line = match task.unit {
        TargetUnit::WholeFile => 1,
        TargetUnit::DiffHunk { start_line } => start_line,
    };

    let mut numbered = String::new();
    for (offset, line) in task.content.lines().enumerate() {
        numbered.push_str(&format!("{}:{}|{}\n", task.file_path, first_line + offset, line));
    }

    let mut prompt = format!("CODE TO REVIEW:\n\n{numbered}");

    if !task.context.is_empty() {
        prompt.push_str("\nCONTEXT:\n\n");
        for snippet in &task.context {
            prompt.push_str(&format!(
                "--- {} (lines {}-{}) ---\n{}\n\n",
                snippet.file_path, snippet.start_line, snippet.end_line, snippet.content
            ));
        }
    }

    prompt
}

/// The JSON array embedded anywhere in a response, including fenced.
static JSON_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[\s*\{.*\}\s*\]").expect("array pattern"));

/// Parse a model response into findings. An empty array in any of its
/// usual disguises is a clean zero-finding review; a response with no
/// parseable array is an error.
pub fn parse_findings(
    raw: &str,
    category: &CategorySpec,
    default_file: &str,
) -> Result<Vec<ReviewFinding>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_empty_array(trimmed) {
        return Ok(Vec::new());
    }

    let candidate = JSON_ARRAY
        .find(trimmed)
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| anyhow::anyhow!("Malformed findings payload: {e}"))?;

    let items = value
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Findings payload is not an array"))?;

    if items.is_empty() {
        return Ok(Vec::new());
    }

    let findings: Vec<ReviewFinding> = items
        .iter()
        .filter_map(|item| finding_from(item, category, default_file))
        .collect();

    if findings.is_empty() {
        anyhow::bail!("No parseable findings among {} array items", items.len());
    }
    Ok(findings)
}

fn is_empty_array(trimmed: &str) -> bool {
    let cleaned: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    matches!(
        cleaned.as_str(),
        "[]" | "`[]`" | "```[]```" | "```json[]```"
    )
}

/// Build one finding from a JSON object, tolerating the field-name drift
/// different models produce. Returns None when no comment text or usable
/// structure is present.
fn finding_from(item: &Value, category: &CategorySpec, default_file: &str) -> Option<ReviewFinding> {
    let obj = item.as_object()?;

    let comment = string_of(obj, &["comment"])
        .or_else(|| {
            let issue = string_of(obj, &["issue", "description", "problem"])?;
            match string_of(obj, &["suggestion", "improvement"]) {
                Some(fix) => Some(format!("{issue} {fix}")),
                None => Some(issue),
            }
        })
        .or_else(|| string_of(obj, &["message"]))?;

    let file = string_of(obj, &["file", "file_name", "filename"])
        .map(|f| f.strip_prefix("b/").unwrap_or(&f).to_string())
        .unwrap_or_else(|| default_file.to_string());

    let line = obj
        .get("line")
        .or_else(|| obj.get("line_number"))
        .and_then(|v| match v {
            Value::Number(n) => n.as_u64().map(|n| n as usize),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(0);

    let declared = string_of(obj, &["severity"]).and_then(|s| Severity::parse(&s));
    let severity = adjust_severity(&comment, category.name, declared.unwrap_or(category.bias));

    let example_code = string_of(obj, &["example_code", "example", "suggested_code"]);

    Some(ReviewFinding {
        file,
        line,
        category: category.name.to_string(),
        severity,
        comment,
        example_code,
    })
}

fn string_of(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        obj.get(*k)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string())
    })
}

const CRITICAL_KEYWORDS: &[&str] = &[
    "security",
    "vulnerability",
    "sql injection",
    "xss",
    "csrf",
    "memory leak",
    "null pointer",
    "crash",
    "data loss",
    "corruption",
];

const HIGH_KEYWORDS: &[&str] = &[
    "performance",
    "bottleneck",
    "inefficient",
    "resource leak",
    "missing error handling",
    "exception not handled",
    "major design flaw",
];

const COSMETIC_KEYWORDS: &[&str] = &[
    "variable name",
    "method name",
    "rename",
    "more descriptive",
    "consider renaming",
    "cosmetic",
    "minor",
    "suggestion",
];

/// Promote or demote a finding's severity based on what the comment
/// actually talks about. Naming and Readability cap at Medium unless a
/// promoting keyword appears.
fn adjust_severity(comment: &str, category_name: &str, default: Severity) -> Severity {
    let lower = comment.to_lowercase();

    if CRITICAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Severity::Critical;
    }
    if HIGH_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Severity::High;
    }

    if matches!(category_name, "Naming" | "Readability") {
        if COSMETIC_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return Severity::Low;
        }
        if default == Severity::High {
            return Severity::Medium;
        }
    }

    default
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::categories::by_name;

    fn category(name: &str) -> &'static CategorySpec {
        by_name(name).unwrap()
    }

    #[test]
    fn test_parse_clean_array() {
        let raw = r#"[{"file": "a.py", "line": 10, "severity": "High", "comment": "Unbounded recursion here"}]"#;
        let findings = parse_findings(raw, category("Design"), "a.py").unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].file, "a.py");
        assert_eq!(findings[0].line, 10);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].category, "Design");
    }

    #[test]
    fn test_parse_array_embedded_in_prose() {
        let raw = "Here are my findings:\n```json\n[{\"file\": \"a.py\", \"line\": 3, \"comment\": \"Dead branch\"}]\n```\nLet me know!";
        let findings = parse_findings(raw, category("CodingStyle"), "a.py").unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].comment, "Dead branch");
    }

    #[test]
    fn test_empty_array_forms_are_zero_findings() {
        for raw in ["[]", "  [ ]  ", "```json\n[]\n```", "```\n[]\n```", "`[]`", ""] {
            let findings = parse_findings(raw, category("Tests"), "a.py").unwrap();
            assert!(findings.is_empty(), "failed for {raw:?}");
        }
    }

    #[test]
    fn test_field_aliases() {
        let raw = r#"[{"filename": "b/src/x.py", "line_number": "7", "issue": "Index can overflow.", "suggestion": "Clamp it.", "suggested_code": "x = min(x, MAX)"}]"#;
        let findings = parse_findings(raw, category("Functionality"), "x.py").unwrap();
        assert_eq!(findings[0].file, "src/x.py");
        assert_eq!(findings[0].line, 7);
        assert_eq!(findings[0].comment, "Index can overflow. Clamp it.");
        assert_eq!(findings[0].example_code.as_deref(), Some("x = min(x, MAX)"));
    }

    #[test]
    fn test_missing_file_falls_back_to_task_file() {
        let raw = r#"[{"line": 2, "comment": "Missing assertion"}]"#;
        let findings = parse_findings(raw, category("Tests"), "tests/t.py").unwrap();
        assert_eq!(findings[0].file, "tests/t.py");
    }

    #[test]
    fn test_missing_severity_uses_category_bias() {
        let raw = r#"[{"file": "a.py", "line": 1, "comment": "Logic reversed in comparison"}]"#;
        let findings = parse_findings(raw, category("Functionality"), "a.py").unwrap();
        assert_eq!(findings[0].severity, Severity::Critical);

        let findings = parse_findings(raw, category("Naming"), "a.py").unwrap();
        assert_eq!(findings[0].severity, Severity::Low);
    }

    #[test]
    fn test_security_comment_promotes_to_critical() {
        let raw = r#"[{"file": "a.py", "line": 5, "severity": "Low", "comment": "Possible sql injection through unescaped input"}]"#;
        let findings = parse_findings(raw, category("Naming"), "a.py").unwrap();
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn test_cosmetic_naming_comment_demotes_to_low() {
        let raw = r#"[{"file": "a.py", "line": 5, "severity": "High", "comment": "Consider renaming tmp to something more descriptive"}]"#;
        let findings = parse_findings(raw, category("Naming"), "a.py").unwrap();
        assert_eq!(findings[0].severity, Severity::Low);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(parse_findings("I could not review this code.", category("Design"), "a.py").is_err());
        assert!(parse_findings("{\"not\": \"an array\"}", category("Design"), "a.py").is_err());
    }

    #[test]
    fn test_items_without_comment_text_are_skipped() {
        let raw = r#"[{"file": "a.py", "line": 1}, {"file": "a.py", "line": 2, "comment": "Real finding"}]"#;
        let findings = parse_findings(raw, category("Design"), "a.py").unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn test_user_prompt_numbers_hunk_lines_from_start() {
        let task = ReviewTask {
            unit: TargetUnit::DiffHunk { start_line: 40 },
            file_path: "src/app.py".to_string(),
            content: "x = 1\ny = 2".to_string(),
            context: Vec::new(),
        };
        let prompt = user_prompt(&task);
        assert!(prompt.contains("src/app.py:40|x = 1"));
        assert!(prompt.contains("src/app.py:41|y = 2"));
        assert!(!prompt.contains("CONTEXT:"));
    }

    #[test]
    fn test_user_prompt_includes_context_block() {
        let task = ReviewTask {
            unit: TargetUnit::WholeFile,
            file_path: "a.py".to_string(),
            content: "pass".to_string(),
            context: vec![crate::models::ContextSnippet {
                file_path: "lib/util.py".to_string(),
                start_line: 3,
                end_line: 9,
                symbols: vec!["helper".to_string()],
                content: "def helper(): ...".to_string(),
                similarity: 0.9,
                distance: 0.1,
                score: 0.8,
            }],
        };
        let prompt = user_prompt(&task);
        assert!(prompt.contains("CONTEXT:"));
        assert!(prompt.contains("--- lib/util.py (lines 3-9) ---"));
        assert!(prompt.contains("def helper"));
    }

    #[test]
    fn test_system_prompt_names_the_category() {
        let prompt = system_prompt(category("Robustness"));
        assert!(prompt.contains("Robustness"));
        assert!(prompt.contains("JSON array"));
    }
}
