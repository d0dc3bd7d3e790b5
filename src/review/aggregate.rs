//! Finding aggregation: collapse near-duplicates, order by severity, and
//! project the same data by file.

use std::collections::BTreeMap;

use crate::models::{FailedPair, ReviewFinding, ReviewReport};

/// Token-overlap threshold above which two comments count as duplicates.
const JACCARD_THRESHOLD: f64 = 0.7;

/// Merge findings into the final report. Two findings collapse when they
/// share (file, line, category) and their comments are near-duplicates;
/// the survivor keeps the higher severity. Failed pairs pass through so
/// the report can name its coverage gaps.
pub fn aggregate(findings: Vec<ReviewFinding>, failed: Vec<FailedPair>) -> ReviewReport {
    let mut merged: Vec<ReviewFinding> = Vec::with_capacity(findings.len());

    for finding in findings {
        let duplicate = merged.iter_mut().find(|kept| {
            kept.file == finding.file
                && kept.line == finding.line
                && kept.category == finding.category
                && near_duplicate(&kept.comment, &finding.comment)
        });

        match duplicate {
            Some(kept) => {
                // Severity sorts Critical first, so "higher" is the min
                if finding.severity < kept.severity {
                    kept.severity = finding.severity;
                }
                if kept.example_code.is_none() {
                    kept.example_code = finding.example_code;
                }
            }
            None => merged.push(finding),
        }
    }

    merged.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.line.cmp(&b.line))
    });

    let mut by_file: BTreeMap<String, Vec<ReviewFinding>> = BTreeMap::new();
    for finding in &merged {
        by_file
            .entry(finding.file.clone())
            .or_default()
            .push(finding.clone());
    }

    ReviewReport {
        findings: merged,
        by_file,
        failed,
    }
}

/// Same normalized text, or token overlap past the threshold.
fn near_duplicate(a: &str, b: &str) -> bool {
    let norm_a = normalize(a);
    let norm_b = normalize(b);
    if norm_a == norm_b {
        return true;
    }

    let tokens_a: std::collections::HashSet<&str> = norm_a.split_whitespace().collect();
    let tokens_b: std::collections::HashSet<&str> = norm_b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return false;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f64 / union as f64 >= JACCARD_THRESHOLD
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
