//! The nine specialist categories as a data table. Each entry carries its
//! prompt focus and a default severity bias used when the model omits one;
//! adding a category is a data change here, not a new type.

use crate::models::Severity;

/// One review specialist: a name, its prompt focus, and the severity
/// assumed when a finding does not state one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategorySpec {
    pub name: &'static str,
    pub prompt: &'static str,
    pub bias: Severity,
}

pub const CATEGORIES: [CategorySpec; 9] = [
    CategorySpec {
        name: "Design",
        prompt: "Evaluate the overall design: separation of concerns, coupling between \
                 components, dependency direction, and whether responsibilities sit in the \
                 right place. Flag structures that will resist change.",
        bias: Severity::High,
    },
    CategorySpec {
        name: "Functionality",
        prompt: "Hunt for incorrect behavior: logic errors, off-by-one mistakes, wrong \
                 operators, unhandled edge cases, race conditions, and code that cannot do \
                 what its name promises.",
        bias: Severity::Critical,
    },
    CategorySpec {
        name: "Naming",
        prompt: "Check that names of functions, variables, and types say what they mean: \
                 misleading names, abbreviations that obscure intent, and inconsistent \
                 terminology for the same concept.",
        bias: Severity::Low,
    },
    CategorySpec {
        name: "Consistency",
        prompt: "Look for internal inconsistency: the same problem solved two different \
                 ways, divergent error-handling or return conventions, and patterns that \
                 contradict the surrounding code.",
        bias: Severity::Medium,
    },
    CategorySpec {
        name: "CodingStyle",
        prompt: "Review style: formatting oddities, dead code, commented-out blocks, \
                 overly long functions, and violations of the language's common idioms.",
        bias: Severity::Low,
    },
    CategorySpec {
        name: "Tests",
        prompt: "Assess test coverage and quality: missing tests for the changed behavior, \
                 tests that assert nothing meaningful, fragile fixtures, and untested \
                 error paths.",
        bias: Severity::High,
    },
    CategorySpec {
        name: "Robustness",
        prompt: "Probe failure handling: unvalidated inputs, ignored errors, missing \
                 timeouts, resource leaks, and anything that turns a recoverable fault \
                 into a crash or corruption.",
        bias: Severity::High,
    },
    CategorySpec {
        name: "Readability",
        prompt: "Judge how easily a newcomer follows the code: convoluted control flow, \
                 clever one-liners, missing explanation where intent is non-obvious, and \
                 misleading comments.",
        bias: Severity::Low,
    },
    CategorySpec {
        name: "Abstractions",
        prompt: "Examine the abstractions: leaky interfaces, duplicated concepts that \
                 should be unified, premature generalization, and abstractions that no \
                 longer pay for their indirection.",
        bias: Severity::Medium,
    },
];

/// Look a category up by name, case-insensitively.
pub fn by_name(name: &str) -> Option<&'static CategorySpec> {
    CATEGORIES
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nine_categories_with_expected_biases() {
        assert_eq!(CATEGORIES.len(), 9);
        assert_eq!(by_name("Functionality").unwrap().bias, Severity::Critical);
        assert_eq!(by_name("Robustness").unwrap().bias, Severity::High);
        assert_eq!(by_name("Tests").unwrap().bias, Severity::High);
        assert_eq!(by_name("Design").unwrap().bias, Severity::High);
        assert_eq!(by_name("Abstractions").unwrap().bias, Severity::Medium);
        assert_eq!(by_name("Consistency").unwrap().bias, Severity::Medium);
        assert_eq!(by_name("Readability").unwrap().bias, Severity::Low);
        assert_eq!(by_name("CodingStyle").unwrap().bias, Severity::Low);
        assert_eq!(by_name("Naming").unwrap().bias, Severity::Low);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert!(by_name("naming").is_some());
        assert!(by_name("NAMING").is_some());
        assert!(by_name("Security").is_none());
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = CATEGORIES.iter().map(|c| c.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 9);
    }
}
