//! Structured boundary detection using tree-sitter.
//!
//! Walks the top-level declarations of a parse tree and reports one
//! boundary per declaration, with the declared symbol name when the
//! grammar exposes one. Refuses (returns `None`) when:
//! - the language has no grammar here
//! - the file exceeds MAX_FILE_SIZE (500 KB)
//! - the parse produces >30% error nodes

use super::{Boundary, Language};

/// Files larger than this skip AST parsing entirely.
const MAX_FILE_SIZE: usize = 500 * 1024; // 500 KB

/// If more than this fraction of AST nodes are error nodes, refuse.
const ERROR_THRESHOLD: f64 = 0.30;

/// Detect declaration boundaries for a supported language.
/// `None` means structured detection is unavailable for this input and the
/// caller should fall back; an empty Vec means the parse succeeded but
/// found no declarations.
pub fn detect_boundaries(content: &str, language: Language) -> Option<Vec<Boundary>> {
    if content.len() > MAX_FILE_SIZE {
        return None;
    }

    let mut parser = tree_sitter::Parser::new();
    let ts_language = language.tree_sitter_language()?;
    parser.set_language(&ts_language).ok()?;

    let tree = parser.parse(content, None)?;
    let root = tree.root_node();

    let (total, errors) = count_nodes(root);
    if total > 0 && (errors as f64 / total as f64) > ERROR_THRESHOLD {
        tracing::warn!(
            "AST error rate {:.0}% exceeds threshold, falling back to heuristic boundaries",
            (errors as f64 / total as f64) * 100.0
        );
        return None;
    }

    let mut boundaries = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        collect_declaration(child, content, language, &mut boundaries);
    }

    boundaries.sort_by_key(|b| b.row);
    boundaries.dedup_by_key(|b| b.row);
    Some(boundaries)
}

/// Record `node` as a boundary if it is a declaration for this language.
/// Wrapper nodes (exports, decorators) are unwrapped one level so the
/// symbol comes from the inner declaration while the boundary keeps the
/// wrapper's start line.
fn collect_declaration(
    node: tree_sitter::Node,
    content: &str,
    language: Language,
    out: &mut Vec<Boundary>,
) {
    let kind = node.kind();

    let inner = match kind {
        "export_statement" => node.child_by_field_name("declaration").unwrap_or(node),
        "decorated_definition" => node.child_by_field_name("definition").unwrap_or(node),
        _ => node,
    };

    if !is_declaration_kind(inner.kind(), language) {
        return;
    }

    out.push(Boundary {
        row: node.start_position().row,
        symbol: symbol_of(inner, content),
    });
}

fn is_declaration_kind(kind: &str, language: Language) -> bool {
    match language {
        Language::Rust => matches!(
            kind,
            "function_item"
                | "struct_item"
                | "enum_item"
                | "union_item"
                | "trait_item"
                | "impl_item"
                | "mod_item"
                | "macro_definition"
                | "type_item"
                | "const_item"
                | "static_item"
        ),
        Language::JavaScript | Language::TypeScript | Language::Tsx => matches!(
            kind,
            "function_declaration"
                | "generator_function_declaration"
                | "class_declaration"
                | "abstract_class_declaration"
                | "interface_declaration"
                | "type_alias_declaration"
                | "enum_declaration"
        ),
        Language::Python => matches!(kind, "function_definition" | "class_definition"),
        Language::Go => matches!(
            kind,
            "function_declaration" | "method_declaration" | "type_declaration"
        ),
        Language::Unknown => false,
    }
}

/// Pull the declared name out of a declaration node.
fn symbol_of(node: tree_sitter::Node, content: &str) -> Option<String> {
    let name_node = match node.kind() {
        // `impl Foo` / `impl Trait for Foo`: the type is the symbol
        "impl_item" => node
            .child_by_field_name("type")
            .or_else(|| node.child_by_field_name("trait")),
        // `type Foo struct {...}`: name lives on the inner type_spec
        "type_declaration" => {
            let mut cursor = node.walk();
            let spec = node
                .children(&mut cursor)
                .find(|c| c.kind() == "type_spec");
            spec.and_then(|s| s.child_by_field_name("name"))
        }
        _ => node.child_by_field_name("name"),
    }?;

    name_node
        .utf8_text(content.as_bytes())
        .ok()
        .map(|s| s.to_string())
}

/// Count total nodes and error nodes in a tree.
fn count_nodes(node: tree_sitter::Node) -> (usize, usize) {
    let mut total = 1usize;
    let mut errors = if node.is_error() { 1usize } else { 0 };

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let (t, e) = count_nodes(child);
        total += t;
        errors += e;
    }

    (total, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_function_boundaries_with_symbols() {
        let source = "use std::io;\n\nfn hello() {\n    println!(\"hi\");\n}\n\nstruct Config {\n    value: u32,\n}\n";
        let boundaries = detect_boundaries(source, Language::Rust).unwrap();
        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0].row, 2);
        assert_eq!(boundaries[0].symbol.as_deref(), Some("hello"));
        assert_eq!(boundaries[1].symbol.as_deref(), Some("Config"));
    }

    #[test]
    fn test_rust_impl_symbol_is_the_type() {
        let source = "struct Foo;\n\nimpl Foo {\n    fn new() -> Self { Foo }\n}\n";
        let boundaries = detect_boundaries(source, Language::Rust).unwrap();
        let symbols: Vec<_> = boundaries.iter().filter_map(|b| b.symbol.as_deref()).collect();
        assert!(symbols.contains(&"Foo"));
        assert_eq!(boundaries.len(), 2);
    }

    #[test]
    fn test_python_class_and_function() {
        let source = "import os\n\nclass Widget:\n    def render(self):\n        pass\n\ndef main():\n    pass\n";
        let boundaries = detect_boundaries(source, Language::Python).unwrap();
        let symbols: Vec<_> = boundaries.iter().filter_map(|b| b.symbol.as_deref()).collect();
        assert_eq!(symbols, vec!["Widget", "main"]);
    }

    #[test]
    fn test_typescript_interface_and_exported_class() {
        let source = "interface Config {\n    name: string;\n}\n\nexport class Service {\n    run(): void {}\n}\n";
        let boundaries = detect_boundaries(source, Language::TypeScript).unwrap();
        let symbols: Vec<_> = boundaries.iter().filter_map(|b| b.symbol.as_deref()).collect();
        assert_eq!(symbols, vec!["Config", "Service"]);
    }

    #[test]
    fn test_go_func_and_type() {
        let source = "package main\n\ntype Server struct {\n\taddr string\n}\n\nfunc (s *Server) Run() error {\n\treturn nil\n}\n";
        let boundaries = detect_boundaries(source, Language::Go).unwrap();
        let symbols: Vec<_> = boundaries.iter().filter_map(|b| b.symbol.as_deref()).collect();
        assert_eq!(symbols, vec!["Server", "Run"]);
    }

    #[test]
    fn test_unsupported_language_returns_none() {
        assert!(detect_boundaries("some text", Language::Unknown).is_none());
    }

    #[test]
    fn test_oversized_file_returns_none() {
        let large = "x".repeat(MAX_FILE_SIZE + 1);
        assert!(detect_boundaries(&large, Language::Rust).is_none());
    }

    #[test]
    fn test_declaration_free_file_yields_empty() {
        let source = "use std::io;\nuse std::fs;\n";
        let boundaries = detect_boundaries(source, Language::Rust).unwrap();
        assert!(boundaries.is_empty());
    }
}
