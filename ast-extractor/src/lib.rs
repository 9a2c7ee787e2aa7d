//! AST extractor: parses a Python source file into a sequence of
//! [`SymbolRecord`]s. One real consumer of `tree-sitter-python` in this
//! codebase — parsing follows the stack/visitor shape used by the Dart
//! extractor (`codegraph-prep::languages::dart::decls`), generalised to
//! Python's grammar and the signature/docstring/decorator rules a Python
//! extractor needs.

use review_model::{SymbolKind, SymbolRecord};
use tree_sitter::{Node, Parser};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("tree-sitter grammar could not be loaded: {0}")]
    Language(#[from] tree_sitter::LanguageError),
}

/// Per-symbol links recorded during the same walk that builds the
/// `SymbolRecord`, so a caller needing them (the graph builder's
/// call/inheritance resolution) never has to re-parse or re-walk the tree.
/// Aligned index-for-index with the `SymbolRecord` sequence; empty for
/// Module/Constant records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolLinks {
    /// Base class names from a class's superclass list, source order.
    pub base_classes: Vec<String>,
    /// Simple identifier and dotted-form names called anywhere in a
    /// function/method body, source order (duplicates included).
    pub call_names: Vec<String>,
}

/// Parse `source` and extract every class, function, method, and top-level
/// constant. Returns an empty sequence on parse failure — parse failure is
/// not an error surfaced upward (spec §4.1/§7).
pub fn extract_symbols(source: &str, file_path: &str) -> Vec<SymbolRecord> {
    extract_symbols_with_links(source, file_path).0
}

/// Same extraction as [`extract_symbols`], plus the per-record
/// [`SymbolLinks`] gathered in the same single pass (recast from the
/// reference implementation's separate second tree walk).
pub fn extract_symbols_with_links(
    source: &str,
    file_path: &str,
) -> (Vec<SymbolRecord>, Vec<SymbolLinks>) {
    match try_extract_symbols(source, file_path) {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(file_path, %err, "ast-extractor: grammar load failed");
            (Vec::new(), Vec::new())
        }
    }
}

fn try_extract_symbols(
    source: &str,
    file_path: &str,
) -> Result<(Vec<SymbolRecord>, Vec<SymbolLinks>), ExtractError> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    parser.set_language(&language)?;

    let Some(tree) = parser.parse(source, None) else {
        tracing::debug!(file_path, "ast-extractor: parse returned no tree");
        return Ok((Vec::new(), Vec::new()));
    };

    let root = tree.root_node();
    if root.has_error() && root.named_child_count() == 0 {
        tracing::debug!(file_path, "ast-extractor: unparsable source, skipping");
        return Ok((Vec::new(), Vec::new()));
    }

    let src = source.as_bytes();
    let mut out = Vec::new();
    let mut links = Vec::new();

    walk_defs(root, src, None, &mut out, &mut links);
    collect_top_level_constants(root, src, &mut out, &mut links);

    Ok((out, links))
}

/// Recursively visits class/function definitions. `current_class` mirrors
/// the original extractor's visitor state: it is set on entering a class
/// body and restored on leaving it, but a function definition does not
/// change it — a function nested inside a method is still classified
/// against the enclosing class, matching the reference implementation.
fn walk_defs(
    node: Node,
    src: &[u8],
    current_class: Option<&str>,
    out: &mut Vec<SymbolRecord>,
    links: &mut Vec<SymbolLinks>,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "decorated_definition" => {
                let decorators = collect_decorators(child, src);
                if let Some(def) = child.child_by_field_name("definition") {
                    visit_definition(def, src, current_class, &decorators, out, links);
                }
            }
            "class_definition" | "function_definition" => {
                visit_definition(child, src, current_class, &[], out, links);
            }
            _ => {
                // Descend into every other statement (blocks, if/else,
                // try/except, etc.) so nested defs anywhere are still found.
                walk_defs(child, src, current_class, out, links);
            }
        }
    }
}

fn visit_definition(
    node: Node,
    src: &[u8],
    current_class: Option<&str>,
    decorators: &[String],
    out: &mut Vec<SymbolRecord>,
    links: &mut Vec<SymbolLinks>,
) {
    match node.kind() {
        "class_definition" => {
            let Some(name) = field_text(node, "name", src) else {
                return;
            };
            let (line_start, line_end) = line_span(node);
            out.push(SymbolRecord {
                name: name.clone(),
                kind: SymbolKind::Class,
                line_start,
                line_end,
                signature: String::new(),
                docstring: docstring_of(node, src),
                decorators: decorators.to_vec(),
                parent_class: None,
            });
            links.push(SymbolLinks {
                base_classes: collect_base_classes(node, src),
                call_names: Vec::new(),
            });
            if let Some(body) = node.child_by_field_name("body") {
                walk_defs(body, src, Some(&name), out, links);
            }
        }
        "function_definition" => {
            let Some(name) = field_text(node, "name", src) else {
                return;
            };
            let (line_start, line_end) = line_span(node);
            let signature = build_signature(node, &name, src);
            let kind = if current_class.is_some() {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            };
            let call_names = node
                .child_by_field_name("body")
                .map(|body| collect_call_names(body, src))
                .unwrap_or_default();
            out.push(SymbolRecord {
                name,
                kind,
                line_start,
                line_end,
                signature,
                docstring: docstring_of(node, src),
                decorators: decorators.to_vec(),
                parent_class: current_class.map(|s| s.to_string()),
            });
            links.push(SymbolLinks {
                base_classes: Vec::new(),
                call_names,
            });
            if let Some(body) = node.child_by_field_name("body") {
                walk_defs(body, src, current_class, out, links);
            }
        }
        _ => {}
    }
}

/// Extracts superclass names from a class's argument list, skipping
/// keyword arguments (`metaclass=...`).
fn collect_base_classes(class_node: Node, src: &[u8]) -> Vec<String> {
    let Some(superclasses) = class_node.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    let mut cursor = superclasses.walk();
    superclasses
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "identifier" || c.kind() == "attribute")
        .filter_map(|c| c.utf8_text(src).ok())
        .map(|s| s.to_string())
        .collect()
}

/// Recursively collects call-target names (`call` nodes' callee text) in
/// source order, including calls inside nested function/class bodies.
fn collect_call_names(node: Node, src: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    collect_call_names_into(node, src, &mut names);
    names
}

fn collect_call_names_into(node: Node, src: &[u8], names: &mut Vec<String>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "call" {
            if let Some(callee) = child.child_by_field_name("function") {
                if matches!(callee.kind(), "identifier" | "attribute") {
                    if let Ok(text) = callee.utf8_text(src) {
                        names.push(text.to_string());
                    }
                }
            }
        }
        collect_call_names_into(child, src, names);
    }
}

fn collect_decorators(decorated: Node, src: &[u8]) -> Vec<String> {
    let mut cursor = decorated.walk();
    decorated
        .children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .filter_map(|c| c.utf8_text(src).ok())
        .map(|text| text.trim_start_matches('@').trim().to_string())
        .collect()
}

fn field_text<'a>(node: Node, field: &str, src: &'a [u8]) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|n| n.utf8_text(src).ok())
        .map(|s| s.to_string())
}

fn line_span(node: Node) -> (usize, usize) {
    (
        node.start_position().row + 1,
        node.end_position().row + 1,
    )
}

fn docstring_of(def: Node, src: &[u8]) -> Option<String> {
    let body = def.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string_node = first.named_child(0)?;
    if string_node.kind() != "string" {
        return None;
    }
    let raw = string_node.utf8_text(src).ok()?;
    Some(strip_string_quotes(raw))
}

fn strip_string_quotes(raw: &str) -> String {
    let mut s = raw.trim();
    for prefix in ["r", "R", "u", "U", "f", "F", "b", "B"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            if rest.starts_with('"') || rest.starts_with('\'') {
                s = rest;
            }
        }
    }
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner.trim().to_string();
        }
    }
    s.trim().to_string()
}

/// Builds the canonical signature: posonly params, `/` if any, positional
/// params, `*vararg`, keyword-only params, `**kwarg` — joined by `, `.
fn build_signature(func: Node, name: &str, src: &[u8]) -> String {
    let Some(params) = func.child_by_field_name("parameters") else {
        return format!("{name}()");
    };

    let mut posonly: Vec<String> = Vec::new();
    let mut positional: Vec<String> = Vec::new();
    let mut vararg: Option<String> = None;
    let mut kwonly: Vec<String> = Vec::new();
    let mut kwarg: Option<String> = None;
    let mut in_kwonly = false;

    let mut cursor = params.walk();
    for child in params.children(&mut cursor) {
        match child.kind() {
            "(" | ")" | "," => continue,
            "/" => {
                posonly = std::mem::take(&mut positional);
            }
            "*" => {
                in_kwonly = true;
            }
            "list_splat_pattern" => {
                vararg = param_name(child, src);
                in_kwonly = true;
            }
            "dictionary_splat_pattern" => {
                kwarg = param_name(child, src);
            }
            _ => {
                if let Some(n) = param_name(child, src) {
                    if in_kwonly {
                        kwonly.push(n);
                    } else {
                        positional.push(n);
                    }
                }
            }
        }
    }

    let mut parts: Vec<String> = Vec::new();
    parts.extend(posonly.iter().cloned());
    if !posonly.is_empty() {
        parts.push("/".to_string());
    }
    parts.extend(positional.iter().cloned());
    if let Some(v) = &vararg {
        parts.push(format!("*{v}"));
    }
    parts.extend(kwonly.iter().cloned());
    if let Some(k) = &kwarg {
        parts.push(format!("**{k}"));
    }

    format!("{name}({})", parts.join(", "))
}

fn param_name(node: Node, src: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" => node.utf8_text(src).ok().map(|s| s.to_string()),
        "default_parameter" | "typed_default_parameter" => node
            .child_by_field_name("name")
            .and_then(|n| param_name(n, src)),
        "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => {
            node.named_child(0).and_then(|n| param_name(n, src))
        }
        _ => node.named_child(0).and_then(|n| param_name(n, src)),
    }
}

/// Scans only the module's direct body statements for simple single-name
/// assignments (`x = ...`) not already bound by an earlier one.
fn collect_top_level_constants(
    root: Node,
    src: &[u8],
    out: &mut Vec<SymbolRecord>,
    links: &mut Vec<SymbolLinks>,
) {
    let mut bound = std::collections::HashSet::new();
    let mut cursor = root.walk();
    for stmt in root.children(&mut cursor) {
        if stmt.kind() != "expression_statement" {
            continue;
        }
        let Some(assign) = stmt.named_child(0) else {
            continue;
        };
        if assign.kind() != "assignment" {
            continue;
        }
        let Some(left) = assign.child_by_field_name("left") else {
            continue;
        };
        if left.kind() != "identifier" {
            continue;
        }
        let Some(name) = left.utf8_text(src).ok().map(|s| s.to_string()) else {
            continue;
        };
        if bound.contains(&name) {
            continue;
        }
        bound.insert(name.clone());
        let (line_start, line_end) = line_span(stmt);
        out.push(SymbolRecord {
            name,
            kind: SymbolKind::Constant,
            line_start,
            line_end,
            signature: String::new(),
            docstring: None,
            decorators: Vec::new(),
            parent_class: None,
        });
        links.push(SymbolLinks::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_function_with_plain_args() {
        let src = "def foo(x, y):\n    return x + y\n";
        let recs = extract_symbols(src, "f.py");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].name, "foo");
        assert_eq!(recs[0].kind, SymbolKind::Function);
        assert_eq!(recs[0].signature, "foo(x, y)");
    }

    #[test]
    fn canonical_signature_covers_all_parameter_kinds() {
        let src = "def f(a, b, /, c, *args, d, **kwargs):\n    pass\n";
        let recs = extract_symbols(src, "f.py");
        assert_eq!(recs[0].signature, "f(a, b, /, c, *args, d, **kwargs)");
    }

    #[test]
    fn extracts_class_and_method_with_parent() {
        let src = "class Bar:\n    def baz(self):\n        pass\n";
        let recs = extract_symbols(src, "f.py");
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].kind, SymbolKind::Class);
        assert_eq!(recs[0].name, "Bar");
        assert_eq!(recs[1].kind, SymbolKind::Method);
        assert_eq!(recs[1].name, "baz");
        assert_eq!(recs[1].parent_class.as_deref(), Some("Bar"));
    }

    #[test]
    fn top_level_constant_detected_class_body_is_not() {
        let src = "X = 1\n\nclass C:\n    Y = 2\n";
        let recs = extract_symbols(src, "f.py");
        assert!(recs.iter().any(|r| r.name == "X" && r.kind == SymbolKind::Constant));
        assert!(!recs.iter().any(|r| r.name == "Y"));
    }

    #[test]
    fn docstring_is_extracted_and_unquoted() {
        let src = "def f():\n    \"\"\"does a thing.\"\"\"\n    pass\n";
        let recs = extract_symbols(src, "f.py");
        assert_eq!(recs[0].docstring.as_deref(), Some("does a thing."));
    }

    #[test]
    fn decorators_are_normalised_without_at() {
        let src = "@staticmethod\ndef f():\n    pass\n";
        let recs = extract_symbols(src, "f.py");
        assert_eq!(recs[0].decorators, vec!["staticmethod".to_string()]);
    }

    #[test]
    fn unparsable_source_yields_empty_sequence() {
        let src = "def f(:\n";
        // Tree-sitter is error-tolerant; this asserts we never panic and
        // always return *some* (possibly empty) sequence.
        let _ = extract_symbols(src, "f.py");
    }

    #[test]
    fn extraction_is_deterministic() {
        let src = "class A:\n    def m(self, x):\n        pass\n\nY = 1\n";
        let a = extract_symbols(src, "f.py");
        let b = extract_symbols(src, "f.py");
        assert_eq!(a, b);
    }

    #[test]
    fn links_capture_base_classes_and_call_names() {
        let src = "class Base:\n    pass\n\nclass Child(Base):\n    pass\n\ndef helper():\n    pass\n\ndef user():\n    helper()\n    obj.method()\n";
        let (recs, links) = extract_symbols_with_links(src, "f.py");
        let child_idx = recs.iter().position(|r| r.name == "Child").unwrap();
        assert_eq!(links[child_idx].base_classes, vec!["Base".to_string()]);

        let user_idx = recs.iter().position(|r| r.name == "user").unwrap();
        assert_eq!(
            links[user_idx].call_names,
            vec!["helper".to_string(), "obj.method".to_string()]
        );
    }
}
