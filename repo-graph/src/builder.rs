//! Graph builder: walks the head worktree and populates a [`GraphStore`]
//! with module/symbol nodes and CALLS/IMPORTS/INHERITS/TESTS edges,
//! restating `python_builder.py::PythonGraphBuilder.build`.

use std::collections::HashSet;
use std::path::Path;

use ast_extractor::{SymbolLinks, extract_symbols_with_links};
use review_model::{EdgeType, GraphEdge, GraphNode, NodeExtra, SymbolKind, SymbolRecord};
use tree_sitter::{Node, Parser};

use crate::store::GraphStore;

/// Languages the builder knows how to walk, keyed by file extension
/// (including the leading dot), e.g. `[".py", ".pyi"]`.
pub struct GraphBuilder {
    extensions: Vec<String>,
}

impl GraphBuilder {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    /// Builds a fresh graph from every matching file under `root`.
    pub fn build(&self, root: &Path) -> GraphStore {
        let mut store = GraphStore::new();
        let mut files: Vec<FileBuild> = Vec::new();

        for entry in walkdir::WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(ext) = self.matching_extension(path) else {
                continue;
            };
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let rel_path = rel.to_string_lossy().replace('\\', "/");
            let Ok(source) = std::fs::read_to_string(path) else {
                tracing::debug!(file = %rel_path, "repo-graph: skipping unreadable file");
                continue;
            };

            let (records, links) = extract_symbols_with_links(&source, &rel_path);
            let module_id = module_id_for(&rel_path, &ext);
            let is_test_file = is_test_file(&rel_path, &ext);
            let imports = collect_imports(&source);

            store.add_node(GraphNode {
                id: module_id.clone(),
                kind: SymbolKind::Module,
                file_path: rel_path.clone(),
                symbol_name: module_id.clone(),
                extra: NodeExtra {
                    line_start: 1,
                    line_end: source.lines().count().max(1),
                    is_test_file,
                    parent_class: None,
                },
            });

            let mut node_ids = Vec::with_capacity(records.len());
            for record in &records {
                let node_id = symbol_node_id(&rel_path, record);
                store.add_node(GraphNode {
                    id: node_id.clone(),
                    kind: record.kind,
                    file_path: rel_path.clone(),
                    symbol_name: record.name.clone(),
                    extra: NodeExtra {
                        line_start: record.line_start,
                        line_end: record.line_end,
                        is_test_file: false,
                        parent_class: record.parent_class.clone(),
                    },
                });
                store.add_edge(GraphEdge {
                    src_id: node_id.clone(),
                    dst_id: module_id.clone(),
                    edge_type: EdgeType::Imports,
                    extra: Some("belongs_to".to_string()),
                });
                node_ids.push(node_id);
            }

            files.push(FileBuild {
                rel_path,
                module_id,
                is_test_file,
                imports,
                records,
                links,
                node_ids,
            });
        }

        for file in &files {
            self.resolve_inherits_and_calls(&mut store, file);
        }
        for file in &files {
            self.resolve_tests_and_imports(&mut store, &files, file);
        }

        store
    }

    fn matching_extension(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        self.extensions
            .iter()
            .find(|ext| name.ends_with(ext.as_str()))
            .cloned()
    }

    fn resolve_inherits_and_calls(&self, store: &mut GraphStore, file: &FileBuild) {
        // Same-file lookup: simple name -> node id, plus "Class.method" for
        // methods so dotted call forms can resolve too.
        let mut by_simple_name: std::collections::HashMap<String, String> =
            std::collections::HashMap::new();
        for (record, node_id) in file.records.iter().zip(file.node_ids.iter()) {
            by_simple_name.insert(record.name.clone(), node_id.clone());
            if let Some(parent) = &record.parent_class {
                by_simple_name.insert(format!("{parent}.{}", record.name), node_id.clone());
            }
        }

        for ((record, link), node_id) in file
            .records
            .iter()
            .zip(file.links.iter())
            .zip(file.node_ids.iter())
        {
            if record.kind == SymbolKind::Class {
                for base in &link.base_classes {
                    if let Some(target) = by_simple_name.get(base.as_str()) {
                        if target != node_id {
                            store.add_edge(GraphEdge {
                                src_id: node_id.clone(),
                                dst_id: target.clone(),
                                edge_type: EdgeType::Inherits,
                                extra: None,
                            });
                        }
                    }
                }
            }
            if record.kind == SymbolKind::Function || record.kind == SymbolKind::Method {
                for call in &link.call_names {
                    if let Some(target) = by_simple_name.get(call) {
                        if target != node_id {
                            store.add_edge(GraphEdge {
                                src_id: node_id.clone(),
                                dst_id: target.clone(),
                                edge_type: EdgeType::Calls,
                                extra: None,
                            });
                        }
                    }
                }
            }
        }
    }

    fn resolve_tests_and_imports(
        &self,
        store: &mut GraphStore,
        all_files: &[FileBuild],
        file: &FileBuild,
    ) {
        if file.is_test_file {
            let mut seen: HashSet<String> = HashSet::new();
            for chain in &file.imports {
                if let Some(target) = first_matching_module(all_files, chain, &file.module_id) {
                    if seen.insert(target.clone()) {
                        store.add_edge(GraphEdge {
                            src_id: file.module_id.clone(),
                            dst_id: target,
                            edge_type: EdgeType::Tests,
                            extra: None,
                        });
                    }
                }
            }
        }

        let mut seen: HashSet<String> = HashSet::new();
        for chain in &file.imports {
            if let Some(target) = first_matching_module(all_files, chain, &file.module_id) {
                if seen.insert(target.clone()) {
                    store.add_edge(GraphEdge {
                        src_id: file.module_id.clone(),
                        dst_id: target,
                        edge_type: EdgeType::Imports,
                        extra: None,
                    });
                }
            }
        }
    }
}

struct FileBuild {
    rel_path: String,
    module_id: String,
    is_test_file: bool,
    imports: Vec<String>,
    records: Vec<SymbolRecord>,
    links: Vec<SymbolLinks>,
    node_ids: Vec<String>,
}

/// First module (other than `exclude_module_id`) whose dotted ID contains
/// `chain`'s head segment, in file-insertion order — "first match wins"
/// per spec §9. Only the first dotted component of `chain` is compared,
/// matching `python_builder.py`'s `imp_name.split(".")[0]`.
fn first_matching_module(
    files: &[FileBuild],
    chain: &str,
    exclude_module_id: &str,
) -> Option<String> {
    let head = chain.split('.').next().unwrap_or(chain);
    files
        .iter()
        .map(|f| &f.module_id)
        .find(|id| id.as_str() != exclude_module_id && id.contains(head))
        .cloned()
}

fn module_id_for(rel_path: &str, ext: &str) -> String {
    let without_suffix = rel_path.strip_suffix(ext).unwrap_or(rel_path);
    without_suffix.replace('/', ".")
}

fn symbol_node_id(rel_path: &str, record: &SymbolRecord) -> String {
    match &record.parent_class {
        Some(parent) => format!("{rel_path}::{parent}.{}", record.name),
        None => format!("{rel_path}::{}", record.name),
    }
}

/// `^test_.*\.<ext>$` or `.*_test\.<ext>$`, matched against the filename.
fn is_test_file(rel_path: &str, ext: &str) -> bool {
    let filename = rel_path.rsplit('/').next().unwrap_or(rel_path);
    (filename.starts_with("test_") && filename.ends_with(ext))
        || filename.ends_with(&format!("_test{ext}"))
}

fn collect_imports(source: &str) -> Vec<String> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    if parser.set_language(&language).is_err() {
        return Vec::new();
    }
    let Some(tree) = parser.parse(source, None) else {
        return Vec::new();
    };
    let src = source.as_bytes();
    let mut out = Vec::new();
    collect_imports_into(tree.root_node(), src, &mut out);
    out
}

/// Head segment only (`imp_name.split(".")[0]` in `python_builder.py`) —
/// the original never matches on the full dotted chain.
fn head_segment(chain: &str) -> String {
    chain.split('.').next().unwrap_or(chain).to_string()
}

fn collect_imports_into(node: Node, src: &[u8], out: &mut Vec<String>) {
    let mut cursor = node.walk();
    match node.kind() {
        "import_statement" => {
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "dotted_name" => {
                        if let Ok(text) = child.utf8_text(src) {
                            out.push(head_segment(text));
                        }
                    }
                    "aliased_import" => {
                        if let Some(name) = child.child_by_field_name("name") {
                            if let Ok(text) = name.utf8_text(src) {
                                out.push(head_segment(text));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        "import_from_statement" => {
            if let Some(module_name) = node.child_by_field_name("module_name") {
                if let Ok(text) = module_name.utf8_text(src) {
                    out.push(head_segment(text));
                }
            }
        }
        _ => {}
    }
    for child in node.children(&mut cursor) {
        collect_imports_into(child, src, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn intra_file_call_edge() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("a.py"),
            "def helper(): pass\ndef user(): helper()\n",
        )
        .unwrap();

        let builder = GraphBuilder::new(vec![".py".to_string()]);
        let store = builder.build(tmp.path());

        assert!(store.contains("a.py::user"));
        assert!(store.contains("a.py::helper"));
        let out = store.out_neighbors("a.py::user", EdgeType::Calls);
        assert!(out.iter().any(|n| n.id == "a.py::helper"));
    }

    #[test]
    fn test_file_edge_and_flag() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("foo.py"), "def foo(): pass\n").unwrap();
        fs::write(
            tmp.path().join("test_foo.py"),
            "from foo import foo\n",
        )
        .unwrap();

        let builder = GraphBuilder::new(vec![".py".to_string()]);
        let store = builder.build(tmp.path());

        let test_module = store.node("test_foo").expect("test module present");
        assert!(test_module.extra.is_test_file);

        let out = store.out_neighbors("test_foo", EdgeType::Tests);
        assert!(out.iter().any(|n| n.id == "foo"));
    }

    #[test]
    fn multi_segment_import_resolves_on_head_segment() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("app/models")).unwrap();
        fs::write(tmp.path().join("app/models/foo.py"), "class Foo:\n    pass\n").unwrap();
        fs::write(
            tmp.path().join("main.py"),
            "from app.models import foo\n",
        )
        .unwrap();

        let builder = GraphBuilder::new(vec![".py".to_string()]);
        let store = builder.build(tmp.path());

        let out = store.out_neighbors("main", EdgeType::Imports);
        assert!(out.iter().any(|n| n.id == "app.models.foo"));
    }

    #[test]
    fn node_ids_are_stable_across_builds() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.py"), "class C:\n    def m(self): pass\n").unwrap();

        let builder = GraphBuilder::new(vec![".py".to_string()]);
        let first = builder.build(tmp.path());
        let second = builder.build(tmp.path());

        let mut first_ids: Vec<_> = first.node_ids().collect();
        let mut second_ids: Vec<_> = second.node_ids().collect();
        first_ids.sort();
        second_ids.sort();
        assert_eq!(first_ids, second_ids);
    }
}
