//! Shared data model for the impact-aware review pipeline.
//!
//! Every type here is a plain value: no behaviour, no I/O. Components pass
//! these back and forth; only `reviewer` owns the pipeline that produces and
//! consumes them end to end.

use serde::{Deserialize, Serialize};

/// Kind of symbol a record/node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Module,
    Class,
    Function,
    Method,
    Constant,
    Test,
}

impl SymbolKind {
    /// Ordering used when capping/sorting symbol changes per file in the
    /// batched prompt digest: Class < Function < Method < Constant.
    pub fn diff_sort_rank(self) -> u8 {
        match self {
            SymbolKind::Class => 0,
            SymbolKind::Function => 1,
            SymbolKind::Method => 2,
            SymbolKind::Constant => 3,
            SymbolKind::Module => 4,
            SymbolKind::Test => 5,
        }
    }
}

/// Kind of change a symbol underwent between base and head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

/// Kind of edge between two graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Calls,
    Imports,
    Inherits,
    Tests,
    UsesConfig,
}

impl EdgeType {
    /// All edge types in declaration order; retrieval walks this order when
    /// visiting a node's neighbourhoods so result ordering is deterministic.
    pub const ALL: [EdgeType; 5] = [
        EdgeType::Calls,
        EdgeType::Imports,
        EdgeType::Inherits,
        EdgeType::Tests,
        EdgeType::UsesConfig,
    ];
}

/// One descriptor naming how a symbol changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Descriptor {
    Added,
    Removed,
    SignatureChange,
    DocstringChange,
    DecoratorChange,
}

impl Descriptor {
    pub fn as_str(self) -> &'static str {
        match self {
            Descriptor::Added => "added",
            Descriptor::Removed => "removed",
            Descriptor::SignatureChange => "signature_change",
            Descriptor::DocstringChange => "docstring_change",
            Descriptor::DecoratorChange => "decorator_change",
        }
    }
}

/// A symbol as extracted from one version (base or head) of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub name: String,
    pub kind: SymbolKind,
    pub line_start: usize,
    pub line_end: usize,
    /// Canonical signature string. Empty for non-callables (Class, Constant).
    pub signature: String,
    pub docstring: Option<String>,
    /// Normalised textual form of each decorator, source order.
    pub decorators: Vec<String>,
    /// Present only for methods.
    pub parent_class: Option<String>,
}

impl SymbolRecord {
    /// Identity key the differ pairs symbols by: `(name, kind, parent_class)`.
    pub fn identity_key(&self) -> (String, SymbolKind, Option<String>) {
        (self.name.clone(), self.kind, self.parent_class.clone())
    }
}

/// The delta between a symbol's base and head form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolChange {
    pub file_path: String,
    pub symbol_name: String,
    pub kind: SymbolKind,
    pub change_type: ChangeType,
    pub descriptors: Vec<Descriptor>,
    pub line_start: usize,
    pub line_end: usize,
    /// Present only when `kind == Method`; mirrors `SymbolRecord::parent_class`.
    pub parent_class: Option<String>,
}

/// Extra, kind-dependent metadata carried on a graph node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeExtra {
    pub line_start: usize,
    pub line_end: usize,
    /// Only meaningful for Module nodes.
    pub is_test_file: bool,
    pub parent_class: Option<String>,
}

/// A node in the repository graph (one per module or per symbol).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub symbol_name: String,
    pub extra: NodeExtra,
}

/// A directed, typed edge between two graph nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub src_id: String,
    pub dst_id: String,
    pub edge_type: EdgeType,
    pub extra: Option<String>,
}

/// One symbol change plus its retrieved context and code snippets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewUnit {
    pub change: SymbolChange,
    /// Ranked, budget-pruned context node IDs (see `repo-graph::retrieval`).
    pub context_ids: Vec<String>,
    pub before_snippet: Option<String>,
    pub after_snippet: Option<String>,
}

/// Severity of a finding, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// Category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Correctness,
    Security,
    Performance,
    Style,
}

/// One item in the final review, typed by severity and category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFinding {
    pub severity: Severity,
    pub category: Category,
    pub location_file: String,
    pub location_line_start: Option<usize>,
    pub location_line_end: Option<usize>,
    pub symbol: Option<String>,
    pub message: String,
    pub suggested_fix: Option<String>,
}

/// Status of a completed pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Completed,
    Partial,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_type_order_matches_declaration() {
        assert_eq!(
            EdgeType::ALL,
            [
                EdgeType::Calls,
                EdgeType::Imports,
                EdgeType::Inherits,
                EdgeType::Tests,
                EdgeType::UsesConfig,
            ]
        );
    }

    #[test]
    fn identity_key_distinguishes_method_from_function() {
        let f = SymbolRecord {
            name: "run".into(),
            kind: SymbolKind::Function,
            line_start: 1,
            line_end: 2,
            signature: "run()".into(),
            docstring: None,
            decorators: vec![],
            parent_class: None,
        };
        let m = SymbolRecord {
            parent_class: Some("Runner".into()),
            kind: SymbolKind::Method,
            ..f.clone()
        };
        assert_ne!(f.identity_key(), m.identity_key());
    }
}
