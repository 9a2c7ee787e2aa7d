//! Context assembler: loads source slices for a changed symbol's context
//! set, pruning to a token budget, restating
//! `context/assembler.py::ContextAssembler.assemble`.

use std::path::Path;

use repo_graph::GraphStore;
use review_model::{ReviewUnit, SymbolChange};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblerConfig {
    pub max_tokens_per_unit: usize,
    pub max_lines: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_unit: 8000,
            max_lines: 50,
        }
    }
}

/// `max(1, chars / 4)`.
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() / 4).max(1)
}

/// Loads the snippet for one graph node: its file's line range, folded to
/// an ellipsis in the middle if it exceeds `max_lines`. Returns `None` on
/// any I/O failure, missing node, or empty/whitespace-only slice — all
/// silent per the spec's filesystem-read-failure policy.
pub fn load_snippet_for_node(
    store: &GraphStore,
    worktree_root: &Path,
    node_id: &str,
    max_lines: usize,
) -> Option<String> {
    let node = store.node(node_id)?;
    let path = worktree_root.join(&node.file_path);
    let text = std::fs::read_to_string(path).ok()?;
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return None;
    }

    let start = node.extra.line_start.max(1).min(lines.len());
    let end = node.extra.line_end.max(start).min(lines.len());
    let slice = &lines[start - 1..end];

    let folded = fold_ellipsis(slice, max_lines);
    if folded.trim().is_empty() {
        None
    } else {
        Some(folded)
    }
}

/// Preserves the first `max_lines/2` and last `max_lines - max_lines/2 - 1`
/// lines, folding the middle into a single `...` line, when `lines` exceeds
/// `max_lines`.
fn fold_ellipsis(lines: &[&str], max_lines: usize) -> String {
    if lines.len() <= max_lines || max_lines == 0 {
        return lines.join("\n");
    }
    let head = max_lines / 2;
    let tail = max_lines - head - 1;
    let mut out: Vec<&str> = Vec::with_capacity(max_lines + 1);
    out.extend_from_slice(&lines[..head]);
    out.push("...");
    if tail > 0 {
        out.extend_from_slice(&lines[lines.len() - tail..]);
    }
    out.join("\n")
}

/// Assembles a [`ReviewUnit`] from a symbol change, its ranked context node
/// IDs, and optional before/after snippets of the changed symbol itself.
/// Stops including context nodes at the first node whose addition would
/// overflow `max_tokens_per_unit` (hard stop; that node and all after it are
/// excluded, even if a later one would have fit).
pub fn assemble(
    store: &GraphStore,
    worktree_root: &Path,
    change: &SymbolChange,
    context_ids: &[String],
    before_snippet: Option<String>,
    after_snippet: Option<String>,
    config: &AssemblerConfig,
) -> ReviewUnit {
    let mut used = 0usize;
    if let Some(before) = &before_snippet {
        used += estimate_tokens(before);
    }
    if let Some(after) = &after_snippet {
        used += estimate_tokens(after);
    }

    let mut retained = Vec::with_capacity(context_ids.len());
    for id in context_ids {
        let Some(snippet) = load_snippet_for_node(store, worktree_root, id, config.max_lines)
        else {
            continue;
        };
        let tokens = estimate_tokens(&snippet);
        if used + tokens > config.max_tokens_per_unit {
            break;
        }
        used += tokens;
        retained.push(id.clone());
    }

    ReviewUnit {
        change: change.clone(),
        context_ids: retained,
        before_snippet,
        after_snippet,
    }
}
