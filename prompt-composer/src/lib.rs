//! Prompt composer: builds per-unit and batched prompts from change
//! records, snippets, and an import-graph digest — per-unit restates
//! `context/prompts.py`; batched mode is built directly from spec's own
//! section layout (no literal source-language counterpart).

use std::collections::HashSet;
use std::path::Path;

use context_assembler::load_snippet_for_node;
use repo_graph::GraphStore;
use review_model::{ChangeType, ReviewUnit, SymbolChange, SymbolKind};

pub const SYSTEM_PROMPT: &str = "You are a meticulous code reviewer. Given a \
symbol-level change and the surrounding repository context, report concrete \
observations about correctness, security, performance, style, and test \
coverage. Be specific and cite line numbers where possible.";

/// A composed system/user prompt pair, mirroring the teacher's
/// `review::prompt::Prompt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchedPromptConfig {
    pub max_scope_paths: usize,
    pub max_symbol_bullets: usize,
    pub max_import_lines: usize,
    pub max_diff_lines_total: usize,
    pub max_diff_symbols_per_file: usize,
    pub per_file_cap: usize,
    pub total_cap: usize,
    pub diff_snippet_lines: usize,
}

impl Default for BatchedPromptConfig {
    fn default() -> Self {
        Self {
            max_scope_paths: 20,
            max_symbol_bullets: 50,
            max_import_lines: 30,
            max_diff_lines_total: 200,
            max_diff_symbols_per_file: 5,
            per_file_cap: 5,
            total_cap: 40,
            diff_snippet_lines: 25,
        }
    }
}

/// Orders changes the way the batched prompt's code-diff digest groups
/// them: Added before others, then Class < Function < Method < Constant,
/// then symbol name.
fn diff_sort_key(change: &SymbolChange) -> (u8, u8, String) {
    let added_rank = if change.change_type == ChangeType::Added { 0 } else { 1 };
    (added_rank, change.kind.diff_sort_rank(), change.symbol_name.clone())
}

/// Caps symbol changes to 5 per file and 40 total, ordered as above —
/// shared by the batched prompt and by whatever stage of the orchestrator
/// needs a deterministic, bounded change list (spec §4.6 "symbol-change
/// dedupe/limit", applied before composition regardless of mode).
pub fn dedupe_and_limit(changes: &[SymbolChange], per_file_cap: usize, total_cap: usize) -> Vec<SymbolChange> {
    let mut file_order: Vec<String> = Vec::new();
    let mut by_file: std::collections::HashMap<String, Vec<SymbolChange>> =
        std::collections::HashMap::new();

    for change in changes {
        by_file
            .entry(change.file_path.clone())
            .or_insert_with(|| {
                file_order.push(change.file_path.clone());
                Vec::new()
            })
            .push(change.clone());
    }

    let mut out = Vec::new();
    for file in &file_order {
        let mut group = by_file.remove(file).unwrap_or_default();
        group.sort_by(|a, b| diff_sort_key(a).cmp(&diff_sort_key(b)));
        group.truncate(per_file_cap);
        out.extend(group);
        if out.len() >= total_cap {
            break;
        }
    }
    out.truncate(total_cap);
    out
}

/// `file :: symbol (kind): change_type`, plus a `Descriptors: ...` line if
/// any descriptors are present.
pub fn change_summary_bullet(change: &SymbolChange) -> String {
    let mut line = format!(
        "{} :: {} ({:?}): {:?}",
        change.file_path, change.symbol_name, change.kind, change.change_type
    );
    if !change.descriptors.is_empty() {
        let descriptors = change
            .descriptors
            .iter()
            .map(|d| d.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        line.push_str(&format!("\nDescriptors: {descriptors}"));
    }
    line
}

/// Builds the per-unit prompt: optional repository-context block,
/// change-summary bullet, and a relevant-surrounding-code section with
/// before/after fences and one fenced block per context node.
pub fn build_unit_prompt(
    unit: &ReviewUnit,
    store: &GraphStore,
    head_root: &Path,
    repo_context: Option<&str>,
    max_lines: usize,
) -> Prompt {
    let mut sections: Vec<String> = Vec::new();

    if let Some(ctx) = repo_context {
        if !ctx.trim().is_empty() {
            sections.push(format!("## Repository context\n{ctx}"));
        }
    }

    sections.push(format!(
        "## Change summary\n{}",
        change_summary_bullet(&unit.change)
    ));

    let mut code_section = String::from("## Relevant surrounding code\n");
    if let Some(before) = &unit.before_snippet {
        code_section.push_str(&format!("### Before\n```\n{before}\n```\n"));
    }
    if let Some(after) = &unit.after_snippet {
        code_section.push_str(&format!("### After\n```\n{after}\n```\n"));
    }
    for node_id in &unit.context_ids {
        if let Some(snippet) = load_snippet_for_node(store, head_root, node_id, max_lines) {
            code_section.push_str(&format!("### Context: {node_id}\n```\n{snippet}\n```\n"));
        }
    }
    sections.push(code_section.trim_end().to_string());

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user: sections.join("\n\n"),
    }
}

/// For every module node whose `file_path` is among `changed_files`, one
/// line per outgoing/incoming Imports edge to another module,
/// deduplicated, capped at `max_lines` — or a placeholder if there are none.
pub fn build_import_digest(changed_files: &[String], store: &GraphStore, max_lines: usize) -> Vec<String> {
    let changed: HashSet<&str> = changed_files.iter().map(|s| s.as_str()).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut lines = Vec::new();

    for module in store
        .all_nodes()
        .filter(|n| n.kind == SymbolKind::Module && changed.contains(n.file_path.as_str()))
    {
        for target in store.out_neighbors(&module.id, review_model::EdgeType::Imports) {
            if target.kind != SymbolKind::Module {
                continue;
            }
            let line = format!("- {} imports {}", module.symbol_name, target.symbol_name);
            if seen.insert(line.clone()) {
                lines.push(line);
            }
        }
        for source in store.in_neighbors(&module.id, review_model::EdgeType::Imports) {
            if source.kind != SymbolKind::Module {
                continue;
            }
            let line = format!("- {} imports {}", source.symbol_name, module.symbol_name);
            if seen.insert(line.clone()) {
                lines.push(line);
            }
        }
        if lines.len() >= max_lines {
            break;
        }
    }
    lines.truncate(max_lines);
    lines
}

/// Groups already-capped changes by file, emitting a header and a
/// fixed-length snippet (from base if Removed, else head) per symbol.
/// Stops adding whole files once the running line count passes
/// `max_lines_total`.
fn build_code_diff_digest(
    changes: &[SymbolChange],
    base_root: &Path,
    head_root: &Path,
    snippet_lines: usize,
    max_lines_total: usize,
) -> String {
    let mut file_order: Vec<String> = Vec::new();
    let mut by_file: std::collections::HashMap<String, Vec<&SymbolChange>> =
        std::collections::HashMap::new();
    for change in changes {
        by_file
            .entry(change.file_path.clone())
            .or_insert_with(|| {
                file_order.push(change.file_path.clone());
                Vec::new()
            })
            .push(change);
    }

    let mut out = String::new();
    let mut running_lines = 0usize;
    'files: for file in &file_order {
        let Some(group) = by_file.get(file) else {
            continue;
        };
        for change in group {
            out.push_str(&format!(
                "### {} :: {} ({:?}): {:?}\n",
                change.file_path, change.symbol_name, change.kind, change.change_type
            ));
            let root = if change.change_type == ChangeType::Removed {
                base_root
            } else {
                head_root
            };
            let snippet = read_clamped_snippet(
                root,
                &change.file_path,
                change.line_start,
                change.line_end,
                snippet_lines,
            );
            let line_count = snippet.lines().count();
            out.push_str("```\n");
            out.push_str(&snippet);
            out.push_str("\n```\n\n");
            running_lines += line_count;
        }
        if running_lines > max_lines_total {
            break 'files;
        }
    }
    out
}

fn read_clamped_snippet(
    root: &Path,
    rel_path: &str,
    line_start: usize,
    line_end: usize,
    max_lines: usize,
) -> String {
    let Ok(text) = std::fs::read_to_string(root.join(rel_path)) else {
        return String::new();
    };
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = line_start.max(1).min(lines.len());
    let mut end = line_end.max(start).min(lines.len());
    if end - start + 1 > max_lines {
        end = start + max_lines - 1;
    }
    lines[start - 1..end].join("\n")
}

/// Builds the single batched-mode prompt: Scope, Symbol-level changes,
/// Import/dependency relationships, Code diffs, in that order.
pub fn build_batched_prompt(
    changed_files: &[String],
    changes: &[SymbolChange],
    store: &GraphStore,
    base_root: &Path,
    head_root: &Path,
    config: &BatchedPromptConfig,
) -> Prompt {
    let limited = dedupe_and_limit(changes, config.per_file_cap, config.total_cap);

    let mut scope = String::from("## Scope\n");
    for path in changed_files.iter().take(config.max_scope_paths) {
        scope.push_str(&format!("- {path}\n"));
    }

    let mut symbol_section = String::from("## Symbol-level changes\n");
    for change in limited.iter().take(config.max_symbol_bullets) {
        symbol_section.push_str(&format!("- {}\n", change_summary_bullet(change)));
    }

    let import_lines = build_import_digest(changed_files, store, config.max_import_lines);
    let mut import_section = String::from("## Import/dependency relationships\n");
    if import_lines.is_empty() {
        import_section.push_str("(no cross-file import edges in graph)\n");
    } else {
        for line in &import_lines {
            import_section.push_str(line);
            import_section.push('\n');
        }
    }

    let mut diff_section = String::from("## Code diffs\n");
    let digest = build_code_diff_digest(
        &limited,
        base_root,
        head_root,
        config.diff_snippet_lines,
        config.max_diff_lines_total,
    );
    let char_cap = config.max_diff_lines_total * 40;
    if digest.chars().count() > char_cap {
        let truncated: String = digest.chars().take(char_cap).collect();
        diff_section.push_str(&truncated);
        diff_section.push_str("\n[... truncated for length ...]\n");
    } else {
        diff_section.push_str(&digest);
    }

    let user = [scope, symbol_section, import_section, diff_section].join("\n\n");

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_model::Descriptor;

    fn change(file: &str, name: &str, kind: SymbolKind, ct: ChangeType) -> SymbolChange {
        SymbolChange {
            file_path: file.to_string(),
            symbol_name: name.to_string(),
            kind,
            change_type: ct,
            descriptors: vec![],
            line_start: 1,
            line_end: 1,
            parent_class: None,
        }
    }

    #[test]
    fn dedupe_caps_per_file_and_total() {
        let mut changes = Vec::new();
        for i in 0..10 {
            changes.push(change("a.py", &format!("f{i}"), SymbolKind::Function, ChangeType::Added));
        }
        let limited = dedupe_and_limit(&changes, 5, 40);
        assert_eq!(limited.len(), 5);
    }

    #[test]
    fn dedupe_orders_added_before_modified() {
        let changes = vec![
            change("a.py", "z", SymbolKind::Function, ChangeType::Modified),
            change("a.py", "a", SymbolKind::Function, ChangeType::Added),
        ];
        let limited = dedupe_and_limit(&changes, 5, 40);
        assert_eq!(limited[0].symbol_name, "a");
    }

    #[test]
    fn empty_import_digest_uses_placeholder() {
        let store = GraphStore::new();
        let prompt = build_batched_prompt(
            &["f.py".to_string()],
            &[],
            &store,
            Path::new("."),
            Path::new("."),
            &BatchedPromptConfig::default(),
        );
        assert!(prompt.user.contains("(no cross-file import edges in graph)"));
    }

    #[test]
    fn change_summary_includes_descriptors_line() {
        let mut c = change("a.py", "foo", SymbolKind::Function, ChangeType::Modified);
        c.descriptors = vec![Descriptor::SignatureChange];
        let bullet = change_summary_bullet(&c);
        assert!(bullet.contains("Descriptors: signature_change"));
    }
}
