//! Orchestrator: turns a `(PullRequestRef, mode)` pair into a structured
//! review. Restates `mr_reviewer::run_review`'s step-by-step shape —
//! provider I/O, delta symbol extraction, context building, prompt + LLM —
//! specialised to the semantic-diff/graph-retrieval pipeline this crate
//! builds instead of mr-reviewer's RAG-backed one.

pub mod config;
pub mod errors;
pub mod findings;

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use serde::{Deserialize, Serialize};

use checkout::{CheckoutProvider, FileChange, FileChangeType};
use config::{ReviewConfig, ReviewMode};
use errors::ReviewError;
use llm_adapter::LlmClient;
use repo_graph::GraphStore;
use review_model::{ChangeType, ReviewFinding, ReviewStatus, SymbolChange, SymbolRecord};

/// A base/head revision pair to review. The checkout provider resolves
/// these into worktrees; the filesystem reference provider ignores them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub base: String,
    pub head: String,
}

/// One per-unit LLM call's result, paired with the change it reviewed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitReview {
    pub change: SymbolChange,
    pub review_text: String,
    pub findings: Vec<ReviewFinding>,
}

/// Final pipeline output (spec §6 "Pipeline output").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutput {
    pub summary: String,
    pub findings: Vec<ReviewFinding>,
    pub status: ReviewStatus,
    pub unit_reviews: Vec<UnitReview>,
    pub combined_review: Option<String>,
}

fn failed(message: String) -> ReviewOutput {
    ReviewOutput {
        summary: message,
        findings: Vec::new(),
        status: ReviewStatus::Failed,
        unit_reviews: Vec::new(),
        combined_review: None,
    }
}

/// Runs one review end to end. Never returns an `Err`: input failures
/// (stages 1-2) come back as `status = Failed` with the message in
/// `summary`; everything past that point is soft-fail (spec §7).
pub async fn run_review(
    checkout: &impl CheckoutProvider,
    llm: &LlmClient,
    pr: &PullRequestRef,
    config: &ReviewConfig,
) -> ReviewOutput {
    debug!("reviewer: stage 1, fetching file changes");
    let file_changes = match checkout.file_changes(&pr.base, &pr.head) {
        Ok(changes) => changes,
        Err(e) => {
            let err: ReviewError = e.into();
            return failed(format!("Failed to get file changes: {err}"));
        }
    };

    let base_root = checkout.base_worktree_path();
    let head_root = checkout.head_worktree_path();
    debug!("reviewer: stage 2, acquiring base/head worktrees");
    if !base_root.exists() || !head_root.exists() {
        return failed("Failed to checkout base/head: worktree path does not exist".to_string());
    }

    let extensions: Vec<String> = config
        .supported_languages
        .iter()
        .flat_map(|(_, exts)| exts.clone())
        .collect();

    let supported_changes: Vec<&FileChange> = file_changes
        .iter()
        .filter(|c| extensions.iter().any(|ext| c.path.ends_with(ext.as_str())))
        .collect();

    debug!(
        total = file_changes.len(),
        supported = supported_changes.len(),
        "reviewer: stage 3, running semantic diff over supported files"
    );
    let mut all_changes: Vec<SymbolChange> = Vec::new();
    for change in &supported_changes {
        // Added/Removed files never need the other side read at all — the
        // fast path `ast_diff_service.py` takes for wholly one-sided files.
        let base_records = if change.change_type == FileChangeType::Added {
            Vec::new()
        } else {
            read_records(base_root, &change.path)
        };
        let head_records = if change.change_type == FileChangeType::Removed {
            Vec::new()
        } else {
            read_records(head_root, &change.path)
        };
        all_changes.extend(semantic_diff::diff(&change.path, &base_records, &head_records));
    }

    if all_changes.is_empty() {
        info!("reviewer: no symbol-level changes, returning completed review with no findings");
        return ReviewOutput {
            summary: "No symbol-level changes detected.".to_string(),
            findings: Vec::new(),
            status: ReviewStatus::Completed,
            unit_reviews: Vec::new(),
            combined_review: None,
        };
    }

    let limited = prompt_composer::dedupe_and_limit(
        &all_changes,
        config.batched_prompt.per_file_cap,
        config.batched_prompt.total_cap,
    );

    debug!("reviewer: stage 5, building head graph");
    let builder = repo_graph::GraphBuilder::new(extensions);
    let store = builder.build(head_root);

    let mut unit_reviews: Vec<UnitReview> = Vec::new();
    if matches!(config.mode, ReviewMode::PerUnit | ReviewMode::Both) {
        debug!(units = limited.len(), "reviewer: stage 6, dispatching per-unit reviews");
        for change in &limited {
            let seeds: Vec<String> = map_symbol_to_node_id(&store, change).into_iter().collect();
            let context_ids = repo_graph::find(&store, &seeds, &config.retrieval);

            let before_snippet = if change.change_type == ChangeType::Added {
                None
            } else {
                read_snippet(
                    base_root,
                    &change.file_path,
                    change.line_start,
                    change.line_end,
                    config.assembler.max_lines,
                )
            };
            let after_snippet = if change.change_type == ChangeType::Removed {
                None
            } else {
                read_snippet(
                    head_root,
                    &change.file_path,
                    change.line_start,
                    change.line_end,
                    config.assembler.max_lines,
                )
            };

            let unit = context_assembler::assemble(
                &store,
                head_root,
                change,
                &context_ids,
                before_snippet,
                after_snippet,
                &config.assembler,
            );
            let prompt = prompt_composer::build_unit_prompt(&unit, &store, head_root, None, config.assembler.max_lines);
            let text = llm.complete(&prompt.system, &prompt.user, None, config.llm_max_tokens).await;
            let findings = findings::parse_with_location(&text, &change.file_path, Some(&change.symbol_name));
            unit_reviews.push(UnitReview {
                change: change.clone(),
                review_text: text,
                findings,
            });
        }
    }

    let combined_review = if unit_reviews.is_empty() {
        None
    } else {
        Some(
            unit_reviews
                .iter()
                .map(|u| u.review_text.clone())
                .collect::<Vec<_>>()
                .join("\n\n"),
        )
    };

    let mut batched_summary: Option<String> = None;
    let mut batched_findings: Vec<ReviewFinding> = Vec::new();
    if matches!(config.mode, ReviewMode::Batched | ReviewMode::Both) {
        debug!("reviewer: stage 7, composing batched prompt");
        let mut seen_files = HashSet::new();
        let changed_files: Vec<String> = supported_changes
            .iter()
            .map(|c| c.path.clone())
            .filter(|p| seen_files.insert(p.clone()))
            .collect();

        let prompt = prompt_composer::build_batched_prompt(
            &changed_files,
            &limited,
            &store,
            base_root,
            head_root,
            &config.batched_prompt,
        );
        let text = llm.complete(&prompt.system, &prompt.user, None, config.llm_max_tokens).await;
        batched_findings = findings::parse_with_location(&text, "", None);
        batched_summary = Some(text);
    }

    let summary = match config.mode {
        ReviewMode::PerUnit => combined_review.clone().unwrap_or_else(|| "No review output.".to_string()),
        ReviewMode::Batched | ReviewMode::Both => batched_summary.unwrap_or_default(),
    };

    let mut findings: Vec<ReviewFinding> = unit_reviews.iter().flat_map(|u| u.findings.clone()).collect();
    findings.extend(batched_findings);

    ReviewOutput {
        summary,
        findings,
        status: ReviewStatus::Completed,
        unit_reviews,
        combined_review,
    }
}

fn read_records(root: &Path, rel_path: &str) -> Vec<SymbolRecord> {
    match std::fs::read_to_string(root.join(rel_path)) {
        Ok(text) => ast_extractor::extract_symbols(&text, rel_path),
        Err(e) => {
            warn!(path = rel_path, %e, "reviewer: could not read file, treating as zero symbols");
            Vec::new()
        }
    }
}

/// Direct id (`file::name`) first; for methods, falls back to any node in
/// the same file whose id ends with `.<name>` (spec §4.8 step 6).
fn map_symbol_to_node_id(store: &GraphStore, change: &SymbolChange) -> Option<String> {
    let direct = format!("{}::{}", change.file_path, change.symbol_name);
    if store.contains(&direct) {
        return Some(direct);
    }
    let suffix = format!(".{}", change.symbol_name);
    store
        .all_nodes()
        .find(|n| n.file_path == change.file_path && n.id.ends_with(&suffix))
        .map(|n| n.id.clone())
}

/// Line-clamped, ellipsis-folded snippet for a changed symbol's own
/// before/after text, read directly (not through the head-only graph
/// store) since base-side nodes never make it into the graph.
fn read_snippet(root: &Path, rel_path: &str, line_start: usize, line_end: usize, max_lines: usize) -> Option<String> {
    let text = std::fs::read_to_string(root.join(rel_path)).ok()?;
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return None;
    }
    let start = line_start.max(1).min(lines.len());
    let end = line_end.max(start).min(lines.len());
    let slice = &lines[start - 1..end];

    let folded = if slice.len() <= max_lines || max_lines == 0 {
        slice.join("\n")
    } else {
        let head = max_lines / 2;
        let tail = max_lines - head - 1;
        let mut out: Vec<&str> = Vec::with_capacity(max_lines + 1);
        out.extend_from_slice(&slice[..head]);
        out.push("...");
        if tail > 0 {
            out.extend_from_slice(&slice[slice.len() - tail..]);
        }
        out.join("\n")
    };

    if folded.trim().is_empty() { None } else { Some(folded) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout::FilesystemCheckoutProvider;
    use llm_adapter::LlmConfig;
    use std::fs;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn signature_change_is_the_only_symbol_change() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("base");
        let head = tmp.path().join("head");
        write(&base, "f.py", "def foo(x):\n    return x\n");
        write(&head, "f.py", "def foo(x, y):\n    return x + y\n");

        let provider = FilesystemCheckoutProvider::new(&base, &head, vec![("python".into(), vec![".py".into()])]);
        let llm = LlmClient::build(LlmConfig { provider: "unknown".to_string(), ..Default::default() });
        let pr = PullRequestRef { base: "base".into(), head: "head".into() };
        let config = ReviewConfig { mode: ReviewMode::PerUnit, ..Default::default() };

        let output = run_review(&provider, &llm, &pr, &config).await;
        assert_eq!(output.status, ReviewStatus::Completed);
        assert_eq!(output.unit_reviews.len(), 1);
        assert_eq!(output.unit_reviews[0].change.symbol_name, "foo");
    }

    #[tokio::test]
    async fn batched_mode_on_single_file_repo_reports_no_import_edges() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("base");
        let head = tmp.path().join("head");
        write(&base, "f.py", "def foo():\n    return 1\n");
        write(&head, "f.py", "def foo():\n    return 2\n");

        let provider = FilesystemCheckoutProvider::new(&base, &head, vec![("python".into(), vec![".py".into()])]);
        let llm = LlmClient::build(LlmConfig { provider: "unknown".to_string(), ..Default::default() });
        let pr = PullRequestRef { base: "base".into(), head: "head".into() };
        let config = ReviewConfig { mode: ReviewMode::Batched, ..Default::default() };

        let output = run_review(&provider, &llm, &pr, &config).await;
        assert_eq!(output.status, ReviewStatus::Completed);
        assert!(!output.summary.is_empty());
    }

    #[tokio::test]
    async fn missing_worktree_fails_fast() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("base");
        let head = tmp.path().join("does-not-exist");
        fs::create_dir_all(&base).unwrap();

        let provider = FilesystemCheckoutProvider::new(&base, &head, vec![("python".into(), vec![".py".into()])]);
        let llm = LlmClient::build(LlmConfig::default());
        let pr = PullRequestRef { base: "base".into(), head: "head".into() };
        let config = ReviewConfig::default();

        let output = run_review(&provider, &llm, &pr, &config).await;
        assert_eq!(output.status, ReviewStatus::Failed);
    }

    #[tokio::test]
    async fn unchanged_base_and_head_yields_no_symbol_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("base");
        let head = tmp.path().join("head");
        write(&base, "f.py", "def foo():\n    return 1\n");
        write(&head, "f.py", "def foo():\n    return 1\n");

        let provider = FilesystemCheckoutProvider::new(&base, &head, vec![("python".into(), vec![".py".into()])]);
        let llm = LlmClient::build(LlmConfig::default());
        let pr = PullRequestRef { base: "base".into(), head: "head".into() };
        let config = ReviewConfig::default();

        let output = run_review(&provider, &llm, &pr, &config).await;
        assert_eq!(output.status, ReviewStatus::Completed);
        assert!(output.unit_reviews.is_empty());
        assert!(output.findings.is_empty());
    }
}
