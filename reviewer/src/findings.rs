//! Heuristic finding parser (spec §4.9): turns raw LLM text into a list of
//! typed findings by splitting on heading-like anchors and scanning each
//! block for severity/category keywords and a line number, restating the
//! block-and-keyword-scan shape of `mr_reviewer::review::policy`'s comment
//! normalisation.

use lazy_static::lazy_static;
use regex::Regex;
use review_model::{Category, ReviewFinding, Severity};

const MAX_MESSAGE_CHARS: usize = 500;
const KEYWORD_SCAN_CHARS: usize = 200;
const MIN_BLOCK_CHARS: usize = 10;

lazy_static! {
    static ref BLOCK_START: Regex = Regex::new(
        r"(?m)^(?:#{1,6}[ \t]+\S.*|\*\*[^*\n]+\*\*.*|[-*][ \t]*(?i:error|warning|warn|info|suggestion)\b.*)$"
    )
    .expect("block-start pattern is a static literal");
    static ref LINE_NUMBER: Regex =
        Regex::new(r"(?i)(?:line|L)\s*(\d+)").expect("line-number pattern is a static literal");
}

/// Splits `text` at the start of each heading/bold-leader/bulleted-severity
/// line. With no such anchor, the whole text is one candidate block — the
/// input to step 6's no-qualifying-block fallback. Any text preceding the
/// first anchor (e.g. an introductory summary paragraph) is kept as its own
/// leading block rather than dropped, mirroring a lookahead split.
fn split_blocks(text: &str) -> Vec<&str> {
    let starts: Vec<usize> = BLOCK_START.find_iter(text).map(|m| m.start()).collect();
    if starts.is_empty() {
        return vec![text];
    }
    let mut blocks = Vec::with_capacity(starts.len() + 1);
    if starts[0] > 0 {
        blocks.push(&text[..starts[0]]);
    }
    blocks.extend(starts.iter().enumerate().map(|(i, &start)| {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        &text[start..end]
    }));
    blocks
}

fn severity_of(block: &str) -> Severity {
    let window: String = block.chars().take(KEYWORD_SCAN_CHARS).collect::<String>().to_lowercase();
    if window.contains("error") {
        Severity::Error
    } else if window.contains("warning") || window.contains("warn") {
        Severity::Warn
    } else {
        // info and suggestion both map to info; so does the absence of a keyword.
        Severity::Info
    }
}

fn category_of(block: &str) -> Category {
    let window: String = block.chars().take(KEYWORD_SCAN_CHARS).collect::<String>().to_lowercase();
    if window.contains("correctness") {
        Category::Correctness
    } else if window.contains("security") {
        Category::Security
    } else if window.contains("performance") {
        Category::Performance
    } else if window.contains("style") {
        Category::Style
    } else if window.contains("test") {
        Category::Correctness
    } else {
        Category::Style
    }
}

fn line_number_of(block: &str) -> Option<usize> {
    LINE_NUMBER
        .captures(block)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn message_of(block: &str) -> String {
    block.chars().take(MAX_MESSAGE_CHARS).collect::<String>().trim().to_string()
}

fn to_finding(block: &str, location_file: &str, symbol: Option<&str>) -> ReviewFinding {
    let line = line_number_of(block);
    ReviewFinding {
        severity: severity_of(block),
        category: category_of(block),
        location_file: location_file.to_string(),
        location_line_start: line,
        location_line_end: line,
        symbol: symbol.map(|s| s.to_string()),
        message: message_of(block),
        suggested_fix: None,
    }
}

/// No-qualifying-block fallback (spec §4.9 step 6): defaults only, no
/// content scan — `severity="info"`, `category="style"`, no line number.
fn default_finding(text: &str, location_file: &str, symbol: Option<&str>) -> ReviewFinding {
    ReviewFinding {
        severity: Severity::Info,
        category: Category::Style,
        location_file: location_file.to_string(),
        location_line_start: None,
        location_line_end: None,
        symbol: symbol.map(|s| s.to_string()),
        message: message_of(text),
        suggested_fix: None,
    }
}

/// Parses `text` into findings, attributing each to `location_file` and
/// (for per-unit reviews) the changed symbol's name.
pub fn parse_with_location(text: &str, location_file: &str, symbol: Option<&str>) -> Vec<ReviewFinding> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let qualifying: Vec<&str> = split_blocks(text)
        .into_iter()
        .filter(|b| b.trim().chars().count() >= MIN_BLOCK_CHARS)
        .collect();

    if qualifying.is_empty() {
        return vec![default_finding(trimmed, location_file, symbol)];
    }

    qualifying
        .into_iter()
        .map(|b| to_finding(b, location_file, symbol))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_headings_and_extracts_line_number() {
        let text = "## Error: off-by-one\nLooks wrong on line 42, fix the bound.\n\
                     ## Style note\nConsider renaming this variable for clarity please.";
        let findings = parse_with_location(text, "f.py", Some("foo"));
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].location_line_start, Some(42));
        assert_eq!(findings[1].category, Category::Style);
    }

    #[test]
    fn no_heading_yields_single_default_finding() {
        let findings = parse_with_location("Looks fine overall, nothing to flag here.", "f.py", None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[test]
    fn short_blocks_are_discarded() {
        let text = "## A\nhi\n## Security issue\nUnescaped input reaches the query builder directly.";
        let findings = parse_with_location(text, "f.py", None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::Security);
    }

    #[test]
    fn parser_totality_any_nonempty_text_yields_a_finding() {
        let findings = parse_with_location("asdkjf alksdjf laksjdf laksjdflk ajsdlkfj", "f.py", None);
        assert!(!findings.is_empty());
    }

    #[test]
    fn empty_text_yields_no_findings() {
        assert!(parse_with_location("   ", "f.py", None).is_empty());
    }

    #[test]
    fn preamble_before_first_heading_becomes_its_own_finding() {
        let text = "This change looks reasonable overall, a couple of notes below.\n\
                     ## Security issue\nUnescaped input reaches the query builder directly.";
        let findings = parse_with_location(text, "f.py", None);
        assert_eq!(findings.len(), 2);
        assert!(findings[0].message.starts_with("This change looks reasonable"));
        assert_eq!(findings[1].category, Category::Security);
    }

    #[test]
    fn fallback_finding_uses_defaults_not_content_scan() {
        let findings = parse_with_location("Error on line 7: looks like a real problem here.", "f.py", None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[0].category, Category::Style);
        assert_eq!(findings[0].location_line_start, None);
    }
}
