//! Semantic differ: pairs base vs. head symbol records by identity key and
//! emits symbol changes with descriptors, restating
//! `python_differ.py::SemanticDiffer.diff` over `SymbolRecord`s.

use std::collections::HashMap;

use review_model::{ChangeType, Descriptor, SymbolChange, SymbolKind, SymbolRecord};

type Key = (String, SymbolKind, Option<String>);

/// Diffs `base` against `head` records from a single file. Result ordering:
/// all head-derived changes in head order, then base-only removals in base
/// order.
pub fn diff(file_path: &str, base: &[SymbolRecord], head: &[SymbolRecord]) -> Vec<SymbolChange> {
    let base_by_key: HashMap<Key, &SymbolRecord> =
        base.iter().map(|r| (r.identity_key(), r)).collect();

    let mut changes = Vec::with_capacity(head.len());
    let mut seen_keys: Vec<Key> = Vec::with_capacity(head.len());

    for record in head {
        let key = record.identity_key();
        seen_keys.push(key.clone());
        match base_by_key.get(&key) {
            None => changes.push(to_change(
                file_path,
                record,
                ChangeType::Added,
                vec![Descriptor::Added],
            )),
            Some(base_record) => {
                let descriptors = compare_symbols(base_record, record);
                if !descriptors.is_empty() {
                    changes.push(to_change(file_path, record, ChangeType::Modified, descriptors));
                }
            }
        }
    }

    for record in base {
        let key = record.identity_key();
        if !seen_keys.contains(&key) {
            changes.push(to_change(
                file_path,
                record,
                ChangeType::Removed,
                vec![Descriptor::Removed],
            ));
        }
    }

    changes
}

/// Compares two same-identity records in the fixed descriptor order
/// [signature_change, docstring_change, decorator_change].
fn compare_symbols(base: &SymbolRecord, head: &SymbolRecord) -> Vec<Descriptor> {
    let mut descriptors = Vec::with_capacity(3);
    if base.signature != head.signature {
        descriptors.push(Descriptor::SignatureChange);
    }
    if base.docstring != head.docstring {
        descriptors.push(Descriptor::DocstringChange);
    }
    if base.decorators != head.decorators {
        descriptors.push(Descriptor::DecoratorChange);
    }
    descriptors
}

fn to_change(
    file_path: &str,
    record: &SymbolRecord,
    change_type: ChangeType,
    descriptors: Vec<Descriptor>,
) -> SymbolChange {
    SymbolChange {
        file_path: file_path.to_string(),
        symbol_name: record.name.clone(),
        kind: record.kind,
        change_type,
        descriptors,
        line_start: record.line_start,
        line_end: record.line_end,
        parent_class: record.parent_class.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(name: &str, signature: &str) -> SymbolRecord {
        SymbolRecord {
            name: name.to_string(),
            kind: SymbolKind::Function,
            line_start: 1,
            line_end: 2,
            signature: signature.to_string(),
            docstring: None,
            decorators: vec![],
            parent_class: None,
        }
    }

    #[test]
    fn signature_change_is_modified_with_single_descriptor() {
        let base = vec![func("foo", "foo(x)")];
        let head = vec![func("foo", "foo(x, y)")];
        let changes = diff("f.py", &base, &head);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::Modified);
        assert_eq!(changes[0].descriptors, vec![Descriptor::SignatureChange]);
    }

    #[test]
    fn identical_sources_produce_no_changes() {
        let recs = vec![func("foo", "foo(x)")];
        assert!(diff("f.py", &recs, &recs).is_empty());
    }

    #[test]
    fn added_class_and_method() {
        let head = vec![
            SymbolRecord {
                name: "Bar".into(),
                kind: SymbolKind::Class,
                line_start: 1,
                line_end: 2,
                signature: String::new(),
                docstring: None,
                decorators: vec![],
                parent_class: None,
            },
            SymbolRecord {
                name: "baz".into(),
                kind: SymbolKind::Method,
                line_start: 2,
                line_end: 2,
                signature: "baz(self)".into(),
                docstring: None,
                decorators: vec![],
                parent_class: Some("Bar".into()),
            },
        ];
        let changes = diff("f.py", &[], &head);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.change_type == ChangeType::Added));
        assert_eq!(changes[0].symbol_name, "Bar");
        assert_eq!(changes[1].symbol_name, "baz");
        assert_eq!(changes[1].parent_class.as_deref(), Some("Bar"));
    }

    #[test]
    fn removed_symbol_is_reported() {
        let base = vec![func("gone", "gone()")];
        let changes = diff("f.py", &base, &[]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::Removed);
        assert_eq!(changes[0].descriptors, vec![Descriptor::Removed]);
    }
}
