use super::*;

fn edit() -> DocumentEdit {
    // Replace bytes 10..14 with 10 new bytes.
    DocumentEdit {
        before: DocumentId(1),
        after: DocumentId(2),
        offset: 10,
        removed: 4,
        inserted: 10,
    }
}

#[test]
fn test_remap_before_edit_is_unchanged_except_document() {
    let loc = SourceLocation::new(DocumentId(1), 0, 5);
    assert_eq!(edit().remap(loc), SourceLocation::new(DocumentId(2), 0, 5));
}

#[test]
fn test_remap_after_edit_shifts() {
    let loc = SourceLocation::new(DocumentId(1), 20, 3);
    assert_eq!(edit().remap(loc), SourceLocation::new(DocumentId(2), 26, 3));
}

#[test]
fn test_remap_overlapping_stretches() {
    let loc = SourceLocation::new(DocumentId(1), 8, 4);
    let mapped = edit().remap(loc);
    assert_eq!(mapped.start, 8);
    assert_eq!(mapped.end(), 20);
}

#[test]
fn test_remap_other_document_untouched() {
    let loc = SourceLocation::new(DocumentId(7), 20, 3);
    assert_eq!(edit().remap(loc), loc);
}

#[test]
fn test_contains() {
    let outer = SourceLocation::new(DocumentId(1), 0, 100);
    let inner = SourceLocation::new(DocumentId(1), 10, 5);
    assert!(outer.contains(&inner));
    assert!(!inner.contains(&outer));
    assert!(SourceLocation::SYNTHETIC.is_synthetic());
}
