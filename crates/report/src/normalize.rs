//! Span normalization
//!
//! Office suites split a run of text into many `text:span` elements that
//! carry the same style, which also splits any `{{ ... }}` directive typed
//! into the document. Folding such spans back together restores the
//! directives before the text reaches the merge engine.

use crate::names::{attributes, elements};
use crate::diagnostics::DiagnosticKind;
use crate::prepare::PrepareContext;
use crate::xml::{NodeData, NodeId, Tree};

/// Merge adjacent same-style spans in every paragraph and annotation
///
/// `text:p` elements are visited first, then annotations, each in document
/// order.
pub fn merge_spans(tree: &mut Tree, ctx: &mut PrepareContext<'_>) {
    let paragraphs = tree.find_elements(|e| e.name == elements::TEXT_P);
    let annotations = tree.find_elements(|e| e.local_name() == elements::ANNOTATION);

    for id in paragraphs.into_iter().chain(annotations) {
        merge_children(tree, id, ctx);
    }
}

enum ChildKind {
    Space,
    Span,
    Blank,
    Other,
}

fn classify(tree: &Tree, id: NodeId) -> ChildKind {
    match tree.data(id) {
        NodeData::Element(e) if e.local_name() == elements::S => ChildKind::Space,
        NodeData::Element(e) if e.local_name() == elements::SPAN => ChildKind::Span,
        NodeData::Text(text) if text.trim().is_empty() => ChildKind::Blank,
        _ => ChildKind::Other,
    }
}

/// Style of a span; a missing attribute compares as empty
fn style_of(tree: &Tree, id: NodeId) -> &str {
    tree.element(id)
        .and_then(|e| e.attribute(attributes::STYLE_NAME))
        .unwrap_or("")
}

/// Rebuild the child list of one paragraph
///
/// Whitespace between two merged spans moves into the merged span; any
/// other text or element ends the run.
fn merge_children(tree: &mut Tree, paragraph: NodeId, ctx: &mut PrepareContext<'_>) {
    let children = tree.children(paragraph).to_vec();
    let mut kept = Vec::with_capacity(children.len());
    let mut previous: Option<NodeId> = None;
    let mut pending: Vec<NodeId> = Vec::new();
    let mut changed = false;

    for child in children {
        match classify(tree, child) {
            ChildKind::Space => {
                kept.append(&mut pending);
                previous = None;
                changed = true;
                ctx.debug(DiagnosticKind::SpaceRemoved, "removed <text:s/>");
            }
            ChildKind::Span => match previous {
                Some(prev) if style_of(tree, prev) == style_of(tree, child) => {
                    let style = style_of(tree, child).to_string();
                    let mut merged = tree.children(prev).to_vec();
                    merged.append(&mut pending);
                    merged.extend_from_slice(tree.children(child));
                    tree.set_children(child, Vec::new());
                    tree.set_children(prev, merged);
                    changed = true;
                    ctx.debug(
                        DiagnosticKind::SpanMerged,
                        format!("merged span into previous span with style {:?}", style),
                    );
                }
                _ => {
                    kept.append(&mut pending);
                    kept.push(child);
                    previous = Some(child);
                }
            },
            ChildKind::Blank if previous.is_some() => pending.push(child),
            ChildKind::Blank | ChildKind::Other => {
                kept.append(&mut pending);
                kept.push(child);
                previous = None;
            }
        }
    }
    kept.append(&mut pending);

    if changed {
        tree.set_children(paragraph, kept);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::options::PrepareOptions;
    use crate::prepare::normalize_with;
    use crate::xml::{parse_document, write_document};
    use proptest::prelude::*;

    const OPEN: &str = r#"<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0"><office:body><office:text>"#;
    const CLOSE: &str = "</office:text></office:body></office:document-content>";

    fn doc(body: &str) -> String {
        format!("{}{}{}", OPEN, body, CLOSE)
    }

    fn run(body: &str) -> (String, MemorySink) {
        let options = PrepareOptions::default();
        let mut sink = MemorySink::new();
        let out = {
            let mut ctx = PrepareContext::new("content.xml", &options, &mut sink);
            normalize_with(&doc(body), &mut ctx).unwrap()
        };
        (out, sink)
    }

    #[test]
    fn test_same_style_spans_collapse_in_order() {
        let (out, sink) = run(r#"<text:p><text:span text:style-name="T1">A</text:span><text:span text:style-name="T1">B</text:span><text:span text:style-name="T1">C</text:span></text:p>"#);
        assert_eq!(out, doc(r#"<text:p><text:span text:style-name="T1">ABC</text:span></text:p>"#));
        assert_eq!(sink.count(DiagnosticKind::SpanMerged), 2);
    }

    #[test]
    fn test_different_styles_never_merge() {
        let body = r#"<text:p><text:span text:style-name="T1">{{.</text:span><text:span text:style-name="T2">Name}}</text:span></text:p>"#;
        let (out, sink) = run(body);
        assert_eq!(out, doc(body));
        assert_eq!(sink.count(DiagnosticKind::SpanMerged), 0);
    }

    #[test]
    fn test_styleless_spans_merge() {
        let (out, _) = run("<text:p><text:span>{{.Gr</text:span><text:span>andTotal}}</text:span></text:p>");
        assert_eq!(out, doc("<text:p><text:span>{{.GrandTotal}}</text:span></text:p>"));
    }

    #[test]
    fn test_space_placeholder_removed_and_breaks_run() {
        let (out, sink) = run(r#"<text:p><text:span text:style-name="T1">a</text:span><text:s/><text:span text:style-name="T1">b</text:span></text:p>"#);
        assert_eq!(
            out,
            doc(r#"<text:p><text:span text:style-name="T1">a</text:span><text:span text:style-name="T1">b</text:span></text:p>"#)
        );
        assert_eq!(sink.count(DiagnosticKind::SpaceRemoved), 1);
    }

    #[test]
    fn test_other_children_break_runs() {
        let body = r#"<text:p><text:span text:style-name="T1">a</text:span>x<text:span text:style-name="T1">b</text:span><text:tab/><text:span text:style-name="T1">c</text:span></text:p>"#;
        let (out, _) = run(body);
        assert_eq!(out, doc(body));
    }

    #[test]
    fn test_whitespace_between_merged_spans_is_kept() {
        let (out, _) = run(r#"<text:p><text:span text:style-name="T1">{{range</text:span> <text:span text:style-name="T1">.Items}}</text:span></text:p>"#);
        assert_eq!(out, doc(r#"<text:p><text:span text:style-name="T1">{{range .Items}}</text:span></text:p>"#));
    }

    #[test]
    fn test_nested_children_move_with_merge() {
        let (out, _) = run(r#"<text:p><text:span text:style-name="T1">a<text:line-break/></text:span><text:span text:style-name="T1">b</text:span></text:p>"#);
        assert_eq!(out, doc(r#"<text:p><text:span text:style-name="T1">a<text:line-break/>b</text:span></text:p>"#));
    }

    #[test]
    fn test_annotation_paragraphs_merge() {
        let (out, _) = run(r#"<table:table-cell><text:p><office:annotation><text:p><text:span text:style-name="T9">{{range</text:span><text:span text:style-name="T9"> .Items}}</text:span></text:p></office:annotation></text:p></table:table-cell>"#);
        assert!(out.contains(r#"<text:span text:style-name="T9">{{range .Items}}</text:span>"#));
    }

    #[test]
    fn test_merge_spans_on_tree() {
        let mut tree = parse_document(&doc(r#"<text:p><text:span>a</text:span><text:span>b</text:span></text:p>"#)).unwrap();
        let options = PrepareOptions::default();
        let mut sink = MemorySink::new();
        merge_spans(&mut tree, &mut PrepareContext::new("content.xml", &options, &mut sink));

        let spans = tree.find_elements(|e| e.local_name() == "span");
        assert_eq!(spans.len(), 1);
        assert_eq!(tree.text_content(spans[0]), "ab");
        assert!(write_document(&tree, false).unwrap().contains("<text:span>ab</text:span>"));
    }

    fn span_strategy() -> impl Strategy<Value = (usize, String)> {
        (0usize..3, "[a-z ]{0,3}")
    }

    fn paragraph(spans: &[(usize, String)]) -> String {
        let mut body = String::from("<text:p>");
        for (style, text) in spans {
            body.push_str(&format!(r#"<text:span text:style-name="T{}">{}</text:span>"#, style, text));
        }
        body.push_str("</text:p>");
        body
    }

    proptest! {
        #[test]
        fn prop_no_adjacent_equal_styles(spans in prop::collection::vec(span_strategy(), 0..12)) {
            let (out, _) = run(&paragraph(&spans));
            let tree = parse_document(&out).unwrap();
            let p = tree.find_elements(|e| e.name == "text:p")[0];
            let styles: Vec<&str> = tree.children(p).iter().map(|&c| style_of(&tree, c)).collect();
            for pair in styles.windows(2) {
                prop_assert_ne!(pair[0], pair[1]);
            }
        }

        #[test]
        fn prop_text_is_preserved(spans in prop::collection::vec(span_strategy(), 0..12)) {
            let (out, _) = run(&paragraph(&spans));
            let tree = parse_document(&out).unwrap();
            let expected: String = spans.iter().map(|(_, text)| text.as_str()).collect();
            prop_assert_eq!(tree.text_content(tree.root()), expected);
        }

        #[test]
        fn prop_normalize_is_idempotent(spans in prop::collection::vec(span_strategy(), 0..12)) {
            let (once, _) = run(&paragraph(&spans));
            let options = PrepareOptions::default();
            let mut sink = MemorySink::new();
            let mut ctx = PrepareContext::new("content.xml", &options, &mut sink);
            let twice = normalize_with(&once, &mut ctx).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
