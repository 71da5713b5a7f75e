//! Loop annotations
//!
//! Authors mark a repeating table row by attaching comments to it whose
//! text is a loop directive, e.g. `{{range .Items}}` on one cell and
//! `{{end}}` on another. The directive text is moved out of the comment to
//! sit right before (start) or right after (end) the row, so the merge
//! engine repeats the whole row. Every annotation is removed, loop or not.

use crate::diagnostics::DiagnosticKind;
use crate::error::PrepareError;
use crate::names::elements;
use crate::options::LoopMarkers;
use crate::prepare::PrepareContext;
use crate::xml::{NodeData, NodeId, Tree};

/// Which side of the row a marker belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Start,
    End,
}

/// Move loop markers out of annotations and drop all annotations
///
/// Fails with [`PrepareError::Structure`] when a loop marker has no
/// enclosing table row.
pub fn rewrite_annotations(tree: &mut Tree, ctx: &mut PrepareContext<'_>) -> Result<(), PrepareError> {
    let annotations = tree.find_elements(|e| e.local_name() == elements::ANNOTATION);

    for annotation in annotations {
        let marker = marker_text(tree, annotation);
        if let Some(kind) = classify_marker(&marker, &ctx.options().loop_markers) {
            place_marker(tree, annotation, marker, kind, ctx)?;
        }
        tree.detach(annotation);
        ctx.debug(DiagnosticKind::AnnotationRemoved, "removed annotation");
    }

    for end in tree.find_elements(|e| e.local_name() == elements::ANNOTATION_END) {
        tree.detach(end);
        ctx.debug(DiagnosticKind::AnnotationRemoved, "removed annotation end");
    }

    Ok(())
}

/// Text of the span in the last annotation paragraph that has one
fn marker_text(tree: &Tree, annotation: NodeId) -> String {
    let mut content = String::new();
    for p in tree.child_elements(annotation).filter(|&c| tree.is_local(c, elements::P)) {
        if let Some(span) = tree.child_elements(p).find(|&c| tree.is_local(c, elements::SPAN)) {
            content = tree.text_content(span);
        }
    }
    content
}

/// Decide whether annotation text is a loop marker
///
/// Looks at the keyword right after each `{{` (or `{{-`); a start keyword
/// anywhere wins over an end keyword.
pub fn classify_marker(text: &str, markers: &LoopMarkers) -> Option<MarkerKind> {
    let keywords: Vec<&str> = directive_keywords(text).collect();
    if keywords.iter().any(|k| *k == markers.start) {
        Some(MarkerKind::Start)
    } else if keywords.iter().any(|k| *k == markers.end) {
        Some(MarkerKind::End)
    } else {
        None
    }
}

fn directive_keywords(text: &str) -> impl Iterator<Item = &str> {
    text.split("{{").skip(1).map(|action| {
        let action = action.strip_prefix('-').unwrap_or(action).trim_start();
        let end = action
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(action.len());
        &action[..end]
    })
}

fn place_marker(
    tree: &mut Tree,
    annotation: NodeId,
    marker: String,
    kind: MarkerKind,
    ctx: &mut PrepareContext<'_>,
) -> Result<(), PrepareError> {
    let boundary = tree
        .ancestors(annotation)
        .find(|&a| tree.is_local(a, elements::TABLE_ROW) || tree.is_local(a, elements::BODY));

    let row = match boundary {
        Some(row) if tree.is_local(row, elements::TABLE_ROW) => row,
        _ => return Err(PrepareError::Structure { marker }),
    };
    let Some(table) = tree.parent(row) else {
        return Err(PrepareError::Structure { marker });
    };

    let message = match kind {
        MarkerKind::Start => format!("inserted {:?} before table row", marker),
        MarkerKind::End => format!("inserted {:?} after table row", marker),
    };
    let node = tree.create(NodeData::Text(marker));

    match kind {
        MarkerKind::Start => {
            tree.insert_before(row, node);
        }
        MarkerKind::End => match tree.next_element_sibling(row) {
            Some(next) => {
                tree.insert_before(next, node);
            }
            None => tree.append(table, node),
        },
    }

    ctx.info(DiagnosticKind::LoopMarkerInserted, message);
    Ok(())
}
