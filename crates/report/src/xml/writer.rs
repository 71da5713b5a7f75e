//! [`Tree`] to XML text

use std::io::Write;

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::tree::{Element, NodeData, NodeId, Tree};
use crate::error::PrepareError;
use crate::names::elements;

const INDENT: &[u8] = b"  ";

/// Serialize a tree
///
/// Text escapes only `&`, `<` and `>`, so quotes in character data stay
/// literal. With `pretty` set, elements are indented by two spaces.
/// Paragraphs, headings and any element holding non-blank text are written
/// exactly as they are, so indenting never changes document text.
pub fn write_document(tree: &Tree, pretty: bool) -> Result<String, PrepareError> {
    let mut writer = Writer::new(Vec::new());

    if pretty {
        write_block_children(&mut writer, tree, tree.root(), 0)?;
    } else {
        for &child in tree.children(tree.root()) {
            write_node(&mut writer, tree, child)?;
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| PrepareError::serialize(e.to_string()))
}

/// Whitespace inside this element is part of the content
fn keeps_layout(tree: &Tree, id: NodeId) -> bool {
    if tree.is_local(id, elements::P) || tree.is_local(id, elements::H) {
        return true;
    }
    tree.children(id)
        .iter()
        .any(|&c| tree.text(c).is_some_and(|text| !text.trim().is_empty()))
}

/// Children of a block element, one per line, blank text dropped
///
/// Returns whether anything was written.
fn write_block_children<W: Write>(
    writer: &mut Writer<W>,
    tree: &Tree,
    parent: NodeId,
    depth: usize,
) -> Result<bool, PrepareError> {
    let mut wrote = false;
    for &child in tree.children(parent) {
        if tree.text(child).is_some_and(|text| text.trim().is_empty()) {
            continue;
        }
        if wrote || depth > 0 {
            newline(writer, depth)?;
        }
        write_pretty(writer, tree, child, depth)?;
        wrote = true;
    }
    Ok(wrote)
}

fn write_pretty<W: Write>(writer: &mut Writer<W>, tree: &Tree, id: NodeId, depth: usize) -> Result<(), PrepareError> {
    let NodeData::Element(element) = tree.data(id) else {
        return write_node(writer, tree, id);
    };
    if keeps_layout(tree, id) {
        return write_node(writer, tree, id);
    }

    let start = start_tag(element);
    if tree.children(id).is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    if write_block_children(writer, tree, id, depth + 1)? {
        newline(writer, depth)?;
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

fn write_node<W: Write>(writer: &mut Writer<W>, tree: &Tree, id: NodeId) -> Result<(), PrepareError> {
    match tree.data(id) {
        NodeData::Document => {
            for &child in tree.children(id) {
                write_node(writer, tree, child)?;
            }
        }
        NodeData::Element(element) => {
            let start = start_tag(element);
            let children = tree.children(id);
            if children.is_empty() {
                emit(writer, Event::Empty(start))?;
            } else {
                emit(writer, Event::Start(start))?;
                for &child in children {
                    write_node(writer, tree, child)?;
                }
                emit(writer, Event::End(BytesEnd::new(element.name.as_str())))?;
            }
        }
        NodeData::Text(text) => {
            emit(writer, Event::Text(BytesText::from_escaped(partial_escape(text))))?;
        }
        NodeData::Raw(markup) => raw(writer, markup.as_bytes())?,
    }
    Ok(())
}

fn start_tag(element: &Element) -> BytesStart<'_> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    start
}

fn newline<W: Write>(writer: &mut Writer<W>, depth: usize) -> Result<(), PrepareError> {
    raw(writer, b"\n")?;
    for _ in 0..depth {
        raw(writer, INDENT)?;
    }
    Ok(())
}

fn raw<W: Write>(writer: &mut Writer<W>, bytes: &[u8]) -> Result<(), PrepareError> {
    writer
        .get_mut()
        .write_all(bytes)
        .map_err(|e| PrepareError::serialize(e.to_string()))
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), PrepareError> {
    writer
        .write_event(event)
        .map_err(|e| PrepareError::serialize(e.to_string()))
}
