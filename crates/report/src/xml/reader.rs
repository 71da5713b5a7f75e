//! XML text to [`Tree`]

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::tree::{Element, NodeData, NodeId, Tree};
use crate::error::PrepareError;

/// Parse a complete XML document
///
/// Whitespace is kept exactly as written; entity and character references
/// in text and attribute values are resolved.
pub fn parse_document(xml: &str) -> Result<Tree, PrepareError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut tree = Tree::new();
    let mut stack: Vec<NodeId> = vec![tree.root()];

    loop {
        let parent = stack.last().copied().unwrap_or_else(|| tree.root());
        match reader.read_event()? {
            Event::Start(e) => {
                let id = tree.append_data(parent, NodeData::Element(read_element(&e)?));
                stack.push(id);
            }
            Event::Empty(e) => {
                tree.append_data(parent, NodeData::Element(read_element(&e)?));
            }
            Event::End(_) => {
                if stack.len() <= 1 {
                    return Err(PrepareError::parse("unexpected end tag"));
                }
                stack.pop();
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(|e| PrepareError::parse(e.to_string()))?;
                push_text(&mut tree, parent, &text);
            }
            Event::CData(e) => {
                let raw = format!("<![CDATA[{}]]>", utf8(&e)?);
                tree.append_data(parent, NodeData::Raw(raw));
            }
            Event::Comment(e) => {
                let raw = format!("<!--{}-->", utf8(&e)?);
                tree.append_data(parent, NodeData::Raw(raw));
            }
            Event::Decl(e) => {
                let raw = format!("<?{}?>", utf8(&e)?);
                tree.append_data(parent, NodeData::Raw(raw));
            }
            Event::PI(e) => {
                let raw = format!("<?{}?>", utf8(&e)?);
                tree.append_data(parent, NodeData::Raw(raw));
            }
            Event::DocType(e) => {
                let raw = format!("<!DOCTYPE {}>", utf8(&e)?);
                tree.append_data(parent, NodeData::Raw(raw));
            }
            Event::Eof => break,
        }
    }

    if let Some(&open) = stack.get(1) {
        let name = tree.element(open).map(|e| e.name.clone()).unwrap_or_default();
        return Err(PrepareError::parse(format!("unclosed element <{}>", name)));
    }
    if tree.document_element().is_none() {
        return Err(PrepareError::parse("missing root element"));
    }

    Ok(tree)
}

fn read_element(e: &BytesStart<'_>) -> Result<Element, PrepareError> {
    let mut element = Element::new(utf8(e.name().as_ref())?);
    for attr in e.attributes() {
        let attr = attr?;
        let key = utf8(attr.key.as_ref())?;
        let value = attr
            .unescape_value()
            .map_err(|e| PrepareError::parse(e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Adjacent character data ends up in one text node
fn push_text(tree: &mut Tree, parent: NodeId, text: &str) {
    if let Some(&last) = tree.children(parent).last() {
        if let NodeData::Text(existing) = tree.data_mut(last) {
            existing.push_str(text);
            return;
        }
    }
    tree.append_data(parent, NodeData::Text(text.to_string()));
}

fn utf8(bytes: &[u8]) -> Result<String, PrepareError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| PrepareError::parse(format!("invalid UTF-8: {}", e)))
}
