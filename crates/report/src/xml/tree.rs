//! Arena-backed element tree
//!
//! Nodes live in a single vector and refer to each other by [`NodeId`].
//! Every node records its parent, so ancestor walks are plain index hops.
//! Detached nodes stay in the arena but are no longer reachable from the root.

use crate::names::local_name;

/// Handle to a node in a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written, e.g. `text:span`
    pub name: String,
    /// Attributes in document order, values unescaped
    pub attributes: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Attribute value by local name
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| local_name(key) == local)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// The document node holding the prolog and the root element
    Document,
    Element(Element),
    /// Character data, unescaped
    Text(String),
    /// Markup copied through verbatim (declaration, comments, PIs, doctype, CDATA)
    Raw(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The single top-level element, if any
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&id| self.element(id).is_some())
    }

    /// Allocate a detached node
    pub fn create(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0].data
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.data(id) {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether `id` is an element with the given local name
    pub fn is_local(&self, id: NodeId, local: &str) -> bool {
        self.element(id).is_some_and(|e| e.local_name() == local)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element children only
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.element(child).is_some())
    }

    /// Ancestors from the parent up to the document node
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&current| self.parent(current))
    }

    /// Replace the child list of `parent`
    ///
    /// Nodes dropped from the list become detached; nodes in the new list are
    /// re-parented, so children may be moved here from elsewhere as long as
    /// their old parent's list is rebuilt as well.
    pub fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        let old = std::mem::take(&mut self.nodes[parent.0].children);
        for id in old {
            self.nodes[id.0].parent = None;
        }
        for &id in &children {
            self.nodes[id.0].parent = Some(parent);
        }
        self.nodes[parent.0].children = children;
    }

    /// Append a detached node, or create one from data
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn append_data(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.create(data);
        self.append(parent, id);
        id
    }

    /// Insert a detached node right before `reference` in its parent
    ///
    /// Returns `false` if `reference` has no parent.
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) -> bool {
        let Some(parent) = self.parent(reference) else {
            return false;
        };
        let mut children = self.children(parent).to_vec();
        let position = children.iter().position(|&c| c == reference).unwrap_or(children.len());
        children.insert(position, child);
        self.set_children(parent, children);
        true
    }

    /// Remove a node from its parent
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            let children: Vec<NodeId> = self.children(parent).iter().copied().filter(|&c| c != id).collect();
            self.set_children(parent, children);
        }
    }

    /// Next element sibling of `id`
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.children(parent)
            .iter()
            .copied()
            .skip_while(|&c| c != id)
            .skip(1)
            .find(|&c| self.element(c).is_some())
    }

    /// Previous sibling of `id`, of any kind
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let children = self.children(parent);
        let position = children.iter().position(|&c| c == id)?;
        position.checked_sub(1).map(|p| children[p])
    }

    /// Following sibling of `id`, of any kind
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let children = self.children(parent);
        let position = children.iter().position(|&c| c == id)?;
        children.get(position + 1).copied()
    }

    /// `id` and everything below it, in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Elements below the document node matching a predicate, in document order
    pub fn find_elements(&self, mut predicate: impl FnMut(&Element) -> bool) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.element(id).is_some_and(&mut predicate))
            .collect()
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .collect()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
