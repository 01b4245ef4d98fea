//! SVG document tree.
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by
//! [`NodeId`]. Child lists are the owning direction; every attached node also
//! records its parent, which is only a lookup and never keeps anything alive.
//! Detaching a node makes its whole subtree unreachable from the root.

use crate::error::TreeError;

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// The seven kinds of node a document can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Element,
    Text,
    Cdata,
    Comment,
    Instruction,
    Doctype,
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Root,
    Element(Element),
    Text(String),
    Cdata(String),
    Comment(String),
    /// A processing instruction (e.g., `<?xml version="1.0"?>`)
    Instruction(Instruction),
    /// Everything between `<!DOCTYPE` and the closing `>`
    Doctype(String),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Root => NodeKind::Root,
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Cdata(_) => NodeKind::Cdata,
            NodeData::Comment(_) => NodeKind::Comment,
            NodeData::Instruction(_) => NodeKind::Instruction,
            NodeData::Doctype(_) => NodeKind::Doctype,
        }
    }
}

/// An SVG/XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name exactly as written, prefix included (e.g. "svg", "sodipodi:namedview")
    pub name: String,
    attributes: Vec<Attribute>,
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The part before `:`, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }
}

/// A processing instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub name: String,
    pub value: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Builder-style [`Element::set_attr`].
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Attributes in insertion order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Get an attribute value by name.
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Set an attribute value. An existing attribute keeps its position.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if let Some(attr) = self.attributes.iter_mut().find(|a| a.name == name) {
            attr.value = value.into();
        } else {
            self.attributes.push(Attribute::new(name, value));
        }
    }

    /// Remove an attribute by name, returning its value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index).value)
    }

    pub fn retain_attrs(&mut self, f: impl FnMut(&Attribute) -> bool) {
        self.attributes.retain(f);
    }

    /// Mutable access to values only, so names stay unique.
    pub fn attr_values_mut(&mut self) -> impl Iterator<Item = (&str, &mut String)> {
        self.attributes
            .iter_mut()
            .map(|a| (a.name.as_str(), &mut a.value))
    }

    /// Check if this element has a specific tag name.
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// The part of the tag name before `:`, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// A complete SVG document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Root,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    fn check(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.node(id).ok_or(TreeError::UnknownNode(id))
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.node(id).map(|n| &n.data)
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.data(id).map(NodeData::kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.data(id) {
            Some(NodeData::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.node_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn instruction(&self, id: NodeId) -> Option<&Instruction> {
        match self.data(id) {
            Some(NodeData::Instruction(pi)) => Some(pi),
            _ => None,
        }
    }

    pub fn instruction_mut(&mut self, id: NodeId) -> Option<&mut Instruction> {
        match self.node_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Instruction(pi)) => Some(pi),
            _ => None,
        }
    }

    /// String payload of a text, cdata, comment or doctype node.
    pub fn value(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            Some(
                NodeData::Text(s) | NodeData::Cdata(s) | NodeData::Comment(s) | NodeData::Doctype(s),
            ) => Some(s),
            _ => None,
        }
    }

    pub fn value_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match self.node_mut(id).map(|n| &mut n.data) {
            Some(
                NodeData::Text(s) | NodeData::Cdata(s) | NodeData::Comment(s) | NodeData::Doctype(s),
            ) => Some(s),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Children of a root or element node; empty for every other kind.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Position of a node in its parent's child list.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let index = self.index_of(id)?;
        let parent = self.parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let index = self.index_of(id)?;
        let parent = self.parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Pre-order iterator over the descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Recursively visit all attached elements.
    pub fn for_each_element(&self, mut f: impl FnMut(NodeId, &Element)) {
        for id in self.descendants(self.root()) {
            if let Some(elem) = self.element(id) {
                f(id, elem);
            }
        }
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Create a detached element. Attach it with [`Document::append`] or one
    /// of the insert methods.
    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.alloc(NodeData::Element(element))
    }

    pub fn create_text(&mut self, value: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(value.into()))
    }

    pub fn create_cdata(&mut self, value: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Cdata(value.into()))
    }

    pub fn create_comment(&mut self, value: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Comment(value.into()))
    }

    pub fn create_instruction(&mut self, name: impl Into<String>, value: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Instruction(Instruction {
            name: name.into(),
            value: value.into(),
        }))
    }

    pub fn create_doctype(&mut self, value: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Doctype(value.into()))
    }

    /// Append a freshly created node without validation. Only for builders
    /// that own both ids.
    pub(crate) fn push_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    /// Validate that `child` may be placed under `parent`.
    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let parent_node = self.check(parent)?;
        self.check(child)?;
        if child == self.root() {
            return Err(TreeError::RootNode);
        }
        if !matches!(parent_node.data, NodeData::Root | NodeData::Element(_)) {
            return Err(TreeError::NotAContainer(parent));
        }
        let mut current = Some(parent);
        while let Some(id) = current {
            if id == child {
                return Err(TreeError::Cycle(child));
            }
            current = self.parent(id);
        }
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|&c| c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    /// Insert `child` at `index` in `parent`'s children, detaching it from
    /// wherever it was first. The index refers to the list without `child`.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), TreeError> {
        self.check_insert(parent, child)?;
        let len = self.children(parent).iter().filter(|&&c| c != child).count();
        if index > len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }
        self.detach(child);
        if let Some(node) = self.node_mut(parent) {
            node.children.insert(index, child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_insert(parent, child)?;
        let len = self.children(parent).iter().filter(|&&c| c != child).count();
        self.insert(parent, len, child)
    }

    pub fn insert_before(&mut self, sibling: NodeId, child: NodeId) -> Result<(), TreeError> {
        if sibling == child {
            return Ok(());
        }
        let parent = self.parent(sibling).ok_or(TreeError::Detached(sibling))?;
        self.check_insert(parent, child)?;
        self.detach(child);
        let index = self.index_of(sibling).ok_or(TreeError::Detached(sibling))?;
        self.insert(parent, index, child)
    }

    pub fn insert_after(&mut self, sibling: NodeId, child: NodeId) -> Result<(), TreeError> {
        if sibling == child {
            return Ok(());
        }
        let parent = self.parent(sibling).ok_or(TreeError::Detached(sibling))?;
        self.check_insert(parent, child)?;
        self.detach(child);
        let index = self.index_of(sibling).ok_or(TreeError::Detached(sibling))?;
        self.insert(parent, index + 1, child)
    }

    /// Detach a node (and with it its subtree) from its parent.
    /// Removing an already detached node is a no-op.
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.check(id)?;
        if id == self.root() {
            return Err(TreeError::RootNode);
        }
        self.detach(id);
        Ok(())
    }

    /// Put `new` where `old` is and detach `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), TreeError> {
        if old == new {
            return Ok(());
        }
        self.insert_before(old, new)?;
        self.remove(old)
    }

    /// Replace a node's children wholesale. Previous children are detached.
    pub fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) -> Result<(), TreeError> {
        for &child in &children {
            self.check_insert(parent, child)?;
        }
        for old in self.children(parent).to_vec() {
            self.detach(old);
        }
        for child in children {
            self.append(parent, child)?;
        }
        Ok(())
    }

    /// Move the children of `id` into its parent at its position, then
    /// detach `id`.
    pub fn replace_with_children(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.check(id)?;
        if self.parent(id).is_none() {
            return Err(TreeError::Detached(id));
        }
        for child in self.children(id).to_vec() {
            self.insert_before(id, child)?;
        }
        self.remove(id)
    }
}

/// Iterator returned by [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}
