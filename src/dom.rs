//! In-memory document model.
//!
//! A [`Document`] is an arena of [`Node`]s addressed by [`NodeId`]. Nodes are
//! never freed: detaching a subtree only unlinks it from its parent, so handles
//! held by templates and variables stay valid for the lifetime of the document.

use indexmap::IndexMap;

/// Elements that never carry content or an end tag.
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text content is written without escaping.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,
    Doctype(String),
    Element {
        tag: String,
        attrs: IndexMap<String, String>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Arena-backed tree of nodes with a single document root.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Document)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node::new(kind));
        NodeId(self.nodes.len() - 1)
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: IndexMap::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Comment(text.to_string()))
    }

    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Doctype(name.to_string()))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element children only, in order.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// Unlinks `id` from its parent. The subtree below `id` is kept intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }
    }

    /// Moves `child` under `parent` as its last child.
    /// Returns false (leaving the tree untouched) when `parent` lies inside
    /// `child`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.contains(child, parent) {
            return false;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        true
    }

    /// Places `node` right after `reference` under the same parent.
    /// Returns false (leaving `node` detached) when `reference` has no parent,
    /// and false with the tree untouched when `reference` lies inside `node`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> bool {
        if self.contains(node, reference) {
            return false;
        }
        self.detach(node);
        let Some(parent) = self.parent(reference) else {
            return false;
        };
        let siblings = &mut self.nodes[parent.0].children;
        let position = siblings
            .iter()
            .position(|sibling| *sibling == reference)
            .map_or(siblings.len(), |p| p + 1);
        siblings.insert(position, node);
        self.nodes[node.0].parent = Some(parent);
        true
    }

    /// Puts `new` where `old` was and detaches `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> bool {
        let placed = self.insert_after(old, new);
        if placed {
            self.detach(old);
        }
        placed
    }

    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// All nodes below `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |node| self.parent(*node))
    }

    /// True when `node` is `ancestor` or lies below it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// True when `id` is reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.root(), id)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element { .. })
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> Option<&IndexMap<String, String>> {
        match self.kind(id) {
            NodeKind::Element { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .and_then(|attrs| attrs.get(name))
            .map(String::as_str)
    }

    /// Sets an attribute on an element; a no-op on other node kinds.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            attrs.insert(name.to_ascii_lowercase(), value.to_string());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => attrs.shift_remove(name),
            _ => None,
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    /// Concatenated text of all text nodes below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        if let NodeKind::Text(text) = self.kind(id) {
            return text.clone();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|node| match self.kind(node) {
                NodeKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replaces the children of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.clear_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    /// Reads one declaration out of the inline `style` attribute.
    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        let style = self.attr(id, "style")?;
        parse_style(style).get(property).cloned()
    }

    /// Sets (`Some`) or removes (`None`) one inline style declaration,
    /// dropping the `style` attribute once it is empty.
    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: Option<&str>) {
        let mut declarations = self.attr(id, "style").map(parse_style).unwrap_or_default();
        match value {
            Some(value) => {
                declarations.insert(property.to_string(), value.to_string());
            }
            None => {
                declarations.shift_remove(property);
            }
        }
        if declarations.is_empty() {
            self.remove_attr(id, "style");
        } else {
            let style = declarations
                .iter()
                .map(|(k, v)| format!("{k}: {v};"))
                .collect::<Vec<_>>()
                .join(" ");
            self.set_attr(id, "style", &style);
        }
    }

    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.style_property(id, "display").as_deref() == Some("none")
    }

    /// Every `id` attribute value carried by an attached element.
    pub fn identifiers(&self) -> Vec<String> {
        self.descendants(self.root())
            .into_iter()
            .filter_map(|node| self.attr(node, "id").map(str::to_string))
            .collect()
    }

    /// Serializes the whole document.
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self
            .tag_name(id)
            .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
        for child in self.children(id) {
            self.write_node(*child, raw, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, false, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        match self.kind(id) {
            NodeKind::Document => out.push_str(&self.inner_html(id)),
            NodeKind::Doctype(name) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeKind::Text(text) if raw_text => out.push_str(text),
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                out.push_str(&self.inner_html(id));
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn parse_style(style: &str) -> IndexMap<String, String> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim();
            if property.is_empty() {
                return None;
            }
            Some((property.to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> (Document, NodeId, Vec<NodeId>) {
        let mut doc = Document::new();
        let ul = doc.create_element("ul");
        let root = doc.root();
        doc.append_child(root, ul);
        let items = (0..3)
            .map(|i| {
                let li = doc.create_element("li");
                doc.set_text(li, &format!("item {i}"));
                doc.append_child(ul, li);
                li
            })
            .collect();
        (doc, ul, items)
    }

    #[test]
    fn test_insert_after_and_replace() {
        let (mut doc, ul, items) = list();
        let extra = doc.create_element("li");
        assert!(doc.insert_after(items[0], extra));
        assert_eq!(doc.children(ul), &[items[0], extra, items[1], items[2]]);

        let swapped = doc.create_element("li");
        assert!(doc.replace(items[1], swapped));
        assert_eq!(doc.children(ul), &[items[0], extra, swapped, items[2]]);
        assert!(!doc.is_attached(items[1]));
        assert_eq!(doc.text_content(items[1]), "item 1");
    }

    #[test]
    fn test_insert_after_detached_reference() {
        let mut doc = Document::new();
        let lone = doc.create_element("div");
        let other = doc.create_element("span");
        assert!(!doc.insert_after(lone, other));
        assert_eq!(doc.parent(other), None);
    }

    #[test]
    fn test_moves_into_own_subtree_are_refused() {
        let (mut doc, ul, items) = list();
        let root = doc.root();
        assert!(!doc.append_child(items[0], ul));
        assert!(!doc.append_child(ul, ul));
        assert!(!doc.insert_after(items[1], ul));
        assert_eq!(doc.parent(ul), Some(root));
        assert_eq!(doc.children(ul), &[items[0], items[1], items[2]]);
        assert!(doc.is_attached(items[2]));
    }

    #[test]
    fn test_style_property_roundtrip() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.set_attr(div, "style", "color: red;");
        doc.set_style_property(div, "display", Some("none"));
        assert!(doc.is_hidden(div));
        assert_eq!(doc.attr(div, "style"), Some("color: red; display: none;"));

        doc.set_style_property(div, "display", None);
        doc.set_style_property(div, "color", None);
        assert_eq!(doc.attr(div, "style"), None);
    }

    #[test]
    fn test_serialization_escapes() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.create_element("p");
        doc.set_attr(p, "title", "say \"hi\" & bye");
        doc.set_text(p, "1 < 2");
        let br = doc.create_element("br");
        doc.append_child(root, p);
        doc.append_child(root, br);
        assert_eq!(
            doc.to_html(),
            "<p title=\"say &quot;hi&quot; &amp; bye\">1 &lt; 2</p><br>"
        );
    }

    #[test]
    fn test_descendants_document_order() {
        let (doc, ul, items) = list();
        let descendants = doc.descendants(ul);
        assert_eq!(descendants.len(), 6);
        assert_eq!(descendants[0], items[0]);
        assert_eq!(descendants[2], items[1]);
    }
}
