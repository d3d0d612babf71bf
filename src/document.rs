use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to an element stored in a [`Document`].
    pub struct NodeKey;
}

/// Content of an element: either a nested element or a run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    Element(NodeKey),
    Text(String),
}

/// A single element in the document arena.
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    /// Ordered `(name, value)` pairs, first occurrence wins.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Child>,
    pub parent: Option<NodeKey>,
}

impl Element {
    fn new(tag: impl Into<String>, parent: Option<NodeKey>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            parent,
        }
    }
}

/// An ordered, rooted tree of tagged elements with text.
///
/// Elements live in a [`SlotMap`] and refer to each other by [`NodeKey`], so
/// the document owns every node and parent links never dangle.
///
/// ```
/// use tree_records::Document;
///
/// let mut doc = Document::new("ul");
/// let li = doc.append_element(doc.root(), "li");
/// doc.append_text(li, "first");
/// assert_eq!(doc.text_content(doc.root()), "first");
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    nodes: SlotMap<NodeKey, Element>,
    root: NodeKey,
}

impl Document {
    /// Creates a document holding a single root element.
    pub fn new(root_tag: impl Into<String>) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Element::new(root_tag, None));
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Number of elements, text runs excluded.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends a new element as the last child of `parent`.
    pub fn append_element(&mut self, parent: NodeKey, tag: impl Into<String>) -> NodeKey {
        let key = self.nodes.insert(Element::new(tag, Some(parent)));
        self.nodes[parent].children.push(Child::Element(key));
        key
    }

    /// Appends a text run as the last child of `parent`.
    ///
    /// Adjacent text runs are merged.
    pub fn append_text(&mut self, parent: NodeKey, text: impl Into<String>) {
        let text = text.into();
        let children = &mut self.nodes[parent].children;
        if let Some(Child::Text(last)) = children.last_mut() {
            last.push_str(&text);
        } else {
            children.push(Child::Text(text));
        }
    }

    pub fn get(&self, key: NodeKey) -> Option<&Element> {
        self.nodes.get(key)
    }

    pub fn tag(&self, key: NodeKey) -> &str {
        &self.nodes[key].tag
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes[key].parent
    }

    pub fn children(&self, key: NodeKey) -> &[Child] {
        &self.nodes[key].children
    }

    /// Element children of `key`, in document order.
    pub fn child_elements(&self, key: NodeKey) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes[key].children.iter().filter_map(|child| match child {
            Child::Element(k) => Some(*k),
            Child::Text(_) => None,
        })
    }

    pub fn attrs(&self, key: NodeKey) -> &[(String, String)] {
        &self.nodes[key].attrs
    }

    pub fn attr(&self, key: NodeKey, name: &str) -> Option<&str> {
        self.nodes[key]
            .attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets an attribute, replacing the value if it already exists.
    pub fn set_attr(&mut self, key: NodeKey, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let attrs = &mut self.nodes[key].attrs;
        if let Some((_, v)) = attrs.iter_mut().find(|(n, _)| *n == name) {
            *v = value;
        } else {
            attrs.push((name, value));
        }
    }

    /// Sets an attribute only if it is not present yet.
    pub fn set_attr_if_missing(
        &mut self,
        key: NodeKey,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        let name = name.into();
        let attrs = &mut self.nodes[key].attrs;
        if !attrs.iter().any(|(n, _)| *n == name) {
            attrs.push((name, value.into()));
        }
    }

    /// Concatenated text of the whole subtree, in document order.
    pub fn text_content(&self, key: NodeKey) -> String {
        let mut out = String::new();
        // Reversed so the first child is popped first.
        let mut stack: Vec<&Child> = self.nodes[key].children.iter().rev().collect();
        while let Some(child) = stack.pop() {
            match child {
                Child::Text(t) => out.push_str(t),
                Child::Element(k) => stack.extend(self.nodes[*k].children.iter().rev()),
            }
        }
        out
    }

    /// Text that appears inside `key` before its first element child.
    pub fn leading_text(&self, key: NodeKey) -> Option<&str> {
        match self.nodes[key].children.first() {
            Some(Child::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }

    /// Elements of the subtree rooted at `key` in pre-order, `key` included.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            out.push(current);
            let before = stack.len();
            stack.extend(self.child_elements(current));
            stack[before..].reverse();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeKey, NodeKey) {
        let mut doc = Document::new("div");
        let root = doc.root();
        doc.append_text(root, "head ");
        let p = doc.append_element(root, "p");
        doc.append_text(p, "inner");
        let b = doc.append_element(p, "b");
        doc.append_text(b, " bold");
        doc.append_text(root, " tail");
        (doc, p, b)
    }

    #[test]
    fn test_text_content_in_document_order() {
        let (doc, p, b) = sample();
        assert_eq!(doc.text_content(doc.root()), "head inner bold tail");
        assert_eq!(doc.text_content(p), "inner bold");
        assert_eq!(doc.text_content(b), " bold");
    }

    #[test]
    fn test_leading_text() {
        let (doc, p, _) = sample();
        assert_eq!(doc.leading_text(doc.root()), Some("head "));
        assert_eq!(doc.leading_text(p), Some("inner"));

        let mut doc = Document::new("ul");
        let li = doc.append_element(doc.root(), "li");
        doc.append_text(doc.root(), "after");
        assert_eq!(doc.leading_text(doc.root()), None);
        assert_eq!(doc.leading_text(li), None);
    }

    #[test]
    fn test_adjacent_text_merged() {
        let mut doc = Document::new("p");
        doc.append_text(doc.root(), "a");
        doc.append_text(doc.root(), "b");
        assert_eq!(doc.children(doc.root()), &[Child::Text("ab".to_string())]);
    }

    #[test]
    fn test_parent_links() {
        let (doc, p, b) = sample();
        assert_eq!(doc.parent(b), Some(p));
        assert_eq!(doc.parent(p), Some(doc.root()));
        assert_eq!(doc.parent(doc.root()), None);
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_attrs() {
        let mut doc = Document::new("a");
        let root = doc.root();
        doc.set_attr(root, "href", "/x");
        doc.set_attr(root, "href", "/y");
        doc.set_attr_if_missing(root, "href", "/z");
        doc.set_attr_if_missing(root, "class", "link");
        assert_eq!(doc.attr(root, "href"), Some("/y"));
        assert_eq!(doc.attr(root, "class"), Some("link"));
        assert_eq!(doc.attrs(root).len(), 2);
    }

    #[test]
    fn test_descendants_preorder() {
        let mut doc = Document::new("r");
        let a = doc.append_element(doc.root(), "a");
        let a1 = doc.append_element(a, "a1");
        let b = doc.append_element(doc.root(), "b");
        assert_eq!(doc.descendants(doc.root()), vec![doc.root(), a, a1, b]);
    }
}
