//! Owned document tree
//!
//! An arena of nodes addressed by copyable [`NodeId`]s. Subtrees dropped
//! by [`Document::clear_children`] go back to a free list and their slots
//! are reused. Each slot carries a generation, so an id that outlived its
//! node is stale rather than aliasing the slot's next occupant: lookups
//! through it behave like a detached empty node.

mod parse;
mod selector;

pub use selector::Selector;

/// Handle to a node inside one [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// Element name plus attributes in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|(k, _)| k != name);
        self.attrs.len() != before
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_ascii_whitespace().any(|t| t == class))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Doctype(String),
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A parsed (or built) HTML document
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<usize>,
    focused: Option<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document holding only the root node
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node {
                    parent: None,
                    children: Vec::new(),
                    kind: NodeKind::Document,
                }),
            }],
            free: Vec::new(),
            focused: None,
        }
    }

    /// Parse a complete HTML document
    pub fn parse(html: &str) -> Self {
        parse::parse_document(html)
    }

    pub fn root(&self) -> NodeId {
        NodeId {
            index: 0,
            generation: 0,
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            parent: None,
            children: Vec::new(),
            kind,
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    /// Free `id` and everything below it
    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(slot) = self
                .slots
                .get_mut(id.index)
                .filter(|slot| slot.generation == id.generation)
            else {
                continue;
            };
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                stack.extend(node.children);
                self.free.push(id.index);
            }
        }
    }

    /// Whether `id` still names a live node of this document
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Node kind, or None for a stale id
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Element(Element::new(name)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub(crate) fn create_node(&mut self, kind: NodeKind) -> NodeId {
        self.alloc(kind)
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.contains(parent) || !self.contains(child) {
            return;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    /// Remove a node from its parent; the subtree stays intact
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node_mut(id).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != id);
        }
    }

    /// Drop every child subtree of `id`, freeing their nodes
    pub fn clear_children(&mut self, id: NodeId) {
        let children = self
            .node_mut(id)
            .map(|n| std::mem::take(&mut n.children))
            .unwrap_or_default();
        for child in children {
            self.release(child);
        }
        if let Some(focused) = self.focused {
            if !self.is_connected(focused) {
                self.focused = None;
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// The node itself followed by each ancestor up to the root
    pub fn inclusive_ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |n| self.parent(*n))
    }

    /// Whether the node is still reachable from the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.inclusive_ancestors(id).any(|n| n == self.root())
    }

    /// Descendants of `scope` in document order, excluding `scope`
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id)? {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::name)
    }

    // ----------------------------------------
    // Queries
    // ----------------------------------------

    /// All matching elements below `scope`, in document order
    pub fn select_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|id| self.element(*id).map(|el| selector.matches(el)).unwrap_or(false))
            .collect()
    }

    pub fn select_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.select_all(scope, selector).into_iter().next()
    }

    /// Nearest inclusive ancestor matching `selector`
    pub fn closest(&self, id: NodeId, selector: &Selector) -> Option<NodeId> {
        self.inclusive_ancestors(id)
            .find(|n| self.element(*n).map(|el| selector.matches(el)).unwrap_or(false))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.select_first(self.root(), &Selector::tag("head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        self.select_first(self.root(), &Selector::tag("body"))
    }

    // ----------------------------------------
    // Attributes and classes
    // ----------------------------------------

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> bool {
        self.element_mut(id).map(|el| el.remove_attr(name)).unwrap_or(false)
    }

    /// Attribute name/value pairs of an element (empty for other nodes)
    pub fn attr_pairs(&self, id: NodeId) -> Vec<(String, String)> {
        self.element(id)
            .map(|el| el.attrs().map(|(k, v)| (k.to_string(), v.to_string())).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).map(|el| el.has_class(class)).unwrap_or(false)
    }

    /// Add or remove one class token
    pub fn set_class(&mut self, id: NodeId, class: &str, on: bool) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        let mut tokens: Vec<String> = el
            .attr("class")
            .map(|c| c.split_ascii_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let present = tokens.iter().any(|t| t == class);
        if on == present {
            return;
        }
        if on {
            tokens.push(class.to_string());
        } else {
            tokens.retain(|t| t != class);
        }
        el.set_attr("class", &tokens.join(" "));
    }

    /// Flip one class token, returning whether it is now present
    pub fn toggle_class(&mut self, id: NodeId, class: &str) -> bool {
        let on = !self.has_class(id, class);
        self.set_class(id, class, on);
        on
    }

    // ----------------------------------------
    // Text and markup
    // ----------------------------------------

    /// Concatenated text of the node and its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => text.clone(),
            Some(NodeKind::Element(_)) | Some(NodeKind::Document) => self
                .descendants(id)
                .into_iter()
                .filter_map(|n| match self.kind(n) {
                    Some(NodeKind::Text(text)) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            _ => String::new(),
        }
    }

    /// Replace all children with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        if let NodeKind::Text(existing) = &mut node.kind {
            *existing = text.to_string();
            return;
        }
        self.clear_children(id);
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(id, text_node);
        }
    }

    /// Replace the node's children with parsed `html`
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        self.clear_children(id);
        parse::parse_fragment_into(self, id, html);
    }

    /// Deep-copy a node from another document, returning the detached copy
    ///
    /// A stale `node` imports as an empty comment.
    pub fn import_node(&mut self, source: &Document, node: NodeId) -> NodeId {
        let kind = source
            .kind(node)
            .cloned()
            .unwrap_or_else(|| NodeKind::Comment(String::new()));
        let copy = self.alloc(kind);
        for child in source.children(node).to_vec() {
            let child_copy = self.import_node(source, child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    // ----------------------------------------
    // Document-level state
    // ----------------------------------------

    /// Text of the first `<title>` element
    pub fn title(&self) -> Option<String> {
        self.select_first(self.root(), &Selector::tag("title"))
            .map(|t| self.text_content(t))
    }

    /// Set the document title, creating `<title>` in the head if needed
    pub fn set_title(&mut self, title: &str) {
        let existing = self.select_first(self.root(), &Selector::tag("title"));
        match existing {
            Some(node) => self.set_text_content(node, title),
            None => {
                if let Some(head) = self.head() {
                    let node = self.create_element("title");
                    self.append_child(head, node);
                    self.set_text_content(node, title);
                }
            }
        }
    }

    pub fn focus(&mut self, id: NodeId) {
        self.focused = Some(id);
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Runes</title><link rel="stylesheet" href="/assets/site.css"></head>
<body class="page runes" data-page="runes">
<nav><a class="nav-link" href="tracks.html">tracks</a></nav>
<main><h1 class="glitch">Runes &amp; notes</h1><p>first</p></main>
</body></html>"#;

    #[test]
    fn test_parse_and_query() {
        let doc = Document::parse(PAGE);
        let body = doc.body().expect("body");
        assert_eq!(doc.attr(body, "data-page"), Some("runes"));
        assert!(doc.has_class(body, "runes"));
        assert_eq!(doc.title().as_deref(), Some("Runes"));

        let main = doc.select_first(doc.root(), &Selector::tag("main")).unwrap();
        let h1 = doc.select_first(main, &Selector::class("glitch")).unwrap();
        assert_eq!(doc.text_content(h1), "Runes & notes");
        assert_eq!(doc.closest(h1, &Selector::tag("main")), Some(main));
    }

    #[test]
    fn test_set_inner_html_replaces_children() {
        let mut doc = Document::parse(PAGE);
        let main = doc.select_first(doc.root(), &Selector::tag("main")).unwrap();

        doc.set_inner_html(main, "<section id=\"a\"><br>hi &amp; bye</section>");
        let children = doc.children(main).to_vec();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.tag_name(children[0]), Some("section"));
        assert_eq!(doc.attr(children[0], "id"), Some("a"));
        assert_eq!(doc.text_content(main), "hi & bye");
        assert!(doc.select_first(doc.root(), &Selector::class("glitch")).is_none());
    }

    #[test]
    fn test_replaced_nodes_are_disconnected() {
        let mut doc = Document::parse(PAGE);
        let main = doc.select_first(doc.root(), &Selector::tag("main")).unwrap();
        let h1 = doc.select_first(main, &Selector::tag("h1")).unwrap();
        doc.focus(h1);
        assert!(doc.is_connected(h1));

        doc.set_inner_html(main, "<p>new</p>");
        assert!(!doc.is_connected(h1));
        assert_eq!(doc.focused(), None);
    }

    #[test]
    fn test_stale_ids_do_not_alias_reused_slots() {
        let mut doc = Document::parse(PAGE);
        let main = doc.select_first(doc.root(), &Selector::tag("main")).unwrap();
        let h1 = doc.select_first(main, &Selector::tag("h1")).unwrap();

        doc.set_inner_html(main, "<h2>next</h2>");
        let h2 = doc.select_first(main, &Selector::tag("h2")).unwrap();
        assert_ne!(h1, h2);
        assert!(!doc.contains(h1));
        assert_eq!(doc.tag_name(h1), None);
        assert_eq!(doc.text_content(h1), "");
        assert!(doc.children(h1).is_empty());

        // writes through a stale id are ignored
        doc.set_attr(h1, "id", "ghost");
        doc.append_child(h1, h2);
        assert_eq!(doc.parent(h2), Some(main));
        assert!(doc.select_first(doc.root(), &Selector::attr("id")).is_none());
    }

    #[test]
    fn test_replaced_content_reuses_arena_slots() {
        let mut doc = Document::parse(PAGE);
        let main = doc.select_first(doc.root(), &Selector::tag("main")).unwrap();
        let mut settled = None;

        for i in 0..1000 {
            doc.set_inner_html(main, "<section><h1>page</h1><p>body text</p></section>");
            let p = doc.select_first(main, &Selector::tag("p")).unwrap();
            doc.set_text_content(p, &format!("tick {}", i));
            let len = *settled.get_or_insert(doc.slots.len());
            assert_eq!(doc.slots.len(), len);
        }
        assert_eq!(doc.text_content(main), "pagetick 999");
    }

    #[test]
    fn test_class_and_attribute_mutation() {
        let mut doc = Document::parse(PAGE);
        let body = doc.body().unwrap();
        doc.set_class(body, "is-loading", true);
        assert!(doc.has_class(body, "is-loading"));
        assert!(!doc.toggle_class(body, "is-loading"));
        assert_eq!(doc.attr(body, "class"), Some("page runes"));

        doc.set_attr(body, "data-extra", "1");
        assert!(doc.remove_attr(body, "data-extra"));
        assert!(!doc.remove_attr(body, "data-extra"));
    }

    #[test]
    fn test_set_title_and_text() {
        let mut doc = Document::parse(PAGE);
        doc.set_title("Tracks");
        assert_eq!(doc.title().as_deref(), Some("Tracks"));

        let p = doc.select_first(doc.root(), &Selector::tag("p")).unwrap();
        doc.set_text_content(p, "<not markup>");
        let children = doc.children(p).to_vec();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.kind(children[0]), Some(&NodeKind::Text("<not markup>".to_string())));
    }

    #[test]
    fn test_import_node_copies_subtree() {
        let source = Document::parse(PAGE);
        let link = source
            .select_first(source.root(), &Selector::tag("link"))
            .unwrap();

        let mut target = Document::parse("<html><head></head><body></body></html>");
        let head = target.head().unwrap();
        let copy = target.import_node(&source, link);
        target.append_child(head, copy);
        let imported = target.select_first(head, &Selector::tag("link")).unwrap();
        assert_eq!(target.attr(imported, "rel"), Some("stylesheet"));
        assert_eq!(target.attr(imported, "href"), Some("/assets/site.css"));
        assert_eq!(target.children(head).to_vec(), vec![imported]);
    }
}
