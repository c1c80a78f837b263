//! Mutable DOM over scraper's `ego_tree` arena.
//!
//! The extraction pipeline rewrites the tree heavily: nodes are detached,
//! re-parented, retagged and wrapped. [`Document`] owns the
//! `ego_tree::Tree<scraper::Node>` produced by the parser and addresses every
//! node by its [`NodeId`], so scores and flags can live in side tables.
//!
//! Detached nodes stay in the arena until the document is dropped. Cloning a
//! [`Document`] is how the selector snapshots the page between retry
//! attempts; ids stay valid across the clone. Markup is written by
//! html5ever's serializer.
//!
//! ## Example
//!
//! ```rust
//! use readability_arena::dom::Document;
//!
//! let mut doc = Document::parse("<html><body><div><p>Hello</p></div></body></html>");
//! let body = doc.body().unwrap();
//! let p = doc.get_elements_by_tag(body, &["P"])[0];
//! doc.set_tag(p, "SPAN");
//! assert_eq!(doc.inner_html(body), "<div><span>Hello</span></div>");
//! ```

use ego_tree::{iter::Edge, NodeMut, NodeRef, Tree};
use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::{namespace_url, ns, LocalName, QualName};
use scraper::node::{Comment, Element, Text};
use scraper::{Html, Node, StrTendril};
use std::collections::{HashMap, HashSet};
use std::io;

pub use ego_tree::NodeId;

/// Kind of a DOM node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Comment,
    /// Doctype or processing instruction.
    Other,
}

/// A mutable HTML document.
///
/// Attributes are read from `Element::attrs` directly; scraper's cached
/// `id()` and `classes()` are never consulted once the tree is edited.
#[derive(Debug, Clone)]
pub struct Document {
    tree: Tree<Node>,
    hidden: HashSet<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the root node.
    pub fn new() -> Self {
        Self {
            tree: Tree::new(Node::Document),
            hidden: HashSet::new(),
        }
    }

    /// Parse a full HTML document.
    pub fn parse(html: &str) -> Self {
        Self::from_html(&Html::parse_document(html))
    }

    /// Take a copy of the tree built by `scraper`.
    pub fn from_html(html: &Html) -> Self {
        Self {
            tree: html.tree.clone(),
            hidden: HashSet::new(),
        }
    }

    /// Parse an HTML fragment and return its top-level nodes, detached.
    pub fn parse_fragment(&mut self, html: &str) -> Vec<NodeId> {
        let fragment = Html::parse_fragment(html);
        fragment
            .root_element()
            .children()
            .map(|child| self.import(child))
            .collect()
    }

    /// Deep-copy a node of another tree into this arena as an orphan.
    fn import(&mut self, source: NodeRef<'_, Node>) -> NodeId {
        let id = self.tree.orphan(source.value().clone()).id();
        let mut stack = vec![(source, id)];
        while let Some((from, to)) = stack.pop() {
            for child in from.children() {
                let copy = self.node_mut(to).append(child.value().clone()).id();
                stack.push((child, copy));
            }
        }
        id
    }

    fn node(&self, id: NodeId) -> NodeRef<'_, Node> {
        // Ids are only handed out by this tree and nodes are never freed.
        self.tree.get(id).expect("node id belongs to this document")
    }

    fn node_mut(&mut self, id: NodeId) -> NodeMut<'_, Node> {
        self.tree.get_mut(id).expect("node id belongs to this document")
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id).value().as_element()
    }

    fn edit_element(&mut self, id: NodeId, edit: impl FnOnce(&mut Element)) {
        if let Node::Element(element) = self.node_mut(id).value() {
            edit(element);
        }
    }

    pub fn root(&self) -> NodeId {
        self.tree.root().id()
    }

    /// The `<html>` element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.first_element_child(self.root())
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .into_iter()
            .find(|id| self.has_tag(*id, "BODY"))
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .into_iter()
            .find(|id| self.has_tag(*id, "HEAD"))
    }

    /// Create a detached HTML element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let name = QualName::new(None, ns!(html), LocalName::from(tag.to_ascii_lowercase()));
        self.tree
            .orphan(Node::Element(Element::new(name, Vec::new())))
            .id()
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        let text = Text {
            text: StrTendril::from(text),
        };
        self.tree.orphan(Node::Text(text)).id()
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        let comment = Comment {
            comment: StrTendril::from(text),
        };
        self.tree.orphan(Node::Comment(comment)).id()
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        match self.node(id).value() {
            Node::Document | Node::Fragment => NodeKind::Document,
            Node::Element(_) => NodeKind::Element,
            Node::Text(_) => NodeKind::Text,
            Node::Comment(_) => NodeKind::Comment,
            _ => NodeKind::Other,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.node(id).value().is_element()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.node(id).value().is_text()
    }

    /// Uppercase tag name, `None` for non-element nodes.
    pub fn tag_name(&self, id: NodeId) -> Option<String> {
        self.element(id).map(|el| el.name().to_ascii_uppercase())
    }

    /// Whether `id` is an element with the given tag name.
    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.element(id)
            .is_some_and(|el| el.name().eq_ignore_ascii_case(tag))
    }

    /// Whether `id` is an element whose tag is one of `tags`.
    pub fn has_any_tag(&self, id: NodeId, tags: &[&str]) -> bool {
        self.element(id)
            .is_some_and(|el| tags.iter().any(|tag| el.name().eq_ignore_ascii_case(tag)))
    }

    /// Rename an element in place. Children, attributes and the node id are kept.
    pub fn set_tag(&mut self, id: NodeId, tag: &str) {
        let local = LocalName::from(tag.to_ascii_lowercase());
        self.edit_element(id, |el| {
            el.name = QualName::new(el.name.prefix.clone(), el.name.ns.clone(), local);
        });
    }

    /// Character data of a text or comment node, `""` otherwise.
    pub fn text(&self, id: NodeId) -> &str {
        match self.node(id).value() {
            Node::Text(text) => &**text,
            Node::Comment(comment) => &**comment,
            _ => "",
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        let tendril = StrTendril::from(text.into());
        match self.node_mut(id).value() {
            Node::Text(text) => text.text = tendril,
            Node::Comment(comment) => comment.comment = tendril,
            _ => {}
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(key, _)| (*key.local).eq_ignore_ascii_case(name))
            .map(|(_, value)| &**value)
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Attribute names and values in document order.
    pub fn attrs(&self, id: NodeId) -> Vec<(String, String)> {
        self.element(id)
            .map(|el| {
                el.attrs
                    .iter()
                    .map(|(key, value)| (key.local.to_string(), value.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = StrTendril::from(value.into());
        self.edit_element(id, |el| {
            if let Some((_, slot)) = el
                .attrs
                .iter_mut()
                .find(|(key, _)| (*key.local).eq_ignore_ascii_case(name))
            {
                *slot = value;
                return;
            }
            let key = QualName::new(None, ns!(), LocalName::from(name.to_ascii_lowercase()));
            el.attrs.insert(key, value);
        });
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        self.edit_element(id, |el| {
            el.attrs.retain(|key, _| !(*key.local).eq_ignore_ascii_case(name));
        });
    }

    /// The `class` attribute, or `""`.
    pub fn class_name(&self, id: NodeId) -> &str {
        self.attr(id, "class").unwrap_or("")
    }

    /// The `id` attribute, or `""`.
    pub fn id_attr(&self, id: NodeId) -> &str {
        self.attr(id, "id").unwrap_or("")
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        !self.hidden.contains(&id)
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if visible {
            self.hidden.remove(&id);
        } else {
            self.hidden.insert(id);
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent().map(|parent| parent.id())
    }

    /// Parent if it is an element.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).children().map(|child| child.id()).collect()
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .children()
            .filter(|child| child.value().is_element())
            .map(|child| child.id())
            .collect()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child().map(|child| child.id())
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child().map(|child| child.id())
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)
            .children()
            .find(|child| child.value().is_element())
            .map(|child| child.id())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling().map(|sibling| sibling.id())
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling().map(|sibling| sibling.id())
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)
            .next_siblings()
            .find(|sibling| sibling.value().is_element())
            .map(|sibling| sibling.id())
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)
            .prev_siblings()
            .find(|sibling| sibling.value().is_element())
            .map(|sibling| sibling.id())
    }

    /// Whether `node` is `ancestor` or lies beneath it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.node(node).ancestors().any(|up| up.id() == ancestor)
    }

    /// Remove `id` from its parent. The subtree stays intact and may be re-attached.
    pub fn detach(&mut self, id: NodeId) {
        self.node_mut(id).detach();
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).append_id(child);
    }

    /// Insert `child` into `parent` right before `reference`, or at the end when
    /// `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        if child == reference {
            return;
        }
        if self.parent(reference) == Some(parent) {
            self.node_mut(reference).insert_id_before(child);
        } else {
            self.append_child(parent, child);
        }
    }

    /// Put `new` where `old` is and detach `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        self.detach(new);
        if self.parent(old).is_some() {
            self.node_mut(old).insert_id_before(new);
        }
        self.detach(old);
    }

    /// Move every child of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        if from == to {
            return;
        }
        while let Some(child) = self.first_child(from) {
            self.append_child(to, child);
        }
    }

    /// All nodes below `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).descendants().skip(1).map(|node| node.id()).collect()
    }

    /// Descendant elements of `id` whose tag is in `tags` (`"*"` matches all).
    pub fn get_elements_by_tag(&self, id: NodeId, tags: &[&str]) -> Vec<NodeId> {
        let any = tags.contains(&"*");
        self.node(id)
            .descendants()
            .skip(1)
            .filter(|node| match node.value().as_element() {
                Some(el) => any || tags.iter().any(|tag| el.name().eq_ignore_ascii_case(tag)),
                None => false,
            })
            .map(|node| node.id())
            .collect()
    }

    /// Number of elements attached to the document.
    pub fn element_count(&self) -> usize {
        self.tree
            .root()
            .descendants()
            .filter(|node| node.value().is_element())
            .count()
    }

    /// Position of every attached node in a depth-first walk.
    pub fn document_order(&self) -> HashMap<NodeId, usize> {
        self.descendants(self.root())
            .into_iter()
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect()
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self, id: NodeId) -> String {
        self.node(id)
            .descendants()
            .filter_map(|node| node.value().as_text())
            .map(|text| &**text)
            .collect()
    }

    /// Like [`text_content`](Self::text_content) but skipping subtrees flagged invisible.
    pub fn visible_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut skip_depth: Option<usize> = None;
        let mut depth = 0usize;
        for edge in self.node(id).traverse() {
            match edge {
                Edge::Open(node) => {
                    depth += 1;
                    if skip_depth.is_some() {
                        continue;
                    }
                    match node.value() {
                        Node::Text(text) => out.push_str(text),
                        Node::Element(_) if node.id() != id && self.hidden.contains(&node.id()) => {
                            skip_depth = Some(depth);
                        }
                        _ => {}
                    }
                }
                Edge::Close(_) => {
                    if skip_depth == Some(depth) {
                        skip_depth = None;
                    }
                    depth -= 1;
                }
            }
        }
        out
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        self.serialize(id, TraversalScope::ChildrenOnly(None))
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        self.serialize(id, TraversalScope::IncludeNode)
    }

    fn serialize(&self, id: NodeId, scope: TraversalScope) -> String {
        let opts = SerializeOpts {
            traversal_scope: scope,
            ..SerializeOpts::default()
        };
        let mut buf = Vec::new();
        match serialize(&mut buf, &Subtree(self.node(id)), opts) {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => String::new(),
        }
    }
}

/// A node and everything below it, fed to html5ever's serializer.
struct Subtree<'a>(NodeRef<'a, Node>);

impl Serialize for Subtree<'_> {
    fn serialize<S: Serializer>(&self, serializer: &mut S, scope: TraversalScope) -> io::Result<()> {
        let top = self.0;
        let children_only = scope == TraversalScope::ChildrenOnly(None);
        for edge in top.traverse() {
            match edge {
                Edge::Open(node) => {
                    if children_only && node == top {
                        continue;
                    }
                    match node.value() {
                        Node::Doctype(doctype) => serializer.write_doctype(doctype.name())?,
                        Node::Comment(comment) => serializer.write_comment(comment)?,
                        Node::Text(text) => serializer.write_text(text)?,
                        Node::Element(el) => {
                            let attrs = el.attrs.iter().map(|(key, value)| (key, &value[..]));
                            serializer.start_elem(el.name.clone(), attrs)?;
                        }
                        _ => {}
                    }
                }
                Edge::Close(node) => {
                    if children_only && node == top {
                        continue;
                    }
                    if let Some(el) = node.value().as_element() {
                        serializer.end_elem(el.name.clone())?;
                    }
                }
            }
        }
        Ok(())
    }
}
