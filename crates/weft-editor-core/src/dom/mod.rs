//! Arena-backed document tree.
//!
//! Nodes live in a flat arena and are addressed by [`NodeId`]. Nothing is
//! ever freed: detaching a node only unlinks it from its parent, so a
//! `NodeId` stays valid for the lifetime of the [`Dom`]. Liveness is a
//! question of reachability from the document body, which is exactly what
//! the card registry's garbage collection sweep asks.

mod parse;
mod selector;
mod serialize;

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use smol_str::SmolStr;

pub use parse::{decode_entities, parse_fragment};
pub use selector::Selector;
pub use serialize::{escape_attribute, escape_text, is_void_element};

/// Handle to a node in a [`Dom`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Payload of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// Tag name plus attributes in insertion order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementData {
    pub name: SmolStr,
    pub attrs: Vec<(SmolStr, String)>,
}

#[derive(Clone, Debug)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A document: `#document > body`, plus any number of detached subtrees.
#[derive(Clone, Debug)]
pub struct Dom {
    nodes: Vec<Slot>,
    document: NodeId,
    body: NodeId,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// Create a document containing an empty `body`.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: NodeId(0),
            body: NodeId(0),
        };
        let document = dom.alloc(NodeData::Document);
        let body = dom.create_element("body");
        dom.append_child(document, body);
        dom.document = document;
        dom.body = body;
        dom
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Slot {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn slot(&self, id: NodeId) -> &Slot {
        &self.nodes[id.index()]
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
        &mut self.nodes[id.index()]
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Number of nodes ever allocated, attached or not.
    pub fn allocated(&self) -> usize {
        self.nodes.len()
    }

    // === Construction ===

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData {
            name: SmolStr::new(name.to_ascii_lowercase()),
            attrs: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Comment(text.into()))
    }

    /// Copy a node without its children.
    pub fn shallow_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.slot(id).data.clone();
        self.alloc(data)
    }

    // === Node payload ===

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.slot(id).data
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.slot(id).data, NodeData::Element(_))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.slot(id).data, NodeData::Text(_))
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.slot(id).data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.slot_mut(id).data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Lowercase tag name for elements.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.slot(id).data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) {
        if let NodeData::Text(text) = &mut self.slot_mut(id).data {
            *text = value.into();
        }
    }

    /// Length used by range offsets: chars for text, child count otherwise.
    pub fn node_len(&self, id: NodeId) -> usize {
        match &self.slot(id).data {
            NodeData::Text(text) | NodeData::Comment(text) => text.chars().count(),
            _ => self.slot(id).children.len(),
        }
    }

    // === Attributes ===

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Set an attribute, keeping its position if it already exists. No-op on non-elements.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        let value = value.into();
        match el.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => el.attrs.push((SmolStr::new(name), value)),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.retain(|(key, _)| key != name);
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(SmolStr, String)] {
        self.element(id).map(|el| el.attrs.as_slice()).unwrap_or(&[])
    }

    /// All attributes except `style`, keyed by name.
    pub fn attributes_map(&self, id: NodeId) -> BTreeMap<String, String> {
        self.attrs(id)
            .iter()
            .filter(|(key, _)| key != "style")
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    /// Parsed inline style declarations.
    pub fn css(&self, id: NodeId) -> BTreeMap<String, String> {
        let mut styles = BTreeMap::new();
        let Some(style) = self.attr(id, "style") else {
            return styles;
        };
        for declaration in split_declarations(style) {
            let Some((prop, value)) = declaration.split_once(':') else {
                continue;
            };
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim();
            if !prop.is_empty() && !value.is_empty() {
                styles.insert(prop, value.to_string());
            }
        }
        styles
    }

    /// Replace the inline style. An empty map removes the `style` attribute.
    pub fn set_css(&mut self, id: NodeId, styles: &BTreeMap<String, String>) {
        if styles.is_empty() {
            self.remove_attr(id, "style");
            return;
        }
        let style = styles
            .iter()
            .map(|(prop, value)| format!("{prop}: {value};"))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(id, "style", style);
    }

    pub fn set_style(&mut self, id: NodeId, prop: &str, value: &str) {
        let mut styles = self.css(id);
        styles.insert(prop.to_ascii_lowercase(), value.to_string());
        self.set_css(id, &styles);
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) || !self.is_element(id) {
            return;
        }
        let classes = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", classes);
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let Some(existing) = self.attr(id, "class") else {
            return;
        };
        let remaining = existing
            .split_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        if remaining.is_empty() {
            self.remove_attr(id, "class");
        } else {
            self.set_attr(id, "class", remaining);
        }
    }

    // === Tree navigation ===

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slot(id).children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Position among the parent's children (all node kinds count).
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            dom: self,
            next: self.parent(id),
        }
    }

    /// Nearest node, starting with `id` itself, satisfying `pred`.
    pub fn closest(&self, id: NodeId, mut pred: impl FnMut(NodeId) -> bool) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|node| pred(*node))
    }

    /// Whether `node` is `ancestor` or lies beneath it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether the node is reachable from the document body.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.body, id)
    }

    /// Descendants in document order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Child indices leading from the document (or detached root) down to `id`.
    pub fn path(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(index) = self.index_of(current) {
            path.push(index);
            match self.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }

    pub fn text_content(&self, id: NodeId) -> String {
        match &self.slot(id).data {
            NodeData::Text(text) => text.clone(),
            NodeData::Comment(_) => String::new(),
            _ => self
                .descendants(id)
                .into_iter()
                .filter_map(|node| self.text(node))
                .collect(),
        }
    }

    // === Selectors ===

    pub fn matches(&self, id: NodeId, selector: &str) -> bool {
        Selector::parse(selector).is_some_and(|s| s.matches(self, id))
    }

    /// Descendants of `root` matching a selector list, in document order.
    pub fn query_all(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(selector) = Selector::parse(selector) else {
            tracing::warn!(selector, "unsupported selector");
            return Vec::new();
        };
        self.descendants(root)
            .into_iter()
            .filter(|node| selector.matches(self, *node))
            .collect()
    }

    // === Mutation ===

    /// Unlink a node from its parent. The subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.slot(id).parent else {
            return;
        };
        self.slot_mut(parent).children.retain(|child| *child != id);
        self.slot_mut(id).parent = None;
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child);
    }

    /// Insert `child` at `index` under `parent`, moving it from wherever it was.
    ///
    /// The index is interpreted against the parent's children before the move.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if self.contains(child, parent) {
            tracing::warn!(?parent, ?child, "refusing to insert a node into its own subtree");
            return;
        }
        let mut index = index;
        if self.parent(child) == Some(parent)
            && let Some(current) = self.index_of(child)
            && current < index
        {
            index -= 1;
        }
        self.detach(child);
        let len = self.children(parent).len();
        self.slot_mut(parent).children.insert(index.min(len), child);
        self.slot_mut(child).parent = Some(parent);
    }

    /// Insert `node` as the previous sibling of `reference`.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        let (Some(parent), Some(index)) = (self.parent(reference), self.index_of(reference)) else {
            return;
        };
        self.insert_child(parent, index, node);
    }

    /// Insert `node` as the next sibling of `reference`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        let (Some(parent), Some(index)) = (self.parent(reference), self.index_of(reference)) else {
            return;
        };
        self.insert_child(parent, index + 1, node);
    }

    /// Put `new` where `old` is and detach `old`.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        self.insert_before(old, new);
        self.detach(old);
    }

    /// Detach all children.
    pub fn empty(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.detach(child);
        }
    }

    /// Replace an element with its children.
    pub fn unwrap(&mut self, id: NodeId) {
        if self.parent(id).is_none() {
            return;
        }
        for child in self.children(id).to_vec() {
            self.insert_before(id, child);
        }
        self.detach(id);
    }

    /// Split a text node at a char offset, returning the new right-hand node.
    ///
    /// Returns `None` for offsets at either edge or for non-text nodes.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text(id)?;
        let len = text.chars().count();
        if offset == 0 || offset >= len {
            return None;
        }
        let byte = text
            .char_indices()
            .nth(offset)
            .map(|(byte, _)| byte)
            .unwrap_or(text.len());
        let right = text[byte..].to_string();
        let left = text[..byte].to_string();
        self.set_text(id, left);
        let right = self.create_text(right);
        if self.parent(id).is_some() {
            self.insert_after(id, right);
        }
        Some(right)
    }

    /// Split `boundary` at the point (`node`, `offset`).
    ///
    /// Everything after the point moves into shallow clones of the ancestors
    /// between the point and `boundary`; the clone of `boundary` is inserted
    /// directly after it and returned. `offset` is a char offset for text nodes
    /// and a child index otherwise. Returns `None` when the point is not inside
    /// `boundary` or `boundary` is detached.
    pub fn split_at(&mut self, boundary: NodeId, node: NodeId, offset: usize) -> Option<NodeId> {
        if !self.contains(boundary, node) || self.parent(boundary).is_none() {
            return None;
        }
        let (mut parent, mut split_index) = if self.is_text(node) {
            let parent = self.parent(node)?;
            let index = self.index_of(node)?;
            if offset == 0 {
                (parent, index)
            } else if offset >= self.node_len(node) {
                (parent, index + 1)
            } else {
                self.split_text(node, offset);
                (parent, index + 1)
            }
        } else {
            (node, offset.min(self.children(node).len()))
        };

        loop {
            let clone = self.shallow_clone(parent);
            let moved = self.children(parent)[split_index..].to_vec();
            for child in moved {
                self.append_child(clone, child);
            }
            if parent == boundary {
                self.insert_after(parent, clone);
                return Some(clone);
            }
            let grand = self.parent(parent)?;
            let index = self.index_of(parent)? + 1;
            self.insert_child(grand, index, clone);
            parent = grand;
            split_index = index;
        }
    }

    // === HTML ===

    /// Parse `html` and append the result to `parent`, returning the new top-level nodes.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
        let nodes = parse_fragment(self, html);
        for node in &nodes {
            self.append_child(parent, *node);
        }
        nodes
    }

    /// Replace the children of `id` with parsed `html`.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        self.empty(id);
        self.append_html(id, html);
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            serialize::write_node(self, *child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        serialize::write_node(self, id, &mut out);
        out
    }

    /// Hash of tag name and attributes, ignoring attribute order.
    pub fn hash_node(&self, id: NodeId) -> u64 {
        let mut hasher = DefaultHasher::new();
        match self.element(id) {
            Some(el) => {
                el.name.hash(&mut hasher);
                let mut attrs: Vec<_> = el.attrs.iter().collect();
                attrs.sort();
                attrs.hash(&mut hasher);
            }
            None => self.text_content(id).hash(&mut hasher),
        }
        hasher.finish()
    }
}

/// Iterator over strict ancestors, see [`Dom::ancestors`].
pub struct Ancestors<'a> {
    dom: &'a Dom,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.dom.parent(current);
        Some(current)
    }
}

/// Split a declaration list on `;` outside quotes and parentheses.
fn split_declarations(style: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (index, c) in style.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == open {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                parts.push(&style[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&style[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(html: &str) -> (Dom, NodeId) {
        let mut dom = Dom::new();
        let root = dom.create_element("div");
        dom.append_child(dom.body(), root);
        dom.set_inner_html(root, html);
        (dom, root)
    }

    #[test]
    fn test_new_document_has_body() {
        let dom = Dom::new();
        assert_eq!(dom.name(dom.body()), Some("body"));
        assert_eq!(dom.parent(dom.body()), Some(dom.document()));
        assert!(dom.is_attached(dom.body()));
    }

    #[test]
    fn test_detach_keeps_subtree() {
        let (mut dom, root) = fragment("<p><b>bold</b></p>");
        let p = dom.first_child(root).unwrap();
        dom.detach(p);
        assert!(!dom.is_attached(p));
        assert_eq!(dom.outer_html(p), "<p><b>bold</b></p>");
        assert_eq!(dom.inner_html(root), "");
    }

    #[test]
    fn test_insert_child_within_same_parent() {
        let (mut dom, root) = fragment("<a></a><b></b><i></i>");
        let a = dom.children(root)[0];
        // Move `a` to the end: index counts the list before the move.
        dom.insert_child(root, 3, a);
        assert_eq!(dom.inner_html(root), "<b></b><i></i><a></a>");
    }

    #[test]
    fn test_insert_into_own_subtree_is_refused() {
        let (mut dom, root) = fragment("<p><b></b></p>");
        let p = dom.first_child(root).unwrap();
        let b = dom.first_child(p).unwrap();
        dom.append_child(b, p);
        assert_eq!(dom.inner_html(root), "<p><b></b></p>");
    }

    #[test]
    fn test_attributes_and_css() {
        let (mut dom, root) =
            fragment(r#"<span class="a b" style="color: red; font-size:12px">x</span>"#);
        let span = dom.first_child(root).unwrap();
        assert_eq!(dom.attr(span, "class"), Some("a b"));
        let css = dom.css(span);
        assert_eq!(css.get("color").map(String::as_str), Some("red"));
        assert_eq!(css.get("font-size").map(String::as_str), Some("12px"));
        assert!(!dom.attributes_map(span).contains_key("style"));

        dom.set_style(span, "color", "blue");
        assert_eq!(dom.css(span).get("color").map(String::as_str), Some("blue"));

        dom.set_css(span, &BTreeMap::new());
        assert!(!dom.has_attr(span, "style"));
    }

    #[test]
    fn test_class_helpers() {
        let (mut dom, root) = fragment("<p></p>");
        let p = dom.first_child(root).unwrap();
        dom.add_class(p, "one");
        dom.add_class(p, "two");
        dom.add_class(p, "one");
        assert_eq!(dom.attr(p, "class"), Some("one two"));
        dom.remove_class(p, "one");
        assert_eq!(dom.attr(p, "class"), Some("two"));
        dom.remove_class(p, "two");
        assert!(!dom.has_attr(p, "class"));
    }

    #[test]
    fn test_split_text() {
        let (mut dom, root) = fragment("<p>héllo</p>");
        let p = dom.first_child(root).unwrap();
        let text = dom.first_child(p).unwrap();
        let right = dom.split_text(text, 2).unwrap();
        assert_eq!(dom.text(text), Some("hé"));
        assert_eq!(dom.text(right), Some("llo"));
        assert_eq!(dom.children(p).len(), 2);
        assert!(dom.split_text(text, 0).is_none());
    }

    #[test]
    fn test_split_at_nested_point() {
        let (mut dom, root) = fragment("<p>ab<b>cd</b>ef</p>");
        let p = dom.first_child(root).unwrap();
        let b = dom.children(p)[1];
        let cd = dom.first_child(b).unwrap();
        let right = dom.split_at(p, cd, 1).unwrap();
        assert_eq!(dom.inner_html(root), "<p>ab<b>c</b></p><p><b>d</b>ef</p>");
        assert_eq!(dom.outer_html(right), "<p><b>d</b>ef</p>");
    }

    #[test]
    fn test_split_at_outside_boundary() {
        let (mut dom, root) = fragment("<p>a</p><p>b</p>");
        let first = dom.children(root)[0];
        let second_text = dom.first_child(dom.children(root)[1]).unwrap();
        assert!(dom.split_at(first, second_text, 0).is_none());
    }

    #[test]
    fn test_unwrap_and_replace() {
        let (mut dom, root) = fragment("<div><p>a</p><p>b</p></div>");
        let div = dom.first_child(root).unwrap();
        dom.unwrap(div);
        assert_eq!(dom.inner_html(root), "<p>a</p><p>b</p>");

        let hr = dom.create_element("hr");
        let first = dom.children(root)[0];
        dom.replace_with(first, hr);
        assert_eq!(dom.inner_html(root), "<hr><p>b</p>");
        assert!(!dom.is_attached(first));
    }

    #[test]
    fn test_path_and_siblings() {
        let (dom, root) = fragment("<p>a</p><p>b</p>");
        let second = dom.children(root)[1];
        assert_eq!(dom.prev_sibling(second), Some(dom.children(root)[0]));
        assert_eq!(dom.next_sibling(second), None);
        let mut expected = dom.path(root);
        expected.push(1);
        assert_eq!(dom.path(second), expected);
    }

    #[test]
    fn test_hash_node_ignores_attribute_order() {
        let (dom, root) = fragment(r#"<p a="1" b="2"></p><p b="2" a="1"></p><p a="1"></p>"#);
        let children = dom.children(root);
        assert_eq!(dom.hash_node(children[0]), dom.hash_node(children[1]));
        assert_ne!(dom.hash_node(children[0]), dom.hash_node(children[2]));
    }

    #[test]
    fn test_css_keeps_semicolons_in_urls() {
        let (mut dom, root) = fragment("<span>x</span>");
        let span = dom.first_child(root).unwrap();
        dom.set_attr(
            span,
            "style",
            r#"background-image: url("data:image/png;base64,AAAA"); mask: url(a;b.svg); color: red"#,
        );
        let css = dom.css(span);
        assert_eq!(css.len(), 3);
        assert_eq!(
            css.get("background-image").map(String::as_str),
            Some(r#"url("data:image/png;base64,AAAA")"#)
        );
        assert_eq!(css.get("mask").map(String::as_str), Some("url(a;b.svg)"));
        assert_eq!(css.get("color").map(String::as_str), Some("red"));
    }

    #[test]
    fn test_query_all() {
        let (dom, root) =
            fragment(r#"<p class="x"><span data-k="1">a</span></p><span class="x">b</span>"#);
        assert_eq!(dom.query_all(root, ".x").len(), 2);
        assert_eq!(dom.query_all(root, "span[data-k]").len(), 1);
        assert_eq!(dom.query_all(root, "p, span").len(), 3);
        assert!(dom.query_all(root, "p > span").is_empty());
    }
}
