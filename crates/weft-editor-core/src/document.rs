//! Core editor document trait and implementations.
//!
//! Defines the `EditorDocument` trait the card registry drives: DOM access,
//! the editable container, the schema, the current selection and a
//! notification sink. Storage is left to implementors; `PlainEditor` keeps
//! everything in plain fields and is what the tests and the CLI use.

use crate::constants::{CARD_KEY, CARD_TYPE_KEY, DATA_ELEMENT, ROOT, ZERO_WIDTH_SPACE};
use crate::dom::{Dom, NodeData, NodeId};
use crate::range::{DomPoint, DomRange};
use crate::schema::{Schema, SchemaType};
use crate::types::{CardType, EditorEvent};

/// Elements that count as content even without text.
const CONTENT_VOIDS: &[&str] = &[
    "img", "hr", "video", "audio", "iframe", "input", "embed", "object", "canvas", "svg",
];

/// Core trait for editor documents.
///
/// Required methods expose state; provided methods implement the structural
/// edits the card registry needs on top of it.
pub trait EditorDocument {
    // === Required: DOM access ===

    fn dom(&self) -> &Dom;

    fn dom_mut(&mut self) -> &mut Dom;

    /// The editable root element.
    fn container(&self) -> NodeId;

    fn schema(&self) -> &Schema;

    // === Required: engine state ===

    /// Whether this is an interactive engine rather than a read-only view.
    ///
    /// Card interaction operations are no-ops on views.
    fn is_engine(&self) -> bool;

    fn readonly(&self) -> bool;

    fn set_readonly(&mut self, readonly: bool);

    // === Required: selection ===

    /// The current selection, if the editor has one.
    fn range(&self) -> Option<DomRange>;

    /// Make `range` the current selection.
    fn select_range(&mut self, range: DomRange);

    // === Required: notifications ===

    fn notify(&mut self, event: EditorEvent);

    /// Bring `node` into view. Hosts without scrolling ignore this.
    fn scroll_into_view(&mut self, _node: NodeId) {}

    // === Provided: queries ===

    /// The current selection if it lies inside the container, otherwise a
    /// caret at the end of the container.
    fn safe_range(&self) -> DomRange {
        let dom = self.dom();
        let container = self.container();
        match self.range() {
            Some(range)
                if dom.contains(container, range.start.node)
                    && dom.contains(container, range.end.node) =>
            {
                range
            }
            _ => DomRange::collapsed_at(DomPoint::new(container, dom.children(container).len())),
        }
    }

    /// Whether `node` is a block: a block card root, or an element the
    /// schema classifies as a block.
    fn is_block(&self, node: NodeId) -> bool {
        let dom = self.dom();
        if !dom.is_element(node) {
            return false;
        }
        if dom.has_attr(node, CARD_KEY) {
            return dom.attr(node, CARD_TYPE_KEY).and_then(CardType::parse) == Some(CardType::Block);
        }
        self.schema().get_type(dom, node, None) == Some(SchemaType::Block)
    }

    /// Nearest block at or above `node`, inside the container.
    fn closest_block(&self, node: NodeId) -> Option<NodeId> {
        let dom = self.dom();
        let container = self.container();
        dom.closest(node, |n| n == container || self.is_block(n))
            .filter(|n| *n != container && dom.contains(container, *n))
    }

    /// Whether `node` has no visible content. Caret anchors, whitespace and
    /// `br` do not count; media, rules and cards do.
    fn is_empty_node(&self, node: NodeId) -> bool {
        let dom = self.dom();
        match dom.data(node) {
            NodeData::Text(text) => text
                .chars()
                .all(|c| c == ZERO_WIDTH_SPACE || c.is_whitespace()),
            NodeData::Comment(_) => true,
            NodeData::Element(el) => {
                if CONTENT_VOIDS.contains(&el.name.as_str()) || dom.has_attr(node, CARD_KEY) {
                    return false;
                }
                dom.children(node).iter().all(|child| self.is_empty_node(*child))
            }
            NodeData::Document => dom.children(node).iter().all(|child| self.is_empty_node(*child)),
        }
    }

    // === Provided: structural edits ===

    /// Remove the selected content and collapse `range` onto its start.
    ///
    /// Partially selected nodes are split; nodes wholly inside are detached.
    /// Blocks on either side are not merged.
    fn delete_content(&mut self, range: &mut DomRange) {
        if range.is_collapsed() {
            return;
        }
        let dom = self.dom_mut();
        let DomRange { mut start, mut end } = *range;

        if start.node == end.node && dom.is_text(start.node) {
            if let Some(text) = dom.text(start.node) {
                let kept: String = text
                    .chars()
                    .enumerate()
                    .filter(|(i, _)| *i < start.offset || *i >= end.offset)
                    .map(|(_, c)| c)
                    .collect();
                dom.set_text(start.node, kept);
            }
            range.collapse(true);
            return;
        }

        if dom.is_text(start.node)
            && let (Some(parent), Some(index)) = (dom.parent(start.node), dom.index_of(start.node))
        {
            let split = start.offset > 0 && dom.split_text(start.node, start.offset).is_some();
            let new_index = if start.offset == 0 { index } else { index + 1 };
            if split && end.node == parent && end.offset > index {
                end.offset += 1;
            }
            start = DomPoint::new(parent, new_index);
        }
        if dom.is_text(end.node)
            && let (Some(parent), Some(index)) = (dom.parent(end.node), dom.index_of(end.node))
        {
            let new_index = if end.offset == 0 { index } else { index + 1 };
            dom.split_text(end.node, end.offset);
            end = DomPoint::new(parent, new_index);
        }

        let bounded = DomRange::new(start, end);
        let Some(ancestor) = bounded.common_ancestor(dom) else {
            return;
        };
        let doomed: Vec<NodeId> = dom
            .descendants(ancestor)
            .into_iter()
            .filter(|node| bounded.contains_node(dom, *node))
            .collect();
        for node in &doomed {
            let parent_doomed = dom.parent(*node).is_some_and(|p| doomed.contains(&p));
            if !parent_doomed {
                dom.detach(*node);
            }
        }
        *range = DomRange::collapsed_at(start);
    }

    /// Insert an inline node at the start of `range`, leaving a caret after it.
    fn insert_inline(&mut self, node: NodeId, range: &mut DomRange) {
        self.delete_content(range);
        let dom = self.dom_mut();
        let point = range.start;
        if dom.is_text(point.node) {
            let (Some(parent), Some(index)) = (dom.parent(point.node), dom.index_of(point.node))
            else {
                return;
            };
            if point.offset == 0 {
                dom.insert_child(parent, index, node);
            } else {
                dom.split_text(point.node, point.offset);
                dom.insert_child(parent, index + 1, node);
            }
        } else {
            dom.insert_child(point.node, point.offset, node);
        }
        if let Some(after) = DomPoint::after(dom, node) {
            *range = DomRange::collapsed_at(after);
        }
    }

    /// Insert a block node at the start of `range`.
    ///
    /// The enclosing block, widened by `resolve`, is split at the caret and
    /// the node goes between the halves; halves left empty are removed. With
    /// no enclosing block the top-level child holding the caret is split
    /// instead. The range ends up collapsed after the node.
    fn insert_block(
        &mut self,
        node: NodeId,
        range: &mut DomRange,
        resolve: impl Fn(&Self, NodeId) -> NodeId,
    ) where
        Self: Sized,
    {
        self.delete_content(range);
        let container = self.container();
        let point = range.start;

        let target = match self.closest_block(point.node) {
            Some(block) => Some(resolve(self, block)),
            None if point.node == container => None,
            None => {
                let dom = self.dom();
                dom.closest(point.node, |n| dom.parent(n) == Some(container))
            }
        };

        match target {
            Some(target) => {
                let right = self.dom_mut().split_at(target, point.node, point.offset);
                self.dom_mut().insert_after(target, node);
                if let Some(right) = right
                    && self.is_empty_node(right)
                {
                    self.dom_mut().detach(right);
                }
                if self.is_empty_node(target) {
                    self.dom_mut().detach(target);
                }
            }
            None if self.dom().contains(container, point.node) => {
                self.dom_mut().insert_child(point.node, point.offset, node);
            }
            None => {
                self.dom_mut().append_child(container, node);
            }
        }

        if let Some(after) = DomPoint::after(self.dom(), node) {
            *range = DomRange::collapsed_at(after);
        }
    }

    /// Replace a block with its children.
    fn unwrap_block(&mut self, node: NodeId) {
        self.dom_mut().unwrap(node);
    }
}

/// Simple field-based implementation of EditorDocument.
///
/// Notifications are queued in order and can be drained with
/// [`PlainEditor::take_events`].
#[derive(Clone, Debug)]
pub struct PlainEditor {
    dom: Dom,
    container: NodeId,
    schema: Schema,
    readonly: bool,
    engine: bool,
    range: Option<DomRange>,
    events: Vec<EditorEvent>,
    scrolled_to: Option<NodeId>,
}

impl Default for PlainEditor {
    fn default() -> Self {
        Self::new(Schema::with_defaults())
    }
}

impl PlainEditor {
    /// Create an interactive editor with an empty container.
    pub fn new(schema: Schema) -> Self {
        let mut dom = Dom::new();
        let container = dom.create_element("div");
        dom.set_attr(container, DATA_ELEMENT, ROOT);
        dom.set_attr(container, "contenteditable", "true");
        dom.append_child(dom.body(), container);
        Self {
            dom,
            container,
            schema,
            readonly: false,
            engine: true,
            range: None,
            events: Vec::new(),
            scrolled_to: None,
        }
    }

    /// Create an interactive editor whose container holds `html`.
    pub fn with_html(schema: Schema, html: &str) -> Self {
        let mut editor = Self::new(schema);
        editor.dom.set_inner_html(editor.container, html);
        editor
    }

    /// Create a non-interactive view of `html`.
    pub fn view(schema: Schema, html: &str) -> Self {
        let mut editor = Self::with_html(schema, html);
        editor.engine = false;
        editor.dom.remove_attr(editor.container, "contenteditable");
        editor
    }

    pub fn html(&self) -> String {
        self.dom.inner_html(self.container)
    }

    /// Notifications raised so far.
    pub fn events(&self) -> &[EditorEvent] {
        &self.events
    }

    /// Drain the notification queue.
    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn scrolled_to(&self) -> Option<NodeId> {
        self.scrolled_to
    }

    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }
}

impl EditorDocument for PlainEditor {
    fn dom(&self) -> &Dom {
        &self.dom
    }

    fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    fn container(&self) -> NodeId {
        self.container
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn is_engine(&self) -> bool {
        self.engine
    }

    fn readonly(&self) -> bool {
        self.readonly
    }

    fn set_readonly(&mut self, readonly: bool) {
        self.readonly = readonly;
    }

    fn range(&self) -> Option<DomRange> {
        self.range
    }

    fn select_range(&mut self, range: DomRange) {
        self.range = Some(range);
    }

    fn notify(&mut self, event: EditorEvent) {
        self.events.push(event);
    }

    fn scroll_into_view(&mut self, node: NodeId) {
        self.scrolled_to = Some(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_editor(html: &str) -> PlainEditor {
        PlainEditor::with_html(Schema::with_defaults(), html)
    }

    fn text_in(editor: &PlainEditor, path: &[usize]) -> NodeId {
        let mut node = editor.container();
        for index in path {
            node = editor.dom().children(node)[*index];
        }
        node
    }

    #[test]
    fn test_container_contract() {
        let editor = make_editor("<p>a</p>");
        let container = editor.container();
        assert_eq!(editor.dom().attr(container, DATA_ELEMENT), Some(ROOT));
        assert!(editor.dom().is_attached(container));
        assert!(editor.is_engine());
        assert!(!PlainEditor::view(Schema::with_defaults(), "").is_engine());
    }

    #[test]
    fn test_safe_range_falls_back_to_end() {
        let mut editor = make_editor("<p>a</p><p>b</p>");
        let range = editor.safe_range();
        assert_eq!(range.start, DomPoint::new(editor.container(), 2));
        assert!(range.is_collapsed());

        let outside = editor.dom_mut().create_text("x");
        editor.select_range(DomRange::collapsed_at(DomPoint::new(outside, 0)));
        assert_eq!(editor.safe_range().start.node, editor.container());
    }

    #[test]
    fn test_is_block_and_closest_block() {
        let editor = make_editor("<ul><li><strong>x</strong></li></ul>");
        let ul = text_in(&editor, &[0]);
        let li = text_in(&editor, &[0, 0]);
        let strong = text_in(&editor, &[0, 0, 0]);
        let text = text_in(&editor, &[0, 0, 0, 0]);
        assert!(editor.is_block(ul));
        assert!(editor.is_block(li));
        assert!(!editor.is_block(strong));
        assert_eq!(editor.closest_block(text), Some(li));
        assert_eq!(editor.closest_block(editor.container()), None);
    }

    #[test]
    fn test_is_empty_node() {
        let editor = make_editor("<p><br></p><p>\u{200b} </p><p><img src=\"/a.png\"></p><p>x</p>");
        let container = editor.container();
        let children = editor.dom().children(container).to_vec();
        assert!(editor.is_empty_node(children[0]));
        assert!(editor.is_empty_node(children[1]));
        assert!(!editor.is_empty_node(children[2]));
        assert!(!editor.is_empty_node(children[3]));
    }

    #[test]
    fn test_delete_content_within_text() {
        let mut editor = make_editor("<p>hello world</p>");
        let text = text_in(&editor, &[0, 0]);
        let mut range = DomRange::new(DomPoint::new(text, 5), DomPoint::new(text, 11));
        editor.delete_content(&mut range);
        assert_eq!(editor.html(), "<p>hello</p>");
        assert_eq!(range, DomRange::collapsed_at(DomPoint::new(text, 5)));
    }

    #[test]
    fn test_delete_content_across_nodes() {
        let mut editor = make_editor("<p>ab<b>cd</b>ef</p><p>gh</p><p>ij</p>");
        let ab = text_in(&editor, &[0, 0]);
        let ij = text_in(&editor, &[2, 0]);
        let mut range = DomRange::new(DomPoint::new(ab, 1), DomPoint::new(ij, 1));
        editor.delete_content(&mut range);
        assert_eq!(editor.html(), "<p>a</p><p>j</p>");
        assert!(range.is_collapsed());
    }

    #[test]
    fn test_insert_inline_splits_text() {
        let mut editor = make_editor("<p>abcd</p>");
        let text = text_in(&editor, &[0, 0]);
        let img = editor.dom_mut().create_element("img");
        let mut range = DomRange::collapsed_at(DomPoint::new(text, 2));
        editor.insert_inline(img, &mut range);
        assert_eq!(editor.html(), "<p>ab<img>cd</p>");
        let p = text_in(&editor, &[0]);
        assert_eq!(range.start, DomPoint::new(p, 2));
    }

    #[test]
    fn test_insert_block_splits_paragraph() {
        let mut editor = make_editor("<p>abcd</p>");
        let text = text_in(&editor, &[0, 0]);
        let hr = editor.dom_mut().create_element("hr");
        let mut range = DomRange::collapsed_at(DomPoint::new(text, 2));
        editor.insert_block(hr, &mut range, |_, block| block);
        assert_eq!(editor.html(), "<p>ab</p><hr><p>cd</p>");
        assert_eq!(range.start, DomPoint::new(editor.container(), 2));
    }

    #[test]
    fn test_insert_block_replaces_empty_paragraph() {
        let mut editor = make_editor("<p><br></p>");
        let p = text_in(&editor, &[0]);
        let hr = editor.dom_mut().create_element("hr");
        let mut range = DomRange::collapsed_at(DomPoint::new(p, 0));
        editor.insert_block(hr, &mut range, |_, block| block);
        assert_eq!(editor.html(), "<hr>");
    }

    #[test]
    fn test_insert_block_at_container_point() {
        let mut editor = make_editor("<p>a</p>");
        let hr = editor.dom_mut().create_element("hr");
        let mut range = DomRange::collapsed_at(DomPoint::new(editor.container(), 1));
        editor.insert_block(hr, &mut range, |_, block| block);
        assert_eq!(editor.html(), "<p>a</p><hr>");
    }

    #[test]
    fn test_events_are_queued_in_order() {
        let mut editor = make_editor("");
        editor.notify(EditorEvent::Focus);
        editor.notify(EditorEvent::SelectionChange);
        assert_eq!(editor.take_events(), vec![EditorEvent::Focus, EditorEvent::SelectionChange]);
        assert!(editor.events().is_empty());
    }
}
