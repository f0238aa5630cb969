//! Card registry.
//!
//! Cards are embedded widgets living inside the editable surface. The
//! [`CardModel`] owns every mounted [`CardInstance`], materialises pending
//! card markers, and drives activation and selection while keeping the
//! DOM, the editor selection and its own list consistent.
//!
//! At most one card is active at a time. Activating another card first
//! deactivates the current one within the same call, so observers never see
//! two active cards.

mod entry;
mod instance;
mod value;


use std::collections::HashMap;

use smol_str::{SmolStr, format_smolstr};

pub use entry::{Card, CardContent, CardContext, CardEntry};
pub use instance::{CardInstance, CardToolbar, CardZones};
pub use value::{CardValue, decode_card_value, encode_card_value};

use crate::constants::{
    CARD_ATTRIBUTE_PREFIX, CARD_ELEMENT_KEY, CARD_KEY, CARD_TYPE_KEY, CARD_VALUE_KEY,
    DATA_ELEMENT, DATA_TRANSIENT_ATTRIBUTES, DATA_TRANSIENT_ELEMENT, EDITABLE, READY_CARD_KEY,
    READY_CARD_SELECTOR, ROOT, ZERO_WIDTH_SPACE,
};
use crate::document::EditorDocument;
use crate::dom::{Dom, NodeId};
use crate::error::CardError;
use crate::range::{DomPoint, DomRange};
use crate::types::{ActiveTrigger, CardType, EditorEvent, PointerPosition};
use value::value_id;

/// How to look a card up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardSelector {
    /// By card id.
    Id(SmolStr),
    /// By a node at or inside the card.
    Node(NodeId),
}

impl From<NodeId> for CardSelector {
    fn from(node: NodeId) -> Self {
        CardSelector::Node(node)
    }
}

impl From<&str> for CardSelector {
    fn from(id: &str) -> Self {
        CardSelector::Id(SmolStr::new(id))
    }
}

impl From<SmolStr> for CardSelector {
    fn from(id: SmolStr) -> Self {
        CardSelector::Id(id)
    }
}

/// Options for [`CardModel::create`].
#[derive(Clone, Debug, Default)]
pub struct CreateOptions {
    pub value: Option<CardValue>,
    /// Existing element to build the card in. It is emptied first.
    pub root: Option<NodeId>,
}

fn is_root_element(dom: &Dom, node: NodeId) -> bool {
    dom.attr(node, DATA_ELEMENT) == Some(ROOT)
}

fn is_editable_element(dom: &Dom, node: NodeId) -> bool {
    matches!(dom.attr(node, DATA_ELEMENT), Some(ROOT) | Some(EDITABLE))
}

/// Outermost block around `block` that is still below an editable element.
fn outermost_block<D: EditorDocument>(editor: &D, block: NodeId) -> NodeId {
    let dom = editor.dom();
    let mut container = block;
    let mut block_parent = dom.parent(container);
    while let Some(parent) = block_parent {
        if is_editable_element(dom, parent) {
            break;
        }
        container = parent;
        match dom.parent(parent) {
            Some(grand) if editor.is_block(grand) => block_parent = Some(grand),
            _ => break,
        }
    }
    container
}

/// Registry of card descriptors and mounted cards.
#[derive(Debug, Default)]
pub struct CardModel {
    classes: HashMap<SmolStr, CardEntry>,
    components: Vec<CardInstance>,
    next_id: u64,
}

impl CardModel {
    pub fn new() -> Self {
        Self::default()
    }

    // === Registration ===

    /// Register descriptors, replacing any with the same name.
    pub fn init(&mut self, entries: impl IntoIterator<Item = CardEntry>) {
        for entry in entries {
            self.add(entry);
        }
    }

    pub fn add(&mut self, entry: CardEntry) {
        tracing::debug!(name = %entry.name, card_type = %entry.card_type, "card registered");
        self.classes.insert(entry.name.clone(), entry);
    }

    pub fn entry(&self, name: &str) -> Option<&CardEntry> {
        self.classes.get(name)
    }

    // === Queries ===

    /// The activated card, if any.
    pub fn active(&self) -> Option<&CardInstance> {
        self.components.iter().find(|card| card.activated)
    }

    fn active_index(&self) -> Option<usize> {
        self.components.iter().position(|card| card.activated)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardInstance> {
        self.components.iter()
    }

    /// Visit mounted cards in order until `f` returns `false`.
    pub fn each(&self, mut f: impl FnMut(&CardInstance, usize) -> bool) {
        for (index, card) in self.components.iter().enumerate() {
            if !f(card, index) {
                break;
            }
        }
    }

    /// Mounted card by root node.
    pub fn get(&self, root: NodeId) -> Option<&CardInstance> {
        self.components.iter().find(|card| card.root() == root)
    }

    fn index_of_root(&self, root: NodeId) -> Option<usize> {
        self.components.iter().position(|card| card.root() == root)
    }

    /// Card root at or above `node`.
    ///
    /// The walk stops at the first editable element (or only at the editor
    /// root with `ignore_editable`), so nodes inside an editable island do
    /// not resolve to the card hosting the island.
    pub fn closest(&self, dom: &Dom, node: NodeId, ignore_editable: bool) -> Option<NodeId> {
        let mut current = node;
        loop {
            if dom.has_attr(current, CARD_KEY) {
                return Some(current);
            }
            let stop = if ignore_editable {
                is_root_element(dom, current)
            } else {
                is_editable_element(dom, current)
            };
            if stop {
                return None;
            }
            current = dom.parent(current)?;
        }
    }

    fn position(&self, dom: &Dom, selector: &CardSelector, ignore_editable: bool) -> Option<usize> {
        match selector {
            CardSelector::Id(id) => self.components.iter().position(|card| card.id() == id),
            CardSelector::Node(node) => {
                let card_node = self.closest(dom, *node, ignore_editable)?;
                let card_id = dom
                    .attr(card_node, CARD_VALUE_KEY)
                    .map(decode_card_value)
                    .and_then(|value| value_id(&value).map(SmolStr::new));
                self.components
                    .iter()
                    .position(|card| card.root() == card_node)
                    .or_else(|| {
                        let card_id = card_id?;
                        self.components.iter().position(|card| *card.id() == card_id)
                    })
            }
        }
    }

    /// Mounted card matching `selector`.
    pub fn find(
        &self,
        dom: &Dom,
        selector: impl Into<CardSelector>,
        ignore_editable: bool,
    ) -> Option<&CardInstance> {
        let index = self.position(dom, &selector.into(), ignore_editable)?;
        self.components.get(index)
    }

    fn find_block_index(&self, dom: &Dom, node: NodeId) -> Option<usize> {
        let parent = dom.parent(node)?;
        let index = self.position(dom, &CardSelector::Node(parent), false)?;
        let card = &self.components[index];
        if card.card_type() == CardType::Block {
            Some(index)
        } else {
            self.find_block_index(dom, card.root())
        }
    }

    /// Nearest block card strictly enclosing `node`.
    pub fn find_block(&self, dom: &Dom, node: NodeId) -> Option<&CardInstance> {
        let index = self.find_block_index(dom, node)?;
        self.components.get(index)
    }

    /// The card containing the whole range, or the single card it selects.
    pub fn get_single_card(&self, dom: &Dom, range: &DomRange) -> Option<&CardInstance> {
        range
            .common_ancestor(dom)
            .and_then(|ancestor| self.find(dom, ancestor, false))
            .or_else(|| self.get_single_selected_card(dom, range))
    }

    /// The card a range selects when the range touches exactly one element
    /// and that element is a card root.
    pub fn get_single_selected_card(&self, dom: &Dom, range: &DomRange) -> Option<&CardInstance> {
        match range.find_elements_in_simple_range(dom).as_slice() {
            [node] if dom.has_attr(*node, CARD_KEY) => self.find(dom, *node, false),
            _ => None,
        }
    }

    fn generate_id(&mut self) -> SmolStr {
        loop {
            self.next_id += 1;
            let id = format_smolstr!("cd-{}", self.next_id);
            if !self.components.iter().any(|card| *card.id() == id) {
                return id;
            }
        }
    }

    // === Construction ===

    /// Build a card's DOM skeleton and plugin instance without mounting it.
    pub fn create<D: EditorDocument>(
        &mut self,
        editor: &mut D,
        name: &str,
        options: CreateOptions,
    ) -> Result<CardInstance, CardError> {
        let entry = self
            .classes
            .get(name)
            .cloned()
            .ok_or_else(|| CardError::NotFound {
                name: SmolStr::new(name),
            })?;
        let card_type = entry.card_type()?;
        let readonly = !editor.is_engine() || editor.readonly();
        let value = options.value.unwrap_or_default();
        // Copied markup carries the id of the card it came from.
        let id = match value_id(&value) {
            Some(id) if !self.components.iter().any(|card| card.id() == id) => SmolStr::new(id),
            Some(id) => {
                let fresh = self.generate_id();
                tracing::debug!(name, duplicate = id, id = %fresh, "card id already mounted");
                fresh
            }
            None => self.generate_id(),
        };

        let dom = editor.dom_mut();
        let tag = card_type.tag_name();
        let root = match options.root {
            Some(root) => {
                dom.empty(root);
                root
            }
            None => dom.create_element(tag),
        };
        dom.set_attr(root, CARD_TYPE_KEY, card_type.as_str());
        dom.set_attr(root, CARD_KEY, name);

        let focusable = entry.focus.unwrap_or(!readonly);
        let plugin = entry.build();
        let has_islands = !plugin.contenteditable().is_empty();

        let center = dom.create_element(tag);
        if has_islands {
            dom.set_attr(center, DATA_TRANSIENT_ATTRIBUTES, "*");
        }
        dom.set_attr(center, CARD_ELEMENT_KEY, "center");
        if focusable {
            dom.set_attr(center, "contenteditable", "false");
        } else {
            dom.set_attr(root, "contenteditable", "false");
        }

        let body = dom.create_element(tag);
        dom.set_attr(body, CARD_ELEMENT_KEY, "body");
        let (left, right) = if focusable {
            let mut anchor = |side: &str| {
                let span = dom.create_element("span");
                dom.set_attr(span, CARD_ELEMENT_KEY, side);
                dom.set_attr(span, DATA_TRANSIENT_ELEMENT, "true");
                let text = dom.create_text(ZERO_WIDTH_SPACE.to_string());
                dom.append_child(span, text);
                span
            };
            let left = anchor("left");
            let right = anchor("right");
            dom.append_child(body, left);
            dom.append_child(body, center);
            dom.append_child(body, right);
            (Some(left), Some(right))
        } else {
            dom.append_child(body, center);
            (None, None)
        };
        dom.append_child(root, body);

        let zones = CardZones {
            body,
            left,
            center,
            right,
        };
        let mut card = CardInstance::new(entry, card_type, plugin, root, zones, id, readonly);
        card.set_value(dom, value);
        card.with_plugin(dom, |plugin, cx| plugin.init(cx));
        tracing::debug!(name, id = %card.id(), %card_type, focusable, "card created");
        Ok(card)
    }

    /// Render plugin content into the center and mark editable islands.
    fn render_into_center(card: &mut CardInstance, dom: &mut Dom) {
        let center = card.center();
        match card.with_plugin(dom, |plugin, cx| plugin.render(cx)) {
            Some(CardContent::Html(html)) => {
                dom.append_html(center, &html);
            }
            Some(CardContent::Node(node)) => dom.append_child(center, node),
            None => {}
        }
        if !card.contenteditable().is_empty() {
            let selector = card.contenteditable().join(",");
            for island in dom.query_all(center, &selector) {
                dom.set_attr(island, "contenteditable", "true");
                dom.set_attr(island, DATA_ELEMENT, EDITABLE);
            }
        }
    }

    /// Full mount rendering: content, islands, `did_render`, toolbar.
    fn mount(card: &mut CardInstance, dom: &mut Dom) {
        Self::render_into_center(card, dom);
        card.with_plugin(dom, |plugin, cx| plugin.did_render(cx));
        if card.toolbar.is_none() {
            let items = card.with_plugin(dom, |plugin, _| plugin.toolbar());
            if !items.is_empty() {
                card.toolbar = Some(CardToolbar {
                    items,
                    visible: false,
                });
            }
        }
    }

    // === Mutation ===

    /// Mount `card` at `range`.
    ///
    /// Selected content is deleted first. Inline cards go in at the caret;
    /// block cards split the outermost enclosing block. Returns the card root.
    pub fn insert_node<D: EditorDocument>(
        &mut self,
        editor: &mut D,
        range: &mut DomRange,
        card: CardInstance,
    ) -> NodeId {
        let is_inline = card.card_type() == CardType::Inline;
        if !range.is_collapsed() && editor.is_engine() {
            editor.delete_content(range);
        }
        self.gc(editor.dom_mut());

        let root = card.root();
        if is_inline {
            editor.insert_inline(root, range);
        } else {
            editor.insert_block(root, range, outermost_block::<D>);
        }
        self.components.push(card);
        let index = self.components.len() - 1;
        self.components[index].focus(editor.dom(), range, false);

        // Block cards may not sit inside another block.
        if !is_inline
            && let Some(parent) = editor.dom().parent(root)
            && parent != editor.container()
            && editor.dom().contains(editor.container(), parent)
            && editor.is_block(parent)
        {
            editor.unwrap_block(parent);
        }

        let card = &mut self.components[index];
        Self::mount(card, editor.dom_mut());
        card.with_plugin(editor.dom_mut(), |plugin, cx| plugin.did_insert(cx));
        tracing::debug!(id = %card.id(), name = card.name(), "card inserted");
        root
    }

    /// Unmount the card rooted at `root` and detach it from the document.
    pub fn remove_node<D: EditorDocument>(&mut self, editor: &mut D, root: NodeId) {
        let Some(index) = self.index_of_root(root) else {
            return;
        };
        let mut card = self.components.remove(index);
        card.with_plugin(editor.dom_mut(), |plugin, cx| plugin.destroy(cx));
        if editor.is_engine() && card.card_type() == CardType::Block && card.is_activated() {
            editor.set_readonly(false);
        }
        editor.dom_mut().detach(root);
        tracing::debug!(id = %card.id(), name = card.name(), "card removed");
    }

    /// Re-render the card with a new value. Root and id are kept.
    pub fn update_node<D: EditorDocument>(
        &mut self,
        editor: &mut D,
        root: NodeId,
        value: CardValue,
    ) {
        let Some(index) = self.index_of_root(root) else {
            return;
        };
        let dom = editor.dom_mut();
        let card = &mut self.components[index];
        card.with_plugin(dom, |plugin, cx| plugin.destroy(cx));
        dom.empty(card.center());
        card.set_value(dom, value);
        Self::render_into_center(card, dom);
        card.with_plugin(dom, |plugin, cx| plugin.did_update(cx));
        tracing::debug!(id = %card.id(), "card updated");
    }

    /// Wrap `node` in a pending marker for card `name`, to be materialised by
    /// the next [`render`](Self::render). Returns the marker.
    pub fn replace_node<D: EditorDocument>(
        &self,
        editor: &mut D,
        node: NodeId,
        name: &str,
        value: Option<CardValue>,
    ) -> Result<NodeId, CardError> {
        let entry = self.classes.get(name).ok_or_else(|| CardError::NotFound {
            name: SmolStr::new(name),
        })?;
        let card_type = entry.card_type()?;
        let dom = editor.dom_mut();
        let marker = dom.create_element(card_type.tag_name());
        dom.set_attr(marker, CARD_TYPE_KEY, card_type.as_str());
        dom.set_attr(marker, READY_CARD_KEY, name);
        dom.set_attr(marker, CARD_VALUE_KEY, encode_card_value(&value.unwrap_or_default()));
        dom.insert_before(node, marker);
        dom.append_child(marker, node);
        Ok(marker)
    }

    // === Interaction ===

    /// Resolve the card for an interaction at `node` and make it the active one.
    ///
    /// Interactions in a nested editor are ignored. Caret anchors and nodes
    /// outside any card deactivate the current card. A card inside a block
    /// card resolves to the outer block card.
    pub fn activate<D: EditorDocument>(
        &mut self,
        editor: &mut D,
        node: NodeId,
        trigger: ActiveTrigger,
        position: Option<PointerPosition>,
    ) {
        if !editor.is_engine() {
            return;
        }
        let dom = editor.dom();
        if let Some(root) = dom.closest(node, |n| is_root_element(dom, n))
            && root != editor.container()
        {
            tracing::trace!(?node, "activation from a nested editor ignored");
            return;
        }

        let mut card = self.position(dom, &CardSelector::Node(node), false);
        let editable = dom.closest(node, |n| dom.attr(n, DATA_ELEMENT) == Some(EDITABLE));
        if card.is_none()
            && let Some(parent) = editable.and_then(|island| dom.parent(island))
        {
            card = self.position(dom, &CardSelector::Node(parent), false);
        }
        if let Some(index) = card
            && let Some(block) = self.find_block_index(dom, self.components[index].root())
        {
            card = Some(block);
        }
        if let Some(index) = card
            && self.components[index].is_cursor(dom, node)
        {
            card = None;
        }

        let active = self.active_index();
        let is_current = trigger != ActiveTrigger::UpdateCard
            && card.is_some()
            && card == active;
        tracing::trace!(?node, ?trigger, ?card, ?active, is_current, "card activation");

        if let Some(active) = active
            && !is_current
        {
            let previous = &mut self.components[active];
            if let Some(toolbar) = previous.toolbar.as_mut()
                && toolbar.visible
            {
                toolbar.visible = false;
                editor.notify(EditorEvent::ToolbarHidden {
                    id: previous.id().clone(),
                });
            }
            previous.activate(editor.dom_mut(), false);
            previous.select(editor.dom_mut(), false);
            editor.notify(EditorEvent::CardDeactivated {
                id: previous.id().clone(),
            });
            if previous.card_type() == CardType::Block {
                editor.set_readonly(false);
            }
        }

        let Some(index) = card else {
            return;
        };
        if self.components[index].activated_by_other {
            return;
        }
        let root = self.components[index].root();
        let card_type = self.components[index].card_type();

        if !is_current {
            let current = &mut self.components[index];
            if let Some(toolbar) = current.toolbar.as_mut() {
                toolbar.visible = true;
                editor.notify(EditorEvent::ToolbarShown {
                    id: current.id().clone(),
                    position,
                });
            }
            let auto_select = card_type == CardType::Inline
                && current.entry().auto_selected
                && (trigger != ActiveTrigger::Click || !current.is_readonly());
            if auto_select {
                self.select(editor, root);
            }
            let current = &mut self.components[index];
            current.activate(editor.dom_mut(), true);
            editor.notify(EditorEvent::CardActivated {
                id: current.id().clone(),
            });
        }

        if card_type == CardType::Block {
            self.components[index].select(editor.dom_mut(), false);
            // Outside an editable island the rest of the document is locked.
            editor.set_readonly(editable.is_none());
        }
        if !is_current && trigger == ActiveTrigger::MouseDown {
            editor.notify(EditorEvent::Focus);
        }
        editor.notify(EditorEvent::SelectionChange);
    }

    /// Select the card as one atomic unit among its siblings.
    ///
    /// Cards declared not single-selectable and activated block cards are
    /// left alone.
    pub fn select<D: EditorDocument>(&mut self, editor: &mut D, root: NodeId) {
        if !editor.is_engine() {
            return;
        }
        let Some(index) = self.index_of_root(root) else {
            return;
        };
        let card = &mut self.components[index];
        if !card.entry().single_selectable
            || (card.card_type() == CardType::Block && card.is_activated())
        {
            return;
        }
        let Some(range) = DomRange::select_node(editor.dom(), root) else {
            return;
        };
        editor.select_range(range);
        card.select(editor.dom_mut(), true);
    }

    /// Put the caret beside the card and activate it as if clicked.
    pub fn focus<D: EditorDocument>(&mut self, editor: &mut D, root: NodeId, to_start: bool) {
        if !editor.is_engine() {
            return;
        }
        let Some(index) = self.index_of_root(root) else {
            return;
        };
        let mut range = editor.range().unwrap_or_else(|| editor.safe_range());
        self.components[index].focus(editor.dom(), &mut range, to_start);
        editor.select_range(range);
        editor.set_readonly(false);
        self.activate(editor, range.start.node, ActiveTrigger::MouseDown, None);
        editor.notify(EditorEvent::SelectionChange);
        editor.scroll_into_view(root);
    }

    /// Create card `name` and mount it at the current selection.
    ///
    /// Cards with `auto_activate` are activated afterwards, which leaves
    /// inline cards atomically selected. Returns `Ok(None)` on a
    /// non-interactive document.
    pub fn insert<D: EditorDocument>(
        &mut self,
        editor: &mut D,
        name: &str,
        value: Option<CardValue>,
    ) -> Result<Option<NodeId>, CardError> {
        if !editor.is_engine() {
            return Ok(None);
        }
        let card = self.create(
            editor,
            name,
            CreateOptions {
                value,
                ..Default::default()
            },
        )?;
        let auto_activate = card.entry().auto_activate;
        let is_inline = card.card_type() == CardType::Inline;
        let mut range = editor.safe_range();
        let root = self.insert_node(editor, &mut range, card);
        if is_inline && let Some(card) = self.get(root) {
            card.focus(editor.dom(), &mut range, false);
        }
        editor.select_range(range);
        if auto_activate {
            self.activate(editor, root, ActiveTrigger::InsertCard, None);
        }
        editor.notify(EditorEvent::Change);
        Ok(Some(root))
    }

    /// Re-render a mounted card with a new value and put the caret after it.
    pub fn update<D: EditorDocument>(
        &mut self,
        editor: &mut D,
        selector: impl Into<CardSelector>,
        value: CardValue,
    ) {
        if !editor.is_engine() {
            return;
        }
        let Some(index) = self.position(editor.dom(), &selector.into(), false) else {
            return;
        };
        let root = self.components[index].root();
        self.update_node(editor, root, value);
        let mut range = editor.safe_range();
        if let Some(card) = self.get(root) {
            card.focus(editor.dom(), &mut range, false);
        }
        editor.select_range(range);
        editor.notify(EditorEvent::Change);
    }

    /// Remove a mounted card and repair the caret.
    ///
    /// A container left without content gets a placeholder: `<p><br></p>`
    /// in an editable element, `<br>` elsewhere.
    pub fn remove<D: EditorDocument>(&mut self, editor: &mut D, selector: impl Into<CardSelector>) {
        if !editor.is_engine() {
            return;
        }
        let mut range = editor.safe_range();
        let Some(index) = self.position(editor.dom(), &selector.into(), false) else {
            return;
        };
        let root = self.components[index].root();
        let parent = editor.dom().parent(root);
        let inline_index = editor.dom().index_of(root);
        if self.components[index].card_type() == CardType::Inline {
            if let (Some(parent), Some(at)) = (parent, inline_index) {
                range = DomRange::collapsed_at(DomPoint::new(parent, at));
            }
        } else {
            let card = &self.components[index];
            card.focus_prev_block(editor, &mut range, true);
        }

        self.remove_node(editor, root);

        if let Some(parent) = parent
            && editor.is_empty_node(parent)
        {
            let dom = editor.dom_mut();
            if is_editable_element(dom, parent) {
                dom.set_inner_html(parent, "<p><br></p>");
                if let Some(p) = dom.first_child(parent) {
                    range = DomRange::collapsed_at(DomPoint::new(p, dom.node_len(p)));
                }
            } else {
                dom.set_inner_html(parent, "<br>");
                range = DomRange::collapsed_at(DomPoint::new(parent, dom.node_len(parent)));
            }
        }
        editor.select_range(range);
        editor.notify(EditorEvent::Change);
    }

    // === Bulk ===

    /// Materialise cards found under `container`.
    ///
    /// Without a container only pending markers in the editor are handled.
    /// With one, mounted cards below it are rebuilt as well; a container that
    /// is itself a card root is rebuilt alone. Returns how many cards were
    /// mounted.
    pub fn render<D: EditorDocument>(
        &mut self,
        editor: &mut D,
        container: Option<NodeId>,
    ) -> Result<usize, CardError> {
        let dom = editor.dom();
        let nodes = match container {
            Some(container) if dom.has_attr(container, CARD_KEY) => vec![container],
            Some(container) => dom.query_all(container, "[data-ready-card],[data-card-key]"),
            None => dom.query_all(editor.container(), READY_CARD_SELECTOR),
        };
        self.gc(editor.dom_mut());

        let mut mounted = 0;
        for node in nodes {
            let dom = editor.dom();
            // Rebuilding an outer card may already have dropped this one.
            if !dom.is_attached(node) {
                continue;
            }
            let ready = dom
                .attr(node, READY_CARD_KEY)
                .filter(|name| !name.is_empty())
                .map(SmolStr::new);
            let key = dom
                .attr(node, CARD_KEY)
                .filter(|name| !name.is_empty())
                .map(SmolStr::new);
            let Some(name) = ready.clone().or_else(|| key.clone()) else {
                continue;
            };
            if !self.classes.contains_key(&name) {
                tracing::trace!(%name, "no card registered for marker");
                continue;
            }
            let value = dom.attr(node, CARD_VALUE_KEY).map(decode_card_value).unwrap_or_default();
            let attributes = dom.attrs(node).to_vec();

            if key.is_some()
                && let Some(index) = self.position(dom, &CardSelector::Node(node), false)
            {
                let mut stale = self.components.remove(index);
                stale.with_plugin(editor.dom_mut(), |plugin, cx| plugin.destroy(cx));
            }

            let mut card = self.create(
                editor,
                &name,
                CreateOptions {
                    value: Some(value),
                    root: key.is_some().then_some(node),
                },
            )?;
            let dom = editor.dom_mut();
            for (attr, value) in attributes {
                if attr.starts_with("data-")
                    && !attr.starts_with(CARD_ATTRIBUTE_PREFIX)
                    && attr.as_str() != READY_CARD_KEY
                {
                    dom.set_attr(card.root(), &attr, value);
                }
            }
            if ready.is_some() {
                dom.replace_with(node, card.root());
            }
            Self::mount(&mut card, dom);
            tracing::debug!(id = %card.id(), %name, "card rendered");
            self.components.push(card);
            mounted += 1;
        }
        Ok(mounted)
    }

    /// Evict cards whose root is no longer in the document, running their
    /// `destroy` hook. Returns how many were evicted.
    pub fn gc(&mut self, dom: &mut Dom) -> usize {
        let mut evicted = 0;
        let mut index = 0;
        while index < self.components.len() {
            if dom.is_attached(self.components[index].root()) {
                index += 1;
                continue;
            }
            let mut card = self.components.remove(index);
            card.with_plugin(dom, |plugin, cx| plugin.destroy(cx));
            tracing::debug!(id = %card.id(), name = card.name(), "card collected");
            evicted += 1;
        }
        evicted
    }
}
