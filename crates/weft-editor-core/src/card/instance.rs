use std::fmt;

use smol_str::SmolStr;
use serde_json::Value;

use super::entry::{Card, CardContext, CardEntry};
use super::value::{CardValue, encode_card_value};
use crate::constants::{CARD_ACTIVATED_CLASS, CARD_SELECTED_CLASS, CARD_VALUE_KEY};
use crate::document::EditorDocument;
use crate::dom::{Dom, NodeId};
use crate::range::{DomPoint, DomRange};
use crate::types::CardType;

/// Structural zones of a mounted card.
///
/// `root > body > [left] center [right]`; the caret anchors only exist on
/// focusable cards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CardZones {
    pub body: NodeId,
    pub left: Option<NodeId>,
    pub center: NodeId,
    pub right: Option<NodeId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CardToolbar {
    pub items: Vec<SmolStr>,
    pub visible: bool,
}

/// A live card: the plugin object plus the registry's bookkeeping.
///
/// Identity is the root node.
pub struct CardInstance {
    entry: CardEntry,
    card_type: CardType,
    plugin: Box<dyn Card>,
    root: NodeId,
    zones: CardZones,
    id: SmolStr,
    value: CardValue,
    pub(crate) activated: bool,
    pub(crate) readonly: bool,
    /// Set when another collaborator holds this card active; activation
    /// requests are then ignored.
    pub activated_by_other: bool,
    selected: bool,
    pub(crate) toolbar: Option<CardToolbar>,
    contenteditable: Vec<SmolStr>,
}

impl CardInstance {
    pub(crate) fn new(
        entry: CardEntry,
        card_type: CardType,
        plugin: Box<dyn Card>,
        root: NodeId,
        zones: CardZones,
        id: SmolStr,
        readonly: bool,
    ) -> Self {
        let contenteditable = plugin.contenteditable();
        Self {
            entry,
            card_type,
            plugin,
            root,
            zones,
            id,
            value: CardValue::new(),
            activated: false,
            readonly,
            activated_by_other: false,
            selected: false,
            toolbar: None,
            contenteditable,
        }
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn entry(&self) -> &CardEntry {
        &self.entry
    }

    pub fn card_type(&self) -> CardType {
        self.card_type
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn zones(&self) -> CardZones {
        self.zones
    }

    pub fn center(&self) -> NodeId {
        self.zones.center
    }

    pub fn id(&self) -> &SmolStr {
        &self.id
    }

    pub fn value(&self) -> &CardValue {
        &self.value
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn is_focusable(&self) -> bool {
        self.zones.left.is_some()
    }

    pub fn toolbar(&self) -> Option<&CardToolbar> {
        self.toolbar.as_ref()
    }

    /// Selectors of the card's editable islands.
    pub fn contenteditable(&self) -> &[SmolStr] {
        &self.contenteditable
    }

    /// Replace the value, keeping the card id, and persist it on the root.
    pub fn set_value(&mut self, dom: &mut Dom, mut value: CardValue) {
        value.insert("id".to_string(), Value::String(self.id.to_string()));
        dom.set_attr(self.root, CARD_VALUE_KEY, encode_card_value(&value));
        self.value = value;
    }

    /// Zone node by its `data-card-element` name.
    pub fn find_by_key(&self, key: &str) -> Option<NodeId> {
        match key {
            "body" => Some(self.zones.body),
            "left" => self.zones.left,
            "center" => Some(self.zones.center),
            "right" => self.zones.right,
            _ => None,
        }
    }

    /// Put a collapsed caret beside the card, before it when `to_start`.
    ///
    /// Focusable cards take the caret inside their anchors; others get it
    /// directly before or after the root.
    pub fn focus(&self, dom: &Dom, range: &mut DomRange, to_start: bool) {
        let anchor = if to_start { self.zones.left } else { self.zones.right };
        let point = match anchor {
            Some(anchor) => match dom.first_child(anchor) {
                Some(text) if dom.is_text(text) => {
                    DomPoint::new(text, if to_start { 0 } else { dom.node_len(text) })
                }
                _ => DomPoint::new(anchor, if to_start { 0 } else { dom.node_len(anchor) }),
            },
            None if to_start => match DomPoint::before(dom, self.root) {
                Some(point) => point,
                None => return,
            },
            None => match DomPoint::after(dom, self.root) {
                Some(point) => point,
                None => return,
            },
        };
        *range = DomRange::collapsed_at(point);
    }

    /// Toggle the selected state and its class on the root.
    pub fn select(&mut self, dom: &mut Dom, selected: bool) {
        self.selected = selected;
        if selected {
            dom.add_class(self.root, CARD_SELECTED_CLASS);
        } else {
            dom.remove_class(self.root, CARD_SELECTED_CLASS);
        }
    }

    /// Toggle the activated state and its class on the root.
    pub fn activate(&mut self, dom: &mut Dom, activated: bool) {
        self.activated = activated;
        if activated {
            dom.add_class(self.root, CARD_ACTIVATED_CLASS);
        } else {
            dom.remove_class(self.root, CARD_ACTIVATED_CLASS);
        }
    }

    /// Whether `node` is inside one of the caret anchors.
    pub fn is_cursor(&self, dom: &Dom, node: NodeId) -> bool {
        [self.zones.left, self.zones.right]
            .into_iter()
            .flatten()
            .any(|anchor| dom.contains(anchor, node))
    }

    /// Move the caret to the end of the block before the card.
    ///
    /// Without a previous block the caret goes before the card, or into a
    /// fresh empty paragraph inserted there when `has_modify`.
    pub fn focus_prev_block<D: EditorDocument>(
        &self,
        editor: &mut D,
        range: &mut DomRange,
        has_modify: bool,
    ) {
        let prev = editor
            .dom()
            .prev_sibling(self.root)
            .filter(|prev| editor.is_block(*prev));
        if let Some(prev) = prev {
            let dom = editor.dom();
            let mut node = prev;
            while let Some(last) = dom.last_child(node) {
                node = last;
            }
            *range = DomRange::collapsed_at(DomPoint::new(node, dom.node_len(node)));
            return;
        }
        if has_modify {
            let dom = editor.dom_mut();
            let p = dom.create_element("p");
            let br = dom.create_element("br");
            dom.append_child(p, br);
            dom.insert_before(self.root, p);
            *range = DomRange::collapsed_at(DomPoint::new(p, 0));
        } else if let Some(point) = DomPoint::before(editor.dom(), self.root) {
            *range = DomRange::collapsed_at(point);
        }
    }

    /// Run a plugin hook with a context over this card.
    pub(crate) fn with_plugin<R>(
        &mut self,
        dom: &mut Dom,
        f: impl FnOnce(&mut dyn Card, &mut CardContext<'_>) -> R,
    ) -> R {
        let mut cx = CardContext {
            dom,
            root: self.root,
            center: self.zones.center,
            value: &self.value,
            readonly: self.readonly,
        };
        f(self.plugin.as_mut(), &mut cx)
    }
}

impl fmt::Debug for CardInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardInstance")
            .field("name", &self.entry.name)
            .field("card_type", &self.card_type)
            .field("root", &self.root)
            .field("id", &self.id)
            .field("activated", &self.activated)
            .field("selected", &self.selected)
            .field("readonly", &self.readonly)
            .finish_non_exhaustive()
    }
}
