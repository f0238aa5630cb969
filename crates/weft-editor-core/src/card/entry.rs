use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use super::value::CardValue;
use crate::dom::{Dom, NodeId};
use crate::error::CardError;
use crate::types::CardType;

/// What a card renders into its center zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardContent {
    /// Markup parsed and appended to the center.
    Html(String),
    /// A node the plugin built itself.
    Node(NodeId),
}

/// Everything a card hook may look at or touch.
pub struct CardContext<'a> {
    pub dom: &'a mut Dom,
    pub root: NodeId,
    pub center: NodeId,
    pub value: &'a CardValue,
    pub readonly: bool,
}

/// Plugin side of a card.
///
/// Every hook has a no-op default, so a plugin only implements what it
/// needs. Hooks run in this order over a card's life: `init` on creation,
/// `render` then `did_render` when mounted, `did_insert` after an
/// interactive insert, `render` then `did_update` on value changes and
/// `destroy` when the card leaves the registry.
pub trait Card: 'static {
    fn init(&mut self, _cx: &mut CardContext<'_>) {}

    fn render(&mut self, _cx: &mut CardContext<'_>) -> Option<CardContent> {
        None
    }

    fn did_render(&mut self, _cx: &mut CardContext<'_>) {}

    fn did_insert(&mut self, _cx: &mut CardContext<'_>) {}

    fn did_update(&mut self, _cx: &mut CardContext<'_>) {}

    fn destroy(&mut self, _cx: &mut CardContext<'_>) {}

    /// Selectors, relative to the center, of nested editable islands.
    fn contenteditable(&self) -> Vec<SmolStr> {
        Vec::new()
    }

    /// Toolbar items shown while the card is active. Empty means no toolbar.
    fn toolbar(&self) -> Vec<SmolStr> {
        Vec::new()
    }
}

type CardFactory = Arc<dyn Fn() -> Box<dyn Card> + Send + Sync>;

/// Registered card descriptor.
#[derive(Clone)]
pub struct CardEntry {
    pub name: SmolStr,
    /// Declared type, validated when a card is created.
    pub card_type: SmolStr,
    /// Whether the card gets caret anchors. `None` means "unless read-only".
    pub focus: Option<bool>,
    pub auto_selected: bool,
    pub auto_activate: bool,
    pub single_selectable: bool,
    factory: CardFactory,
}

impl CardEntry {
    pub fn new<F, C>(name: impl Into<SmolStr>, card_type: CardType, factory: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Card,
    {
        Self::declared(name, card_type.as_str(), factory)
    }

    /// Descriptor with a free-form type string, as read from plugin metadata.
    pub fn declared<F, C>(name: impl Into<SmolStr>, card_type: &str, factory: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Card,
    {
        Self {
            name: name.into(),
            card_type: SmolStr::new(card_type),
            focus: None,
            auto_selected: true,
            auto_activate: true,
            single_selectable: true,
            factory: Arc::new(move || -> Box<dyn Card> { Box::new(factory()) }),
        }
    }

    pub fn with_focus(mut self, focus: bool) -> Self {
        self.focus = Some(focus);
        self
    }

    pub fn with_auto_selected(mut self, auto_selected: bool) -> Self {
        self.auto_selected = auto_selected;
        self
    }

    pub fn with_auto_activate(mut self, auto_activate: bool) -> Self {
        self.auto_activate = auto_activate;
        self
    }

    pub fn with_single_selectable(mut self, single_selectable: bool) -> Self {
        self.single_selectable = single_selectable;
        self
    }

    pub fn card_type(&self) -> Result<CardType, CardError> {
        CardType::parse(&self.card_type).ok_or_else(|| CardError::UnsupportedType {
            name: self.name.clone(),
            card_type: self.card_type.clone(),
        })
    }

    pub(crate) fn build(&self) -> Box<dyn Card> {
        (self.factory)()
    }
}

impl fmt::Debug for CardEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardEntry")
            .field("name", &self.name)
            .field("card_type", &self.card_type)
            .field("focus", &self.focus)
            .field("auto_selected", &self.auto_selected)
            .field("auto_activate", &self.auto_activate)
            .field("single_selectable", &self.single_selectable)
            .finish_non_exhaustive()
    }
}
