//! Core editor types: card kinds, activation triggers and editor notifications.
//!
//! These types are shared between the card registry and whatever hosts the
//! editor surface.

use std::fmt;

use smol_str::SmolStr;

/// Placement of a card inside the document.
///
/// Inline cards sit inside text like an image glyph, block cards occupy a
/// whole block position and can lock the surrounding document while active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CardType {
    Inline,
    Block,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Inline => "inline",
            CardType::Block => "block",
        }
    }

    /// Parse a declared card type. Only `inline` and `block` exist.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inline" => Some(CardType::Inline),
            "block" => Some(CardType::Block),
            _ => None,
        }
    }

    /// Tag used for the root, body and center zone of a card of this type.
    pub fn tag_name(&self) -> &'static str {
        match self {
            CardType::Inline => "span",
            CardType::Block => "div",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CardType> for SmolStr {
    fn from(value: CardType) -> Self {
        SmolStr::new_static(value.as_str())
    }
}

/// What caused a card activation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ActiveTrigger {
    #[default]
    Manual,
    Click,
    MouseDown,
    InsertCard,
    /// Re-activation after the card's value changed. Never counts as "already active".
    UpdateCard,
    Custom,
}

/// Pointer location of the interaction that activated a card, used to place toolbars.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

/// Notifications the engine raises towards the host.
///
/// The host decides what to do with them (repaint toolbars, emit change
/// events, move browser focus); the engine only records the order.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    /// Focus should move into the editor surface.
    Focus,
    /// The selection changed and dependants should re-read it.
    SelectionChange,
    /// Document content changed.
    Change,
    CardActivated { id: SmolStr },
    CardDeactivated { id: SmolStr },
    ToolbarShown {
        id: SmolStr,
        position: Option<PointerPosition>,
    },
    ToolbarHidden { id: SmolStr },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_type_parse() {
        assert_eq!(CardType::parse("inline"), Some(CardType::Inline));
        assert_eq!(CardType::parse("block"), Some(CardType::Block));
        assert_eq!(CardType::parse("table"), None);
        assert_eq!(CardType::parse("Block"), None);
    }

    #[test]
    fn test_card_type_tag_name() {
        assert_eq!(CardType::Inline.tag_name(), "span");
        assert_eq!(CardType::Block.tag_name(), "div");
        assert_eq!(CardType::Block.to_string(), "block");
    }

    #[test]
    fn test_default_trigger() {
        assert_eq!(ActiveTrigger::default(), ActiveTrigger::Manual);
    }
}
