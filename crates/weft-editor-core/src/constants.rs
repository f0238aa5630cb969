//! Attribute names and values making up the card DOM contract.

/// Registered card name on a materialised card root.
pub const CARD_KEY: &str = "data-card-key";
/// `inline` or `block` on a card root (and on pending markers).
pub const CARD_TYPE_KEY: &str = "data-card-type";
/// Encoded card value, see [`crate::card::encode_card_value`].
pub const CARD_VALUE_KEY: &str = "data-card-value";
/// Zone marker inside a card: `body`, `left`, `center` or `right`.
pub const CARD_ELEMENT_KEY: &str = "data-card-element";
/// Card name on a pending marker awaiting materialisation.
pub const READY_CARD_KEY: &str = "data-ready-card";

pub const CARD_SELECTOR: &str = "[data-card-key]";
pub const READY_CARD_SELECTOR: &str = "[data-ready-card]";

/// Prefix shared by all card bookkeeping attributes.
pub const CARD_ATTRIBUTE_PREFIX: &str = "data-card";

/// Role of an element inside the editor: `root`, `editable` or `ui`.
pub const DATA_ELEMENT: &str = "data-element";
pub const ROOT: &str = "root";
pub const EDITABLE: &str = "editable";
pub const UI: &str = "ui";

/// Marks nodes that exist only while editing and are never serialised as content.
pub const DATA_TRANSIENT_ELEMENT: &str = "data-transient-element";
/// Attributes on this element may change without being treated as content changes.
pub const DATA_TRANSIENT_ATTRIBUTES: &str = "data-transient-attributes";

/// Explicit node identity, used as the schema classification cache key.
pub const DATA_ID: &str = "data-id";

/// Caret anchor content on either side of a focusable card.
pub const ZERO_WIDTH_SPACE: char = '\u{200b}';

pub const CARD_SELECTED_CLASS: &str = "card-selected";
pub const CARD_ACTIVATED_CLASS: &str = "card-activated";
