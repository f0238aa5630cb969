//! weft-editor-core: editor engine core without browser dependencies.
//!
//! This crate provides:
//! - `Dom` - an arena-backed document tree with HTML parsing and serialisation
//! - `Schema` - the prioritised markup whitelist used to validate and sanitise nodes
//! - `CardModel` - the registry of embedded card widgets and their lifecycle
//! - `EditorDocument` - the editor surface the registry drives, with `PlainEditor`
//!   as a field-backed implementation
//! - `ChangeEvents` - input and composition coalescing over a `Scheduler`

pub mod card;
pub mod config;
pub mod constants;
pub mod document;
pub mod dom;
pub mod error;
pub mod events;
pub mod normalize;
pub mod range;
pub mod schema;
pub mod types;

pub use card::{
    Card, CardContent, CardContext, CardEntry, CardInstance, CardModel, CardSelector,
    CardToolbar, CardValue, CreateOptions, decode_card_value, encode_card_value,
};
pub use config::EditorConfig;
pub use document::{EditorDocument, PlainEditor};
pub use dom::{Dom, NodeData, NodeId};
pub use error::{CardError, ConfigError, WeftError};
pub use events::{ChangeEvents, ManualScheduler, Scheduler, is_card_input};
pub use normalize::{NormalizeReport, normalize};
pub use range::{DomPoint, DomRange};
pub use schema::{
    Schema, SchemaAttributes, SchemaEntry, SchemaGlobal, SchemaMacro, SchemaRule, SchemaType,
    SchemaValue,
};
pub use smol_str::SmolStr;
pub use types::{ActiveTrigger, CardType, EditorEvent, PointerPosition};
