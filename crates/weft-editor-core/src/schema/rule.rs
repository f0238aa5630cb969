use std::collections::BTreeMap;

use serde::Deserialize;
use smol_str::SmolStr;

use super::value::SchemaValue;

/// Classification a rule assigns to the elements it matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Block,
    Inline,
    Mark,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Block => "block",
            SchemaType::Inline => "inline",
            SchemaType::Mark => "mark",
        }
    }
}

impl std::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute constraints plus the nested inline-style constraints.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SchemaAttributes {
    #[serde(default)]
    pub style: BTreeMap<SmolStr, SchemaValue>,
    #[serde(flatten)]
    pub attrs: BTreeMap<SmolStr, SchemaValue>,
}

impl SchemaAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: impl Into<SmolStr>, value: impl Into<SchemaValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn style(mut self, name: impl Into<SmolStr>, value: impl Into<SchemaValue>) -> Self {
        self.style.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty() && self.style.is_empty()
    }

    /// Number of required attributes and required styles.
    pub fn required_counts(&self) -> (usize, usize) {
        let count = |map: &BTreeMap<SmolStr, SchemaValue>| {
            map.values().filter(|v| v.is_required()).count()
        };
        (count(&self.attrs), count(&self.style))
    }

    /// Drop every entry whose constraint equals the global one for the same key.
    pub fn prune_against(&mut self, global: &SchemaAttributes) {
        self.attrs
            .retain(|key, value| global.attrs.get(key) != Some(&*value));
        self.style
            .retain(|key, value| global.style.get(key) != Some(&*value));
    }

    /// Merge `other` into `self`; `other` wins on conflicting keys.
    pub fn merge(&mut self, other: SchemaAttributes) {
        self.attrs.extend(other.attrs);
        self.style.extend(other.style);
    }

    /// These constraints with `globals` layered on top; global keys win.
    pub fn merged_with(&self, globals: Option<&SchemaAttributes>) -> SchemaAttributes {
        let mut merged = self.clone();
        if let Some(globals) = globals {
            merged.merge(globals.clone());
        }
        merged
    }
}

/// A named markup rule.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRule {
    pub name: SmolStr,
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(default)]
    pub attributes: SchemaAttributes,
    /// Parent block tags this block may be nested in.
    #[serde(default)]
    pub allow_in: Vec<SmolStr>,
    /// Adjacent blocks of this tag may be merged.
    #[serde(default)]
    pub can_merge: bool,
    #[serde(default)]
    pub is_void: bool,
}

impl SchemaRule {
    pub fn new(name: impl Into<SmolStr>, schema_type: SchemaType) -> Self {
        Self {
            name: name.into(),
            schema_type,
            attributes: SchemaAttributes::default(),
            allow_in: Vec::new(),
            can_merge: false,
            is_void: false,
        }
    }

    pub fn block(name: impl Into<SmolStr>) -> Self {
        Self::new(name, SchemaType::Block)
    }

    pub fn inline(name: impl Into<SmolStr>) -> Self {
        Self::new(name, SchemaType::Inline)
    }

    pub fn mark(name: impl Into<SmolStr>) -> Self {
        Self::new(name, SchemaType::Mark)
    }

    pub fn with_attributes(mut self, attributes: SchemaAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn allow_in<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.allow_in = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn can_merge(mut self, can_merge: bool) -> Self {
        self.can_merge = can_merge;
        self
    }

    pub fn void(mut self) -> Self {
        self.is_void = true;
        self
    }
}

/// Attributes shared by every rule of one type.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SchemaGlobal {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    pub attributes: SchemaAttributes,
}

impl SchemaGlobal {
    pub fn new(schema_type: SchemaType, attributes: SchemaAttributes) -> Self {
        Self {
            schema_type,
            attributes,
        }
    }
}

/// Anything `Schema::add` accepts.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SchemaEntry {
    Rule(SchemaRule),
    Global(SchemaGlobal),
}

impl From<SchemaRule> for SchemaEntry {
    fn from(rule: SchemaRule) -> Self {
        SchemaEntry::Rule(rule)
    }
}

impl From<SchemaGlobal> for SchemaEntry {
    fn from(global: SchemaGlobal) -> Self {
        SchemaEntry::Global(global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaMacro;

    #[test]
    fn test_required_counts() {
        let attrs = SchemaAttributes::new()
            .attr("href", SchemaValue::required("@url"))
            .attr("title", "*")
            .style("color", SchemaValue::required("@color"))
            .style("font-size", SchemaValue::required("@length"));
        assert_eq!(attrs.required_counts(), (1, 2));
    }

    #[test]
    fn test_prune_against_global() {
        let global = SchemaAttributes::new()
            .attr("data-id", "*")
            .style("color", "@color");
        let mut attrs = SchemaAttributes::new()
            .attr("data-id", "*")
            .attr("href", "@url")
            .style("color", "red");
        attrs.prune_against(&global);
        assert!(!attrs.attrs.contains_key("data-id"));
        assert!(attrs.attrs.contains_key("href"));
        // Different constraint for the same key is kept.
        assert_eq!(attrs.style.get("color"), Some(&SchemaValue::parse("red")));
    }

    #[test]
    fn test_merged_with_global_keys_win() {
        let globals = SchemaAttributes::new()
            .attr("data-id", "*")
            .attr("align", "left")
            .style("padding-left", "@length");
        let own = SchemaAttributes::new()
            .attr("align", SchemaValue::one_of(["left", "right"]))
            .style("color", "@color");
        let merged = own.merged_with(Some(&globals));
        assert_eq!(merged.attrs.len(), 2);
        assert_eq!(merged.attrs.get("align"), Some(&SchemaValue::from("left")));
        assert_eq!(merged.style.len(), 2);
        assert_eq!(
            merged.style.get("padding-left"),
            Some(&SchemaValue::Macro(SchemaMacro::Length))
        );
    }

    #[test]
    fn test_deserialize_entries() {
        let entries: Vec<SchemaEntry> = serde_json::from_str(
            r#"[
                {"name": "li", "type": "block", "allowIn": ["ul", "ol"]},
                {"type": "block", "attributes": {"data-id": "*", "style": {"text-align": ["left", "center"]}}},
                {"name": "span", "type": "mark", "attributes": {"style": {"color": {"required": true, "value": "@color"}}}}
            ]"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 3);
        match &entries[0] {
            SchemaEntry::Rule(rule) => {
                assert_eq!(rule.name, "li");
                assert_eq!(rule.allow_in, vec![SmolStr::new("ul"), SmolStr::new("ol")]);
            }
            other => panic!("expected rule, got {other:?}"),
        }
        match &entries[1] {
            SchemaEntry::Global(global) => {
                assert_eq!(global.schema_type, SchemaType::Block);
                assert_eq!(global.attributes.attrs.get("data-id"), Some(&SchemaValue::Any));
                assert!(global.attributes.style.contains_key("text-align"));
            }
            other => panic!("expected global, got {other:?}"),
        }
        match &entries[2] {
            SchemaEntry::Rule(rule) => assert_eq!(rule.attributes.required_counts(), (0, 1)),
            other => panic!("expected rule, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = serde_json::from_str::<SchemaEntry>(r#"{"name": "x", "type": "table"}"#);
        assert!(result.is_err());
    }
}
