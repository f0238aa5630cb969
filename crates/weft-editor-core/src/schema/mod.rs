//! Markup whitelist.
//!
//! A [`Schema`] holds rules for block, inline and mark elements plus
//! per-type global attributes. Rules are searched in priority order: the
//! more required attributes (then required styles) a rule declares, the
//! earlier it is tried, so `span[style=color]` wins over a bare `span`.

mod defaults;
mod rule;
mod value;

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use smol_str::{SmolStr, format_smolstr};

use crate::constants::DATA_ID;
use crate::dom::{Dom, NodeId};

pub use defaults::default_rules;
pub use rule::{SchemaAttributes, SchemaEntry, SchemaGlobal, SchemaRule, SchemaType};
pub use value::{SchemaMacro, SchemaValue, ValuePredicate, is_valid_url};

/// Rule predicate accepted by the lookup operations.
pub type RuleFilter<'a> = &'a dyn Fn(&SchemaRule) -> bool;

/// Registered rules by bucket.
#[derive(Clone, Debug, Default)]
pub struct SchemaData {
    pub blocks: Vec<Arc<SchemaRule>>,
    pub inlines: Vec<Arc<SchemaRule>>,
    pub marks: Vec<Arc<SchemaRule>>,
    pub globals: HashMap<SchemaType, SchemaAttributes>,
}

#[derive(Debug, Default)]
pub struct Schema {
    data: SchemaData,
    /// blocks ++ marks ++ inlines in priority order.
    all: Vec<Arc<SchemaRule>>,
    type_cache: RefCell<HashMap<SmolStr, Arc<SchemaRule>>>,
}

impl Clone for Schema {
    /// Independent copy. The classification cache starts empty.
    fn clone(&self) -> Self {
        let mut schema = Schema {
            data: self.data.clone(),
            all: Vec::new(),
            type_cache: RefCell::default(),
        };
        schema.reorder();
        schema
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// A schema preloaded with [`default_rules`].
    pub fn with_defaults() -> Self {
        let mut schema = Self::new();
        schema.add(default_rules());
        schema
    }

    pub fn data(&self) -> &SchemaData {
        &self.data
    }

    /// Rules in search order.
    pub fn rules(&self) -> &[Arc<SchemaRule>] {
        &self.all
    }

    /// Register rules and globals, then recompute the search order.
    ///
    /// A rule's constraint equal to the current global constraint for the
    /// same key is dropped from the rule. Rules with the same name coexist.
    pub fn add<I>(&mut self, entries: I)
    where
        I: IntoIterator,
        I::Item: Into<SchemaEntry>,
    {
        for entry in entries {
            match entry.into() {
                SchemaEntry::Rule(mut rule) => {
                    if let Some(global) = self.data.globals.get(&rule.schema_type) {
                        rule.attributes.prune_against(global);
                    }
                    tracing::trace!(
                        name = %rule.name,
                        kind = %rule.schema_type,
                        "schema rule added"
                    );
                    let bucket = match rule.schema_type {
                        SchemaType::Block => &mut self.data.blocks,
                        SchemaType::Inline => &mut self.data.inlines,
                        SchemaType::Mark => &mut self.data.marks,
                    };
                    bucket.push(Arc::new(rule));
                }
                SchemaEntry::Global(global) => {
                    tracing::trace!(kind = %global.schema_type, "schema global merged");
                    self.data
                        .globals
                        .entry(global.schema_type)
                        .or_default()
                        .merge(global.attributes);
                }
            }
        }
        self.reorder();
    }

    pub fn add_one(&mut self, entry: impl Into<SchemaEntry>) {
        self.add(std::iter::once(entry.into()));
    }

    fn reorder(&mut self) {
        let SchemaData {
            blocks,
            inlines,
            marks,
            ..
        } = &self.data;
        let mut all: Vec<_> = blocks.iter().chain(marks).chain(inlines).cloned().collect();
        // Stable: equal counts keep bucket order.
        all.sort_by_key(|rule| Reverse(rule.attributes.required_counts()));
        self.all = all;
    }

    /// All rules passing `pred`, in blocks, inlines, marks order.
    pub fn find(&self, pred: impl Fn(&SchemaRule) -> bool) -> Vec<Arc<SchemaRule>> {
        self.data
            .blocks
            .iter()
            .chain(&self.data.inlines)
            .chain(&self.data.marks)
            .filter(|rule| pred(rule))
            .cloned()
            .collect()
    }

    /// First rule in search order accepted by `filter` (default: same tag
    /// name) whose constraints the node satisfies.
    pub fn get_rule(
        &self,
        dom: &Dom,
        node: NodeId,
        filter: Option<RuleFilter<'_>>,
    ) -> Option<Arc<SchemaRule>> {
        let name = dom.name(node)?;
        let found = self.all.iter().find(|rule| {
            let accepted = match filter {
                Some(filter) => filter(rule),
                None => rule.name == name,
            };
            accepted && self.check_node(dom, node, &rule.attributes)
        });
        tracing::trace!(node = name, rule = ?found.map(|r| r.name.clone()), "schema lookup");
        found.cloned()
    }

    /// Memoised classification of an element.
    ///
    /// The cache key is the `data-id` prefix before the first `-`, or a hash
    /// of tag name and attributes. A cached entry is reused while it passes
    /// `filter`; entries are not invalidated when attributes change.
    pub fn get_type(
        &self,
        dom: &Dom,
        node: NodeId,
        filter: Option<RuleFilter<'_>>,
    ) -> Option<SchemaType> {
        if !dom.is_element(node) {
            return None;
        }
        let key = match dom.attr(node, DATA_ID) {
            Some(id) => SmolStr::new(id.split('-').next().unwrap_or(id)),
            None => format_smolstr!("{:x}", dom.hash_node(node)),
        };
        if let Some(rule) = self.type_cache.borrow().get(&key)
            && filter.is_none_or(|filter| filter(rule))
        {
            return Some(rule.schema_type);
        }
        let rule = self.get_rule(dom, node, filter)?;
        let schema_type = rule.schema_type;
        self.type_cache.borrow_mut().insert(key, rule);
        Some(schema_type)
    }

    /// Whether the node's attributes and inline styles satisfy `attributes`.
    pub fn check_node(&self, dom: &Dom, node: NodeId, attributes: &SchemaAttributes) -> bool {
        let node_styles = dom.css(node);
        let attrs_ok = attributes.attrs.iter().all(|(name, rule)| {
            name == "style" || rule.check(name, dom.attr(node, name))
        });
        attrs_ok
            && attributes.style.iter().all(|(name, rule)| {
                rule.check(name, node_styles.get(name.as_str()).map(String::as_str))
            })
    }

    /// Check one value against a constraint map. A name without a
    /// constraint fails.
    pub fn check_value(
        rules: &BTreeMap<SmolStr, SchemaValue>,
        name: &str,
        value: Option<&str>,
    ) -> bool {
        match rules.get(name) {
            Some(rule) => rule.check(name, value),
            None => false,
        }
    }

    /// Remove from `attributes` and `styles` every entry the node's best rule
    /// (merged with its type's globals) does not allow.
    ///
    /// Nothing is removed when no rule matches the node.
    pub fn filter(
        &self,
        dom: &Dom,
        node: NodeId,
        attributes: &mut BTreeMap<String, String>,
        styles: &mut BTreeMap<String, String>,
    ) {
        let Some(rule) = self.get_rule(dom, node, None) else {
            return;
        };
        let merged = rule
            .attributes
            .merged_with(self.data.globals.get(&rule.schema_type));
        attributes
            .retain(|name, value| Self::check_value(&merged.attrs, name, Some(value.as_str())));
        styles.retain(|name, value| Self::check_value(&merged.style, name, Some(value.as_str())));
    }

    /// Outermost block tag `name` can be nested into, following `allowIn`.
    pub fn closest(&self, name: &str) -> SmolStr {
        let mut visited = HashSet::new();
        self.closest_inner(SmolStr::new(name), &mut visited)
    }

    fn closest_inner(&self, name: SmolStr, visited: &mut HashSet<SmolStr>) -> SmolStr {
        if !visited.insert(name.clone()) {
            return name;
        }
        let mut top = name.clone();
        for block in self.data.blocks.iter().filter(|rule| rule.name == name) {
            if block.allow_in.is_empty() {
                continue;
            }
            for parent in &block.allow_in {
                if self.is_allow_in(parent, &top) {
                    top = parent.clone();
                }
            }
            top = self.closest_inner(top, visited);
        }
        top
    }

    /// Whether a `child` block may be nested inside a `parent` block.
    pub fn is_allow_in(&self, parent: &str, child: &str) -> bool {
        if parent == "p" {
            return false;
        }
        if child == "p" {
            return true;
        }
        self.data
            .blocks
            .iter()
            .filter(|rule| rule.name == child)
            .any(|rule| rule.allow_in.iter().any(|p| p == parent))
    }

    /// Tags that may contain child blocks, first-seen order.
    pub fn get_allow_in_tags(&self) -> Vec<SmolStr> {
        let mut tags: Vec<SmolStr> = Vec::new();
        for parent in self.data.blocks.iter().flat_map(|rule| &rule.allow_in) {
            if !tags.contains(parent) {
                tags.push(parent.clone());
            }
        }
        tags
    }

    /// Block tags whose adjacent siblings may be merged.
    pub fn get_can_merge_tags(&self) -> Vec<SmolStr> {
        let mut tags: Vec<SmolStr> = Vec::new();
        for rule in self.data.blocks.iter().filter(|rule| rule.can_merge) {
            if !tags.contains(&rule.name) {
                tags.push(rule.name.clone());
            }
        }
        tags
    }
}
