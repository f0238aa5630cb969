//! Minimal selector matching.
//!
//! Supports comma-separated lists of compound selectors built from a tag (or
//! `*`), `.class`, `#id`, `[attr]` and `[attr=value]`. Combinators are not
//! supported and make the whole selector unparseable.

use smol_str::SmolStr;

use super::{Dom, NodeId};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<SmolStr>,
    id: Option<SmolStr>,
    classes: Vec<SmolStr>,
    attrs: Vec<(SmolStr, Option<String>)>,
}

impl Compound {
    fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        let Some(name) = dom.name(node) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|tag| tag != name) {
            return false;
        }
        if let Some(id) = &self.id
            && dom.attr(node, "id") != Some(id.as_str())
        {
            return false;
        }
        if !self.classes.iter().all(|class| dom.has_class(node, class)) {
            return false;
        }
        self.attrs.iter().all(|(attr, value)| match value {
            Some(value) => dom.attr(node, attr) == Some(value.as_str()),
            None => dom.has_attr(node, attr),
        })
    }
}

/// A parsed selector list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Compound>,
}

impl Selector {
    pub fn parse(input: &str) -> Option<Self> {
        let alternatives = input
            .split(',')
            .map(|part| parse_compound(part.trim()))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { alternatives })
    }

    pub fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        self.alternatives.iter().any(|c| c.matches(dom, node))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(input: &str) -> (&str, &str) {
    let end = input
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    input.split_at(end)
}

fn parse_compound(input: &str) -> Option<Compound> {
    if input.is_empty() {
        return None;
    }
    let mut compound = Compound::default();
    let mut rest = input;

    if let Some(after) = rest.strip_prefix('*') {
        rest = after;
    } else {
        let (tag, after) = take_ident(rest);
        if !tag.is_empty() {
            compound.tag = Some(SmolStr::new(tag.to_ascii_lowercase()));
            rest = after;
        }
    }

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let (class, after) = take_ident(after);
            if class.is_empty() {
                return None;
            }
            compound.classes.push(SmolStr::new(class));
            rest = after;
        } else if let Some(after) = rest.strip_prefix('#') {
            let (id, after) = take_ident(after);
            if id.is_empty() {
                return None;
            }
            compound.id = Some(SmolStr::new(id));
            rest = after;
        } else if let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']')?;
            let inner = after[..close].trim();
            rest = &after[close + 1..];
            let (name, value) = match inner.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim();
                    let value = value
                        .strip_prefix('"')
                        .and_then(|v| v.strip_suffix('"'))
                        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                        .unwrap_or(value);
                    (name.trim(), Some(value.to_string()))
                }
                None => (inner, None),
            };
            if name.is_empty() || !name.chars().all(is_ident_char) {
                return None;
            }
            compound.attrs.push((SmolStr::new(name.to_ascii_lowercase()), value));
        } else {
            // Combinators, pseudo-classes and anything else.
            return None;
        }
    }
    Some(compound)
}
