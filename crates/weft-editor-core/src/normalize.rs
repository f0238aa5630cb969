//! Apply a [`Schema`] to a subtree.
//!
//! Elements without a rule are unwrapped (their children move up) except
//! for a short list of elements whose content is never text, which are
//! dropped whole. Elements with a rule keep only the attributes and styles
//! the rule, merged with its type's globals, accepts. Cards and pending card
//! markers are left alone: their content belongs to the card.

use std::collections::BTreeMap;

use crate::constants::{CARD_KEY, READY_CARD_KEY};
use crate::dom::{Dom, NodeData, NodeId};
use crate::schema::{Schema, SchemaAttributes};

/// Elements removed together with their content.
const DROP_WITH_CONTENT: &[&str] = &[
    "script", "style", "template", "noscript", "object", "embed", "head", "meta", "link", "title",
    "iframe",
];

/// What a [`normalize`] pass changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Elements replaced by their children.
    pub unwrapped: usize,
    /// Elements and comments removed with their content.
    pub dropped: usize,
    /// Attributes and style properties removed.
    pub filtered: usize,
}

/// Normalise everything below `root`. `root` itself is not touched.
pub fn normalize(schema: &Schema, dom: &mut Dom, root: NodeId) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    for child in dom.children(root).to_vec() {
        normalize_node(schema, dom, child, &mut report);
    }
    tracing::debug!(
        unwrapped = report.unwrapped,
        dropped = report.dropped,
        filtered = report.filtered,
        "normalized"
    );
    report
}

fn normalize_node(schema: &Schema, dom: &mut Dom, node: NodeId, report: &mut NormalizeReport) {
    let name = match dom.data(node) {
        NodeData::Text(_) | NodeData::Document => return,
        NodeData::Comment(_) => {
            dom.detach(node);
            report.dropped += 1;
            return;
        }
        NodeData::Element(el) => el.name.clone(),
    };
    if dom.has_attr(node, CARD_KEY) || dom.has_attr(node, READY_CARD_KEY) {
        return;
    }
    if DROP_WITH_CONTENT.contains(&name.as_str()) {
        tracing::trace!(%name, "dropping element");
        dom.detach(node);
        report.dropped += 1;
        return;
    }

    for child in dom.children(node).to_vec() {
        normalize_node(schema, dom, child, report);
    }

    let mut attributes = dom.attributes_map(node);
    let mut styles = dom.css(node);
    let (before_attrs, before_styles) = (attributes.len(), styles.len());

    if schema.get_rule(dom, node, None).is_some() {
        schema.filter(dom, node, &mut attributes, &mut styles);
    } else {
        // A same-named rule may still match once the offending values go.
        let candidates: Vec<SchemaAttributes> = schema
            .find(|rule| rule.name == name)
            .iter()
            .map(|rule| {
                rule.attributes
                    .merged_with(schema.data().globals.get(&rule.schema_type))
            })
            .collect();
        if candidates.is_empty() {
            unwrap(dom, node, &name, report);
            return;
        }
        attributes.retain(|key, value| {
            candidates
                .iter()
                .any(|c| Schema::check_value(&c.attrs, key, Some(value.as_str())))
        });
        styles.retain(|key, value| {
            candidates
                .iter()
                .any(|c| Schema::check_value(&c.style, key, Some(value.as_str())))
        });
    }

    write_back(dom, node, &attributes, &styles);
    report.filtered += (before_attrs - attributes.len()) + (before_styles - styles.len());

    if schema.get_rule(dom, node, None).is_none() {
        unwrap(dom, node, &name, report);
    }
}

fn unwrap(dom: &mut Dom, node: NodeId, name: &str, report: &mut NormalizeReport) {
    tracing::trace!(name, "unwrapping element without a rule");
    dom.unwrap(node);
    report.unwrapped += 1;
}

fn write_back(
    dom: &mut Dom,
    node: NodeId,
    attributes: &BTreeMap<String, String>,
    styles: &BTreeMap<String, String>,
) {
    let stale: Vec<String> = dom
        .attributes_map(node)
        .into_keys()
        .filter(|key| !attributes.contains_key(key))
        .collect();
    for key in stale {
        dom.remove_attr(node, &key);
    }
    if dom.css(node) != *styles {
        dom.set_css(node, styles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaRule, SchemaValue};

    fn run(schema: &Schema, html: &str) -> (String, NormalizeReport) {
        let mut dom = Dom::new();
        let root = dom.create_element("div");
        dom.append_child(dom.body(), root);
        dom.set_inner_html(root, html);
        let report = normalize(schema, &mut dom, root);
        (dom.inner_html(root), report)
    }

    #[test]
    fn test_unknown_elements_are_unwrapped() {
        let schema = Schema::with_defaults();
        let (html, report) = run(&schema, "<section><p>a<font>b</font></p></section>");
        insta::assert_snapshot!(html, @"<p>ab</p>");
        assert_eq!(report.unwrapped, 2);
    }

    #[test]
    fn test_dangerous_elements_are_dropped() {
        let schema = Schema::with_defaults();
        let (html, report) = run(
            &schema,
            "<p>a<script>alert(1)</script></p><!-- note --><style>p{}</style><p>b</p>",
        );
        insta::assert_snapshot!(html, @"<p>a</p><p>b</p>");
        assert_eq!(report.dropped, 3);
    }

    #[test]
    fn test_attributes_are_filtered() {
        let schema = Schema::with_defaults();
        let (html, report) = run(
            &schema,
            r#"<p data-id="p-1" class="x" style="text-align: center; color: red">t</p>"#,
        );
        insta::assert_snapshot!(html, @r#"<p data-id="p-1" style="text-align: center;">t</p>"#);
        assert_eq!(report.filtered, 2);
    }

    #[test]
    fn test_bad_link_keeps_element() {
        let schema = Schema::with_defaults();
        let (html, _) = run(
            &schema,
            r#"<p><a href="javascript:alert(1)" target="_blank">x</a></p>"#,
        );
        insta::assert_snapshot!(html, @r#"<p><a target="_blank">x</a></p>"#);
    }

    #[test]
    fn test_required_style_decides_span() {
        let schema = Schema::with_defaults();
        let (html, _) = run(
            &schema,
            r#"<p><span style="color: red; font-size: 12px">r</span><span style="font-size: 12px">s</span></p>"#,
        );
        insta::assert_snapshot!(html, @r#"<p><span style="color: red;">r</span>s</p>"#);
    }

    #[test]
    fn test_cards_are_skipped() {
        let schema = Schema::with_defaults();
        let (html, report) = run(
            &schema,
            r#"<div data-card-key="video" data-card-type="block"><section>x</section></div>"#,
        );
        insta::assert_snapshot!(html, @r#"<div data-card-key="video" data-card-type="block"><section>x</section></div>"#);
        assert_eq!(report, NormalizeReport::default());
    }

    #[test]
    fn test_custom_rule() {
        let mut schema = Schema::new();
        schema.add_one(SchemaRule::block("p"));
        schema.add_one(
            SchemaRule::mark("mark").with_attributes(
                SchemaAttributes::new()
                    .attr("data-color", SchemaValue::one_of(["yellow", "green"])),
            ),
        );
        let (html, _) = run(
            &schema,
            r#"<p><mark data-color="yellow">a</mark><mark data-color="red">b</mark></p>"#,
        );
        insta::assert_snapshot!(html, @r#"<p><mark data-color="yellow">a</mark><mark>b</mark></p>"#);
    }
}
