//! Tolerant HTML fragment parser.
//!
//! Handles what pasted and stored editor content actually contains: nested
//! elements, quoted and bare attributes, void tags, comments and entities.
//! Mismatched end tags close back to the nearest matching open element and
//! stray ones are ignored. There is no tree-construction algorithm beyond that.

use smol_str::SmolStr;

use super::serialize::is_void_element;
use super::{Dom, NodeId};

/// Elements whose content is raw text up to the matching end tag.
fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style" | "textarea" | "title")
}

/// Parse `html` into detached nodes, returning the top-level ones in order.
pub fn parse_fragment(dom: &mut Dom, html: &str) -> Vec<NodeId> {
    let mut top: Vec<NodeId> = Vec::new();
    let mut open: Vec<NodeId> = Vec::new();
    let mut text = String::new();
    let mut rest = html;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            text.push_str(rest);
            break;
        };
        text.push_str(&rest[..lt]);
        rest = &rest[lt..];

        // Comment
        if let Some(body) = rest.strip_prefix("<!--") {
            flush_text(dom, &mut text, &mut top, &open);
            let (comment, after) = match body.find("-->") {
                Some(end) => (&body[..end], &body[end + 3..]),
                None => (body, ""),
            };
            let node = dom.create_comment(comment);
            attach(dom, &mut top, &open, node);
            rest = after;
            continue;
        }

        // Doctype and processing instructions are dropped.
        if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = match rest.find('>') {
                Some(end) => &rest[end + 1..],
                None => "",
            };
            continue;
        }

        // End tag
        if let Some(body) = rest.strip_prefix("</") {
            let Some(end) = body.find('>') else {
                text.push_str(rest);
                break;
            };
            let name = body[..end].trim().to_ascii_lowercase();
            rest = &body[end + 1..];
            if name.is_empty() || !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
                continue;
            }
            flush_text(dom, &mut text, &mut top, &open);
            if let Some(pos) = open
                .iter()
                .rposition(|node| dom.name(*node) == Some(name.as_str()))
            {
                open.truncate(pos);
            }
            continue;
        }

        // Start tag
        let starts_tag = rest[1..].starts_with(|c: char| c.is_ascii_alphabetic());
        if !starts_tag {
            text.push('<');
            rest = &rest[1..];
            continue;
        }
        let Some((tag, after)) = read_start_tag(&rest[1..]) else {
            // Unterminated tag: keep it as text.
            text.push_str(rest);
            break;
        };
        rest = after;
        flush_text(dom, &mut text, &mut top, &open);

        let node = dom.create_element(&tag.name);
        for (name, value) in tag.attrs {
            if !dom.has_attr(node, &name) {
                dom.set_attr(node, &name, value);
            }
        }
        attach(dom, &mut top, &open, node);

        let name = dom.name(node).unwrap_or_default().to_string();
        if is_void_element(&name) || tag.self_closing {
            continue;
        }
        if is_raw_text_element(&name) {
            let close = format!("</{name}");
            let end = find_ascii_case_insensitive(rest, &close).unwrap_or(rest.len());
            let raw = &rest[..end];
            if !raw.is_empty() {
                let value = if name == "textarea" || name == "title" {
                    decode_entities(raw)
                } else {
                    raw.to_string()
                };
                let child = dom.create_text(value);
                dom.append_child(node, child);
            }
            rest = &rest[end..];
            rest = match rest.find('>') {
                Some(gt) => &rest[gt + 1..],
                None => "",
            };
            continue;
        }
        open.push(node);
    }

    flush_text(dom, &mut text, &mut top, &open);
    top
}

fn attach(dom: &mut Dom, top: &mut Vec<NodeId>, open: &[NodeId], node: NodeId) {
    match open.last() {
        Some(parent) => dom.append_child(*parent, node),
        None => top.push(node),
    }
}

fn flush_text(dom: &mut Dom, text: &mut String, top: &mut Vec<NodeId>, open: &[NodeId]) {
    if text.is_empty() {
        return;
    }
    let node = dom.create_text(decode_entities(text));
    text.clear();
    attach(dom, top, open, node);
}

struct StartTag {
    name: String,
    attrs: Vec<(SmolStr, String)>,
    self_closing: bool,
}

/// Read a start tag after its `<`, returning the tag and the remaining input.
fn read_start_tag(input: &str) -> Option<(StartTag, &str)> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/'
    {
        i += 1;
    }
    let name = input[..i].to_ascii_lowercase();
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        match bytes[i] {
            b'>' => {
                return Some((
                    StartTag {
                        name,
                        attrs,
                        self_closing,
                    },
                    &input[i + 1..],
                ));
            }
            b'/' => {
                self_closing = true;
                i += 1;
                continue;
            }
            _ => {}
        }
        self_closing = false;

        let start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        if start == i {
            // Stray character such as a lone quote.
            i += 1;
            continue;
        }
        let attr_name = SmolStr::new(input[start..i].to_ascii_lowercase());

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() {
                return None;
            }
            let value = match bytes[i] {
                quote @ (b'"' | b'\'') => {
                    let value_start = i + 1;
                    let len = input[value_start..].find(quote as char)?;
                    i = value_start + len + 1;
                    &input[value_start..value_start + len]
                }
                _ => {
                    let value_start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    &input[value_start..i]
                }
            };
            attrs.push((attr_name, decode_entities(value)));
        } else {
            attrs.push((attr_name, String::new()));
        }
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

/// Decode the named entities editor markup uses plus numeric references.
///
/// Unknown entities are left as written.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            decode_entity(entity).map(|c| (c, end + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = entity.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> (Dom, Vec<NodeId>) {
        let mut dom = Dom::new();
        let nodes = parse_fragment(&mut dom, html);
        (dom, nodes)
    }

    #[test]
    fn test_parse_nested() {
        let (dom, nodes) = parse("<p>Hello <strong>world</strong>!</p>");
        assert_eq!(nodes.len(), 1);
        let p = nodes[0];
        assert_eq!(dom.name(p), Some("p"));
        assert_eq!(dom.children(p).len(), 3);
        assert_eq!(dom.text_content(p), "Hello world!");
    }

    #[test]
    fn test_parse_attributes() {
        let (dom, nodes) = parse(r#"<a href="/x?a=1&amp;b=2" target=_blank data-flag>t</a>"#);
        let a = nodes[0];
        assert_eq!(dom.attr(a, "href"), Some("/x?a=1&b=2"));
        assert_eq!(dom.attr(a, "target"), Some("_blank"));
        assert_eq!(dom.attr(a, "data-flag"), Some(""));
    }

    #[test]
    fn test_parse_void_and_self_closing() {
        let (dom, nodes) = parse("<p>a<br>b<img src=\"x.png\"/>c</p>");
        let p = nodes[0];
        let names: Vec<_> = dom.children(p).iter().map(|c| dom.name(*c)).collect();
        assert_eq!(names, vec![None, Some("br"), None, Some("img"), None]);
    }

    #[test]
    fn test_parse_comment_and_doctype() {
        let (dom, nodes) = parse("<!DOCTYPE html><!-- note --><p>x</p>");
        assert_eq!(nodes.len(), 2);
        assert!(matches!(dom.data(nodes[0]), super::super::NodeData::Comment(c) if c == " note "));
    }

    #[test]
    fn test_parse_mismatched_end_tags() {
        let (dom, nodes) = parse("<div><p>a</div><p>b</span></p>");
        assert_eq!(nodes.len(), 2);
        assert_eq!(dom.outer_html(nodes[0]), "<div><p>a</p></div>");
        assert_eq!(dom.outer_html(nodes[1]), "<p>b</p>");
    }

    #[test]
    fn test_parse_raw_text() {
        let (dom, nodes) = parse("<script>if (a < b) { x() }</script><p>ok</p>");
        assert_eq!(nodes.len(), 2);
        assert_eq!(dom.text_content(nodes[0]), "if (a < b) { x() }");
    }

    #[test]
    fn test_parse_stray_lt() {
        let (dom, nodes) = parse("1 < 2");
        assert_eq!(nodes.len(), 1);
        assert_eq!(dom.text(nodes[0]), Some("1 < 2"));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#65;&#x42; &unknown; &"), "a <b> AB &unknown; &");
        assert_eq!(decode_entities("&nbsp;"), "\u{a0}");
    }
}
