use super::{Dom, NodeData, NodeId};

/// Elements that never have children or an end tag.
pub fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

pub fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

pub fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

pub(super) fn write_node(dom: &Dom, id: NodeId, out: &mut String) {
    match dom.data(id) {
        NodeData::Document => {
            for child in dom.children(id) {
                write_node(dom, *child, out);
            }
        }
        NodeData::Text(text) => {
            let raw_parent = dom
                .parent(id)
                .and_then(|parent| dom.name(parent))
                .is_some_and(|name| matches!(name, "script" | "style"));
            if raw_parent {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attribute(value, out);
                out.push('"');
            }
            out.push('>');
            if is_void_element(&el.name) {
                return;
            }
            for child in dom.children(id) {
                write_node(dom, *child, out);
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_escaping() {
        let mut dom = Dom::new();
        let root = dom.create_element("div");
        dom.set_inner_html(root, r#"<p title="a &quot;b&quot;">1 &lt; 2 &amp; 3</p>"#);
        assert_eq!(
            dom.inner_html(root),
            r#"<p title="a &quot;b&quot;">1 &lt; 2 &amp; 3</p>"#
        );
    }

    #[test]
    fn test_void_elements_have_no_end_tag() {
        let mut dom = Dom::new();
        let root = dom.create_element("div");
        dom.set_inner_html(root, "<p>a<br/>b</p><hr>");
        assert_eq!(dom.inner_html(root), "<p>a<br>b</p><hr>");
    }

    #[test]
    fn test_comment_output() {
        let mut dom = Dom::new();
        let root = dom.create_element("div");
        dom.set_inner_html(root, "<!--x--><b></b>");
        assert_eq!(dom.inner_html(root), "<!--x--><b></b>");
    }
}
