//! HTML serializer.
//!
//! Writes a [`Dom`] back out as markup. Attribute values are stringified
//! here for the first time: `true` and empty strings become bare attributes,
//! `false`, `null` and `undefined` drop the attribute.

use crate::dom::{Dom, NodeData, NodeId};
use crate::value::Value;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

const PRESERVING_ELEMENTS: &[&str] = &["pre", "textarea", "script", "style"];

/// Serialize the children of the tree's root.
pub fn serialize(dom: &Dom, collapse_whitespace: bool) -> String {
    let mut out = String::new();
    let root = dom.root();
    let sensitive = dom.node(root).whitespace_sensitive;
    for child in dom.children(root) {
        write_node(dom, child, collapse_whitespace, sensitive, false, &mut out);
    }
    out
}

fn write_node(
    dom: &Dom,
    id: NodeId,
    collapse: bool,
    inherited_sensitive: bool,
    raw_text: bool,
    out: &mut String,
) {
    let node = dom.node(id);
    let sensitive = inherited_sensitive || node.whitespace_sensitive;
    match &node.data {
        NodeData::Document => {
            for child in dom.children(id) {
                write_node(dom, child, collapse, sensitive, false, out);
            }
        }
        NodeData::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else if collapse && !sensitive {
                out.push_str(&escape_text(&collapse_whitespace(text)));
            } else {
                out.push_str(&escape_text(text));
            }
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::CData(text) => {
            out.push_str("<![CDATA[");
            out.push_str(text);
            out.push_str("]]>");
        }
        NodeData::ProcessingInstruction { target, data } => {
            out.push_str("<?");
            out.push_str(target);
            if !data.is_empty() {
                out.push(' ');
                out.push_str(data);
            }
            out.push_str("?>");
        }
        NodeData::Tag(tag) => {
            let name = tag.name.as_str();
            out.push('<');
            out.push_str(name);
            for (key, value) in &tag.attrs {
                write_attribute(key, value, out);
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&name) {
                return;
            }
            let sensitive = sensitive || PRESERVING_ELEMENTS.contains(&name);
            let raw_text = RAW_TEXT_ELEMENTS.contains(&name);
            for child in dom.children(id) {
                write_node(dom, child, collapse, sensitive, raw_text, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

fn write_attribute(key: &str, value: &Value, out: &mut String) {
    let text = match value {
        Value::Bool(false) | Value::Null | Value::Undefined => return,
        Value::Bool(true) => String::new(),
        other => other.to_display_string(),
    };
    out.push(' ');
    out.push_str(key);
    if !text.is_empty() {
        out.push_str("=\"");
        out.push_str(&escape_attribute(&text));
        out.push('"');
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
    out
}

fn escape_attribute(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            other => out.push(other),
        }
    }
    out
}

/// Replace every whitespace run with a single space.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_html;

    fn round_trip(html: &str, collapse: bool) -> String {
        serialize(&parse_html(html, "t.html").unwrap(), collapse)
    }

    #[test]
    fn test_void_and_raw_text_elements() {
        assert_eq!(round_trip("<p>a<br>b</p>", false), "<p>a<br>b</p>");
        assert_eq!(
            round_trip("<script>if (a < b) {}</script>", false),
            "<script>if (a < b) {}</script>"
        );
        assert_eq!(round_trip("<p>1 &lt; 2 &amp; 3</p>", false), "<p>1 &lt; 2 &amp; 3</p>");
    }

    #[test]
    fn test_attribute_values() {
        let mut dom = Dom::new();
        let mut tag = crate::dom::TagNode::element("input");
        tag.set_attr("disabled", Value::Bool(true));
        tag.set_attr("hidden", Value::Bool(false));
        tag.set_attr("value", Value::Number(3.0));
        tag.set_attr("title", "say \"hi\"");
        tag.set_attr("missing", Value::Undefined);
        let id = dom.create_tag(tag);
        dom.append(dom.root(), id).unwrap();
        assert_eq!(
            serialize(&dom, false),
            r#"<input disabled value="3" title="say &quot;hi&quot;">"#
        );
    }

    #[test]
    fn test_whitespace_collapsing_respects_sensitive_subtrees() {
        let html = "<div>a   b\n  c</div><pre>a   b</pre>";
        assert_eq!(round_trip(html, false), html);
        assert_eq!(round_trip(html, true), "<div>a b c</div><pre>a   b</pre>");
    }
}
