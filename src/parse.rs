//! HTML front end.
//!
//! Markup is parsed with html5ever and converted into a [`Dom`]. Two
//! pre-passes keep the parser from restructuring template markup:
//!
//! * self-closing custom tags (`<m-var a="1" />`) become open/close pairs,
//!   since HTML ignores the self-closing flag on non-void elements;
//! * `html`, `head` and `body` tags are renamed before parsing so fragments
//!   keep their own document tags exactly where they were written. The
//!   wrappers html5ever synthesizes are then flattened away.
//!
//! Bogus comments produced for `<?pi ?>` and `<![CDATA[ ]]>` are turned back
//! into processing instructions and CDATA nodes.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData as HtmlNode, RcDom};
use regex::{Captures, Regex};
use std::ops::Range;

use crate::dom::{Attributes, Dom, NodeData, NodeId, TagNode};
use crate::error::{CompileError, Result};
use crate::value::Value;

const DOC_TAG_PREFIX: &str = "m-doc-";

lazy_static! {
    static ref SELF_CLOSING_RE: Regex = Regex::new(
        r#"<([a-zA-Z][a-zA-Z0-9]*-[a-zA-Z0-9-]*)((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*/>"#
    )
    .unwrap();
    static ref DOC_TAG_RE: Regex = Regex::new(r"(?i)<(/?)(html|head|body)([\s/>])").unwrap();
    static ref DOC_TAG_RESTORE_RE: Regex = Regex::new(r"<(/?)m-doc-(html|head|body)").unwrap();
}

/// Byte ranges of markup the pre-passes must not touch: quoted attribute
/// values, comments and the raw text of `script` and `style`. Sorted and
/// disjoint.
fn protected_regions(html: &str) -> Vec<Range<usize>> {
    let bytes = html.as_bytes();
    let lower = html.to_ascii_lowercase();
    let mut regions = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        if lower[i..].starts_with("<!--") {
            let end = lower[i + 4..].find("-->").map_or(bytes.len(), |p| i + 4 + p + 3);
            regions.push(i..end);
            i = end;
            continue;
        }
        let closing = bytes.get(i + 1) == Some(&b'/');
        let name_start = i + 1 + usize::from(closing);
        if !bytes.get(name_start).is_some_and(u8::is_ascii_alphabetic) {
            i += 1;
            continue;
        }
        let mut j = name_start;
        while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'-') {
            j += 1;
        }
        let name = &lower[name_start..j];
        while j < bytes.len() && bytes[j] != b'>' {
            if let quote @ (b'"' | b'\'') = bytes[j] {
                let end = html[j + 1..]
                    .find(quote as char)
                    .map_or(bytes.len(), |p| j + 1 + p + 1);
                regions.push(j..end);
                j = end;
            } else {
                j += 1;
            }
        }
        i = (j + 1).min(bytes.len());
        if !closing && matches!(name, "script" | "style") {
            let close = format!("</{}", name);
            let end = lower[i..].find(&close).map_or(bytes.len(), |p| i + p);
            if end > i {
                regions.push(i..end);
            }
            i = end;
        }
    }
    regions
}

fn is_protected(regions: &[Range<usize>], pos: usize) -> bool {
    let idx = regions.partition_point(|r| r.end <= pos);
    regions.get(idx).is_some_and(|r| r.start <= pos)
}

/// Apply `replacement` to every match of `re` that starts in live markup.
fn rewrite_markup(re: &Regex, html: &str, replacement: &str) -> String {
    let regions = protected_regions(html);
    re.replace_all(html, |caps: &Captures| {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        if caps.get(0).is_some_and(|m| is_protected(&regions, m.start())) {
            return whole.to_string();
        }
        let mut out = String::new();
        caps.expand(replacement, &mut out);
        out
    })
    .to_string()
}

/// Convert self-closing custom tags into properly closed pairs.
fn convert_self_closing_tags(html: &str) -> String {
    rewrite_markup(&SELF_CLOSING_RE, html, "<${1}${2}></${1}>")
}

fn rename_document_tags(html: &str) -> String {
    let replacement = format!("<${{1}}{}${{2}}${{3}}", DOC_TAG_PREFIX);
    rewrite_markup(&DOC_TAG_RE, html, &replacement)
}

fn restore_document_tags(text: &str) -> String {
    DOC_TAG_RESTORE_RE.replace_all(text, "<${1}${2}").to_string()
}

/// Parse markup into a tree. `path` identifies the resource in errors.
pub fn parse_html(text: &str, path: &str) -> Result<Dom> {
    let source = rename_document_tags(&convert_self_closing_tags(text));
    let parsed = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut source.as_bytes())
        .map_err(|e| CompileError::structure(path, "#document", format!("failed to parse HTML: {}", e)))?;

    let mut dom = Dom::new();
    let root = dom.root();
    convert_children(&parsed.document, &mut dom, root, path)?;
    Ok(dom)
}

fn convert_children(handle: &Handle, dom: &mut Dom, parent: NodeId, path: &str) -> Result<()> {
    for child in handle.children.borrow().iter() {
        convert_node(child, dom, parent, path)?;
    }
    Ok(())
}

fn convert_node(handle: &Handle, dom: &mut Dom, parent: NodeId, path: &str) -> Result<()> {
    match &handle.data {
        HtmlNode::Document => convert_children(handle, dom, parent, path),
        // The doctype is emitted by page promotion, never copied.
        HtmlNode::Doctype { .. } => Ok(()),
        HtmlNode::Text { contents } => {
            let text = restore_document_tags(&contents.borrow());
            let id = dom.create_text(text);
            dom.append(parent, id)
        }
        HtmlNode::Comment { contents } => {
            let id = dom.create(bogus_comment(&restore_document_tags(contents)));
            dom.append(parent, id)
        }
        HtmlNode::ProcessingInstruction { target, contents } => {
            let id = dom.create(NodeData::ProcessingInstruction {
                target: target.to_string(),
                data: contents.to_string(),
            });
            dom.append(parent, id)
        }
        HtmlNode::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let local = name.local.to_string();
            // Every source html/head/body was renamed, so these are synthesized.
            if matches!(local.as_str(), "html" | "head" | "body") {
                return convert_children(handle, dom, parent, path);
            }
            let tag_name = match local.strip_prefix(DOC_TAG_PREFIX) {
                Some(doc @ ("html" | "head" | "body")) => doc.to_string(),
                _ => local.clone(),
            };

            let mut attributes = Attributes::new();
            for attr in attrs.borrow().iter() {
                let attr_name = match &attr.name.prefix {
                    Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                    None => attr.name.local.to_string(),
                };
                attributes.insert(attr_name, Value::string(&*attr.value));
            }

            let tag = TagNode::new(tag_name, attributes).map_err(|e| e.in_file(path))?;
            let id = dom.create_tag(tag);
            dom.append(parent, id)?;

            match template_contents.borrow().as_ref() {
                Some(contents) => convert_children(contents, dom, id, path),
                None => convert_children(handle, dom, id, path),
            }
        }
    }
}

/// html5ever reports `<?target data?>` and `<![CDATA[..]]>` outside foreign
/// content as bogus comments.
fn bogus_comment(text: &str) -> NodeData {
    if let Some(inner) = text
        .strip_prefix("[CDATA[")
        .and_then(|t| t.strip_suffix("]]"))
    {
        return NodeData::CData(inner.to_string());
    }
    if let Some(body) = text.strip_prefix('?') {
        let body = body.strip_suffix('?').unwrap_or(body).trim();
        let (target, data) = match body.find(char::is_whitespace) {
            Some(i) => (&body[..i], body[i..].trim()),
            None => (body, ""),
        };
        return NodeData::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        };
    }
    NodeData::Comment(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::TagKind;

    #[test]
    fn test_self_closing_custom_tags() {
        let out = convert_self_closing_tags(r#"<m-var a="1" b='x > y' /><p>after</p>"#);
        assert_eq!(out, r#"<m-var a="1" b='x > y'></m-var><p>after</p>"#);
        assert_eq!(convert_self_closing_tags("<br/>"), "<br/>");
    }

    #[test]
    fn test_attribute_values_survive_pre_passes() {
        let dom = parse_html(
            r#"<div title="<body> and </head>" data-x='<my-el a="1" />'>x</div><!-- <m-var /> --><script>if (a<b) x = "</body>";</script>"#,
            "p.html",
        )
        .unwrap();
        let children = dom.children(dom.root());
        let div = dom.tag(children[0]).unwrap();
        assert_eq!(div.attr("title"), Some(&Value::string("<body> and </head>")));
        assert_eq!(div.attr("data-x"), Some(&Value::string(r#"<my-el a="1" />"#)));
        assert_eq!(dom.data(children[1]), &NodeData::Comment(" <m-var /> ".to_string()));
        assert_eq!(dom.text_content(children[2]), r#"if (a<b) x = "</body>";"#);

        let out = convert_self_closing_tags(r#"<m-var v='<x-y />' /><p title="<a-b/>"></p>"#);
        assert_eq!(out, r#"<m-var v='<x-y />'></m-var><p title="<a-b/>"></p>"#);
    }

    #[test]
    fn test_document_tags_are_kept_in_place() {
        let dom = parse_html(
            "<m-fragment src=\"x.html\"></m-fragment><html><head><title>T</title></head><body><p>b</p></body></html>",
            "page.html",
        )
        .unwrap();
        let names: Vec<_> = dom
            .children(dom.root())
            .into_iter()
            .filter_map(|c| dom.tag_name(c).map(str::to_string))
            .collect();
        assert_eq!(names, vec!["m-fragment", "html"]);
        let html = dom.children(dom.root())[1];
        let inner: Vec<_> = dom
            .children(html)
            .into_iter()
            .filter_map(|c| dom.tag_name(c).map(str::to_string))
            .collect();
        assert_eq!(inner, vec!["head", "body"]);
    }

    #[test]
    fn test_template_contents_become_children() {
        let dom = parse_html("<template><p>inside</p></template>", "c.html").unwrap();
        let template = dom.children(dom.root())[0];
        assert_eq!(dom.tag_name(template), Some("template"));
        assert_eq!(dom.text_content(template), "inside");
    }

    #[test]
    fn test_control_tags_are_classified() {
        let dom = parse_html(r#"<m-for var="x" of="{{ [1] }}"><b>${x}</b></m-for>"#, "p.html").unwrap();
        let node = dom.children(dom.root())[0];
        assert!(matches!(dom.tag(node).unwrap().kind, TagKind::For { .. }));
    }

    #[test]
    fn test_structural_error_names_the_file() {
        let err = parse_html("<m-if><p>x</p></m-if>", "pages/a.html").unwrap_err();
        match err {
            CompileError::Structure { path, tag, .. } => {
                assert_eq!(path, "pages/a.html");
                assert_eq!(tag, "m-if");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_processing_instructions_and_cdata() {
        assert_eq!(
            bogus_comment("?xml version=\"1.0\"?"),
            NodeData::ProcessingInstruction {
                target: "xml".to_string(),
                data: "version=\"1.0\"".to_string()
            }
        );
        assert_eq!(bogus_comment("[CDATA[a<b]]"), NodeData::CData("a<b".to_string()));
        assert_eq!(bogus_comment(" note "), NodeData::Comment(" note ".to_string()));
    }
}
