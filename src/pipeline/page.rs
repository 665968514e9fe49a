//! Page promotion.
//!
//! Turns a compiled fragment into a document: a single `html` holding one
//! `head` and one `body`, processing instructions first, `m-head` nodes
//! hoisted into the head and a `<title>` present.

use crate::config::PipelineOptions;
use crate::dom::{Dom, NodeData, NodeId, TagNode};
use crate::error::Result;

/// Marks a node that belongs in the page head.
pub(crate) const HEAD_MARKER: &str = "m-head";

pub(crate) fn promote(dom: &mut Dom, options: &PipelineOptions) -> Result<()> {
    let root = dom.root();
    lift_processing_instructions(dom)?;

    let html = merge_tags(dom, root, "html")?;
    let html = match html {
        Some(html) => html,
        None => {
            let html = dom.create_tag(TagNode::element("html"));
            dom.append(root, html)?;
            html
        }
    };

    let head = ensure_section(dom, html, "head")?;
    let body = ensure_section(dom, html, "body")?;

    // Loose top-level content ends up in the body, on the same side of the
    // document element it was written on.
    let mut before = Vec::new();
    let mut after = Vec::new();
    let mut seen_html = false;
    for child in dom.children(root) {
        if child == html {
            seen_html = true;
            continue;
        }
        match dom.data(child) {
            NodeData::ProcessingInstruction { .. } => {}
            NodeData::Text(text) if text.trim().is_empty() => dom.detach(child),
            _ if seen_html => after.push(child),
            _ => before.push(child),
        }
    }

    order_sections(dom, html, head, body)?;

    match dom.first_child(body) {
        Some(first) => {
            for node in before {
                dom.insert_before(first, node)?;
            }
        }
        None => {
            for node in before {
                dom.append(body, node)?;
            }
        }
    }
    for node in after {
        dom.append(body, node)?;
    }

    ensure_title(dom, head, &options.default_title)?;
    hoist_head_nodes(dom, head)?;
    Ok(())
}

fn lift_processing_instructions(dom: &mut Dom) -> Result<()> {
    let root = dom.root();
    let instructions: Vec<NodeId> = dom
        .descendants(root)
        .into_iter()
        .filter(|n| matches!(dom.data(*n), NodeData::ProcessingInstruction { .. }))
        .collect();
    for pi in instructions.into_iter().rev() {
        match dom.first_child(root) {
            Some(first) => dom.insert_before(first, pi)?,
            None => dom.append(root, pi)?,
        }
    }
    Ok(())
}

/// Merge every `name` tag in the tree into the first one. Attributes of the
/// first occurrence win; the children of later ones are appended to it, or
/// left in place when they already sit inside it.
fn merge_tags(dom: &mut Dom, scope: NodeId, name: &str) -> Result<Option<NodeId>> {
    let found: Vec<NodeId> = dom
        .descendants(scope)
        .into_iter()
        .filter(|n| dom.tag_name(*n) == Some(name))
        .collect();
    let Some((&primary, duplicates)) = found.split_first() else {
        return Ok(None);
    };
    for &duplicate in duplicates {
        if let Some(attrs) = dom.tag(duplicate).map(|t| t.attrs.clone()) {
            if let Some(tag) = dom.tag_mut(primary) {
                for (key, value) in attrs {
                    tag.attrs.entry(key).or_insert(value);
                }
            }
        }
        if dom.is_inclusive_ancestor(primary, duplicate) {
            dom.promote_children(duplicate)?;
        } else {
            for child in dom.children(duplicate) {
                dom.append(primary, child)?;
            }
            dom.detach(duplicate);
        }
    }
    Ok(Some(primary))
}

fn ensure_section(dom: &mut Dom, html: NodeId, name: &str) -> Result<NodeId> {
    let section = match merge_tags(dom, dom.root(), name)? {
        Some(section) => section,
        None => dom.create_tag(TagNode::element(name)),
    };
    if dom.parent(section) != Some(html) {
        dom.append(html, section)?;
    }
    Ok(section)
}

/// `head` first, then `body`; any other element content of `html` moves
/// into the body around the existing content.
fn order_sections(dom: &mut Dom, html: NodeId, head: NodeId, body: NodeId) -> Result<()> {
    let mut leading = Vec::new();
    let mut trailing = Vec::new();
    let mut seen_body = false;
    for child in dom.children(html) {
        if child == head {
            continue;
        }
        if child == body {
            seen_body = true;
            continue;
        }
        if matches!(dom.data(child), NodeData::Text(t) if t.trim().is_empty()) {
            continue;
        }
        if seen_body {
            trailing.push(child);
        } else {
            leading.push(child);
        }
    }

    match dom.first_child(html) {
        Some(first) if first != head => dom.insert_before(first, head)?,
        None => dom.append(html, head)?,
        _ => {}
    }
    dom.insert_after(head, body)?;

    match dom.first_child(body) {
        Some(first) => {
            for node in leading {
                dom.insert_before(first, node)?;
            }
        }
        None => {
            for node in leading {
                dom.append(body, node)?;
            }
        }
    }
    for node in trailing {
        dom.append(body, node)?;
    }
    Ok(())
}

/// Move a stray `<title>` into the head, or synthesize one.
fn ensure_title(dom: &mut Dom, head: NodeId, default_title: &str) -> Result<()> {
    let root = dom.root();
    let title = dom
        .descendants(root)
        .into_iter()
        .find(|n| dom.tag_name(*n) == Some("title"));
    if let Some(title) = title {
        if !dom.is_inclusive_ancestor(head, title) {
            dom.append(head, title)?;
        }
        return Ok(());
    }
    let title = dom.create_tag(TagNode::element("title"));
    let text = dom.create_text(default_title);
    dom.append(title, text)?;
    dom.append(head, title)
}

fn hoist_head_nodes(dom: &mut Dom, head: NodeId) -> Result<()> {
    let root = dom.root();
    let marked: Vec<NodeId> = dom
        .descendants(root)
        .into_iter()
        .filter(|n| dom.tag(*n).map(|t| t.has_attr(HEAD_MARKER)).unwrap_or(false))
        .collect();
    for node in marked {
        if let Some(tag) = dom.tag_mut(node) {
            tag.remove_attr(HEAD_MARKER);
        }
        if !dom.is_inclusive_ancestor(head, node) {
            dom.append(head, node)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_html;
    use crate::serialize::serialize;

    fn promoted(html: &str) -> String {
        let mut dom = parse_html(html, "page.html").unwrap();
        let options = PipelineOptions {
            default_title: "Untitled".to_string(),
            ..Default::default()
        };
        promote(&mut dom, &options).unwrap();
        serialize(&dom, false)
    }

    #[test]
    fn test_bare_fragment_gets_document_shape() {
        assert_eq!(
            promoted("<p>hi</p>"),
            "<html><head><title>Untitled</title></head><body><p>hi</p></body></html>"
        );
    }

    #[test]
    fn test_duplicate_sections_are_merged() {
        let out = promoted(
            "<html lang=\"en\"><head><title>T</title></head><body><p>a</p></body></html><head><meta charset=\"utf-8\"></head><body class=\"x\"><p>b</p></body>",
        );
        assert_eq!(
            out,
            "<html lang=\"en\"><head><title>T</title><meta charset=\"utf-8\"></head><body class=\"x\"><p>a</p><p>b</p></body></html>"
        );
    }

    #[test]
    fn test_head_markers_are_hoisted() {
        let out = promoted("<p>a</p><style m-head>p{}</style><title>Mine</title>");
        assert_eq!(
            out,
            "<html><head><title>Mine</title><style>p{}</style></head><body><p>a</p></body></html>"
        );
    }

    #[test]
    fn test_processing_instructions_lead() {
        let out = promoted("<p>a</p><?xml-stylesheet href=\"a.xsl\"?>");
        assert!(out.starts_with("<?xml-stylesheet href=\"a.xsl\"?><html>"));
    }
}
