//! External style/script content and `m-bind`.
//!
//! * `<style src="a.css">` is filled with the file's content.
//! * `<script src="a.js" m-bind="...">` is filled the same way; a script
//!   without `m-bind` is an ordinary external script and is left alone.
//! * `m-bind="head"` hoists the node into the page head, `m-bind="link"`
//!   writes the content out through the resource linker and references it,
//!   `m-bind="inline"` keeps it where it is.

use crate::compiler::{CompileUnit, CompilerModule};
use crate::dom::{NodeId, TagNode};
use crate::error::{CompileError, Result};
use crate::paths;
use crate::pipeline::{ResourceKind, StyleBind, HEAD_MARKER};

use super::tag_of;

pub struct StyleScriptModule;

const BIND_ATTR: &str = "m-bind";

impl CompilerModule for StyleScriptModule {
    fn name(&self) -> &'static str {
        "style-script"
    }

    fn enter_node(&self, unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
        let Some(tag) = tag_of(unit, node) else {
            return Ok(());
        };
        let kind = match tag.name.as_str() {
            "style" => ResourceKind::Style,
            "script" => ResourceKind::Script,
            _ => return Ok(()),
        };
        let bind = match tag.attr_str(BIND_ATTR) {
            Some(text) => Some(StyleBind::parse(&text).ok_or_else(|| {
                CompileError::structure(
                    unit.path(),
                    &tag.name,
                    format!("unknown {} mode '{}', expected head, link or inline", BIND_ATTR, text),
                )
            })?),
            None => None,
        };
        if kind == ResourceKind::Script && bind.is_none() {
            return Ok(());
        }

        if let Some(src) = tag.attr_str("src") {
            let content = unit.pipeline.load_value(&src, &unit.context, false)?;
            unit.dom.set_text_content(node, content.to_display_string())?;
            if let Some(tag) = unit.dom.tag_mut(node) {
                tag.remove_attr("src");
            }
        }
        if let Some(tag) = unit.dom.tag_mut(node) {
            tag.remove_attr(BIND_ATTR);
        }

        match bind {
            None | Some(StyleBind::Inline) => Ok(()),
            Some(StyleBind::Head) => {
                if let Some(tag) = unit.dom.tag_mut(node) {
                    tag.set_attr(HEAD_MARKER, "");
                }
                Ok(())
            }
            Some(StyleBind::Link) => link(unit, node, kind),
        }
    }
}

/// Write the node's content out as a resource and point at it instead.
fn link(unit: &mut CompileUnit<'_>, node: NodeId, kind: ResourceKind) -> Result<()> {
    let text = unit.dom.text_content(node);
    let source = unit.context.fragment_res_path.clone();
    let linked = unit.pipeline.link_resource(kind, &text, &source)?;
    let href = paths::relative_to(&unit.context.root_res_path, &linked);

    match kind {
        ResourceKind::Style => {
            let mut tag = TagNode::element("link");
            tag.set_attr("rel", "stylesheet");
            tag.set_attr("href", href);
            tag.set_attr(HEAD_MARKER, "");
            let link = unit.dom.create_tag(tag);
            unit.dom.replace(node, &[link])
        }
        _ => {
            for child in unit.dom.children(node) {
                unit.dom.detach(child);
            }
            if let Some(tag) = unit.dom.tag_mut(node) {
                tag.set_attr("src", href);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{pipeline_with, render_fragment};

    #[test]
    fn test_style_src_is_loaded() {
        let out = render_fragment(
            &[
                ("css/index.html", "<style src=\"site.css\"></style>"),
                ("css/site.css", "p { margin: 0 }"),
            ],
            "css/index.html",
        );
        assert_eq!(out, "<style>p { margin: 0 }</style>");
    }

    #[test]
    fn test_linked_style_and_script() {
        let (mut pipeline, interface) = pipeline_with(&[(
            "blog/post.html",
            "<style m-bind=\"link\">p{}</style><script m-bind=\"link\">go()</script><script src=\"cdn.js\"></script>",
        )]);
        let page = pipeline.compile_page("blog/post.html").unwrap();
        let written = interface.written_paths();
        let css = written.iter().find(|p| p.ends_with(".css")).unwrap();
        let js = written.iter().find(|p| p.ends_with(".js")).unwrap();
        assert_eq!(interface.written(css).as_deref(), Some("p{}"));
        assert!(page.html.contains(&format!("<link rel=\"stylesheet\" href=\"../{}\">", css)));
        assert!(page.html.contains(&format!("<script src=\"../{}\"></script>", js)));
        assert!(page.html.contains("<script src=\"cdn.js\"></script>"));
    }
}
