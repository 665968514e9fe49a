//! Drops repeated styles and stylesheet links within one compile request.
//!
//! Styles are compared with whitespace runs collapsed; links by `href`. The
//! first occurrence is kept. The sets are shared by every fragment compiled
//! for the same page, so a component used ten times contributes its style
//! once.

use tracing::trace;

use crate::compiler::{CompileUnit, CompilerModule};
use crate::dom::NodeId;
use crate::error::Result;

pub struct DedupModule;

impl CompilerModule for DedupModule {
    fn name(&self) -> &'static str {
        "dedup"
    }

    fn enter_node(&self, unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
        let first = match unit.dom.tag(node) {
            Some(tag) if tag.name == "style" => {
                let key = normalize_style(&unit.dom.text_content(node));
                unit.pipeline.first_style(key)
            }
            Some(tag) if tag.name == "link" => match tag.attr_str("href") {
                Some(href) => unit.pipeline.first_link(href),
                None => true,
            },
            _ => true,
        };
        if !first {
            trace!(path = %unit.path(), "dropping duplicate");
            unit.dom.detach(node);
        }
        Ok(())
    }
}

fn normalize_style(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
