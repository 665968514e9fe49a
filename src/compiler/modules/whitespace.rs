//! Whitespace sensitivity flags.
//!
//! `pre`, `textarea`, `script` and `style` mark their subtree sensitive.
//! `<m-whitespace>` (mode `sensitive`, the default, or `insensitive`) sets
//! the flag for its subtree and is replaced by its children on exit. Every
//! other node inherits its parent's flag.

use crate::compiler::{CompileUnit, CompilerModule};
use crate::dom::{NodeId, TagKind};
use crate::error::{CompileError, Result};

pub struct WhitespaceModule;

const PRESERVING_ELEMENTS: &[&str] = &["pre", "textarea", "script", "style"];

impl CompilerModule for WhitespaceModule {
    fn name(&self) -> &'static str {
        "whitespace"
    }

    fn enter_node(&self, unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
        let inherited = unit
            .dom
            .parent(node)
            .map(|p| unit.dom.node(p).whitespace_sensitive)
            .unwrap_or(false);
        let sensitive = match unit.dom.tag(node) {
            Some(tag) if tag.kind == TagKind::Whitespace => {
                match tag.attr_str("mode").as_deref().map(str::trim) {
                    None | Some("") | Some("sensitive") => true,
                    Some("insensitive") => false,
                    Some(other) => {
                        return Err(CompileError::structure(
                            unit.path(),
                            &tag.name,
                            format!("unknown whitespace mode '{}'", other),
                        ))
                    }
                }
            }
            Some(tag) if PRESERVING_ELEMENTS.contains(&tag.name.as_str()) => true,
            _ => inherited || unit.dom.node(node).whitespace_sensitive,
        };
        unit.dom.node_mut(node).whitespace_sensitive = sensitive;
        Ok(())
    }

    fn exit_node(&self, unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
        if matches!(unit.dom.tag(node).map(|t| &t.kind), Some(TagKind::Whitespace)) {
            unit.dom.promote_children(node)?;
        }
        Ok(())
    }
}
