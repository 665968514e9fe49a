//! `<m-import src="_card.html" as="card-item" component>` declares a tag
//! name alias. Later `<card-item>` elements in the same file become
//! `<m-component src="_card.html">` (or `<m-fragment>` without the
//! `component` flag) keeping their attributes and children.

use tracing::trace;

use crate::compiler::{CompileUnit, CompilerModule, ImportAlias};
use crate::dom::{NodeId, TagKind};
use crate::error::{CompileError, Result};

use super::tag_of;

pub struct ImportModule;

impl CompilerModule for ImportModule {
    fn name(&self) -> &'static str {
        "import"
    }

    fn enter_node(&self, unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
        let Some(tag) = tag_of(unit, node) else {
            return Ok(());
        };
        match tag.kind {
            TagKind::Import => {
                let alias = tag.attr_str("as").unwrap_or_default().trim().to_ascii_lowercase();
                if alias.is_empty() || alias.starts_with("m-") {
                    return Err(CompileError::structure(
                        unit.path(),
                        &tag.name,
                        format!("'{}' cannot be used as an import alias", alias),
                    ));
                }
                let import = ImportAlias {
                    src: tag.attr_str("src").unwrap_or_default(),
                    component: tag.has_attr("component"),
                };
                trace!(alias = %alias, src = %import.src, "import");
                unit.state.imports.insert(alias, import);
                unit.dom.detach(node);
            }
            TagKind::Element => {
                let Some(import) = unit.state.imports.get(&tag.name).cloned() else {
                    return Ok(());
                };
                let target = if import.component { "m-component" } else { "m-fragment" };
                let path = unit.path().to_string();
                if let Some(tag) = unit.dom.tag_mut(node) {
                    if !tag.has_attr("src") {
                        tag.set_attr("src", import.src.as_str());
                    }
                    tag.rename(target).map_err(|e| e.in_file(&path))?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::render_fragment;

    #[test]
    fn test_alias_expands_to_fragment() {
        let out = render_fragment(
            &[
                (
                    "index.html",
                    "<m-import src=\"_badge.html\" as=\"my-badge\"></m-import><my-badge label=\"new\"></my-badge>",
                ),
                ("_badge.html", "<span>${ $.label }</span>"),
            ],
            "index.html",
        );
        assert_eq!(out, "<span>new</span>");
    }
}
