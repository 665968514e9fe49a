//! Fills `<m-slot>` markers with the content the caller supplied for them.
//!
//! Each use imports a fresh copy of the content, so a slot referenced twice
//! produces two independent subtrees. A slot without content is removed.

use tracing::trace;

use crate::compiler::{CompileUnit, CompilerModule};
use crate::dom::{NodeId, TagKind};
use crate::error::Result;

pub struct SlotModule;

impl CompilerModule for SlotModule {
    fn name(&self) -> &'static str {
        "slot"
    }

    fn enter_node(&self, unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
        let Some(tag) = unit.dom.tag(node) else {
            return Ok(());
        };
        if tag.kind != TagKind::Slot {
            return Ok(());
        }
        let name = tag.slot_name();
        match unit.context.slot_contents.get(&name).cloned() {
            Some(content) => {
                let nodes = unit.dom.import_children(&content, content.root());
                trace!(slot = %name, nodes = nodes.len(), "filling slot");
                unit.dom.replace(node, &nodes)
            }
            None => {
                trace!(slot = %name, "no content for slot");
                unit.dom.detach(node);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::render_fragment;

    #[test]
    fn test_default_slot_is_filled() {
        let out = render_fragment(
            &[
                ("index.html", "<m-fragment src=\"_wrap.html\"><div>A</div></m-fragment>"),
                ("_wrap.html", "<m-slot></m-slot>"),
            ],
            "index.html",
        );
        assert_eq!(out, "<div>A</div>");
    }

    #[test]
    fn test_named_slots_and_missing_content() {
        let out = render_fragment(
            &[
                (
                    "index.html",
                    "<m-fragment src=\"_card.html\"><m-content slot=\"title\">T</m-content><p slot=\"footer\">F</p></m-fragment>",
                ),
                (
                    "_card.html",
                    "<h2><m-slot slot=\"title\"></m-slot></h2><m-slot></m-slot><footer><m-slot slot=\"footer\"></m-slot></footer>",
                ),
            ],
            "index.html",
        );
        assert_eq!(out, "<h2>T</h2><footer><p>F</p></footer>");
    }
}
