//! The compiler modules, one per language feature. See
//! [`MODULES`](super::MODULES) for the order they run in.

pub mod anchor;
pub mod dedup;
pub mod expression;
pub mod fragment;
pub mod import;
pub mod root_scope;
pub mod slot;
pub mod structural;
pub mod style_script;
pub mod variables;
pub mod whitespace;

use crate::compiler::CompileUnit;
use crate::dom::{NodeId, TagNode};

/// Copy of the node's tag, if it is one. Modules read a snapshot so they can
/// mutate the tree while deciding.
pub(crate) fn tag_of(unit: &CompileUnit<'_>, node: NodeId) -> Option<TagNode> {
    unit.dom.tag(node).cloned()
}
