//! Seeds the document root with the configured globals and the context's
//! initial scope before anything else runs.

use crate::compiler::{CompileUnit, CompilerModule};
use crate::dom::NodeId;
use crate::error::Result;

pub struct RootScopeModule;

impl CompilerModule for RootScopeModule {
    fn name(&self) -> &'static str {
        "root-scope"
    }

    fn enter_node(&self, unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
        if node != unit.dom.root() {
            return Ok(());
        }
        for (key, value) in unit.pipeline.globals() {
            unit.dom.bind(node, key, value);
        }
        let context = unit.context.clone();
        for (key, value) in &context.scope {
            unit.dom.bind(node, key.clone(), value.clone());
        }
        Ok(())
    }
}
