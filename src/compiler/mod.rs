//! Compiler module framework.
//!
//! A fragment is compiled by one depth-first walk over its tree. Every node
//! is offered to each module in [`MODULES`] order on the way down
//! (`enter_node`) and again on the way up (`exit_node`).
//!
//! ## Mutation during the walk
//!
//! Modules rewrite the tree while it is being walked: a conditional promotes
//! its children, a loop replaces itself with one scope block per item, a
//! fragment reference is replaced by the compiled fragment. The walker
//! therefore follows live sibling links instead of a snapshot and, when the
//! child it just visited is no longer under the same parent, resumes from
//! the previous sibling it remembered. A node whose parent changes during
//! `enter_node` is considered removed: the remaining modules and its
//! subtree are skipped.
//!
//! Nodes are marked compiled once their exit phase is done, so content that
//! was compiled elsewhere (slot content, expanded fragments) is spliced in
//! without being walked again.
//!
//! ## Module order
//!
//! The order of [`MODULES`] is part of the contract. Expressions are
//! evaluated before anything reads attribute values; slots are filled
//! before structural logic and import aliasing see their content; style
//! binding, deduplication, anchor rewriting and whitespace flags follow;
//! fragment expansion runs last, on exit, once the node is final.

pub mod modules;

use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

use crate::dom::{Dom, NodeId};
use crate::error::Result;
use crate::expression::EvalHost;
use crate::paths;
use crate::pipeline::{FragmentContext, Pipeline};
use crate::value::Value;

/// One language feature of the compiler. Modules are stateless; per-unit
/// state lives in [`UnitState`].
pub trait CompilerModule: Sync {
    fn name(&self) -> &'static str;

    fn enter_node(&self, _unit: &mut CompileUnit<'_>, _node: NodeId) -> Result<()> {
        Ok(())
    }

    fn exit_node(&self, _unit: &mut CompileUnit<'_>, _node: NodeId) -> Result<()> {
        Ok(())
    }
}

/// Every module, in execution order.
pub static MODULES: &[&dyn CompilerModule] = &[
    &modules::root_scope::RootScopeModule,
    &modules::expression::ExpressionModule,
    &modules::variables::VariablesModule,
    &modules::slot::SlotModule,
    &modules::structural::StructuralModule,
    &modules::import::ImportModule,
    &modules::style_script::StyleScriptModule,
    &modules::dedup::DedupModule,
    &modules::anchor::AnchorModule,
    &modules::whitespace::WhitespaceModule,
    &modules::fragment::FragmentModule,
];

/// An alias declared by `<m-import>`.
#[derive(Debug, Clone)]
pub struct ImportAlias {
    pub src: String,
    pub component: bool,
}

/// State shared by the modules while one tree is compiled.
#[derive(Debug, Default)]
pub struct UnitState {
    /// Conditional chains still open: the next `m-else-if` / `m-else` of a
    /// chain whose earlier branches were not taken, mapped to the branches
    /// after it.
    pub else_chain: HashMap<NodeId, Vec<NodeId>>,
    /// Import aliases by lowercase tag name.
    pub imports: HashMap<String, ImportAlias>,
}

/// A tree being compiled together with its context.
pub struct CompileUnit<'p> {
    pub pipeline: &'p mut Pipeline,
    pub context: Rc<FragmentContext>,
    pub dom: Dom,
    pub state: UnitState,
}

impl<'p> CompileUnit<'p> {
    pub fn new(pipeline: &'p mut Pipeline, context: Rc<FragmentContext>, dom: Dom) -> Self {
        Self {
            pipeline,
            context,
            dom,
            state: UnitState::default(),
        }
    }

    pub fn into_dom(self) -> Dom {
        self.dom
    }

    /// Path of the fragment this unit compiles.
    pub fn path(&self) -> &str {
        &self.context.fragment_res_path
    }

    /// Evaluate `text` in the scope of `node`. `control` also accepts bare
    /// expressions.
    pub fn evaluate(&mut self, node: NodeId, text: &str, control: bool) -> Result<Value> {
        let content = self.pipeline.expression(text, control)?;
        let mut host = NodeHost {
            dom: &self.dom,
            node,
            context: &self.context,
            pipeline: &mut *self.pipeline,
        };
        content.invoke(&mut host)
    }
}

/// Evaluation host for expressions found on a node.
struct NodeHost<'a> {
    dom: &'a Dom,
    node: NodeId,
    context: &'a FragmentContext,
    pipeline: &'a mut Pipeline,
}

impl EvalHost for NodeHost<'_> {
    fn lookup(&self, key: &str) -> Option<Value> {
        self.dom.lookup(self.node, key).cloned()
    }

    fn scope_object(&self) -> Value {
        Value::object(self.dom.effective_scope(self.node))
    }

    fn context_object(&self) -> Value {
        self.context.to_value()
    }

    fn load(&mut self, path: &str) -> Result<Value> {
        let json = paths::extension(path) == "json";
        self.pipeline.load_value(path, self.context, json)
    }
}

/// Run every module over the unit's tree.
pub fn compile(unit: &mut CompileUnit<'_>) -> Result<()> {
    let root = unit.dom.root();
    trace!(path = %unit.context.fragment_res_path, "walking");
    walk(unit, root)
}

fn walk(unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
    if unit.dom.node(node).compiled {
        return Ok(());
    }
    let parent = unit.dom.parent(node);

    for module in MODULES {
        module.enter_node(unit, node)?;
        if unit.dom.parent(node) != parent {
            trace!(module = module.name(), "node removed on enter");
            return Ok(());
        }
    }

    let mut child = unit.dom.first_child(node);
    while let Some(current) = child {
        let previous = unit.dom.prev_sibling(current);
        walk(unit, current)?;
        child = if unit.dom.parent(current) == Some(node) {
            unit.dom.next_sibling(current)
        } else {
            match previous {
                Some(prev) if unit.dom.parent(prev) == Some(node) => unit.dom.next_sibling(prev),
                _ => unit.dom.first_child(node),
            }
        };
    }

    for module in MODULES {
        module.exit_node(unit, node)?;
        if unit.dom.parent(node) != parent {
            trace!(module = module.name(), "node removed on exit");
            return Ok(());
        }
    }
    unit.dom.node_mut(node).compiled = true;
    Ok(())
}
