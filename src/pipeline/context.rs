//! Per-reference compilation context.

use indexmap::IndexMap;
use std::rc::Rc;

use crate::dom::Dom;
use crate::expression::Callable;
use crate::value::{ObjectMap, ScopeVars, Value};

/// Slot contents, initial scope and path bookkeeping for one fragment or
/// component being compiled. A child context is created for every
/// reference; `root_res_path` is shared by the whole chain.
#[derive(Debug, Clone, Default)]
pub struct FragmentContext {
    pub slot_contents: IndexMap<String, Rc<Dom>>,
    pub scope: ScopeVars,
    pub fragment_res_path: String,
    pub root_res_path: String,
    pub parent: Option<Rc<FragmentContext>>,
}

impl FragmentContext {
    /// Context for a top-level compile request.
    pub fn root(path: &str, scope: ScopeVars) -> Self {
        Self {
            slot_contents: IndexMap::new(),
            scope,
            fragment_res_path: path.to_string(),
            root_res_path: path.to_string(),
            parent: None,
        }
    }

    /// Context for a reference found while compiling `parent`.
    pub fn child(
        parent: &Rc<FragmentContext>,
        path: &str,
        scope: ScopeVars,
        slot_contents: IndexMap<String, Rc<Dom>>,
    ) -> Self {
        Self {
            slot_contents,
            scope,
            fragment_res_path: path.to_string(),
            root_res_path: parent.root_res_path.clone(),
            parent: Some(parent.clone()),
        }
    }

    /// The outermost context of the chain.
    pub fn top(&self) -> &FragmentContext {
        let mut current = self;
        while let Some(parent) = &current.parent {
            current = parent;
        }
        current
    }

    /// Fragment paths from the root down to this one.
    pub fn chain(&self) -> Vec<String> {
        let mut chain = vec![self.fragment_res_path.clone()];
        let mut current = self;
        while let Some(parent) = &current.parent {
            chain.push(parent.fragment_res_path.clone());
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// The `$$` object seen by expressions.
    pub fn to_value(&self) -> Value {
        let mut map = ObjectMap::new();
        map.insert("fragment".to_string(), Value::string(&self.fragment_res_path));
        map.insert("root".to_string(), Value::string(&self.top().root_res_path));
        map.insert(
            "chain".to_string(),
            Value::array(self.chain().into_iter().map(Value::from).collect()),
        );
        map.insert(
            "slots".to_string(),
            Value::array(self.slot_contents.keys().map(Value::string).collect()),
        );
        map.insert(
            "load".to_string(),
            Value::Function(Rc::new(Callable::Native("$$.load"))),
        );
        Value::object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_shares_root_path() {
        let root = Rc::new(FragmentContext::root("blog/index.html", ScopeVars::new()));
        let child = Rc::new(FragmentContext::child(
            &root,
            "_layout.html",
            ScopeVars::new(),
            IndexMap::new(),
        ));
        let grandchild = FragmentContext::child(&child, "_nav.html", ScopeVars::new(), IndexMap::new());
        assert_eq!(grandchild.root_res_path, "blog/index.html");
        assert_eq!(grandchild.top().fragment_res_path, "blog/index.html");
        assert_eq!(
            grandchild.chain(),
            vec!["blog/index.html", "_layout.html", "_nav.html"]
        );
    }
}
