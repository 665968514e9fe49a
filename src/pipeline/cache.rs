//! Parse-once template cache.
//!
//! Cached templates are canonical and never mutated: every consumer gets a
//! deep copy of the tree. Compiled expressions and scripts are cached by
//! source text, linked resources by content hash.

use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

use super::{Component, Fragment};
use crate::expression::{EvalContent, Script};

#[derive(Default)]
pub struct PipelineCache {
    fragments: HashMap<String, Rc<Fragment>>,
    components: HashMap<String, Rc<Component>>,
    expressions: HashMap<String, EvalContent>,
    scripts: HashMap<String, Script>,
    links: HashMap<String, String>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragment(&self, path: &str) -> Option<Rc<Fragment>> {
        self.fragments.get(path).cloned()
    }

    /// Store a freshly parsed fragment. Parsing a path twice is a bug in the
    /// caller.
    pub fn insert_fragment(&mut self, fragment: Rc<Fragment>) {
        assert!(
            !self.fragments.contains_key(&fragment.path),
            "fragment '{}' is already cached",
            fragment.path
        );
        self.fragments.insert(fragment.path.clone(), fragment);
    }

    pub fn component(&self, path: &str) -> Option<Rc<Component>> {
        self.components.get(path).cloned()
    }

    pub fn insert_component(&mut self, component: Rc<Component>) {
        assert!(
            !self.components.contains_key(&component.path),
            "component '{}' is already cached",
            component.path
        );
        self.components.insert(component.path.clone(), component);
    }

    pub fn expression(&self, text: &str) -> Option<EvalContent> {
        self.expressions.get(text).cloned()
    }

    pub fn insert_expression(&mut self, text: &str, content: EvalContent) {
        self.expressions.insert(text.to_string(), content);
    }

    pub fn script(&self, text: &str) -> Option<Script> {
        self.scripts.get(text).cloned()
    }

    pub fn insert_script(&mut self, text: &str, script: Script) {
        self.scripts.insert(text.to_string(), script);
    }

    /// Linked path previously assigned to content with this hash.
    pub fn linked(&self, hash: &str) -> Option<&str> {
        self.links.get(hash).map(String::as_str)
    }

    pub fn insert_link(&mut self, hash: &str, path: &str) {
        self.links.insert(hash.to_string(), path.to_string());
    }

    /// Forget the parsed template for `path` so the next use re-reads it.
    pub fn invalidate(&mut self, path: &str) {
        let fragment = self.fragments.remove(path).is_some();
        let component = self.components.remove(path).is_some();
        debug!(path, fragment, component, "cache invalidated");
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
        self.components.clear();
        self.expressions.clear();
        self.scripts.clear();
        self.links.clear();
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn expression_count(&self) -> usize {
        self.expressions.len()
    }
}
