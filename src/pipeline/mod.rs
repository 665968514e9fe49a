//! Pipeline orchestration.
//!
//! A [`Pipeline`] owns the template cache, the dependency tracker and the
//! state of the current compile request. Compiling a page compiles it as a
//! fragment (recursively compiling every referenced fragment and component
//! with a child [`FragmentContext`]) and then promotes the result to a full
//! document.
//!
//! ## Compile requests
//!
//! Each call to [`Pipeline::compile_page`] or [`Pipeline::compile_fragment`]
//! starts a new request: style/link deduplication and the include stack used
//! for recursion detection are reset, while the cache and the dependency
//! tracker live as long as the pipeline.

pub mod cache;
pub mod component;
pub mod context;
pub mod deps;
pub mod interface;
mod link;
mod page;

use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace};

pub use cache::PipelineCache;
pub use component::{Component, ComponentStyle, StyleBind};
pub use context::FragmentContext;
pub use deps::DependencyTracker;
pub use interface::{content_hash, FsPipelineInterface, MemoryInterface, PipelineInterface, ResourceKind};
pub(crate) use page::HEAD_MARKER;

use crate::compiler::{self, CompileUnit};
use crate::config::PipelineOptions;
use crate::dom::{Dom, NodeData, TagNode};
use crate::error::{CompileError, Result};
use crate::expression::{
    parse_control_expression, parse_expression, parse_script, EvalContent, EvalHost, Script,
};
use crate::parse::parse_html;
use crate::paths;
use crate::serialize::serialize;
use crate::value::{ScopeVars, Value};

/// A parsed template, identified by its resource path.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub path: String,
    pub dom: Dom,
}

/// A compiled page with its rendered markup.
#[derive(Debug, Clone)]
pub struct Page {
    pub path: String,
    pub dom: Dom,
    pub html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Fragment,
    Component,
}

impl ReferenceKind {
    pub fn tag(self) -> &'static str {
        match self {
            ReferenceKind::Fragment => "m-fragment",
            ReferenceKind::Component => "m-component",
        }
    }
}

#[derive(Debug, Default)]
struct RequestState {
    root_path: String,
    include_stack: Vec<String>,
    seen_styles: HashSet<String>,
    seen_links: HashSet<String>,
}

pub struct Pipeline {
    interface: Arc<dyn PipelineInterface>,
    options: PipelineOptions,
    cache: PipelineCache,
    deps: DependencyTracker,
    request: RequestState,
}

impl Pipeline {
    pub fn new(interface: Arc<dyn PipelineInterface>, options: PipelineOptions) -> Self {
        Self {
            interface,
            options,
            cache: PipelineCache::new(),
            deps: DependencyTracker::new(),
            request: RequestState::default(),
        }
    }

    /// Build a pipeline with options read from a JSON resource.
    pub fn with_options_resource(interface: Arc<dyn PipelineInterface>, path: &str) -> Result<Self> {
        let text = interface.get_resource(ResourceKind::Data, path)?;
        let options = PipelineOptions::from_json(&text)?;
        Ok(Self::new(interface, options))
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn cache(&self) -> &PipelineCache {
        &self.cache
    }

    pub fn deps(&self) -> &DependencyTracker {
        &self.deps
    }

    pub fn interface(&self) -> &Arc<dyn PipelineInterface> {
        &self.interface
    }

    /// Forget the cached template for a changed resource.
    pub fn invalidate(&mut self, path: &str) {
        self.cache.invalidate(&paths::normalize(path));
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn reset_dependencies(&mut self) {
        self.deps.reset();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PUBLIC ENTRY POINTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Compile a page: fragment compilation followed by page promotion.
    pub fn compile_page(&mut self, path: &str) -> Result<Page> {
        let path = paths::normalize(path);
        debug!(path = %path, "compiling page");
        self.begin_request(&path);
        self.deps.forget_page(&path);

        let context = FragmentContext::root(&path, ScopeVars::new());
        let mut dom = self.compile_reference(ReferenceKind::Fragment, &path, Rc::new(context))?;
        page::promote(&mut dom, &self.options)?;
        check_resolved(&dom, &path)?;

        let mut html = serialize(&dom, self.options.collapse_whitespace);
        if self.options.emit_doctype {
            html.insert_str(0, "<!DOCTYPE html>\n");
        }
        debug!(path = %path, bytes = html.len(), "page compiled");
        Ok(Page { path, dom, html })
    }

    /// Compile a fragment on its own. Without a context the fragment is its
    /// own root.
    pub fn compile_fragment(&mut self, path: &str, context: Option<FragmentContext>) -> Result<Fragment> {
        let path = paths::normalize(path);
        let context = match context {
            Some(mut context) => {
                context.fragment_res_path = path.clone();
                if context.root_res_path.is_empty() {
                    context.root_res_path = path.clone();
                }
                context
            }
            None => FragmentContext::root(&path, ScopeVars::new()),
        };
        debug!(path = %path, root = %context.root_res_path, "compiling fragment");
        self.begin_request(&context.root_res_path);

        let dom = self.compile_reference(ReferenceKind::Fragment, &path, Rc::new(context))?;
        check_resolved(&dom, &path)?;
        Ok(Fragment { path, dom })
    }

    pub fn write_page(&self, page: &Page) -> Result<()> {
        debug!(path = %page.path, "writing page");
        self.interface
            .write_resource(ResourceKind::Html, &page.path, &page.html)
    }

    fn begin_request(&mut self, root_path: &str) {
        self.request = RequestState {
            root_path: root_path.to_string(),
            ..Default::default()
        };
    }

    /// The configured globals, seeded beneath every unit's root scope.
    pub(crate) fn globals(&self) -> ScopeVars {
        self.options
            .globals
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RECURSIVE COMPILATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Compile the fragment or component at `path` with `context` and return
    /// the resolved tree. Used for the request root and for every reference.
    pub(crate) fn compile_reference(
        &mut self,
        kind: ReferenceKind,
        path: &str,
        context: Rc<FragmentContext>,
    ) -> Result<Dom> {
        if self.request.include_stack.iter().any(|p| p == path) {
            let mut chain = self.request.include_stack.clone();
            chain.push(path.to_string());
            return Err(CompileError::RecursiveInclusion {
                path: path.to_string(),
                chain,
            });
        }
        if self.request.include_stack.len() >= self.options.max_depth {
            return Err(CompileError::structure(
                path,
                kind.tag(),
                format!("maximum nesting depth of {} exceeded", self.options.max_depth),
            ));
        }

        let requested_by = context
            .parent
            .as_ref()
            .map(|p| p.fragment_res_path.clone())
            .unwrap_or_default();
        trace!(path, ?kind, depth = self.request.include_stack.len(), "entering");
        self.request.include_stack.push(path.to_string());
        let result = match kind {
            ReferenceKind::Fragment => self.compile_fragment_unit(path, context, &requested_by),
            ReferenceKind::Component => self.compile_component_unit(path, context, &requested_by),
        };
        self.request.include_stack.pop();
        result
    }

    fn compile_fragment_unit(
        &mut self,
        path: &str,
        context: Rc<FragmentContext>,
        requested_by: &str,
    ) -> Result<Dom> {
        let fragment = self.load_fragment(path, requested_by)?;
        self.run_unit(context, fragment.dom.clone())
    }

    fn compile_component_unit(
        &mut self,
        path: &str,
        mut context: Rc<FragmentContext>,
        requested_by: &str,
    ) -> Result<Dom> {
        let component = self.load_component(path, requested_by)?;
        if let Some(script) = &component.script {
            let instance = script.instantiate(&mut ContextHost {
                pipeline: self,
                context: &context,
            })?;
            let context = Rc::make_mut(&mut context);
            for (key, value) in instance {
                context.scope.insert(key, value);
            }
        }
        let mut dom = component.template.clone();
        if let Some(style) = &component.style {
            self.insert_component_style(&mut dom, style, path, &context)?;
        }
        self.run_unit(context, dom)
    }

    fn run_unit(&mut self, context: Rc<FragmentContext>, dom: Dom) -> Result<Dom> {
        let mut unit = CompileUnit::new(self, context, dom);
        compiler::compile(&mut unit)?;
        Ok(unit.into_dom())
    }

    /// Put a component's style at the front of its template so the usual
    /// deduplication and head hoisting apply to it.
    fn insert_component_style(
        &mut self,
        dom: &mut Dom,
        style: &ComponentStyle,
        path: &str,
        context: &FragmentContext,
    ) -> Result<()> {
        let node = match style.bind {
            StyleBind::Head | StyleBind::Inline => {
                let mut tag = TagNode::element("style");
                if style.bind == StyleBind::Head {
                    tag.set_attr(HEAD_MARKER, "");
                }
                let node = dom.create_tag(tag);
                let text = dom.create_text(style.text.clone());
                dom.append(node, text)?;
                node
            }
            StyleBind::Link => {
                let linked = self.link_resource(ResourceKind::Style, &style.text, path)?;
                let mut tag = TagNode::element("link");
                tag.set_attr("rel", "stylesheet");
                tag.set_attr("href", paths::relative_to(&context.root_res_path, &linked));
                tag.set_attr(HEAD_MARKER, "");
                dom.create_tag(tag)
            }
        };
        let root = dom.root();
        match dom.first_child(root) {
            Some(first) => dom.insert_before(first, node),
            None => dom.append(root, node),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RESOURCES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Read a resource on behalf of the current request and record the
    /// dependency of the request root on it.
    pub(crate) fn load_resource(&mut self, kind: ResourceKind, path: &str, requested_by: &str) -> Result<String> {
        self.record_dependency(path);
        self.interface
            .get_resource(kind, path)
            .map_err(|e| match e {
                CompileError::MissingResource { path, message, .. } => CompileError::MissingResource {
                    path,
                    requested_by: requested_by.to_string(),
                    message,
                },
                other => other,
            })
    }

    fn record_dependency(&mut self, path: &str) {
        if !self.request.root_path.is_empty() {
            self.deps.record(&self.request.root_path, path);
        }
    }

    fn load_fragment(&mut self, path: &str, requested_by: &str) -> Result<Rc<Fragment>> {
        if let Some(fragment) = self.cache.fragment(path) {
            debug!(path, "fragment cache hit");
            self.record_dependency(path);
            return Ok(fragment);
        }
        debug!(path, "fragment cache miss");
        let text = self.load_resource(ResourceKind::Html, path, requested_by)?;
        let fragment = Rc::new(Fragment {
            path: path.to_string(),
            dom: parse_html(&text, path)?,
        });
        self.cache.insert_fragment(fragment.clone());
        Ok(fragment)
    }

    fn load_component(&mut self, path: &str, requested_by: &str) -> Result<Rc<Component>> {
        if let Some(component) = self.cache.component(path) {
            debug!(path, "component cache hit");
            self.record_dependency(path);
            return Ok(component);
        }
        debug!(path, "component cache miss");
        let text = self.load_resource(ResourceKind::Html, path, requested_by)?;
        let component = Rc::new(Component::parse(&text, path, &mut |script| {
            self.compile_script(script)
        })?);
        self.cache.insert_component(component.clone());
        Ok(component)
    }

    /// Load `target` (relative to the context's fragment) as a value: parsed
    /// JSON when `json` is set, text otherwise.
    pub(crate) fn load_value(&mut self, target: &str, context: &FragmentContext, json: bool) -> Result<Value> {
        let path = paths::resolve(&context.fragment_res_path, target);
        let text = self.load_resource(ResourceKind::for_path(&path), &path, &context.fragment_res_path)?;
        if !json {
            return Ok(Value::from(text));
        }
        let parsed: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            CompileError::missing(&path, &context.fragment_res_path, format!("invalid JSON: {}", e))
        })?;
        Ok(Value::from_json(&parsed))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COMPILED UNITS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Compiled unit for an expression string. `control` also accepts bare
    /// expressions (the values of `?`, `of` and `in`).
    pub(crate) fn expression(&mut self, text: &str, control: bool) -> Result<EvalContent> {
        if let Some(content) = self.cache.expression(text) {
            return Ok(content);
        }
        trace!(text, "compiling expression");
        let content = if control {
            parse_control_expression(text)?
        } else {
            parse_expression(text)?
        };
        self.cache.insert_expression(text, content.clone());
        Ok(content)
    }

    pub(crate) fn compile_script(&mut self, text: &str) -> Result<Script> {
        if let Some(script) = self.cache.script(text) {
            return Ok(script);
        }
        let script = parse_script(text)?;
        self.cache.insert_script(text, script.clone());
        Ok(script)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REQUEST STATE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record a normalized style payload. False if it was already emitted
    /// in this request.
    pub(crate) fn first_style(&mut self, key: String) -> bool {
        self.request.seen_styles.insert(key)
    }

    pub(crate) fn first_link(&mut self, href: String) -> bool {
        self.request.seen_links.insert(href)
    }
}

/// Evaluation host for component scripts: the scope is the context's
/// initial scope.
struct ContextHost<'a> {
    pipeline: &'a mut Pipeline,
    context: &'a FragmentContext,
}

impl EvalHost for ContextHost<'_> {
    fn lookup(&self, key: &str) -> Option<Value> {
        self.context.scope.get(key).cloned()
    }

    fn scope_object(&self) -> Value {
        Value::object(self.context.scope.clone())
    }

    fn context_object(&self) -> Value {
        self.context.to_value()
    }

    fn load(&mut self, path: &str) -> Result<Value> {
        let json = paths::extension(path) == "json";
        self.pipeline.load_value(path, self.context, json)
    }
}

/// Every template-control tag must be gone after compilation.
fn check_resolved(dom: &Dom, path: &str) -> Result<()> {
    for node in dom.descendants(dom.root()) {
        if let NodeData::Tag(tag) = dom.data(node) {
            if tag.kind.is_template_control() {
                return Err(CompileError::UnresolvedTemplateTag {
                    path: path.to_string(),
                    tag: tag.name.clone(),
                });
            }
        }
    }
    Ok(())
}
