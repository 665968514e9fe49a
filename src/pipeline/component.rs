//! Component files.
//!
//! A component file holds a template, an optional `<script>` producing the
//! instance object and an optional `<style>`:
//!
//! ```html
//! <template><div class="card">${ title }</div></template>
//! <script>export default ($, $$) => ({ title: $.title.toUpperCase() })</script>
//! <style bind="link">.card { padding: 1em }</style>
//! ```
//!
//! Without a `<template>` element every other top-level node is the template.

use crate::dom::{Dom, NodeData, NodeId};
use crate::error::{CompileError, Result};
use crate::expression::Script;
use crate::parse::parse_html;

/// Where a component's style ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleBind {
    /// A `<style>` block hoisted into the page head.
    Head,
    /// An external stylesheet linked from the page head.
    Link,
    /// A `<style>` block left where the component is used.
    Inline,
}

impl StyleBind {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "" | "head" => Some(StyleBind::Head),
            "link" => Some(StyleBind::Link),
            "inline" => Some(StyleBind::Inline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComponentStyle {
    pub text: String,
    pub bind: StyleBind,
}

#[derive(Debug)]
pub struct Component {
    pub path: String,
    pub template: Dom,
    pub script: Option<Script>,
    pub style: Option<ComponentStyle>,
}

impl Component {
    /// Split a parsed component file into its sections. Scripts are
    /// compiled through `compile_script` so identical scripts share a unit.
    pub fn parse(
        text: &str,
        path: &str,
        compile_script: &mut dyn FnMut(&str) -> Result<Script>,
    ) -> Result<Self> {
        let dom = parse_html(text, path)?;
        let root = dom.root();
        let top: Vec<NodeId> = dom.children(root);

        let mut template: Option<NodeId> = None;
        let mut script = None;
        let mut style = None;
        let mut rest = Vec::new();

        for node in top {
            match dom.tag_name(node) {
                Some("template") if template.is_none() => template = Some(node),
                Some("script") if script.is_none() => {
                    script = Some(compile_script(&dom.text_content(node))?);
                }
                Some("style") if style.is_none() => {
                    let bind_attr = dom
                        .tag(node)
                        .and_then(|t| t.attr_str("bind"))
                        .unwrap_or_default();
                    let bind = StyleBind::parse(&bind_attr).ok_or_else(|| {
                        CompileError::structure(
                            path,
                            "style",
                            format!("unknown bind mode '{}', expected head, link or inline", bind_attr),
                        )
                    })?;
                    style = Some(ComponentStyle {
                        text: dom.text_content(node),
                        bind,
                    });
                }
                _ => rest.push(node),
            }
        }

        let template = match template {
            Some(node) => dom.extract(&dom.children(node)),
            None => {
                // Whitespace between the sections is not part of the template.
                let nodes: Vec<NodeId> = rest
                    .into_iter()
                    .filter(|n| !matches!(dom.data(*n), NodeData::Text(t) if t.trim().is_empty()))
                    .collect();
                dom.extract(&nodes)
            }
        };

        Ok(Self {
            path: path.to_string(),
            template,
            script,
            style,
        })
    }
}
