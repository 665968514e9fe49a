//! Evaluates embedded expressions in attribute values and text.
//!
//! The test of a conditional and the source of a loop are also accepted as
//! bare expressions (`?="count > 1"`, `of="$.items"`). Text inside
//! `<script>` and `<style>` is opaque and never evaluated.

use crate::compiler::{CompileUnit, CompilerModule};
use crate::dom::{NodeData, NodeId, TagKind};
use crate::error::Result;
use crate::expression::is_expression_string;
use crate::value::Value;

use super::tag_of;

pub struct ExpressionModule;

const OPAQUE_PARENTS: &[&str] = &["script", "style"];

impl CompilerModule for ExpressionModule {
    fn name(&self) -> &'static str {
        "expression"
    }

    fn enter_node(&self, unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
        match unit.dom.data(node) {
            NodeData::Tag(_) => evaluate_attributes(unit, node),
            NodeData::Text(text) => {
                if !is_expression_string(text) {
                    return Ok(());
                }
                let opaque = unit
                    .dom
                    .parent(node)
                    .and_then(|p| unit.dom.tag_name(p))
                    .map(|name| OPAQUE_PARENTS.contains(&name))
                    .unwrap_or(false);
                if opaque {
                    return Ok(());
                }
                let text = text.clone();
                let value = unit.evaluate(node, &text, false)?;
                let rendered = if value.is_nullish() {
                    String::new()
                } else {
                    value.to_display_string()
                };
                unit.dom.node_mut(node).data = NodeData::Text(rendered);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn control_attributes(kind: &TagKind) -> &'static [&'static str] {
    match kind {
        TagKind::If | TagKind::ElseIf => &["?"],
        TagKind::For { .. } => &["of", "in"],
        _ => &[],
    }
}

fn evaluate_attributes(unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
    let Some(tag) = tag_of(unit, node) else {
        return Ok(());
    };
    let control = control_attributes(&tag.kind);
    for (name, value) in &tag.attrs {
        let Value::String(text) = value else {
            continue;
        };
        let is_control = control.contains(&name.as_str());
        if !is_control && !is_expression_string(text) {
            continue;
        }
        let evaluated = unit.evaluate(node, text, is_control && !is_expression_string(text))?;
        if let Some(tag) = unit.dom.tag_mut(node) {
            tag.set_attr(name, evaluated);
        }
    }
    Ok(())
}
