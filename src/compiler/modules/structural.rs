//! Conditionals and loops.
//!
//! ```html
//! <m-if ?="{{ user }}">Hello</m-if>
//! <m-else-if ?="guest">Welcome</m-else-if>
//! <m-else>Sign in</m-else>
//!
//! <m-for var="post" index="i" of="{{ posts }}"><li>${ i }: ${ post.title }</li></m-for>
//! ```
//!
//! A conditional is replaced by its children when its test holds and removed
//! otherwise. A loop is replaced by one `m-scope` block per item, each
//! holding a fresh copy of the body with the loop variables bound on it.

use tracing::trace;

use crate::compiler::{CompileUnit, CompilerModule};
use crate::dom::{Attributes, ForMode, NodeData, NodeId, TagKind, TagNode};
use crate::error::{CompileError, Result};
use crate::value::Value;

use super::tag_of;

pub struct StructuralModule;

impl CompilerModule for StructuralModule {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn enter_node(&self, unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
        let Some(tag) = tag_of(unit, node) else {
            return Ok(());
        };
        match &tag.kind {
            TagKind::If => {
                let followers = chain_followers(unit, node);
                resolve_branch(unit, node, &tag, followers)
            }
            TagKind::ElseIf | TagKind::Else => {
                let followers = unit.state.else_chain.remove(&node).ok_or_else(|| {
                    CompileError::structure(
                        unit.path(),
                        &tag.name,
                        "must follow an <m-if> or <m-else-if>",
                    )
                })?;
                resolve_branch(unit, node, &tag, followers)
            }
            TagKind::For { var, index, mode } => {
                let source = tag.attr(mode.attribute()).cloned().unwrap_or(Value::Undefined);
                unroll(unit, node, var, index.as_deref(), iteration(&source, *mode))
            }
            _ => Ok(()),
        }
    }
}

/// The `m-else-if` / `m-else` siblings continuing the chain that starts
/// after `node`. Whitespace and comments between branches are ignored; the
/// chain ends at the first `m-else`.
fn chain_followers(unit: &CompileUnit<'_>, node: NodeId) -> Vec<NodeId> {
    let mut followers = Vec::new();
    let mut next = unit.dom.next_sibling(node);
    while let Some(current) = next {
        match unit.dom.data(current) {
            NodeData::Text(text) if text.trim().is_empty() => {}
            NodeData::Comment(_) => {}
            NodeData::Tag(tag) if tag.kind == TagKind::ElseIf => followers.push(current),
            NodeData::Tag(tag) if tag.kind == TagKind::Else => {
                followers.push(current);
                break;
            }
            _ => break,
        }
        next = unit.dom.next_sibling(current);
    }
    followers
}

fn resolve_branch(unit: &mut CompileUnit<'_>, node: NodeId, tag: &TagNode, followers: Vec<NodeId>) -> Result<()> {
    let taken = match tag.kind {
        TagKind::Else => true,
        _ => tag.attr("?").map(Value::is_truthy).unwrap_or(false),
    };
    trace!(tag = %tag.name, taken, "conditional");
    if taken {
        for follower in followers {
            unit.dom.detach(follower);
        }
        return unit.dom.promote_children(node);
    }
    if let Some((&next, rest)) = followers.split_first() {
        unit.state.else_chain.insert(next, rest.to_vec());
    }
    unit.dom.detach(node);
    Ok(())
}

/// `(value, index)` pairs of a loop source. Anything that is not iterable in
/// the requested mode yields nothing.
fn iteration(source: &Value, mode: ForMode) -> Vec<(Value, Value)> {
    match (mode, source) {
        (ForMode::Of, Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.clone(), Value::from(i)))
            .collect(),
        (ForMode::Of, Value::String(text)) => text
            .chars()
            .enumerate()
            .map(|(i, c)| (Value::from(c.to_string()), Value::from(i)))
            .collect(),
        (ForMode::In, Value::Object(map)) => map
            .keys()
            .enumerate()
            .map(|(i, key)| (Value::string(key), Value::from(i)))
            .collect(),
        (ForMode::In, Value::Array(items)) => (0..items.len())
            .map(|i| (Value::from(i), Value::from(i)))
            .collect(),
        _ => Vec::new(),
    }
}

fn unroll(
    unit: &mut CompileUnit<'_>,
    node: NodeId,
    var: &str,
    index: Option<&str>,
    pairs: Vec<(Value, Value)>,
) -> Result<()> {
    let body = unit.dom.children(node);
    for &child in &body {
        unit.dom.detach(child);
    }
    trace!(items = pairs.len(), "unrolling loop");

    // Each block goes right after the loop node, so inserting in reverse
    // leaves them in iteration order.
    for (value, position) in pairs.into_iter().rev() {
        let block = unit
            .dom
            .create_tag(TagNode::new("m-scope", Attributes::new())?);
        unit.dom.bind(block, var, value);
        if let Some(index) = index {
            unit.dom.bind(block, index, position);
        }
        for &child in &body {
            let copy = unit.dom.clone_subtree(child, &mut |_, _, _| {});
            unit.dom.append(block, copy)?;
        }
        unit.dom.insert_after(node, block)?;
    }
    unit.dom.detach(node);
    Ok(())
}
