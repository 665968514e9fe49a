//! Fragment and component expansion.
//!
//! Runs on exit, after the reference's own attributes and children are
//! final. The children become slot content, the attributes (other than
//! `src`) the referenced template's scope. The referenced template is
//! compiled recursively with a child context and the reference is replaced
//! by the compiled children.

use indexmap::IndexMap;
use std::rc::Rc;
use tracing::debug;

use crate::compiler::{CompileUnit, CompilerModule};
use crate::dom::{Dom, NodeData, NodeId, TagKind, DEFAULT_SLOT};
use crate::error::Result;
use crate::paths::{self, kebab_to_camel};
use crate::pipeline::{FragmentContext, ReferenceKind};
use crate::value::ScopeVars;

use super::tag_of;

pub struct FragmentModule;

const SLOT_ATTR: &str = "slot";

impl CompilerModule for FragmentModule {
    fn name(&self) -> &'static str {
        "fragment"
    }

    fn exit_node(&self, unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
        let Some(tag) = tag_of(unit, node) else {
            return Ok(());
        };
        let kind = match tag.kind {
            TagKind::FragmentRef => ReferenceKind::Fragment,
            TagKind::ComponentRef => ReferenceKind::Component,
            _ => return Ok(()),
        };
        let src = tag.attr_str("src").unwrap_or_default();
        let path = paths::resolve(unit.path(), src.trim());

        let scope: ScopeVars = tag
            .attrs
            .iter()
            .filter(|(name, _)| name.as_str() != "src")
            .map(|(name, value)| (kebab_to_camel(name), value.clone()))
            .collect();
        let slots = extract_slots(&mut unit.dom, node);
        debug!(
            path = %path,
            from = %unit.path(),
            slots = slots.len(),
            "expanding {}",
            kind.tag()
        );

        let context = Rc::new(FragmentContext::child(&unit.context, &path, scope, slots));
        let compiled = unit.pipeline.compile_reference(kind, &path, context)?;
        let nodes = unit.dom.import_children(&compiled, compiled.root());
        unit.dom.replace(node, &nodes)
    }
}

/// Partition the reference's children into slot contents: `<m-content
/// slot="x">` wrappers contribute their children, elements carrying
/// `slot="x"` contribute themselves, everything else goes to the default
/// slot. Default content made only of whitespace and comments is absent.
fn extract_slots(dom: &mut Dom, node: NodeId) -> IndexMap<String, Rc<Dom>> {
    let mut slots: IndexMap<String, Vec<NodeId>> = IndexMap::new();
    let mut default = Vec::new();

    for child in dom.children(node) {
        let slot = match dom.tag(child) {
            Some(tag) if tag.kind == TagKind::Content => Some((tag.slot_name(), true)),
            Some(tag) => tag
                .attr_str(SLOT_ATTR)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(|s| (s, false)),
            None => None,
        };
        match slot {
            Some((name, true)) => slots.entry(name).or_default().extend(dom.children(child)),
            Some((name, false)) => {
                if let Some(tag) = dom.tag_mut(child) {
                    tag.remove_attr(SLOT_ATTR);
                }
                slots.entry(name).or_default().push(child);
            }
            None => default.push(child),
        }
    }

    let meaningful = default.iter().any(|&n| match dom.data(n) {
        NodeData::Text(text) => !text.trim().is_empty(),
        NodeData::Comment(_) => false,
        _ => true,
    });
    if meaningful {
        slots.entry(DEFAULT_SLOT.to_string()).or_default().extend(default);
    }

    slots
        .into_iter()
        .map(|(name, nodes)| (name, Rc::new(dom.extract(&nodes))))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::error::{CompileError, ERR_MISSING_RESOURCE};
    use crate::test_support::{render_fragment, try_render_fragment};

    #[test]
    fn test_attributes_become_fragment_scope() {
        let out = render_fragment(
            &[
                (
                    "index.html",
                    "<m-var outer=\"hidden\"></m-var><m-fragment src=\"_hello.html\" user-name=\"Ada\" count=\"{{ 2 + 1 }}\"></m-fragment>",
                ),
                ("_hello.html", "<p>${ $.userName } ${ count + 1 } ${ $.outer ?? 'none' }</p>"),
            ],
            "index.html",
        );
        assert_eq!(out, "<p>Ada 4 none</p>");
    }

    #[test]
    fn test_slot_used_twice_gets_two_copies() {
        let out = render_fragment(
            &[
                ("index.html", "<m-fragment src=\"_twice.html\"><b>x</b></m-fragment>"),
                ("_twice.html", "<m-slot></m-slot>|<m-slot></m-slot>"),
            ],
            "index.html",
        );
        assert_eq!(out, "<b>x</b>|<b>x</b>");
    }

    #[test]
    fn test_whitespace_only_default_slot_is_absent() {
        let out = render_fragment(
            &[
                ("index.html", "<m-fragment src=\"_f.html\">\n  <!-- nothing -->\n</m-fragment>"),
                ("_f.html", "[<m-slot></m-slot>]"),
            ],
            "index.html",
        );
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_nested_fragments_resolve_relative_paths() {
        let out = render_fragment(
            &[
                ("pages/index.html", "<m-fragment src=\"../parts/_outer.html\"></m-fragment>"),
                ("parts/_outer.html", "<div><m-fragment src=\"_inner.html\"></m-fragment></div>"),
                ("parts/_inner.html", "<span>${ $$.fragment } in ${ $$.root }</span>"),
            ],
            "pages/index.html",
        );
        assert_eq!(out, "<div><span>parts/_inner.html in pages/index.html</span></div>");
    }

    #[test]
    fn test_missing_fragment_names_requester() {
        let err = try_render_fragment(
            &[("index.html", "<m-fragment src=\"_gone.html\"></m-fragment>")],
            "index.html",
        )
        .unwrap_err();
        assert_eq!(err.code(), ERR_MISSING_RESOURCE);
        match err {
            CompileError::MissingResource { path, requested_by, .. } => {
                assert_eq!(path, "_gone.html");
                assert_eq!(requested_by, "index.html");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_recursive_inclusion_is_rejected() {
        let err = try_render_fragment(
            &[
                ("index.html", "<m-fragment src=\"_a.html\"></m-fragment>"),
                ("_a.html", "<m-fragment src=\"_b.html\"></m-fragment>"),
                ("_b.html", "<m-fragment src=\"_a.html\"></m-fragment>"),
            ],
            "index.html",
        )
        .unwrap_err();
        match err {
            CompileError::RecursiveInclusion { path, chain } => {
                assert_eq!(path, "_a.html");
                assert_eq!(chain, vec!["index.html", "_a.html", "_b.html", "_a.html"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
