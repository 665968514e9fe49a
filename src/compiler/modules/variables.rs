//! `m-var`, `m-scope` and `m-data`.
//!
//! * `<m-var a="1">` binds its attributes into the parent's scope and
//!   disappears.
//! * `<m-scope a="1">` binds into its own scope, so only its descendants see
//!   the bindings, and is replaced by its children once they are compiled.
//! * `<m-data type="application/json" posts="posts.json">` loads every
//!   named file relative to the current fragment and binds the result into
//!   the parent's scope.
//!
//! Attribute names are camelCased before binding: `page-title` is read as
//! `$.pageTitle`.

use tracing::warn;

use crate::compiler::{CompileUnit, CompilerModule};
use crate::dom::{NodeId, TagKind};
use crate::error::Result;
use crate::paths::kebab_to_camel;

use super::tag_of;

const DEFAULT_DATA_TYPE: &str = "application/json";

pub struct VariablesModule;

impl CompilerModule for VariablesModule {
    fn name(&self) -> &'static str {
        "variables"
    }

    fn enter_node(&self, unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
        let Some(tag) = tag_of(unit, node) else {
            return Ok(());
        };
        match tag.kind {
            TagKind::Var => {
                let Some(parent) = unit.dom.parent(node) else {
                    return Ok(());
                };
                for (name, value) in tag.attrs {
                    unit.dom.bind(parent, kebab_to_camel(&name), value);
                }
                unit.dom.detach(node);
            }
            TagKind::Scope => {
                for (name, value) in tag.attrs {
                    unit.dom.bind(node, kebab_to_camel(&name), value);
                }
            }
            TagKind::Data => {
                let Some(parent) = unit.dom.parent(node) else {
                    return Ok(());
                };
                let mime = tag
                    .attr_str("type")
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DATA_TYPE.to_string());
                let json = match DataFormat::from_mime(&mime) {
                    DataFormat::Json => true,
                    DataFormat::Text => false,
                    DataFormat::Unknown => {
                        warn!(mime = %mime, path = %unit.path(), "unknown m-data type, binding as text");
                        false
                    }
                };
                for (name, value) in &tag.attrs {
                    if name == "type" {
                        continue;
                    }
                    let target = value.to_display_string();
                    let loaded = unit.pipeline.load_value(&target, &unit.context, json)?;
                    unit.dom.bind(parent, kebab_to_camel(name), loaded);
                }
                unit.dom.detach(node);
            }
            _ => {}
        }
        Ok(())
    }

    fn exit_node(&self, unit: &mut CompileUnit<'_>, node: NodeId) -> Result<()> {
        if matches!(unit.dom.tag(node).map(|t| &t.kind), Some(TagKind::Scope)) {
            unit.dom.promote_children(node)?;
        }
        Ok(())
    }
}

enum DataFormat {
    Json,
    Text,
    Unknown,
}

impl DataFormat {
    fn from_mime(mime: &str) -> Self {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if essence == "application/json" || essence.ends_with("+json") || essence == "text/json" {
            DataFormat::Json
        } else if essence.starts_with("text/") {
            DataFormat::Text
        } else {
            DataFormat::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::render_fragment;

    #[test]
    fn test_var_binds_into_parent() {
        let out = render_fragment(
            &[("index.html", "<m-var key=\"value\"></m-var><div>${ $.key }</div>")],
            "index.html",
        );
        assert_eq!(out, "<div>value</div>");
    }

    #[test]
    fn test_attribute_names_are_camel_cased() {
        let out = render_fragment(
            &[("index.html", "<m-var page-title=\"Home\"></m-var><h1>{{ pageTitle }}</h1>")],
            "index.html",
        );
        assert_eq!(out, "<h1>Home</h1>");
    }

    #[test]
    fn test_scope_bindings_do_not_leak() {
        let out = render_fragment(
            &[(
                "index.html",
                "<m-scope x=\"in\"><p>${ $.x }</p></m-scope><p>${ $.x ?? 'out' }</p>",
            )],
            "index.html",
        );
        assert_eq!(out, "<p>in</p><p>out</p>");
    }

    #[test]
    fn test_data_loads_json_and_text() {
        let out = render_fragment(
            &[
                ("blog/index.html", "<m-data posts=\"posts.json\"></m-data><m-data type=\"text/plain\" note=\"note.txt\"></m-data><p>${ posts.length } ${ note }</p>"),
                ("blog/posts.json", "[{\"title\": \"a\"}, {\"title\": \"b\"}]"),
                ("blog/note.txt", "hello"),
            ],
            "blog/index.html",
        );
        assert_eq!(out, "<p>2 hello</p>");
    }
}
