//! Tag nodes and template-control tag kinds.
//!
//! The kind of a tag is derived from its name when the node is built and the
//! required attributes are checked at the same time, so a malformed control
//! tag fails early with the tag identified. Attribute *values* are always read
//! live from the attribute map: the expression module may have replaced the
//! raw text with an evaluated value by the time a later module looks at it.

use indexmap::IndexMap;

use crate::error::{CompileError, Result};
use crate::value::Value;

pub const DEFAULT_SLOT: &str = "[default]";

/// Ordered attribute map. Values start as strings and may be replaced by the
/// result of evaluating an embedded expression.
pub type Attributes = IndexMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForMode {
    /// `of`: iterate the items of a sequence.
    Of,
    /// `in`: iterate the keys of a collection.
    In,
}

impl ForMode {
    pub fn attribute(self) -> &'static str {
        match self {
            ForMode::Of => "of",
            ForMode::In => "in",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKind {
    Element,
    FragmentRef,
    ComponentRef,
    Content,
    Slot,
    If,
    ElseIf,
    Else,
    For {
        var: String,
        index: Option<String>,
        mode: ForMode,
    },
    Var,
    Scope,
    Data,
    Import,
    Whitespace,
}

impl TagKind {
    /// Everything except a plain element is a template-control tag and must
    /// not survive compilation.
    pub fn is_template_control(&self) -> bool {
        !matches!(self, TagKind::Element)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, TagKind::FragmentRef | TagKind::ComponentRef)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagNode {
    pub name: String,
    pub attrs: Attributes,
    pub kind: TagKind,
}

impl TagNode {
    /// Build a tag, classifying it and validating its control attributes.
    pub fn new(name: impl Into<String>, attrs: Attributes) -> Result<Self> {
        let name = name.into();
        let kind = classify(&name, &attrs)?;
        Ok(Self { name, attrs, kind })
    }

    /// A plain element with no attributes.
    pub fn element(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Attributes::new(),
            kind: TagKind::Element,
        }
    }

    /// Change the tag name and reclassify.
    pub fn rename(&mut self, name: &str) -> Result<()> {
        self.kind = classify(name, &self.attrs)?;
        self.name = name.to_string();
        Ok(())
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// Attribute value rendered as text, if present.
    pub fn attr_str(&self, name: &str) -> Option<String> {
        self.attrs.get(name).map(Value::to_display_string)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<Value>) {
        self.attrs.insert(name.to_string(), value.into());
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<Value> {
        self.attrs.shift_remove(name)
    }

    /// Slot name of an `m-slot` / `m-content` tag.
    pub fn slot_name(&self) -> String {
        match self.attr_str("slot") {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => DEFAULT_SLOT.to_string(),
        }
    }
}

fn classify(name: &str, attrs: &Attributes) -> Result<TagKind> {
    let require = |attr: &str| -> Result<()> {
        if attrs.contains_key(attr) {
            Ok(())
        } else {
            Err(CompileError::structure(
                "",
                name,
                format!("missing required attribute '{}'", attr),
            ))
        }
    };

    let kind = match name {
        "m-fragment" => {
            require("src")?;
            TagKind::FragmentRef
        }
        "m-component" => {
            require("src")?;
            TagKind::ComponentRef
        }
        "m-content" => TagKind::Content,
        "m-slot" => TagKind::Slot,
        "m-if" => {
            require("?")?;
            TagKind::If
        }
        "m-else-if" => {
            require("?")?;
            TagKind::ElseIf
        }
        "m-else" => TagKind::Else,
        "m-for" => {
            require("var")?;
            let mode = match (attrs.contains_key("of"), attrs.contains_key("in")) {
                (true, false) => ForMode::Of,
                (false, true) => ForMode::In,
                _ => {
                    return Err(CompileError::structure(
                        "",
                        name,
                        "exactly one of 'of' or 'in' is required",
                    ))
                }
            };
            let var = identifier_attr(name, attrs, "var")?.unwrap_or_default();
            let index = identifier_attr(name, attrs, "index")?;
            TagKind::For { var, index, mode }
        }
        "m-var" => TagKind::Var,
        "m-scope" => TagKind::Scope,
        "m-data" => TagKind::Data,
        "m-import" => {
            require("src")?;
            require("as")?;
            TagKind::Import
        }
        "m-whitespace" => TagKind::Whitespace,
        _ => TagKind::Element,
    };
    Ok(kind)
}

/// Read an attribute that must hold a plain variable name.
fn identifier_attr(tag: &str, attrs: &Attributes, attr: &str) -> Result<Option<String>> {
    let Some(value) = attrs.get(attr) else {
        return Ok(None);
    };
    let text = value.to_display_string();
    let text = text.trim();
    let valid = text
        .chars()
        .next()
        .map(|c| c.is_alphabetic() || c == '_' || c == '$')
        .unwrap_or(false)
        && text.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if !valid {
        return Err(CompileError::structure(
            "",
            tag,
            format!("'{}' must be a variable name, got '{}'", attr, text),
        ));
    }
    Ok(Some(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::string(v)))
            .collect()
    }

    #[test]
    fn test_classifies_control_tags() {
        let tag = TagNode::new("m-if", attrs(&[("?", "{{ true }}")])).unwrap();
        assert_eq!(tag.kind, TagKind::If);
        let tag = TagNode::new("div", attrs(&[])).unwrap();
        assert_eq!(tag.kind, TagKind::Element);
        assert!(!tag.kind.is_template_control());
    }

    #[test]
    fn test_missing_test_is_structural_error() {
        let err = TagNode::new("m-if", attrs(&[])).unwrap_err();
        assert_eq!(err.code(), crate::error::ERR_STRUCTURE);
        assert!(err.to_string().contains("'?'"));
    }

    #[test]
    fn test_for_requires_exactly_one_source() {
        let tag = TagNode::new("m-for", attrs(&[("var", "item"), ("of", "x"), ("index", "i")]))
            .unwrap();
        assert_eq!(
            tag.kind,
            TagKind::For {
                var: "item".to_string(),
                index: Some("i".to_string()),
                mode: ForMode::Of
            }
        );
        assert!(TagNode::new("m-for", attrs(&[("var", "x"), ("of", "a"), ("in", "b")])).is_err());
        assert!(TagNode::new("m-for", attrs(&[("var", "x")])).is_err());
        assert!(TagNode::new("m-for", attrs(&[("var", "not valid"), ("of", "a")])).is_err());
    }

    #[test]
    fn test_slot_name_defaults() {
        let tag = TagNode::new("m-slot", attrs(&[])).unwrap();
        assert_eq!(tag.slot_name(), DEFAULT_SLOT);
        let tag = TagNode::new("m-slot", attrs(&[("slot", "header")])).unwrap();
        assert_eq!(tag.slot_name(), "header");
    }

    #[test]
    fn test_rename_reclassifies() {
        let mut tag = TagNode::new("my-card", attrs(&[("src", "card.html")])).unwrap();
        assert_eq!(tag.kind, TagKind::Element);
        tag.rename("m-fragment").unwrap();
        assert_eq!(tag.kind, TagKind::FragmentRef);
    }
}
