//! Pipeline options.
//!
//! Options are plain serde data in camelCase JSON; every field has a default
//! so an empty object is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, Result};

/// How anchor and `m-path` URLs are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorMode {
    /// Leave the URL unmodified.
    None,
    /// Relative to the fragment that contains the anchor.
    #[default]
    Local,
    /// Relative to the root document being compiled.
    Root,
    /// Relative to the project base directory.
    Base,
}

impl AnchorMode {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "none" => Some(AnchorMode::None),
            "local" => Some(AnchorMode::Local),
            "root" => Some(AnchorMode::Root),
            "base" => Some(AnchorMode::Base),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineOptions {
    pub default_anchor_mode: AnchorMode,
    /// Prefix compiled pages with `<!DOCTYPE html>`.
    pub emit_doctype: bool,
    /// Collapse whitespace runs outside whitespace-sensitive subtrees.
    pub collapse_whitespace: bool,
    /// Text of the `<title>` synthesized for pages without one.
    pub default_title: String,
    /// Variables seeded into the root scope of every page.
    pub globals: serde_json::Map<String, serde_json::Value>,
    /// Maximum fragment nesting depth.
    pub max_depth: usize,
    /// Directory that receives linked style and script resources.
    pub asset_dir: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            default_anchor_mode: AnchorMode::Local,
            emit_doctype: true,
            collapse_whitespace: false,
            default_title: String::new(),
            globals: serde_json::Map::new(),
            max_depth: 64,
            asset_dir: "assets".to_string(),
        }
    }
}

impl PipelineOptions {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| CompileError::Config {
            message: format!("invalid pipeline options: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let options = PipelineOptions::from_json("{}").unwrap();
        assert_eq!(options, PipelineOptions::default());
        assert!(options.emit_doctype);
        assert_eq!(options.max_depth, 64);
    }

    #[test]
    fn test_camel_case_fields() {
        let options = PipelineOptions::from_json(
            r#"{ "defaultAnchorMode": "base", "collapseWhitespace": true, "globals": { "site": "Docs" } }"#,
        )
        .unwrap();
        assert_eq!(options.default_anchor_mode, AnchorMode::Base);
        assert!(options.collapse_whitespace);
        assert_eq!(options.globals.get("site"), Some(&serde_json::json!("Docs")));
    }

    #[test]
    fn test_invalid_options_are_config_errors() {
        let err = PipelineOptions::from_json(r#"{ "defaultAnchorMode": "sideways" }"#).unwrap_err();
        assert_eq!(err.code(), crate::error::ERR_CONFIG);
    }
}
