//! Compiler errors.
//!
//! Every failure the compiler can report is a [`CompileError`]. Each variant
//! carries a stable code so callers (and tests) can match on the kind of
//! failure without parsing messages.

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_STRUCTURE: &str = "M-ERR-STRUCT-001";
pub const ERR_UNRESOLVED_TAG: &str = "M-ERR-STRUCT-002";
pub const ERR_EXPR_SYNTAX: &str = "M-ERR-EXPR-001";
pub const ERR_EXPR_RUNTIME: &str = "M-ERR-EXPR-002";
pub const ERR_MISSING_RESOURCE: &str = "M-ERR-RES-001";
pub const ERR_RECURSIVE_INCLUSION: &str = "M-ERR-RES-002";
pub const ERR_INVALID_TREE: &str = "M-ERR-DOM-001";
pub const ERR_IO: &str = "M-ERR-IO-001";
pub const ERR_CONFIG: &str = "M-ERR-CONFIG-001";

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// A template-control tag is malformed (e.g. `<m-if>` without a test).
    #[error("[{}] <{tag}> in {path}: {message}", ERR_STRUCTURE)]
    Structure {
        path: String,
        tag: String,
        message: String,
    },

    /// A template-control tag survived compilation.
    #[error("[{}] <{tag}> was not resolved in {path}", ERR_UNRESOLVED_TAG)]
    UnresolvedTemplateTag { path: String, tag: String },

    #[error("[{}] invalid expression `{source_text}`: {message}", ERR_EXPR_SYNTAX)]
    ExpressionSyntax {
        source_text: String,
        message: String,
    },

    #[error("[{}] {kind}: {message}", ERR_EXPR_RUNTIME)]
    ExpressionRuntime { kind: RuntimeErrorKind, message: String },

    #[error("[{}] cannot load '{path}' (requested by {requested_by}): {message}", ERR_MISSING_RESOURCE)]
    MissingResource {
        path: String,
        requested_by: String,
        message: String,
    },

    #[error("[{}] '{path}' includes itself: {}", ERR_RECURSIVE_INCLUSION, .chain.join(" -> "))]
    RecursiveInclusion { path: String, chain: Vec<String> },

    #[error("[{}] {message}", ERR_INVALID_TREE)]
    InvalidTree { message: String },

    #[error("[{}] writing '{path}': {message}", ERR_IO)]
    Io { path: String, message: String },

    #[error("[{}] {message}", ERR_CONFIG)]
    Config { message: String },
}

/// JavaScript-style classification of evaluation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    ReferenceError,
    TypeError,
    RangeError,
    Error,
}

impl std::fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RuntimeErrorKind::ReferenceError => "ReferenceError",
            RuntimeErrorKind::TypeError => "TypeError",
            RuntimeErrorKind::RangeError => "RangeError",
            RuntimeErrorKind::Error => "Error",
        };
        f.write_str(name)
    }
}

impl CompileError {
    pub fn structure(path: &str, tag: &str, message: impl Into<String>) -> Self {
        CompileError::Structure {
            path: path.to_string(),
            tag: tag.to_string(),
            message: message.into(),
        }
    }

    pub fn syntax(source_text: &str, message: impl Into<String>) -> Self {
        CompileError::ExpressionSyntax {
            source_text: source_text.to_string(),
            message: message.into(),
        }
    }

    pub fn runtime(kind: RuntimeErrorKind, message: impl Into<String>) -> Self {
        CompileError::ExpressionRuntime {
            kind,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::runtime(RuntimeErrorKind::TypeError, message)
    }

    pub fn missing(path: &str, requested_by: &str, message: impl Into<String>) -> Self {
        CompileError::MissingResource {
            path: path.to_string(),
            requested_by: requested_by.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_tree(message: impl Into<String>) -> Self {
        CompileError::InvalidTree {
            message: message.into(),
        }
    }

    /// Attach the resource path to a structural error raised before the
    /// path was known (tags are classified without knowing their file).
    pub fn in_file(self, file: &str) -> Self {
        match self {
            CompileError::Structure { path, tag, message } if path.is_empty() => {
                CompileError::Structure {
                    path: file.to_string(),
                    tag,
                    message,
                }
            }
            other => other,
        }
    }

    /// Stable error code, e.g. `M-ERR-EXPR-001`.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::Structure { .. } => ERR_STRUCTURE,
            CompileError::UnresolvedTemplateTag { .. } => ERR_UNRESOLVED_TAG,
            CompileError::ExpressionSyntax { .. } => ERR_EXPR_SYNTAX,
            CompileError::ExpressionRuntime { .. } => ERR_EXPR_RUNTIME,
            CompileError::MissingResource { .. } => ERR_MISSING_RESOURCE,
            CompileError::RecursiveInclusion { .. } => ERR_RECURSIVE_INCLUSION,
            CompileError::InvalidTree { .. } => ERR_INVALID_TREE,
            CompileError::Io { .. } => ERR_IO,
            CompileError::Config { .. } => ERR_CONFIG,
        }
    }
}
