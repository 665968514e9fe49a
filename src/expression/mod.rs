//! Embedded expression engine.
//!
//! Two syntaxes are recognised in attribute values and text:
//!
//! * **template style**: any text containing `${`. The whole text is
//!   evaluated as a JavaScript template literal and produces a string.
//!   `\${` leaves a literal `${` in the output.
//! * **single-expression style**: the trimmed text is `{{ expr }}` and the
//!   raw value of `expr` is produced. `\{{ expr }}` produces the literal text.
//!
//! Text is compiled into an [`EvalContent`], an immutable unit that can be
//! invoked any number of times against different scopes. Units are cheap to
//! clone and are cached by source text in the pipeline cache.

pub mod ast;
pub mod builtins;
pub mod eval;

use lazy_static::lazy_static;
use regex::Regex;
use std::marker::PhantomData;
use std::rc::Rc;

pub use eval::{Callable, Env, EvalHost, Interpreter};

use crate::error::{CompileError, Result};
use crate::value::{ObjectMap, Value};
use ast::{Expr, Stmt};

lazy_static! {
    static ref SINGLE_EXPR_RE: Regex = Regex::new(r"^\s*(\\?)\{\{([\s\S]*)\}\}\s*$").unwrap();
}

/// Does `text` contain embedded expression syntax?
pub fn is_expression_string(text: &str) -> bool {
    text.contains("${") || SINGLE_EXPR_RE.is_match(text)
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILED UNITS
// ═══════════════════════════════════════════════════════════════════════════════

enum Compiled {
    Expr(Expr),
    Literal(Value),
    Script(Vec<Stmt>),
}

/// Conversion from an evaluation result.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value.to_display_string())
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value.is_truthy())
    }
}

/// A compiled expression or script.
pub struct EvalContent<T = Value> {
    source: Rc<str>,
    compiled: Rc<Compiled>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for EvalContent<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            compiled: self.compiled.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for EvalContent<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalContent")
            .field("source", &self.source)
            .finish()
    }
}

impl<T: FromValue> EvalContent<T> {
    fn new(source: &str, compiled: Compiled) -> Self {
        Self {
            source: Rc::from(source),
            compiled: Rc::new(compiled),
            _marker: PhantomData,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// View the same unit with a different result type.
    pub fn cast<U: FromValue>(&self) -> EvalContent<U> {
        EvalContent {
            source: self.source.clone(),
            compiled: self.compiled.clone(),
            _marker: PhantomData,
        }
    }

    /// Evaluate against the scope and context supplied by `host`.
    pub fn invoke(&self, host: &mut dyn EvalHost) -> Result<T> {
        let value = match self.compiled.as_ref() {
            Compiled::Literal(value) => value.clone(),
            Compiled::Expr(expr) => Interpreter::new(host).eval(expr, &Env::new_root())?,
            Compiled::Script(body) => Interpreter::new(host).run_script(body)?,
        };
        T::from_value(value)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Compile an expression string. Plain text is an error.
pub fn parse_expression(text: &str) -> Result<EvalContent> {
    if text.contains("${") {
        let source = template_source(text)?;
        let expr = ast::parse_js_expression(&source).map_err(|e| with_source(e, text))?;
        return Ok(EvalContent::new(text, Compiled::Expr(expr)));
    }
    if let Some(caps) = SINGLE_EXPR_RE.captures(text) {
        let inner = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        if caps.get(1).is_some_and(|m| !m.as_str().is_empty()) {
            let literal = Value::from(format!("{{{{{}}}}}", inner));
            return Ok(EvalContent::new(text, Compiled::Literal(literal)));
        }
        if inner.trim().is_empty() {
            return Err(CompileError::syntax(text, "empty expression"));
        }
        let expr = ast::parse_js_expression(inner).map_err(|e| with_source(e, text))?;
        return Ok(EvalContent::new(text, Compiled::Expr(expr)));
    }
    Err(CompileError::syntax(text, "not an expression string"))
}

/// Compile the value of a control attribute (`?`, `of`, `in`). Both
/// embedded syntaxes are accepted, and so is a bare expression.
pub fn parse_control_expression(text: &str) -> Result<EvalContent> {
    if is_expression_string(text) {
        return parse_expression(text);
    }
    if text.trim().is_empty() {
        return Err(CompileError::syntax(text, "empty expression"));
    }
    let expr = ast::parse_js_expression(text)?;
    Ok(EvalContent::new(text, Compiled::Expr(expr)))
}

fn with_source(err: CompileError, text: &str) -> CompileError {
    match err {
        CompileError::ExpressionSyntax { message, .. } => CompileError::syntax(text, message),
        other => other,
    }
}

/// Turn template-style text into the source of a JS template literal.
fn template_source(text: &str) -> Result<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 2);
    out.push('`');
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if chars.get(i + 1) == Some(&'$') && chars.get(i + 2) == Some(&'{') => {
                out.push_str("\\${");
                i += 3;
            }
            '\\' => {
                out.push_str("\\\\");
                i += 1;
            }
            '`' => {
                out.push_str("\\`");
                i += 1;
            }
            '$' if chars.get(i + 1) == Some(&'{') => {
                let end = find_interpolation_end(&chars, i + 2)
                    .ok_or_else(|| CompileError::syntax(text, "unterminated ${ interpolation"))?;
                out.extend(&chars[i..end]);
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out.push('`');
    Ok(out)
}

/// Index just past the `}` closing an interpolation whose body starts at
/// `start`. Quotes and nested template literals are skipped.
fn find_interpolation_end(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\'' | '"' => i = skip_string(chars, i)?,
            '`' => i = skip_template(chars, i)?,
            '{' => {
                depth += 1;
                i += 1;
            }
            '}' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => i += 1,
        }
    }
    None
}

fn skip_string(chars: &[char], start: usize) -> Option<usize> {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn skip_template(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '`' => return Some(i + 1),
            '$' if chars.get(i + 1) == Some(&'{') => i = find_interpolation_end(chars, i + 2)?,
            _ => i += 1,
        }
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT SCRIPTS
// ═══════════════════════════════════════════════════════════════════════════════

/// How a component script produces its instance object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// The script's result (default export, or its declarations) is the instance.
    Object,
    /// The script exports a function called as `($, $$)`.
    Factory,
    /// The script exports a class constructed with `($, $$)`.
    Constructor,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub content: EvalContent,
    pub kind: ScriptKind,
}

/// Compile a component `<script>` body.
pub fn parse_script(text: &str) -> Result<Script> {
    let body = ast::parse_js_module(text)?;
    let kind = script_kind(&body);
    Ok(Script {
        content: EvalContent::new(text, Compiled::Script(body)),
        kind,
    })
}

fn script_kind(body: &[Stmt]) -> ScriptKind {
    let exported = body
        .iter()
        .find_map(|stmt| match stmt {
            Stmt::ExportDefault(expr) => Some(expr),
            _ => None,
        })
        .or_else(|| match body.last() {
            Some(Stmt::Expr(expr)) => Some(expr),
            _ => None,
        });
    match exported {
        Some(Expr::Function(_)) => ScriptKind::Factory,
        Some(Expr::Class(_)) => ScriptKind::Constructor,
        Some(Expr::Ident(name)) => body
            .iter()
            .find_map(|stmt| match stmt {
                Stmt::Function(n, _) if n == name => Some(ScriptKind::Factory),
                Stmt::Class(n, _) if n == name => Some(ScriptKind::Constructor),
                _ => None,
            })
            .unwrap_or(ScriptKind::Object),
        _ => ScriptKind::Object,
    }
}

impl Script {
    /// Run the script for one component use. Factories and constructors
    /// receive the host's scope (`$`) and context (`$$`).
    pub fn instantiate(&self, host: &mut dyn EvalHost) -> Result<ObjectMap> {
        let Compiled::Script(body) = self.content.compiled.as_ref() else {
            return Ok(ObjectMap::new());
        };
        let scope = host.scope_object();
        let context = host.context_object();
        let mut interp = Interpreter::new(host);
        let exported = interp.run_script(body)?;
        let instance = match self.kind {
            ScriptKind::Object => exported,
            ScriptKind::Factory => interp.call_function(&exported, Value::Undefined, vec![scope, context])?,
            ScriptKind::Constructor => interp.construct(&exported, vec![scope, context])?,
        };
        match instance {
            Value::Object(map) => Ok(map.as_ref().clone()),
            Value::Undefined | Value::Null => Ok(ObjectMap::new()),
            other => Err(CompileError::type_error(format!(
                "component script must produce an object, got {}",
                other.type_name()
            ))),
        }
    }
}
