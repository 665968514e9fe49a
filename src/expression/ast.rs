//! Owned expression AST.
//!
//! Source text is parsed with oxc and immediately lowered into this tree,
//! which owns its data and can be cached and evaluated any number of times
//! after the arena allocator is gone. Syntax the evaluator does not support
//! is rejected here, at compile time, rather than at invocation.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, ArrayExpressionElement, AssignmentTarget, BindingPattern, ChainElement, Class,
    ClassElement, Declaration, ExportDefaultDeclarationKind, Expression, FormalParameters,
    Function, MethodDefinitionKind, ObjectPropertyKind, PropertyKey, Statement,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use oxc_syntax::operator::{AssignmentOperator, BinaryOperator, LogicalOperator, UnaryOperator};
use std::rc::Rc;

use crate::error::{CompileError, Result};
use crate::value::Value;

// ═══════════════════════════════════════════════════════════════════════════════
// TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    Plus,
    BitNot,
    Typeof,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

#[derive(Debug, Clone)]
pub enum MemberProp {
    Name(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum ListItem {
    Item(Expr),
    Spread(Expr),
    Hole,
}

#[derive(Debug, Clone)]
pub enum PropKey {
    Static(String),
    Computed(Expr),
}

#[derive(Debug, Clone)]
pub enum ObjectItem {
    Property(PropKey, Expr),
    Spread(Expr),
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Ident(String),
    Object {
        props: Vec<(PropKey, Pattern)>,
        rest: Option<Box<Pattern>>,
    },
    Array {
        items: Vec<Option<Pattern>>,
        rest: Option<Box<Pattern>>,
    },
    Default(Box<Pattern>, Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum AssignTarget {
    Ident(String),
    Member(Box<Expr>, MemberProp),
}

#[derive(Debug, Clone)]
pub enum FunctionBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<Pattern>,
    pub body: FunctionBody,
    /// Arrow functions take `this` from where they were created.
    pub is_arrow: bool,
}

#[derive(Debug)]
pub struct ClassDef {
    pub name: Option<String>,
    pub constructor: Option<Rc<FunctionDef>>,
    pub fields: Vec<(String, Option<Expr>)>,
    pub methods: Vec<(String, Rc<FunctionDef>)>,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Template {
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },
    Ident(String),
    This,
    Array(Vec<ListItem>),
    Object(Vec<ObjectItem>),
    Member {
        object: Box<Expr>,
        prop: MemberProp,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<ListItem>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<ListItem>,
    },
    /// Boundary of an optional chain: a short-circuit inside yields undefined.
    Chain(Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Sequence(Vec<Expr>),
    Function(Rc<FunctionDef>),
    Class(Rc<ClassDef>),
    Assign {
        op: Option<BinaryOp>,
        logical: Option<LogicalOp>,
        target: AssignTarget,
        value: Box<Expr>,
    },
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Let(Vec<(Pattern, Option<Expr>)>),
    Expr(Expr),
    Return(Option<Expr>),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    Block(Vec<Stmt>),
    Function(String, Rc<FunctionDef>),
    Class(String, Rc<ClassDef>),
    ExportDefault(Expr),
    Throw(Expr),
    Empty,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a single JavaScript expression.
pub fn parse_js_expression(code: &str) -> Result<Expr> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, code, SourceType::default()).parse_expression();
    let expr = ret.map_err(|errors| CompileError::syntax(code, join_errors(&errors)))?;
    // The parser stops after the first complete expression.
    let end = expr.span().end as usize;
    let rest = code.get(end..).unwrap_or_default().trim();
    if !rest.is_empty() {
        return Err(CompileError::syntax(
            code,
            format!("unexpected token after expression: `{}`", rest),
        ));
    }
    Lowering { code }.expr(&expr)
}

/// Parse a script module into statements.
pub fn parse_js_module(code: &str) -> Result<Vec<Stmt>> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(true);
    let ret = Parser::new(&allocator, code, source_type).parse();
    if !ret.errors.is_empty() {
        return Err(CompileError::syntax(code, join_errors(&ret.errors)));
    }
    let lowering = Lowering { code };
    ret.program
        .body
        .iter()
        .map(|stmt| lowering.stmt(stmt))
        .collect()
}

fn join_errors<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOWERING
// ═══════════════════════════════════════════════════════════════════════════════

struct Lowering<'c> {
    code: &'c str,
}

impl Lowering<'_> {
    fn unsupported(&self, what: &str) -> CompileError {
        CompileError::syntax(self.code, format!("{} is not supported", what))
    }

    fn expr(&self, expr: &Expression) -> Result<Expr> {
        let lowered = match expr {
            Expression::BooleanLiteral(b) => Expr::Literal(Value::Bool(b.value)),
            Expression::NullLiteral(_) => Expr::Literal(Value::Null),
            Expression::NumericLiteral(n) => Expr::Literal(Value::Number(n.value)),
            Expression::StringLiteral(s) => Expr::Literal(Value::string(s.value.as_str())),
            Expression::TemplateLiteral(tpl) => Expr::Template {
                quasis: tpl
                    .quasis
                    .iter()
                    .map(|q| {
                        q.value
                            .cooked
                            .as_ref()
                            .map(|c| c.to_string())
                            .unwrap_or_else(|| q.value.raw.to_string())
                    })
                    .collect(),
                exprs: tpl
                    .expressions
                    .iter()
                    .map(|e| self.expr(e))
                    .collect::<Result<_>>()?,
            },
            Expression::Identifier(id) => Expr::Ident(id.name.to_string()),
            Expression::ThisExpression(_) => Expr::This,
            Expression::ArrayExpression(arr) => {
                let mut items = Vec::with_capacity(arr.elements.len());
                for elem in &arr.elements {
                    items.push(match elem {
                        ArrayExpressionElement::SpreadElement(s) => {
                            ListItem::Spread(self.expr(&s.argument)?)
                        }
                        ArrayExpressionElement::Elision(_) => ListItem::Hole,
                        other => match other.as_expression() {
                            Some(e) => ListItem::Item(self.expr(e)?),
                            None => return Err(self.unsupported("this array element")),
                        },
                    });
                }
                Expr::Array(items)
            }
            Expression::ObjectExpression(obj) => {
                let mut items = Vec::with_capacity(obj.properties.len());
                for prop in &obj.properties {
                    match prop {
                        ObjectPropertyKind::ObjectProperty(p) => {
                            let key = self.prop_key(&p.key, p.computed)?;
                            items.push(ObjectItem::Property(key, self.expr(&p.value)?));
                        }
                        ObjectPropertyKind::SpreadProperty(s) => {
                            items.push(ObjectItem::Spread(self.expr(&s.argument)?));
                        }
                    }
                }
                Expr::Object(items)
            }
            Expression::StaticMemberExpression(m) => Expr::Member {
                object: Box::new(self.expr(&m.object)?),
                prop: MemberProp::Name(m.property.name.to_string()),
                optional: m.optional,
            },
            Expression::ComputedMemberExpression(m) => Expr::Member {
                object: Box::new(self.expr(&m.object)?),
                prop: MemberProp::Computed(Box::new(self.expr(&m.expression)?)),
                optional: m.optional,
            },
            Expression::CallExpression(call) => Expr::Call {
                callee: Box::new(self.expr(&call.callee)?),
                args: self.args(&call.arguments)?,
                optional: call.optional,
            },
            Expression::ChainExpression(chain) => {
                let inner = match &chain.expression {
                    ChainElement::CallExpression(call) => Expr::Call {
                        callee: Box::new(self.expr(&call.callee)?),
                        args: self.args(&call.arguments)?,
                        optional: call.optional,
                    },
                    ChainElement::StaticMemberExpression(m) => Expr::Member {
                        object: Box::new(self.expr(&m.object)?),
                        prop: MemberProp::Name(m.property.name.to_string()),
                        optional: m.optional,
                    },
                    ChainElement::ComputedMemberExpression(m) => Expr::Member {
                        object: Box::new(self.expr(&m.object)?),
                        prop: MemberProp::Computed(Box::new(self.expr(&m.expression)?)),
                        optional: m.optional,
                    },
                    _ => return Err(self.unsupported("this optional chain")),
                };
                Expr::Chain(Box::new(inner))
            }
            Expression::NewExpression(new_expr) => Expr::New {
                callee: Box::new(self.expr(&new_expr.callee)?),
                args: self.args(&new_expr.arguments)?,
            },
            Expression::UnaryExpression(unary) => {
                let op = match unary.operator {
                    UnaryOperator::LogicalNot => UnaryOp::Not,
                    UnaryOperator::UnaryNegation => UnaryOp::Minus,
                    UnaryOperator::UnaryPlus => UnaryOp::Plus,
                    UnaryOperator::BitwiseNot => UnaryOp::BitNot,
                    UnaryOperator::Typeof => UnaryOp::Typeof,
                    UnaryOperator::Void => UnaryOp::Void,
                    UnaryOperator::Delete => return Err(self.unsupported("delete")),
                };
                Expr::Unary(op, Box::new(self.expr(&unary.argument)?))
            }
            Expression::BinaryExpression(bin) => {
                let op = self.binary_op(bin.operator)?;
                Expr::Binary(
                    op,
                    Box::new(self.expr(&bin.left)?),
                    Box::new(self.expr(&bin.right)?),
                )
            }
            Expression::LogicalExpression(logical) => Expr::Logical(
                logical_op(logical.operator),
                Box::new(self.expr(&logical.left)?),
                Box::new(self.expr(&logical.right)?),
            ),
            Expression::ConditionalExpression(cond) => Expr::Conditional(
                Box::new(self.expr(&cond.test)?),
                Box::new(self.expr(&cond.consequent)?),
                Box::new(self.expr(&cond.alternate)?),
            ),
            Expression::SequenceExpression(seq) => Expr::Sequence(
                seq.expressions
                    .iter()
                    .map(|e| self.expr(e))
                    .collect::<Result<_>>()?,
            ),
            Expression::ParenthesizedExpression(paren) => self.expr(&paren.expression)?,
            Expression::ArrowFunctionExpression(arrow) => {
                if arrow.r#async {
                    return Err(self.unsupported("async functions"));
                }
                let params = self.params(&arrow.params)?;
                let statements = arrow
                    .body
                    .statements
                    .iter()
                    .map(|s| self.stmt(s))
                    .collect::<Result<Vec<_>>>()?;
                let body = match (arrow.expression, statements.as_slice()) {
                    (true, [Stmt::Expr(e)]) => FunctionBody::Expr(Box::new(e.clone())),
                    _ => FunctionBody::Block(statements),
                };
                Expr::Function(Rc::new(FunctionDef {
                    name: None,
                    params,
                    body,
                    is_arrow: true,
                }))
            }
            Expression::FunctionExpression(func) => Expr::Function(self.function(func)?),
            Expression::ClassExpression(class) => Expr::Class(self.class(class)?),
            Expression::AssignmentExpression(assign) => {
                let target = match &assign.left {
                    AssignmentTarget::AssignmentTargetIdentifier(id) => {
                        AssignTarget::Ident(id.name.to_string())
                    }
                    AssignmentTarget::StaticMemberExpression(m) => AssignTarget::Member(
                        Box::new(self.expr(&m.object)?),
                        MemberProp::Name(m.property.name.to_string()),
                    ),
                    AssignmentTarget::ComputedMemberExpression(m) => AssignTarget::Member(
                        Box::new(self.expr(&m.object)?),
                        MemberProp::Computed(Box::new(self.expr(&m.expression)?)),
                    ),
                    _ => return Err(self.unsupported("destructuring assignment")),
                };
                let (op, logical) = match assign.operator {
                    AssignmentOperator::Assign => (None, None),
                    AssignmentOperator::Addition => (Some(BinaryOp::Add), None),
                    AssignmentOperator::Subtraction => (Some(BinaryOp::Sub), None),
                    AssignmentOperator::Multiplication => (Some(BinaryOp::Mul), None),
                    AssignmentOperator::Division => (Some(BinaryOp::Div), None),
                    AssignmentOperator::Remainder => (Some(BinaryOp::Rem), None),
                    AssignmentOperator::LogicalAnd => (None, Some(LogicalOp::And)),
                    AssignmentOperator::LogicalOr => (None, Some(LogicalOp::Or)),
                    AssignmentOperator::LogicalNullish => (None, Some(LogicalOp::Coalesce)),
                    _ => return Err(self.unsupported("this assignment operator")),
                };
                Expr::Assign {
                    op,
                    logical,
                    target,
                    value: Box::new(self.expr(&assign.right)?),
                }
            }
            _ => return Err(self.unsupported("this expression")),
        };
        Ok(lowered)
    }

    fn binary_op(&self, op: BinaryOperator) -> Result<BinaryOp> {
        Ok(match op {
            BinaryOperator::Addition => BinaryOp::Add,
            BinaryOperator::Subtraction => BinaryOp::Sub,
            BinaryOperator::Multiplication => BinaryOp::Mul,
            BinaryOperator::Division => BinaryOp::Div,
            BinaryOperator::Remainder => BinaryOp::Rem,
            BinaryOperator::Exponential => BinaryOp::Exp,
            BinaryOperator::Equality => BinaryOp::Eq,
            BinaryOperator::Inequality => BinaryOp::NotEq,
            BinaryOperator::StrictEquality => BinaryOp::StrictEq,
            BinaryOperator::StrictInequality => BinaryOp::StrictNotEq,
            BinaryOperator::LessThan => BinaryOp::Lt,
            BinaryOperator::LessEqualThan => BinaryOp::LtEq,
            BinaryOperator::GreaterThan => BinaryOp::Gt,
            BinaryOperator::GreaterEqualThan => BinaryOp::GtEq,
            BinaryOperator::In => BinaryOp::In,
            BinaryOperator::BitwiseAnd => BinaryOp::BitAnd,
            BinaryOperator::BitwiseOR => BinaryOp::BitOr,
            BinaryOperator::BitwiseXOR => BinaryOp::BitXor,
            BinaryOperator::ShiftLeft => BinaryOp::Shl,
            BinaryOperator::ShiftRight => BinaryOp::Shr,
            BinaryOperator::ShiftRightZeroFill => BinaryOp::UShr,
            BinaryOperator::Instanceof => return Err(self.unsupported("instanceof")),
        })
    }

    fn args(&self, args: &[Argument]) -> Result<Vec<ListItem>> {
        args.iter()
            .map(|arg| match arg {
                Argument::SpreadElement(s) => Ok(ListItem::Spread(self.expr(&s.argument)?)),
                other => match other.as_expression() {
                    Some(e) => Ok(ListItem::Item(self.expr(e)?)),
                    None => Err(self.unsupported("this argument")),
                },
            })
            .collect()
    }

    fn prop_key(&self, key: &PropertyKey, computed: bool) -> Result<PropKey> {
        if !computed {
            if let Some(name) = key.static_name() {
                return Ok(PropKey::Static(name.to_string()));
            }
        }
        match key.as_expression() {
            Some(e) => Ok(PropKey::Computed(self.expr(e)?)),
            None => Err(self.unsupported("private names")),
        }
    }

    fn pattern(&self, pattern: &BindingPattern) -> Result<Pattern> {
        match pattern {
            BindingPattern::BindingIdentifier(id) => Ok(Pattern::Ident(id.name.to_string())),
            BindingPattern::ObjectPattern(obj) => {
                let mut props = Vec::with_capacity(obj.properties.len());
                for prop in &obj.properties {
                    props.push((self.prop_key(&prop.key, prop.computed)?, self.pattern(&prop.value)?));
                }
                let rest = match &obj.rest {
                    Some(rest) => Some(Box::new(self.pattern(&rest.argument)?)),
                    None => None,
                };
                Ok(Pattern::Object { props, rest })
            }
            BindingPattern::ArrayPattern(arr) => {
                let mut items = Vec::with_capacity(arr.elements.len());
                for elem in &arr.elements {
                    items.push(match elem {
                        Some(p) => Some(self.pattern(p)?),
                        None => None,
                    });
                }
                let rest = match &arr.rest {
                    Some(rest) => Some(Box::new(self.pattern(&rest.argument)?)),
                    None => None,
                };
                Ok(Pattern::Array { items, rest })
            }
            BindingPattern::AssignmentPattern(assign) => Ok(Pattern::Default(
                Box::new(self.pattern(&assign.left)?),
                Box::new(self.expr(&assign.right)?),
            )),
        }
    }

    fn params(&self, params: &FormalParameters) -> Result<Vec<Pattern>> {
        if params.rest.is_some() {
            return Err(self.unsupported("rest parameters"));
        }
        params
            .items
            .iter()
            .map(|param| self.pattern(&param.pattern))
            .collect()
    }

    fn function(&self, func: &Function) -> Result<Rc<FunctionDef>> {
        if func.r#async || func.generator {
            return Err(self.unsupported("async and generator functions"));
        }
        let body = match &func.body {
            Some(body) => body
                .statements
                .iter()
                .map(|s| self.stmt(s))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(Rc::new(FunctionDef {
            name: func.id.as_ref().map(|id| id.name.to_string()),
            params: self.params(&func.params)?,
            body: FunctionBody::Block(body),
            is_arrow: false,
        }))
    }

    fn class(&self, class: &Class) -> Result<Rc<ClassDef>> {
        if class.super_class.is_some() {
            return Err(self.unsupported("class inheritance"));
        }
        let mut def = ClassDef {
            name: class.id.as_ref().map(|id| id.name.to_string()),
            constructor: None,
            fields: Vec::new(),
            methods: Vec::new(),
        };
        for element in &class.body.body {
            match element {
                ClassElement::MethodDefinition(method) => {
                    if method.r#static {
                        return Err(self.unsupported("static class members"));
                    }
                    let function = self.function(&method.value)?;
                    match method.kind {
                        MethodDefinitionKind::Constructor => def.constructor = Some(function),
                        MethodDefinitionKind::Method => {
                            let name = method
                                .key
                                .static_name()
                                .ok_or_else(|| self.unsupported("computed method names"))?;
                            def.methods.push((name.to_string(), function));
                        }
                        _ => return Err(self.unsupported("getters and setters")),
                    }
                }
                ClassElement::PropertyDefinition(prop) => {
                    if prop.r#static {
                        return Err(self.unsupported("static class members"));
                    }
                    let name = prop
                        .key
                        .static_name()
                        .ok_or_else(|| self.unsupported("computed field names"))?;
                    let value = match &prop.value {
                        Some(v) => Some(self.expr(v)?),
                        None => None,
                    };
                    def.fields.push((name.to_string(), value));
                }
                _ => return Err(self.unsupported("this class member")),
            }
        }
        Ok(Rc::new(def))
    }

    fn stmt(&self, stmt: &Statement) -> Result<Stmt> {
        let lowered = match stmt {
            Statement::VariableDeclaration(var) => {
                let mut decls = Vec::with_capacity(var.declarations.len());
                for decl in &var.declarations {
                    let init = match &decl.init {
                        Some(init) => Some(self.expr(init)?),
                        None => None,
                    };
                    decls.push((self.pattern(&decl.id)?, init));
                }
                Stmt::Let(decls)
            }
            Statement::FunctionDeclaration(func) => {
                let def = self.function(func)?;
                let name = def.name.clone().unwrap_or_default();
                Stmt::Function(name, def)
            }
            Statement::ClassDeclaration(class) => {
                let def = self.class(class)?;
                let name = def.name.clone().unwrap_or_default();
                Stmt::Class(name, def)
            }
            Statement::ExpressionStatement(expr_stmt) => {
                Stmt::Expr(self.expr(&expr_stmt.expression)?)
            }
            Statement::ReturnStatement(ret) => Stmt::Return(match &ret.argument {
                Some(arg) => Some(self.expr(arg)?),
                None => None,
            }),
            Statement::IfStatement(if_stmt) => Stmt::If(
                self.expr(&if_stmt.test)?,
                Box::new(self.stmt(&if_stmt.consequent)?),
                match &if_stmt.alternate {
                    Some(alt) => Some(Box::new(self.stmt(alt)?)),
                    None => None,
                },
            ),
            Statement::BlockStatement(block) => Stmt::Block(
                block
                    .body
                    .iter()
                    .map(|s| self.stmt(s))
                    .collect::<Result<_>>()?,
            ),
            Statement::EmptyStatement(_) => Stmt::Empty,
            Statement::ThrowStatement(throw) => Stmt::Throw(self.expr(&throw.argument)?),
            Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                    Stmt::ExportDefault(Expr::Function(self.function(func)?))
                }
                ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    Stmt::ExportDefault(Expr::Class(self.class(class)?))
                }
                other => match other.as_expression() {
                    Some(e) => Stmt::ExportDefault(self.expr(e)?),
                    None => return Err(self.unsupported("this default export")),
                },
            },
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(Declaration::VariableDeclaration(_))
                | Some(Declaration::FunctionDeclaration(_))
                | Some(Declaration::ClassDeclaration(_)) => {
                    return Err(self.unsupported("named exports; use declarations or export default"))
                }
                _ => Stmt::Empty,
            },
            Statement::ImportDeclaration(_) => return Err(self.unsupported("import")),
            _ => return Err(self.unsupported("this statement")),
        };
        Ok(lowered)
    }
}

fn logical_op(op: LogicalOperator) -> LogicalOp {
    match op {
        LogicalOperator::And => LogicalOp::And,
        LogicalOperator::Or => LogicalOp::Or,
        LogicalOperator::Coalesce => LogicalOp::Coalesce,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowers_member_chain() {
        let expr = parse_js_expression("$.user?.name").unwrap();
        match expr {
            Expr::Chain(inner) => match *inner {
                Expr::Member { optional, prop: MemberProp::Name(ref n), .. } => {
                    assert!(optional);
                    assert_eq!(n, "name");
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejects_invalid_syntax_with_source() {
        let err = parse_js_expression("1 +").unwrap_err();
        match err {
            CompileError::ExpressionSyntax { source_text, .. } => assert_eq!(source_text, "1 +"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unsupported_syntax() {
        assert!(parse_js_expression("async () => 1").is_err());
        assert!(parse_js_module("import x from 'y';").is_err());
    }

    #[test]
    fn test_lowers_script_forms() {
        let body = parse_js_module("const a = 1; export default ($, $$) => ({ a });").unwrap();
        assert_eq!(body.len(), 2);
        match &body[0] {
            Stmt::Let(decls) => {
                assert_eq!(decls.len(), 1);
                assert!(matches!(decls[0], (Pattern::Ident(ref n), Some(_)) if n == "a"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(body[1], Stmt::ExportDefault(Expr::Function(_))));

        let body = parse_js_module("class Card { title = 'x'; constructor($) {} }").unwrap();
        match &body[0] {
            Stmt::Class(name, def) => {
                assert_eq!(name, "Card");
                assert!(def.constructor.is_some());
                assert_eq!(def.fields.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
