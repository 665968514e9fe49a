//! Tree-walking interpreter for lowered expressions and scripts.
//!
//! Values are immutable and shared; assignments to object members rebuild
//! the object copy-on-write. Identifier resolution order is: local bindings,
//! `$` / `$$`, built-in globals, then the scope of the node being compiled
//! (reached through the [`EvalHost`]).

use std::cell::RefCell;
use std::rc::Rc;

use super::ast::{
    AssignTarget, BinaryOp, ClassDef, Expr, FunctionBody, FunctionDef, ListItem, LogicalOp,
    MemberProp, ObjectItem, Pattern, PropKey, Stmt, UnaryOp,
};
use super::builtins;
use crate::error::{CompileError, Result, RuntimeErrorKind};
use crate::value::{format_number, ObjectMap, Value};

const MAX_CALL_DEPTH: usize = 200;

/// Access to the outside world during evaluation: the node scope (`$`), the
/// compilation context (`$$`) and resource loading.
pub trait EvalHost {
    /// Resolve a name in the current node's scope chain.
    fn lookup(&self, key: &str) -> Option<Value>;
    /// The whole effective scope as an object (a bare `$`).
    fn scope_object(&self) -> Value;
    /// The compilation context object (`$$`).
    fn context_object(&self) -> Value;
    /// Load a resource relative to the current fragment (`$$.load`).
    fn load(&mut self, path: &str) -> Result<Value>;
}

/// Something that can be called.
pub enum Callable {
    Closure { def: Rc<FunctionDef>, env: Rc<Env> },
    Class { def: Rc<ClassDef>, env: Rc<Env> },
    /// A built-in function, identified by its qualified name (`Math.max`).
    Native(&'static str),
    /// A built-in method read off a string, array or number.
    Method { receiver: Value, name: String },
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// A lexical environment. Function frames also carry `this`.
pub struct Env {
    vars: RefCell<ObjectMap>,
    parent: Option<Rc<Env>>,
    this: Option<RefCell<Value>>,
}

impl Env {
    pub fn new_root() -> Rc<Env> {
        Rc::new(Env {
            vars: RefCell::new(ObjectMap::new()),
            parent: None,
            this: None,
        })
    }

    pub fn child(parent: &Rc<Env>) -> Rc<Env> {
        Rc::new(Env {
            vars: RefCell::new(ObjectMap::new()),
            parent: Some(parent.clone()),
            this: None,
        })
    }

    fn frame(parent: &Rc<Env>, this: Value) -> Rc<Env> {
        Rc::new(Env {
            vars: RefCell::new(ObjectMap::new()),
            parent: Some(parent.clone()),
            this: Some(RefCell::new(this)),
        })
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref()?.get(name)
    }

    pub fn declare(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    /// Update an existing binding. Returns false when the name is unbound.
    fn assign(&self, name: &str, value: Value) -> bool {
        if self.vars.borrow().contains_key(name) {
            self.vars.borrow_mut().insert(name.to_string(), value);
            return true;
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    fn this_value(&self) -> Option<Value> {
        match &self.this {
            Some(this) => Some(this.borrow().clone()),
            None => self.parent.as_ref()?.this_value(),
        }
    }

    fn with_this<R>(&self, f: impl FnOnce(&mut Value) -> R) -> Option<R> {
        match &self.this {
            Some(this) => Some(f(&mut this.borrow_mut())),
            None => self.parent.as_ref()?.with_this(f),
        }
    }

    /// Bindings declared directly in this environment.
    pub fn bindings(&self) -> ObjectMap {
        self.vars.borrow().clone()
    }
}

enum Completion {
    Normal,
    Return(Value),
}

fn reference_error(message: String) -> CompileError {
    CompileError::runtime(RuntimeErrorKind::ReferenceError, message)
}

// ═══════════════════════════════════════════════════════════════════════════════
// INTERPRETER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Interpreter<'h> {
    host: &'h mut dyn EvalHost,
    depth: usize,
}

impl<'h> Interpreter<'h> {
    pub fn new(host: &'h mut dyn EvalHost) -> Self {
        Self { host, depth: 0 }
    }

    pub(crate) fn load(&mut self, path: &str) -> Result<Value> {
        self.host.load(path)
    }

    /// Evaluate a script body. The result is the default export, else the
    /// value of a trailing expression statement, else an object holding
    /// every top-level binding.
    pub fn run_script(&mut self, body: &[Stmt]) -> Result<Value> {
        let env = Env::new_root();
        self.hoist(body, &env);
        let mut exported = None;
        let mut last = None;
        for stmt in body {
            last = None;
            match stmt {
                Stmt::ExportDefault(expr) => exported = Some(self.eval(expr, &env)?),
                Stmt::Expr(expr) => last = Some(self.eval(expr, &env)?),
                other => {
                    if let Completion::Return(value) = self.exec(other, &env)? {
                        return Ok(value);
                    }
                }
            }
        }
        Ok(exported
            .or(last)
            .unwrap_or_else(|| Value::object(env.bindings())))
    }

    pub fn eval(&mut self, expr: &Expr, env: &Rc<Env>) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Template { quasis, exprs } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = exprs.get(i) {
                        out.push_str(&self.eval(expr, env)?.to_display_string());
                    }
                }
                Ok(Value::from(out))
            }
            Expr::Ident(name) => self.resolve(name, env),
            Expr::This => Ok(env.this_value().unwrap_or_default()),
            Expr::Array(items) => Ok(Value::array(self.eval_list(items, env)?)),
            Expr::Object(items) => self.eval_object(items, env),
            Expr::Member { .. } | Expr::Call { .. } => {
                Ok(self.eval_chain(expr, env)?.unwrap_or_default())
            }
            Expr::Chain(inner) => Ok(self.eval_chain(inner, env)?.unwrap_or_default()),
            Expr::New { callee, args } => {
                let callee_value = self.eval(callee, env)?;
                let args = self.eval_list(args, env)?;
                self.construct(&callee_value, args)
                    .map_err(|e| rename_callee(e, callee))
            }
            Expr::Unary(op, arg) => self.unary(*op, arg, env),
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                binary(*op, &left, &right)
            }
            Expr::Logical(op, left, right) => {
                let left = self.eval(left, env)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Coalesce => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, env)
                }
            }
            Expr::Conditional(test, consequent, alternate) => {
                if self.eval(test, env)?.is_truthy() {
                    self.eval(consequent, env)
                } else {
                    self.eval(alternate, env)
                }
            }
            Expr::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.eval(expr, env)?;
                }
                Ok(last)
            }
            Expr::Function(def) => Ok(Value::Function(Rc::new(Callable::Closure {
                def: def.clone(),
                env: env.clone(),
            }))),
            Expr::Class(def) => Ok(Value::Function(Rc::new(Callable::Class {
                def: def.clone(),
                env: env.clone(),
            }))),
            Expr::Assign {
                op,
                logical,
                target,
                value,
            } => self.assign(*op, *logical, target, value, env),
        }
    }

    fn resolve(&mut self, name: &str, env: &Rc<Env>) -> Result<Value> {
        if let Some(value) = env.get(name) {
            return Ok(value);
        }
        match name {
            "$" => return Ok(self.host.scope_object()),
            "$$" => return Ok(self.host.context_object()),
            _ => {}
        }
        if let Some(value) = builtins::global(name) {
            return Ok(value);
        }
        self.host
            .lookup(name)
            .ok_or_else(|| reference_error(format!("{} is not defined", name)))
    }

    /// A bare `$` not shadowed by a local binding.
    fn is_host_scope(expr: &Expr, env: &Rc<Env>) -> bool {
        matches!(expr, Expr::Ident(name) if name == "$" && env.get("$").is_none())
    }

    fn prop_key(&mut self, prop: &MemberProp, env: &Rc<Env>) -> Result<String> {
        match prop {
            MemberProp::Name(name) => Ok(name.clone()),
            MemberProp::Computed(expr) => Ok(property_key(&self.eval(expr, env)?)),
        }
    }

    /// Evaluate a member access or call that may sit inside an optional
    /// chain. `None` means the chain short-circuited.
    fn eval_chain(&mut self, expr: &Expr, env: &Rc<Env>) -> Result<Option<Value>> {
        match expr {
            Expr::Member {
                object,
                prop,
                optional,
            } => {
                if Self::is_host_scope(object, env) {
                    let key = self.prop_key(prop, env)?;
                    return Ok(Some(self.host.lookup(&key).unwrap_or_default()));
                }
                let Some(target) = self.eval_chain(object, env)? else {
                    return Ok(None);
                };
                if *optional && target.is_nullish() {
                    return Ok(None);
                }
                let key = self.prop_key(prop, env)?;
                builtins::get_property(&target, &key).map(Some)
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => {
                let (this, function) = match callee.as_ref() {
                    Expr::Member {
                        object,
                        prop,
                        optional: member_optional,
                    } => {
                        if Self::is_host_scope(object, env) {
                            let key = self.prop_key(prop, env)?;
                            let function = self.host.lookup(&key).unwrap_or_default();
                            (self.host.scope_object(), function)
                        } else {
                            let Some(target) = self.eval_chain(object, env)? else {
                                return Ok(None);
                            };
                            if *member_optional && target.is_nullish() {
                                return Ok(None);
                            }
                            let key = self.prop_key(prop, env)?;
                            let function = builtins::get_property(&target, &key)?;
                            (target, function)
                        }
                    }
                    other => match self.eval_chain(other, env)? {
                        Some(function) => (Value::Undefined, function),
                        None => return Ok(None),
                    },
                };
                if *optional && function.is_nullish() {
                    return Ok(None);
                }
                let args = self.eval_list(args, env)?;
                self.call_function(&function, this, args)
                    .map(Some)
                    .map_err(|e| rename_callee(e, callee))
            }
            other => self.eval(other, env).map(Some),
        }
    }

    pub fn eval_list(&mut self, items: &[ListItem], env: &Rc<Env>) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                ListItem::Item(expr) => out.push(self.eval(expr, env)?),
                ListItem::Hole => out.push(Value::Undefined),
                ListItem::Spread(expr) => {
                    let value = self.eval(expr, env)?;
                    out.extend(builtins::iterate(&value)?);
                }
            }
        }
        Ok(out)
    }

    fn eval_object(&mut self, items: &[ObjectItem], env: &Rc<Env>) -> Result<Value> {
        let mut map = ObjectMap::new();
        for item in items {
            match item {
                ObjectItem::Property(key, expr) => {
                    let key = match key {
                        PropKey::Static(name) => name.clone(),
                        PropKey::Computed(expr) => property_key(&self.eval(expr, env)?),
                    };
                    let value = self.eval(expr, env)?;
                    map.insert(key, value);
                }
                ObjectItem::Spread(expr) => match self.eval(expr, env)? {
                    Value::Object(source) => {
                        for (k, v) in source.iter() {
                            map.insert(k.clone(), v.clone());
                        }
                    }
                    Value::Array(items) => {
                        for (i, v) in items.iter().enumerate() {
                            map.insert(i.to_string(), v.clone());
                        }
                    }
                    Value::String(s) => {
                        for (i, c) in s.chars().enumerate() {
                            map.insert(i.to_string(), Value::from(c.to_string()));
                        }
                    }
                    _ => {}
                },
            }
        }
        Ok(Value::object(map))
    }

    fn unary(&mut self, op: UnaryOp, arg: &Expr, env: &Rc<Env>) -> Result<Value> {
        if op == UnaryOp::Typeof {
            // typeof never throws for an unbound name
            let value = match self.eval(arg, env) {
                Ok(value) => value,
                Err(CompileError::ExpressionRuntime {
                    kind: RuntimeErrorKind::ReferenceError,
                    ..
                }) if matches!(arg, Expr::Ident(_)) => Value::Undefined,
                Err(e) => return Err(e),
            };
            return Ok(Value::string(value.type_name()));
        }
        let value = self.eval(arg, env)?;
        Ok(match op {
            UnaryOp::Not => Value::Bool(!value.is_truthy()),
            UnaryOp::Minus => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::BitNot => Value::Number(!to_int32(value.to_number()) as f64),
            UnaryOp::Void | UnaryOp::Typeof => Value::Undefined,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ASSIGNMENT
    // ═══════════════════════════════════════════════════════════════════════════

    fn assign(
        &mut self,
        op: Option<BinaryOp>,
        logical: Option<LogicalOp>,
        target: &AssignTarget,
        value: &Expr,
        env: &Rc<Env>,
    ) -> Result<Value> {
        let current = if op.is_some() || logical.is_some() {
            Some(self.read_target(target, env)?)
        } else {
            None
        };
        if let (Some(logical), Some(current)) = (logical, &current) {
            let keep = match logical {
                LogicalOp::And => !current.is_truthy(),
                LogicalOp::Or => current.is_truthy(),
                LogicalOp::Coalesce => !current.is_nullish(),
            };
            if keep {
                return Ok(current.clone());
            }
        }
        let rhs = self.eval(value, env)?;
        let result = match (op, current) {
            (Some(op), Some(current)) => binary(op, &current, &rhs)?,
            _ => rhs,
        };
        self.write_target(target, result.clone(), env)?;
        Ok(result)
    }

    fn read_target(&mut self, target: &AssignTarget, env: &Rc<Env>) -> Result<Value> {
        match target {
            AssignTarget::Ident(name) => self.resolve(name, env),
            AssignTarget::Member(object, prop) => {
                let object = self.eval(object, env)?;
                let key = self.prop_key(prop, env)?;
                builtins::get_property(&object, &key)
            }
        }
    }

    fn write_target(&mut self, target: &AssignTarget, value: Value, env: &Rc<Env>) -> Result<()> {
        match target {
            AssignTarget::Ident(name) => {
                if env.assign(name, value) {
                    Ok(())
                } else {
                    Err(reference_error(format!(
                        "assignment to undeclared variable {}",
                        name
                    )))
                }
            }
            AssignTarget::Member(object, prop) => {
                let key = self.prop_key(prop, env)?;
                match object.as_ref() {
                    Expr::This => env
                        .with_this(|this| set_property(this, &key, value))
                        .unwrap_or_else(|| {
                            Err(CompileError::type_error(
                                "cannot assign to a member of 'this' outside a function",
                            ))
                        }),
                    Expr::Ident(name) => {
                        let mut target = env
                            .get(name)
                            .ok_or_else(|| reference_error(format!("{} is not defined", name)))?;
                        set_property(&mut target, &key, value)?;
                        env.assign(name, target);
                        Ok(())
                    }
                    _ => Err(CompileError::type_error(
                        "only members of local variables and 'this' can be assigned",
                    )),
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CALLS
    // ═══════════════════════════════════════════════════════════════════════════

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_CALL_DEPTH {
            self.depth -= 1;
            return Err(CompileError::runtime(
                RuntimeErrorKind::RangeError,
                "Maximum call stack size exceeded",
            ));
        }
        Ok(())
    }

    pub fn call_function(&mut self, function: &Value, this: Value, args: Vec<Value>) -> Result<Value> {
        let Value::Function(callable) = function else {
            return Err(CompileError::type_error(format!(
                "{} is not a function",
                describe(function)
            )));
        };
        match callable.as_ref() {
            Callable::Closure { def, env } => {
                let frame = if def.is_arrow {
                    Env::child(env)
                } else {
                    Env::frame(env, this)
                };
                self.enter()?;
                let result = self.invoke_body(def, &frame, args);
                self.depth -= 1;
                result.map(|(value, _)| value)
            }
            Callable::Class { def, .. } => Err(CompileError::type_error(format!(
                "Class constructor {} cannot be invoked without 'new'",
                def.name.as_deref().unwrap_or("(anonymous)")
            ))),
            Callable::Native(name) => builtins::call_native(self, name, args),
            Callable::Method { receiver, name } => builtins::call_method(self, receiver, name, args),
        }
    }

    /// Bind arguments and run a function body in `frame`. Returns the
    /// completion value and whether the body returned explicitly.
    fn invoke_body(
        &mut self,
        def: &FunctionDef,
        frame: &Rc<Env>,
        args: Vec<Value>,
    ) -> Result<(Value, bool)> {
        let mut args = args.into_iter();
        for param in &def.params {
            self.bind_pattern(param, args.next().unwrap_or_default(), frame)?;
        }
        match &def.body {
            FunctionBody::Expr(expr) => Ok((self.eval(expr, frame)?, true)),
            FunctionBody::Block(stmts) => match self.exec_block(stmts, frame)? {
                Completion::Return(value) => Ok((value, true)),
                Completion::Normal => Ok((Value::Undefined, false)),
            },
        }
    }

    /// `new callee(...args)`.
    pub fn construct(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value> {
        let Value::Function(callable) = callee else {
            return Err(CompileError::type_error(format!(
                "{} is not a constructor",
                describe(callee)
            )));
        };
        match callable.as_ref() {
            Callable::Class { def, env } => {
                let mut instance = ObjectMap::new();
                for (name, method) in &def.methods {
                    let closure = Callable::Closure {
                        def: method.clone(),
                        env: env.clone(),
                    };
                    instance.insert(name.clone(), Value::Function(Rc::new(closure)));
                }
                let frame = Env::frame(env, Value::object(instance));
                for (name, init) in &def.fields {
                    let value = match init {
                        Some(expr) => self.eval(expr, &frame)?,
                        None => Value::Undefined,
                    };
                    frame
                        .with_this(|this| set_property(this, name, value))
                        .unwrap_or(Ok(()))?;
                }
                if let Some(ctor) = &def.constructor {
                    self.enter()?;
                    let result = self.invoke_body(ctor, &frame, args);
                    self.depth -= 1;
                    if let (value @ Value::Object(_), true) = result? {
                        return Ok(value);
                    }
                }
                Ok(frame.this_value().unwrap_or_default())
            }
            Callable::Closure { def, env } if !def.is_arrow => {
                let frame = Env::frame(env, Value::object(ObjectMap::new()));
                self.enter()?;
                let result = self.invoke_body(def, &frame, args);
                self.depth -= 1;
                match result? {
                    (value @ Value::Object(_), true) => Ok(value),
                    _ => Ok(frame.this_value().unwrap_or_default()),
                }
            }
            Callable::Native(name) => builtins::construct_native(self, name, args),
            _ => Err(CompileError::type_error(format!(
                "{} is not a constructor",
                describe(callee)
            ))),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STATEMENTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Function declarations are visible before their statement runs.
    fn hoist(&self, stmts: &[Stmt], env: &Rc<Env>) {
        for stmt in stmts {
            if let Stmt::Function(name, def) = stmt {
                let closure = Callable::Closure {
                    def: def.clone(),
                    env: env.clone(),
                };
                env.declare(name, Value::Function(Rc::new(closure)));
            }
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt], env: &Rc<Env>) -> Result<Completion> {
        self.hoist(stmts, env);
        for stmt in stmts {
            if let Completion::Return(value) = self.exec(stmt, env)? {
                return Ok(Completion::Return(value));
            }
        }
        Ok(Completion::Normal)
    }

    fn exec(&mut self, stmt: &Stmt, env: &Rc<Env>) -> Result<Completion> {
        match stmt {
            Stmt::Let(decls) => {
                for (pattern, init) in decls {
                    let value = match init {
                        Some(expr) => self.eval(expr, env)?,
                        None => Value::Undefined,
                    };
                    self.bind_pattern(pattern, value, env)?;
                }
            }
            Stmt::Expr(expr) | Stmt::ExportDefault(expr) => {
                self.eval(expr, env)?;
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Undefined,
                };
                return Ok(Completion::Return(value));
            }
            Stmt::If(test, consequent, alternate) => {
                if self.eval(test, env)?.is_truthy() {
                    return self.exec(consequent, env);
                } else if let Some(alternate) = alternate {
                    return self.exec(alternate, env);
                }
            }
            Stmt::Block(stmts) => return self.exec_block(stmts, &Env::child(env)),
            Stmt::Class(name, def) => {
                let class = Callable::Class {
                    def: def.clone(),
                    env: env.clone(),
                };
                env.declare(name, Value::Function(Rc::new(class)));
            }
            Stmt::Throw(expr) => {
                let thrown = self.eval(expr, env)?;
                let message = match thrown.as_object().and_then(|o| o.get("message")) {
                    Some(message) => message.to_display_string(),
                    None => thrown.to_display_string(),
                };
                return Err(CompileError::runtime(RuntimeErrorKind::Error, message));
            }
            Stmt::Function(..) | Stmt::Empty => {}
        }
        Ok(Completion::Normal)
    }

    fn bind_pattern(&mut self, pattern: &Pattern, value: Value, env: &Rc<Env>) -> Result<()> {
        match pattern {
            Pattern::Ident(name) => env.declare(name, value),
            Pattern::Default(inner, default) => {
                let value = match value {
                    Value::Undefined => self.eval(default, env)?,
                    other => other,
                };
                self.bind_pattern(inner, value, env)?;
            }
            Pattern::Object { props, rest } => {
                if value.is_nullish() {
                    return Err(CompileError::type_error(format!(
                        "Cannot destructure '{}'",
                        value.to_display_string()
                    )));
                }
                let mut used = Vec::with_capacity(props.len());
                for (key, inner) in props {
                    let key = match key {
                        PropKey::Static(name) => name.clone(),
                        PropKey::Computed(expr) => property_key(&self.eval(expr, env)?),
                    };
                    let item = builtins::get_property(&value, &key)?;
                    self.bind_pattern(inner, item, env)?;
                    used.push(key);
                }
                if let Some(rest) = rest {
                    let remaining = value
                        .as_object()
                        .map(|map| {
                            map.iter()
                                .filter(|(k, _)| !used.contains(k))
                                .map(|(k, v)| (k.clone(), v.clone()))
                                .collect()
                        })
                        .unwrap_or_default();
                    self.bind_pattern(rest, Value::object(remaining), env)?;
                }
            }
            Pattern::Array { items, rest } => {
                let values = builtins::iterate(&value)?;
                for (i, inner) in items.iter().enumerate() {
                    if let Some(inner) = inner {
                        self.bind_pattern(inner, values.get(i).cloned().unwrap_or_default(), env)?;
                    }
                }
                if let Some(rest) = rest {
                    let remaining = values.into_iter().skip(items.len()).collect();
                    self.bind_pattern(rest, Value::array(remaining), env)?;
                }
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Property key for a computed member access.
pub fn property_key(value: &Value) -> String {
    match value {
        Value::Number(n) => format_number(*n),
        other => other.to_display_string(),
    }
}

pub fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    (n.trunc() as i64) as i32
}

fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) | Value::Function(_) => {
            Value::from(value.to_display_string())
        }
        other => other.clone(),
    }
}

pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    let num = |v: &Value| v.to_number();
    Ok(match op {
        BinaryOp::Add => {
            let (l, r) = (to_primitive(left), to_primitive(right));
            if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
                Value::from(format!("{}{}", l.to_display_string(), r.to_display_string()))
            } else {
                Value::Number(num(&l) + num(&r))
            }
        }
        BinaryOp::Sub => Value::Number(num(left) - num(right)),
        BinaryOp::Mul => Value::Number(num(left) * num(right)),
        BinaryOp::Div => Value::Number(num(left) / num(right)),
        BinaryOp::Rem => Value::Number(num(left) % num(right)),
        BinaryOp::Exp => Value::Number(num(left).powf(num(right))),
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let (l, r) = (to_primitive(left), to_primitive(right));
            let ordering = match (&l, &r) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => num(&l).partial_cmp(&num(&r)),
            };
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::LtEq => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
        BinaryOp::In => {
            let key = property_key(left);
            match right {
                Value::Object(map) => Value::Bool(map.contains_key(&key)),
                Value::Array(items) => Value::Bool(
                    key == "length"
                        || key.parse::<usize>().map(|i| i < items.len()).unwrap_or(false),
                ),
                other => {
                    return Err(CompileError::type_error(format!(
                        "Cannot use 'in' operator to search for '{}' in {}",
                        key,
                        other.to_display_string()
                    )))
                }
            }
        }
        BinaryOp::BitAnd => Value::Number((to_int32(num(left)) & to_int32(num(right))) as f64),
        BinaryOp::BitOr => Value::Number((to_int32(num(left)) | to_int32(num(right))) as f64),
        BinaryOp::BitXor => Value::Number((to_int32(num(left)) ^ to_int32(num(right))) as f64),
        BinaryOp::Shl => {
            let shift = (to_int32(num(right)) & 31) as u32;
            Value::Number(to_int32(num(left)).wrapping_shl(shift) as f64)
        }
        BinaryOp::Shr => {
            let shift = (to_int32(num(right)) & 31) as u32;
            Value::Number(to_int32(num(left)).wrapping_shr(shift) as f64)
        }
        BinaryOp::UShr => {
            let shift = (to_int32(num(right)) & 31) as u32;
            Value::Number(((to_int32(num(left)) as u32) >> shift) as f64)
        }
    })
}

/// Set a member on an object or array value, copying shared storage.
pub fn set_property(target: &mut Value, key: &str, value: Value) -> Result<()> {
    match target {
        Value::Object(map) => {
            Rc::make_mut(map).insert(key.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index: usize = key.parse().map_err(|_| {
                CompileError::type_error(format!("cannot set property '{}' of an array", key))
            })?;
            let items = Rc::make_mut(items);
            if index >= items.len() {
                items.resize(index + 1, Value::Undefined);
            }
            items[index] = value;
            Ok(())
        }
        other => Err(CompileError::type_error(format!(
            "Cannot set properties of {} (setting '{}')",
            other.to_display_string(),
            key
        ))),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        other => other.to_display_string(),
    }
}

/// Name the callee in "is not a function" errors when it has a readable form.
fn rename_callee(err: CompileError, callee: &Expr) -> CompileError {
    match (&err, callee_name(callee)) {
        (
            CompileError::ExpressionRuntime {
                kind: RuntimeErrorKind::TypeError,
                message,
            },
            Some(name),
        ) if message.ends_with("is not a function") || message.ends_with("is not a constructor") => {
            let suffix = if message.ends_with("function") {
                "is not a function"
            } else {
                "is not a constructor"
            };
            CompileError::type_error(format!("{} {}", name, suffix))
        }
        _ => err,
    }
}

fn callee_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Ident(name) => Some(name.clone()),
        Expr::This => Some("this".to_string()),
        Expr::Member {
            object,
            prop: MemberProp::Name(name),
            ..
        } => Some(format!("{}.{}", callee_name(object)?, name)),
        _ => None,
    }
}
