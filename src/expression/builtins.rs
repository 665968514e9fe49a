//! Built-in globals and the methods available on strings, arrays and numbers.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::rc::Rc;

use super::eval::{Callable, Interpreter};
use crate::error::{CompileError, Result, RuntimeErrorKind};
use crate::value::{format_number, ObjectMap, Value};

lazy_static! {
    /// Names resolved before the node scope is consulted.
    pub static ref GLOBAL_NAMES: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("undefined");
        s.insert("NaN");
        s.insert("Infinity");
        s.insert("Math");
        s.insert("JSON");
        s.insert("Object");
        s.insert("String");
        s.insert("Number");
        s.insert("Boolean");
        s.insert("Array");
        s.insert("Error");
        s.insert("parseInt");
        s.insert("parseFloat");
        s.insert("isNaN");
        s.insert("isFinite");
        s
    };

    static ref FLOAT_PREFIX_RE: Regex =
        Regex::new(r"^[+-]?(Infinity|\d+\.?\d*(?:[eE][+-]?\d+)?|\.\d+(?:[eE][+-]?\d+)?)").unwrap();
}

const STRING_METHODS: &[&str] = &[
    "toUpperCase",
    "toLowerCase",
    "trim",
    "trimStart",
    "trimEnd",
    "toString",
    "includes",
    "startsWith",
    "endsWith",
    "indexOf",
    "lastIndexOf",
    "slice",
    "substring",
    "charAt",
    "at",
    "split",
    "replace",
    "replaceAll",
    "repeat",
    "padStart",
    "padEnd",
    "concat",
];

const ARRAY_METHODS: &[&str] = &[
    "map",
    "filter",
    "find",
    "findIndex",
    "some",
    "every",
    "forEach",
    "reduce",
    "join",
    "includes",
    "indexOf",
    "slice",
    "concat",
    "reverse",
    "sort",
    "flat",
    "at",
    "toString",
];

const NUMBER_METHODS: &[&str] = &["toFixed", "toString"];

fn native(name: &'static str) -> Value {
    Value::Function(Rc::new(Callable::Native(name)))
}

/// Value of a built-in global, if `name` is one.
pub fn global(name: &str) -> Option<Value> {
    if !GLOBAL_NAMES.contains(name) {
        return None;
    }
    let value = match name {
        "undefined" => Value::Undefined,
        "NaN" => Value::Number(f64::NAN),
        "Infinity" => Value::Number(f64::INFINITY),
        "Math" => {
            let mut math = ObjectMap::new();
            math.insert("PI".to_string(), Value::Number(std::f64::consts::PI));
            math.insert("E".to_string(), Value::Number(std::f64::consts::E));
            for name in [
                "Math.abs",
                "Math.floor",
                "Math.ceil",
                "Math.round",
                "Math.trunc",
                "Math.sign",
                "Math.sqrt",
                "Math.cbrt",
                "Math.pow",
                "Math.min",
                "Math.max",
                "Math.log",
                "Math.exp",
            ] {
                math.insert(name["Math.".len()..].to_string(), native(name));
            }
            Value::object(math)
        }
        "JSON" => {
            let mut json = ObjectMap::new();
            json.insert("stringify".to_string(), native("JSON.stringify"));
            json.insert("parse".to_string(), native("JSON.parse"));
            Value::object(json)
        }
        "Object" => native("Object"),
        "String" => native("String"),
        "Number" => native("Number"),
        "Boolean" => native("Boolean"),
        "Array" => native("Array"),
        "Error" => native("Error"),
        "parseInt" => native("parseInt"),
        "parseFloat" => native("parseFloat"),
        "isNaN" => native("isNaN"),
        "isFinite" => native("isFinite"),
        _ => return None,
    };
    Some(value)
}

/// Static members of the built-in constructors (`Object.keys`, ...).
fn static_member(owner: &str, key: &str) -> Value {
    let name = match (owner, key) {
        ("Object", "keys") => "Object.keys",
        ("Object", "values") => "Object.values",
        ("Object", "entries") => "Object.entries",
        ("Object", "assign") => "Object.assign",
        ("Object", "fromEntries") => "Object.fromEntries",
        ("Array", "isArray") => "Array.isArray",
        ("Array", "from") => "Array.from",
        ("Array", "of") => "Array.of",
        ("Number", "isInteger") => "Number.isInteger",
        ("Number", "isFinite") => "Number.isFinite",
        ("Number", "isNaN") => "Number.isNaN",
        ("Number", "parseFloat") => "Number.parseFloat",
        ("Number", "parseInt") => "Number.parseInt",
        ("Number", "MAX_SAFE_INTEGER") => return Value::Number(9007199254740991.0),
        _ => return Value::Undefined,
    };
    native(name)
}

fn method(target: &Value, key: &str, names: &[&str]) -> Value {
    if names.contains(&key) {
        Value::Function(Rc::new(Callable::Method {
            receiver: target.clone(),
            name: key.to_string(),
        }))
    } else {
        Value::Undefined
    }
}

/// Read `target[key]`.
pub fn get_property(target: &Value, key: &str) -> Result<Value> {
    match target {
        Value::Undefined | Value::Null => Err(CompileError::type_error(format!(
            "Cannot read properties of {} (reading '{}')",
            target.to_display_string(),
            key
        ))),
        Value::Object(map) => Ok(map.get(key).cloned().unwrap_or_default()),
        Value::Array(items) => {
            if key == "length" {
                return Ok(Value::from(items.len()));
            }
            if let Ok(index) = key.parse::<usize>() {
                return Ok(items.get(index).cloned().unwrap_or_default());
            }
            Ok(method(target, key, ARRAY_METHODS))
        }
        Value::String(s) => {
            if key == "length" {
                return Ok(Value::from(s.chars().count()));
            }
            if let Ok(index) = key.parse::<usize>() {
                return Ok(s
                    .chars()
                    .nth(index)
                    .map(|c| Value::from(c.to_string()))
                    .unwrap_or_default());
            }
            Ok(method(target, key, STRING_METHODS))
        }
        Value::Number(_) => Ok(method(target, key, NUMBER_METHODS)),
        Value::Bool(_) => Ok(method(target, key, &["toString"])),
        Value::Function(callable) => match callable.as_ref() {
            Callable::Native(owner) => Ok(static_member(owner, key)),
            _ => Ok(Value::Undefined),
        },
    }
}

/// Items produced by spreading or destructuring a value.
pub fn iterate(value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.as_ref().clone()),
        Value::String(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
        other => Err(CompileError::type_error(format!(
            "{} is not iterable",
            other.to_display_string()
        ))),
    }
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

fn error_object(message: &Value) -> Value {
    let mut map = ObjectMap::new();
    map.insert("name".to_string(), Value::string("Error"));
    let message = match message {
        Value::Undefined => String::new(),
        other => other.to_display_string(),
    };
    map.insert("message".to_string(), Value::from(message));
    Value::object(map)
}

// ═══════════════════════════════════════════════════════════════════════════════
// NATIVE FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn call_native(interp: &mut Interpreter<'_>, name: &str, args: Vec<Value>) -> Result<Value> {
    let a0 = arg(&args, 0);
    let value = match name {
        "String" => match args.first() {
            Some(v) => Value::from(v.to_display_string()),
            None => Value::string(""),
        },
        "Number" => Value::Number(if args.is_empty() { 0.0 } else { a0.to_number() }),
        "Boolean" => Value::Bool(a0.is_truthy()),
        "Error" => error_object(&a0),
        "Object" => match a0 {
            Value::Object(_) => a0,
            _ => Value::object(ObjectMap::new()),
        },
        "Array" => Value::array(args),
        "parseInt" | "Number.parseInt" => {
            Value::Number(parse_int(&a0.to_display_string(), arg(&args, 1)))
        }
        "parseFloat" | "Number.parseFloat" => Value::Number(parse_float(&a0.to_display_string())),
        "isNaN" => Value::Bool(a0.to_number().is_nan()),
        "isFinite" => Value::Bool(a0.to_number().is_finite()),
        "Number.isNaN" => Value::Bool(matches!(a0, Value::Number(n) if n.is_nan())),
        "Number.isFinite" => Value::Bool(matches!(a0, Value::Number(n) if n.is_finite())),
        "Number.isInteger" => {
            Value::Bool(matches!(a0, Value::Number(n) if n.is_finite() && n.fract() == 0.0))
        }
        "Array.isArray" => Value::Bool(matches!(a0, Value::Array(_))),
        "Array.of" => Value::array(args),
        "Array.from" => {
            let items = match &a0 {
                Value::Object(map) => {
                    let len = map.get("length").map(|v| v.to_number()).unwrap_or(0.0);
                    let len = if len.is_finite() && len > 0.0 { len as usize } else { 0 };
                    vec![Value::Undefined; len]
                }
                other => iterate(other)?,
            };
            match args.get(1) {
                Some(mapper @ Value::Function(_)) => {
                    let mut out = Vec::with_capacity(items.len());
                    for (i, item) in items.into_iter().enumerate() {
                        out.push(interp.call_function(
                            mapper,
                            Value::Undefined,
                            vec![item, Value::from(i)],
                        )?);
                    }
                    Value::array(out)
                }
                _ => Value::array(items),
            }
        }
        "Object.keys" | "Object.values" | "Object.entries" => {
            let entries = entries_of(&a0)?;
            let items = entries
                .into_iter()
                .map(|(k, v)| match name {
                    "Object.keys" => Value::from(k),
                    "Object.values" => v,
                    _ => Value::array(vec![Value::from(k), v]),
                })
                .collect();
            Value::array(items)
        }
        "Object.assign" => {
            let mut map = match &a0 {
                Value::Object(map) => map.as_ref().clone(),
                _ => ObjectMap::new(),
            };
            for source in args.iter().skip(1) {
                for (k, v) in entries_of(source).unwrap_or_default() {
                    map.insert(k, v);
                }
            }
            Value::object(map)
        }
        "Object.fromEntries" => {
            let mut map = ObjectMap::new();
            for entry in iterate(&a0)? {
                let key = get_property(&entry, "0")?;
                let value = get_property(&entry, "1")?;
                map.insert(key.to_display_string(), value);
            }
            Value::object(map)
        }
        "JSON.stringify" => json_stringify(&a0, &arg(&args, 2))?,
        "JSON.parse" => {
            let text = a0.to_display_string();
            let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
                CompileError::runtime(RuntimeErrorKind::Error, format!("JSON.parse: {}", e))
            })?;
            Value::from_json(&json)
        }
        "$$.load" => {
            let Value::String(path) = &a0 else {
                return Err(CompileError::type_error("$$.load expects a path string"));
            };
            interp.load(path)?
        }
        math if math.starts_with("Math.") => Value::Number(call_math(math, &args)),
        other => {
            return Err(CompileError::type_error(format!(
                "{} is not a function",
                other
            )))
        }
    };
    Ok(value)
}

pub fn construct_native(
    interp: &mut Interpreter<'_>,
    name: &str,
    args: Vec<Value>,
) -> Result<Value> {
    match name {
        "Error" | "Array" | "Object" => call_native(interp, name, args),
        other => Err(CompileError::type_error(format!(
            "{} is not a constructor",
            other
        ))),
    }
}

fn entries_of(value: &Value) -> Result<Vec<(String, Value)>> {
    match value {
        Value::Object(map) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Value::Array(items) => Ok(items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect()),
        Value::String(s) => Ok(s
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), Value::from(c.to_string())))
            .collect()),
        Value::Undefined | Value::Null => Err(CompileError::type_error(
            "Cannot convert undefined or null to object",
        )),
        _ => Ok(Vec::new()),
    }
}

fn call_math(name: &str, args: &[Value]) -> f64 {
    let n = |i: usize| args.get(i).map(Value::to_number).unwrap_or(f64::NAN);
    match name {
        "Math.abs" => n(0).abs(),
        "Math.floor" => n(0).floor(),
        "Math.ceil" => n(0).ceil(),
        "Math.round" => (n(0) + 0.5).floor(),
        "Math.trunc" => n(0).trunc(),
        "Math.sign" => {
            let x = n(0);
            if x.is_nan() || x == 0.0 {
                x
            } else {
                x.signum()
            }
        }
        "Math.sqrt" => n(0).sqrt(),
        "Math.cbrt" => n(0).cbrt(),
        "Math.pow" => n(0).powf(n(1)),
        "Math.log" => n(0).ln(),
        "Math.exp" => n(0).exp(),
        "Math.min" => args
            .iter()
            .map(Value::to_number)
            .fold(f64::INFINITY, |acc, x| if acc.is_nan() || x.is_nan() { f64::NAN } else { acc.min(x) }),
        "Math.max" => args
            .iter()
            .map(Value::to_number)
            .fold(f64::NEG_INFINITY, |acc, x| if acc.is_nan() || x.is_nan() { f64::NAN } else { acc.max(x) }),
        _ => f64::NAN,
    }
}

fn parse_int(text: &str, radix: Value) -> f64 {
    let mut s = text.trim();
    let mut sign = 1.0;
    if let Some(rest) = s.strip_prefix('-') {
        sign = -1.0;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    let mut radix = match radix {
        Value::Undefined => 10,
        other => other.to_number() as u32,
    };
    if radix == 0 {
        radix = 10;
    }
    if (radix == 16 || radix == 10) && (s.starts_with("0x") || s.starts_with("0X")) {
        radix = 16;
        s = &s[2..];
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let digits: String = s.chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let value = digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0, |acc, d| acc * radix as f64 + d as f64);
    sign * value
}

fn parse_float(text: &str) -> f64 {
    let trimmed = text.trim_start();
    match FLOAT_PREFIX_RE.find(trimmed) {
        Some(m) => {
            let s = m.as_str();
            match s.trim_start_matches(['+', '-']) {
                "Infinity" => {
                    if s.starts_with('-') {
                        f64::NEG_INFINITY
                    } else {
                        f64::INFINITY
                    }
                }
                _ => s.parse().unwrap_or(f64::NAN),
            }
        }
        None => f64::NAN,
    }
}

fn json_stringify(value: &Value, indent: &Value) -> Result<Value> {
    let Some(json) = value.to_json() else {
        return Ok(Value::Undefined);
    };
    let indent = match indent {
        Value::Number(n) if *n >= 1.0 => " ".repeat((*n as usize).min(10)),
        Value::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };
    let to_error = |e: serde_json::Error| CompileError::type_error(format!("JSON.stringify: {}", e));
    if indent.is_empty() {
        return Ok(Value::from(serde_json::to_string(&json).map_err(to_error)?));
    }
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    json.serialize(&mut ser).map_err(to_error)?;
    Ok(Value::from(String::from_utf8_lossy(&buf).into_owned()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// METHODS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn call_method(
    interp: &mut Interpreter<'_>,
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
) -> Result<Value> {
    match receiver {
        Value::String(s) => string_method(interp, s, name, &args),
        Value::Array(items) => array_method(interp, receiver, items, name, &args),
        Value::Number(n) => match name {
            "toFixed" => {
                let digits = arg(&args, 0).to_number();
                let digits = if digits.is_finite() { digits.clamp(0.0, 100.0) as usize } else { 0 };
                Ok(Value::from(format!("{:.*}", digits, n)))
            }
            _ => Ok(Value::from(format_number(*n))),
        },
        other => Ok(Value::from(other.to_display_string())),
    }
}

/// Resolve a possibly negative relative index against a length.
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    match value {
        Value::Undefined => default,
        other => {
            let n = other.to_number();
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            if n < 0.0 {
                (len as f64 + n).max(0.0) as usize
            } else {
                (n as usize).min(len)
            }
        }
    }
}

fn char_index(haystack: &str, byte_index: usize) -> usize {
    haystack[..byte_index].chars().count()
}

fn string_method(
    interp: &mut Interpreter<'_>,
    s: &str,
    name: &str,
    args: &[Value],
) -> Result<Value> {
    let a0 = arg(args, 0);
    let chars: Vec<char> = s.chars().collect();
    let value = match name {
        "toUpperCase" => Value::from(s.to_uppercase()),
        "toLowerCase" => Value::from(s.to_lowercase()),
        "trim" => Value::string(s.trim()),
        "trimStart" => Value::string(s.trim_start()),
        "trimEnd" => Value::string(s.trim_end()),
        "toString" => Value::string(s),
        "includes" => Value::Bool(s.contains(a0.to_display_string().as_str())),
        "startsWith" => Value::Bool(s.starts_with(a0.to_display_string().as_str())),
        "endsWith" => Value::Bool(s.ends_with(a0.to_display_string().as_str())),
        "indexOf" => match s.find(a0.to_display_string().as_str()) {
            Some(i) => Value::from(char_index(s, i)),
            None => Value::Number(-1.0),
        },
        "lastIndexOf" => match s.rfind(a0.to_display_string().as_str()) {
            Some(i) => Value::from(char_index(s, i)),
            None => Value::Number(-1.0),
        },
        "slice" => {
            let start = relative_index(&a0, chars.len(), 0);
            let end = relative_index(&arg(args, 1), chars.len(), chars.len());
            Value::from(chars[start..end.max(start)].iter().collect::<String>())
        }
        "substring" => {
            let clamp = |v: &Value, default: usize| match v {
                Value::Undefined => default,
                other => {
                    let n = other.to_number();
                    if n.is_nan() || n < 0.0 {
                        0
                    } else {
                        (n as usize).min(chars.len())
                    }
                }
            };
            let (a, b) = (clamp(&a0, 0), clamp(&arg(args, 1), chars.len()));
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            Value::from(chars[start..end].iter().collect::<String>())
        }
        "charAt" => {
            let i = a0.to_number();
            let i = if i.is_nan() { 0.0 } else { i };
            Value::from(
                chars
                    .get(i as usize)
                    .filter(|_| i >= 0.0)
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
            )
        }
        "at" => {
            let i = a0.to_number().trunc();
            let index = if i < 0.0 { chars.len() as f64 + i } else { i };
            if index < 0.0 {
                Value::Undefined
            } else {
                chars
                    .get(index as usize)
                    .map(|c| Value::from(c.to_string()))
                    .unwrap_or_default()
            }
        }
        "split" => {
            let parts: Vec<Value> = match &a0 {
                Value::Undefined => vec![Value::string(s)],
                sep => {
                    let sep = sep.to_display_string();
                    if sep.is_empty() {
                        chars.iter().map(|c| Value::from(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(Value::string).collect()
                    }
                }
            };
            match arg(args, 1) {
                Value::Undefined => Value::array(parts),
                limit => Value::array(parts.into_iter().take(limit.to_number() as usize).collect()),
            }
        }
        "replace" | "replaceAll" => {
            let pattern = a0.to_display_string();
            let replacement = arg(args, 1);
            let mut out = String::new();
            let mut rest = s;
            let mut replaced_once = false;
            while let Some(pos) = rest.find(pattern.as_str()) {
                if replaced_once && name == "replace" {
                    break;
                }
                out.push_str(&rest[..pos]);
                let matched = match &replacement {
                    f @ Value::Function(_) => interp
                        .call_function(f, Value::Undefined, vec![Value::string(&pattern)])?
                        .to_display_string(),
                    other => other.to_display_string(),
                };
                out.push_str(&matched);
                rest = &rest[pos + pattern.len()..];
                replaced_once = true;
                if pattern.is_empty() {
                    // An empty pattern matches once at the start.
                    break;
                }
            }
            out.push_str(rest);
            Value::from(out)
        }
        "repeat" => {
            let n = a0.to_number();
            if n < 0.0 || !n.is_finite() {
                return Err(CompileError::runtime(
                    RuntimeErrorKind::RangeError,
                    format!("Invalid count value: {}", format_number(n)),
                ));
            }
            Value::from(s.repeat(n as usize))
        }
        "padStart" | "padEnd" => {
            let target = a0.to_number();
            let target = if target.is_finite() && target > 0.0 { target as usize } else { 0 };
            let fill = match arg(args, 1) {
                Value::Undefined => " ".to_string(),
                other => other.to_display_string(),
            };
            if target <= chars.len() || fill.is_empty() {
                Value::string(s)
            } else {
                let padding: String = fill.chars().cycle().take(target - chars.len()).collect();
                if name == "padStart" {
                    Value::from(format!("{}{}", padding, s))
                } else {
                    Value::from(format!("{}{}", s, padding))
                }
            }
        }
        "concat" => {
            let mut out = s.to_string();
            for a in args {
                out.push_str(&a.to_display_string());
            }
            Value::from(out)
        }
        other => {
            return Err(CompileError::type_error(format!(
                "string.{} is not a function",
                other
            )))
        }
    };
    Ok(value)
}

fn array_method(
    interp: &mut Interpreter<'_>,
    receiver: &Value,
    items: &[Value],
    name: &str,
    args: &[Value],
) -> Result<Value> {
    let a0 = arg(args, 0);
    let callback = |interp: &mut Interpreter<'_>, f: &Value, item: &Value, i: usize| {
        interp.call_function(
            f,
            Value::Undefined,
            vec![item.clone(), Value::from(i), receiver.clone()],
        )
    };
    let value = match name {
        "map" => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(callback(interp, &a0, item, i)?);
            }
            Value::array(out)
        }
        "filter" => {
            let mut out = Vec::new();
            for (i, item) in items.iter().enumerate() {
                if callback(interp, &a0, item, i)?.is_truthy() {
                    out.push(item.clone());
                }
            }
            Value::array(out)
        }
        "find" | "findIndex" => {
            for (i, item) in items.iter().enumerate() {
                if callback(interp, &a0, item, i)?.is_truthy() {
                    return Ok(if name == "find" {
                        item.clone()
                    } else {
                        Value::from(i)
                    });
                }
            }
            if name == "find" {
                Value::Undefined
            } else {
                Value::Number(-1.0)
            }
        }
        "some" => {
            for (i, item) in items.iter().enumerate() {
                if callback(interp, &a0, item, i)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
            }
            Value::Bool(false)
        }
        "every" => {
            for (i, item) in items.iter().enumerate() {
                if !callback(interp, &a0, item, i)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
            }
            Value::Bool(true)
        }
        "forEach" => {
            for (i, item) in items.iter().enumerate() {
                callback(interp, &a0, item, i)?;
            }
            Value::Undefined
        }
        "reduce" => {
            let mut iter = items.iter().enumerate();
            let mut acc = match args.get(1) {
                Some(initial) => initial.clone(),
                None => match iter.next() {
                    Some((_, first)) => first.clone(),
                    None => {
                        return Err(CompileError::type_error(
                            "Reduce of empty array with no initial value",
                        ))
                    }
                },
            };
            for (i, item) in iter {
                acc = interp.call_function(
                    &a0,
                    Value::Undefined,
                    vec![acc, item.clone(), Value::from(i), receiver.clone()],
                )?;
            }
            acc
        }
        "join" | "toString" => {
            let sep = match (&a0, name) {
                (Value::Undefined, _) | (_, "toString") => ",".to_string(),
                (other, _) => other.to_display_string(),
            };
            Value::from(
                items
                    .iter()
                    .map(|item| {
                        if item.is_nullish() {
                            String::new()
                        } else {
                            item.to_display_string()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(&sep),
            )
        }
        "includes" => Value::Bool(items.iter().any(|item| match (item, &a0) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => item.strict_equals(&a0),
        })),
        "indexOf" => match items.iter().position(|item| item.strict_equals(&a0)) {
            Some(i) => Value::from(i),
            None => Value::Number(-1.0),
        },
        "slice" => {
            let start = relative_index(&a0, items.len(), 0);
            let end = relative_index(&arg(args, 1), items.len(), items.len());
            Value::array(items[start..end.max(start)].to_vec())
        }
        "concat" => {
            let mut out = items.to_vec();
            for a in args {
                match a {
                    Value::Array(more) => out.extend(more.iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Value::array(out)
        }
        "reverse" => Value::array(items.iter().rev().cloned().collect()),
        "sort" => Value::array(sort_values(interp, items, &a0)?),
        "flat" => {
            let depth = match &a0 {
                Value::Undefined => 1,
                other => other.to_number().max(0.0) as usize,
            };
            Value::array(flatten(items, depth))
        }
        "at" => {
            let i = a0.to_number().trunc();
            let index = if i < 0.0 { items.len() as f64 + i } else { i };
            if index < 0.0 {
                Value::Undefined
            } else {
                items.get(index as usize).cloned().unwrap_or_default()
            }
        }
        other => {
            return Err(CompileError::type_error(format!(
                "array.{} is not a function",
                other
            )))
        }
    };
    Ok(value)
}

fn flatten(items: &[Value], depth: usize) -> Vec<Value> {
    let mut out = Vec::new();
    for item in items {
        match item {
            Value::Array(inner) if depth > 0 => out.extend(flatten(inner, depth - 1)),
            other => out.push(other.clone()),
        }
    }
    out
}

/// Stable insertion sort; comparator errors propagate. Undefined sorts last.
fn sort_values(interp: &mut Interpreter<'_>, items: &[Value], comparator: &Value) -> Result<Vec<Value>> {
    let mut sorted: Vec<Value> = Vec::with_capacity(items.len());
    let mut undefined = 0;
    for item in items {
        if matches!(item, Value::Undefined) {
            undefined += 1;
            continue;
        }
        let mut pos = sorted.len();
        while pos > 0 {
            let before = &sorted[pos - 1];
            let greater = match comparator {
                Value::Undefined => before.to_display_string() > item.to_display_string(),
                f => {
                    interp
                        .call_function(f, Value::Undefined, vec![before.clone(), item.clone()])?
                        .to_number()
                        > 0.0
                }
            };
            if !greater {
                break;
            }
            pos -= 1;
        }
        sorted.insert(pos, item.clone());
    }
    sorted.extend(std::iter::repeat(Value::Undefined).take(undefined));
    Ok(sorted)
}
