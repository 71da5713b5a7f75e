//! Builtin functions

use std::cmp::Ordering;

use serde_json::Value as JsonValue;

use super::format::{sprint, sprintf, sprintln};

const BUILTINS: &[&str] = &[
    "and", "or", "not", "len", "index", "eq", "ne", "lt", "le", "gt", "ge", "print", "println", "printf", "html",
];

pub(crate) fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Truthiness used by `if`, `with`, `and`, `or` and `not`
pub(crate) fn is_true(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
    }
}

/// Call a builtin with evaluated arguments
pub(crate) fn call(name: &str, args: Vec<JsonValue>) -> Result<JsonValue, String> {
    match name {
        "and" => {
            want_at_least(name, &args, 1)?;
            let position = args.iter().position(|a| !is_true(a)).unwrap_or(args.len() - 1);
            Ok(args.into_iter().nth(position).unwrap_or(JsonValue::Null))
        }
        "or" => {
            want_at_least(name, &args, 1)?;
            let position = args.iter().position(is_true).unwrap_or(args.len() - 1);
            Ok(args.into_iter().nth(position).unwrap_or(JsonValue::Null))
        }
        "not" => {
            want_exactly(name, &args, 1)?;
            Ok(JsonValue::Bool(!is_true(&args[0])))
        }
        "len" => {
            want_exactly(name, &args, 1)?;
            length(&args[0]).map(JsonValue::from)
        }
        "index" => {
            want_at_least(name, &args, 1)?;
            index(&args[0], &args[1..])
        }
        "eq" => {
            want_at_least(name, &args, 2)?;
            for other in &args[1..] {
                if equal(&args[0], other)? {
                    return Ok(JsonValue::Bool(true));
                }
            }
            Ok(JsonValue::Bool(false))
        }
        "ne" => {
            want_exactly(name, &args, 2)?;
            Ok(JsonValue::Bool(!equal(&args[0], &args[1])?))
        }
        "lt" | "le" | "gt" | "ge" => {
            want_exactly(name, &args, 2)?;
            let ordering = order(&args[0], &args[1])?;
            Ok(JsonValue::Bool(match name {
                "lt" => ordering == Ordering::Less,
                "le" => ordering != Ordering::Greater,
                "gt" => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        "print" => Ok(JsonValue::String(sprint(&args))),
        "println" => Ok(JsonValue::String(sprintln(&args))),
        "printf" => {
            want_at_least(name, &args, 1)?;
            match &args[0] {
                JsonValue::String(format) => Ok(JsonValue::String(sprintf(format, &args[1..]))),
                other => Err(format!("printf: format must be a string, got {}", kind(other))),
            }
        }
        "html" => Ok(JsonValue::String(escape_html(&sprint(&args)))),
        other => Err(format!("function {:?} not defined", other)),
    }
}

fn want_exactly(name: &str, args: &[JsonValue], n: usize) -> Result<(), String> {
    if args.len() != n {
        return Err(format!("wrong number of args for {}: want {} got {}", name, n, args.len()));
    }
    Ok(())
}

fn want_at_least(name: &str, args: &[JsonValue], n: usize) -> Result<(), String> {
    if args.len() < n {
        return Err(format!("wrong number of args for {}: want at least {} got {}", name, n, args.len()));
    }
    Ok(())
}

pub(crate) fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "nil",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(n) if n.is_f64() => "float",
        JsonValue::Number(_) => "int",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "map",
    }
}

fn length(value: &JsonValue) -> Result<usize, String> {
    match value {
        JsonValue::Null => Ok(0),
        JsonValue::String(s) => Ok(s.chars().count()),
        JsonValue::Array(items) => Ok(items.len()),
        JsonValue::Object(map) => Ok(map.len()),
        other => Err(format!("len of type {}", kind(other))),
    }
}

fn index(item: &JsonValue, keys: &[JsonValue]) -> Result<JsonValue, String> {
    let mut current = item.clone();
    for key in keys {
        current = match (&current, key) {
            (JsonValue::Array(items), JsonValue::Number(n)) => {
                let i = n.as_i64().ok_or_else(|| format!("cannot index array with {}", n))?;
                usize::try_from(i)
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()
                    .ok_or_else(|| format!("index out of range: {}", i))?
            }
            (JsonValue::String(s), JsonValue::Number(n)) => {
                let i = n.as_i64().ok_or_else(|| format!("cannot index string with {}", n))?;
                usize::try_from(i)
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| JsonValue::from(c as u32))
                    .ok_or_else(|| format!("index out of range: {}", i))?
            }
            (JsonValue::Object(map), JsonValue::String(k)) => map.get(k).cloned().unwrap_or(JsonValue::Null),
            (JsonValue::Null, _) => return Err("index of untyped nil".to_string()),
            (container, key) => {
                return Err(format!("can't index item of type {} with {}", kind(container), kind(key)));
            }
        };
    }
    Ok(current)
}

/// Equality over basic kinds; all numbers compare numerically
fn equal(a: &JsonValue, b: &JsonValue) -> Result<bool, String> {
    match (a, b) {
        (JsonValue::Null, _) | (_, JsonValue::Null) => Ok(a.is_null() && b.is_null()),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => Ok(x == y),
        (JsonValue::String(x), JsonValue::String(y)) => Ok(x == y),
        (JsonValue::Number(_), JsonValue::Number(_)) => Ok(compare_numbers(a, b) == Some(Ordering::Equal)),
        (JsonValue::Array(_), _) | (JsonValue::Object(_), _) | (_, JsonValue::Array(_)) | (_, JsonValue::Object(_)) => {
            Err(format!("non-comparable type {}", if a.is_array() || a.is_object() { kind(a) } else { kind(b) }))
        }
        _ => Err(format!("incompatible types for comparison: {} and {}", kind(a), kind(b))),
    }
}

fn order(a: &JsonValue, b: &JsonValue) -> Result<Ordering, String> {
    match (a, b) {
        (JsonValue::String(x), JsonValue::String(y)) => Ok(x.cmp(y)),
        (JsonValue::Number(_), JsonValue::Number(_)) => {
            compare_numbers(a, b).ok_or_else(|| "invalid number for comparison".to_string())
        }
        (JsonValue::Number(_), JsonValue::String(_)) | (JsonValue::String(_), JsonValue::Number(_)) => {
            Err(format!("incompatible types for comparison: {} and {}", kind(a), kind(b)))
        }
        _ => Err(format!(
            "invalid type for comparison: {}",
            if matches!(a, JsonValue::Number(_) | JsonValue::String(_)) { kind(b) } else { kind(a) }
        )),
    }
}

fn compare_numbers(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}
