//! Value printing and `printf` verbs

use serde_json::Value as JsonValue;

/// Render a value the way actions print it
pub(crate) fn display(value: &JsonValue) -> String {
    let mut out = String::new();
    write_value(&mut out, value, false);
    out
}

fn write_value(out: &mut String, value: &JsonValue, nested: bool) {
    match value {
        JsonValue::Null if nested => out.push_str("<nil>"),
        JsonValue::Null => {}
        JsonValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        JsonValue::Number(n) => out.push_str(&format_number(n)),
        JsonValue::String(s) => out.push_str(s),
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_value(out, item, true);
            }
            out.push(']');
        }
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push_str("map[");
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(key);
                out.push(':');
                write_value(out, &map[key.as_str()], true);
            }
            out.push(']');
        }
    }
}

fn format_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(|f| f.to_string()).unwrap_or_default()
    }
}

/// `print`: operands are joined with a space only when neither side is a string
pub(crate) fn sprint(args: &[JsonValue]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 && !args[i - 1].is_string() && !arg.is_string() {
            out.push(' ');
        }
        out.push_str(&display(arg));
    }
    out
}

/// `println`: always space separated, newline terminated
pub(crate) fn sprintln(args: &[JsonValue]) -> String {
    let parts: Vec<String> = args.iter().map(display).collect();
    let mut out = parts.join(" ");
    out.push('\n');
    out
}

#[derive(Default)]
struct Spec {
    minus: bool,
    zero: bool,
    plus: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

/// Largest width or precision accepted in a verb
const MAX_FIELD: usize = 1_000_000;

/// `printf` with the `%v %s %d %f %t %q %x %%` verbs
///
/// Mismatched verbs and missing operands render inline as `%!verb(...)`
/// rather than failing the merge.
pub(crate) fn sprintf(format: &str, args: &[JsonValue]) -> String {
    let mut out = String::new();
    let mut chars = format.chars().peekable();
    let mut next_arg = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.minus = true,
                '0' => spec.zero = true,
                '+' => spec.plus = true,
                _ => break,
            }
            chars.next();
        }
        spec.width = read_digits(&mut chars);
        if spec.width.is_some_and(|w| w > MAX_FIELD) {
            out.push_str("%!(BADWIDTH)");
            spec.width = None;
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            spec.precision = Some(read_digits(&mut chars).unwrap_or(0));
            if spec.precision.is_some_and(|p| p > MAX_FIELD) {
                out.push_str("%!(BADPREC)");
                spec.precision = None;
            }
        }

        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }

        let Some(arg) = args.get(next_arg) else {
            out.push_str(&format!("%!{}(MISSING)", verb));
            continue;
        };
        next_arg += 1;

        let body = match format_verb(verb, arg, &spec) {
            Some(body) => body,
            None => {
                out.push_str(&format!("%!{}({})", verb, display(arg)));
                continue;
            }
        };
        out.push_str(&pad(body, &spec, verb));
    }

    if next_arg < args.len() {
        let extra: Vec<String> = args[next_arg..].iter().map(display).collect();
        out.push_str(&format!("%!(EXTRA {})", extra.join(", ")));
    }

    out
}

fn read_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(d as usize));
        chars.next();
    }
    value
}

fn format_verb(verb: char, arg: &JsonValue, spec: &Spec) -> Option<String> {
    match verb {
        'v' => Some(match (arg, spec.precision) {
            (JsonValue::Number(n), Some(p)) if !n.is_i64() && !n.is_u64() => format!("{:.*}", p, n.as_f64()?),
            _ => display(arg),
        }),
        's' => {
            let text = display(arg);
            Some(match spec.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            })
        }
        'd' => {
            let n = as_integer(arg)?;
            Some(if spec.plus && n >= 0 { format!("+{}", n) } else { n.to_string() })
        }
        'f' => {
            let f = arg.as_f64()?;
            let p = spec.precision.unwrap_or(6);
            Some(if spec.plus && f >= 0.0 { format!("+{:.*}", p, f) } else { format!("{:.*}", p, f) })
        }
        't' => arg.as_bool().map(|b| b.to_string()),
        'q' => match arg {
            JsonValue::String(s) => Some(format!("{:?}", s)),
            _ => None,
        },
        'x' => match arg {
            JsonValue::String(s) => Some(s.bytes().map(|b| format!("{:02x}", b)).collect()),
            _ => {
                let n = as_integer(arg)?;
                Some(if n < 0 { format!("-{:x}", n.unsigned_abs()) } else { format!("{:x}", n) })
            }
        },
        _ => None,
    }
}

fn as_integer(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn pad(body: String, spec: &Spec, verb: char) -> String {
    let Some(width) = spec.width else { return body };
    let len = body.chars().count();
    if len >= width {
        return body;
    }
    let fill = width - len;
    if spec.minus {
        return format!("{}{}", body, " ".repeat(fill));
    }
    if spec.zero && matches!(verb, 'd' | 'f' | 'x') {
        let (sign, digits) = match body.strip_prefix(['-', '+']) {
            Some(rest) => (&body[..1], rest),
            None => ("", body.as_str()),
        };
        return format!("{}{}{}", sign, "0".repeat(fill), digits);
    }
    format!("{}{}", " ".repeat(fill), body)
}
