//! Template lexer
//!
//! Splits template text into literal text and `{{ ... }}` actions, applying
//! `{{-` / `-}}` whitespace trimming and dropping `{{/* comments */}}`, then
//! tokenizes the inside of every action.

use serde_json::Value as JsonValue;

use super::SyntaxError;

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";

/// A lexical item: literal text or one action
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    Text(String),
    Action { tokens: Vec<Token>, line: usize },
}

/// A token inside an action
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// `.`
    Dot,
    /// `.A.B`
    Field(Vec<String>),
    /// `.A.B` written directly after `)`
    ChainField(Vec<String>),
    /// `$name.A.B`, the name keeps its `$`
    Variable(String, Vec<String>),
    Ident(String),
    Str(String),
    Number(JsonValue),
    Bool(bool),
    Nil,
    LeftParen,
    RightParen,
    Pipe,
    Declare,
    Assign,
    Comma,
}

/// Split a template into items
pub(crate) fn lex(src: &str) -> Result<Vec<Item>, SyntaxError> {
    let mut items = Vec::new();
    let mut pos = 0;
    let mut line = 1;
    let mut trim_next = false;

    loop {
        let open = src[pos..].find(LEFT_DELIM).map(|i| pos + i);
        let text_end = open.unwrap_or(src.len());
        let raw_text = &src[pos..text_end];

        let mut text = raw_text;
        if trim_next {
            text = text.trim_start();
        }
        let left_trim = open.is_some_and(|start| has_left_trim(&src[start + LEFT_DELIM.len()..]));
        if left_trim {
            text = text.trim_end();
        }
        if !text.is_empty() {
            items.push(Item::Text(text.to_string()));
        }
        line += count_lines(raw_text);

        let Some(start) = open else { break };

        let action_line = line;
        let mut body_start = start + LEFT_DELIM.len();
        if left_trim {
            body_start += 1;
        }

        let close = find_close(src, body_start).ok_or_else(|| SyntaxError {
            line: action_line,
            message: "unclosed action".to_string(),
        })?;

        let mut body_end = close;
        trim_next = has_right_trim(&src[body_start..close]);
        if trim_next {
            body_end -= 1;
        }

        let body = &src[body_start..body_end];
        line += count_lines(&src[start..close]);
        pos = close + RIGHT_DELIM.len();

        let trimmed = body.trim();
        if trimmed.starts_with("/*") {
            if !trimmed.ends_with("*/") {
                return Err(SyntaxError {
                    line: action_line,
                    message: "comment ends before closing delimiter".to_string(),
                });
            }
            continue;
        }

        let tokens = tokenize(body, action_line)?;
        if tokens.is_empty() {
            return Err(SyntaxError {
                line: action_line,
                message: "missing value for command".to_string(),
            });
        }
        items.push(Item::Action {
            tokens,
            line: action_line,
        });
    }

    Ok(items)
}

fn count_lines(s: &str) -> usize {
    s.bytes().filter(|&b| b == b'\n').count()
}

/// `{{- ` trims preceding whitespace; `{{-3}}` is a negative number
fn has_left_trim(after_delim: &str) -> bool {
    let mut chars = after_delim.chars();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

/// ` -}}` trims following whitespace
fn has_right_trim(body: &str) -> bool {
    let mut chars = body.chars().rev();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

/// Find the `}}` closing the action starting at `from`, skipping quoted text
/// and comments
fn find_close(src: &str, from: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let body = src[from..].trim_start();
    if body.starts_with("/*") {
        let comment_start = src.len() - body.len();
        let comment_end = src[comment_start..].find("*/")? + comment_start + 2;
        return src[comment_end..].find(RIGHT_DELIM).map(|i| comment_end + i);
    }

    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'`' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'`' {
                    i += 1;
                }
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenize the body of a single action
fn tokenize(body: &str, line: usize) -> Result<Vec<Token>, SyntaxError> {
    let chars: Vec<char> = body.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let err = |message: String| SyntaxError { line, message };

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LeftParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RightParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ':' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Declare);
                i += 2;
            }
            '=' => {
                tokens.push(Token::Assign);
                i += 1;
            }
            '"' => {
                let (s, next) = lex_quoted(&chars, i).map_err(err)?;
                tokens.push(Token::Str(s));
                i = next;
            }
            '`' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&c| c == '`')
                    .ok_or_else(|| err("unterminated raw quoted string".to_string()))?;
                tokens.push(Token::Str(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            '\'' => {
                let (value, next) = lex_char(&chars, i).map_err(err)?;
                tokens.push(Token::Number(JsonValue::from(value as u32)));
                i = next;
            }
            '$' => {
                let start = i;
                i += 1;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                let (fields, next) = lex_fields(&chars, i);
                tokens.push(Token::Variable(name, fields));
                i = next;
            }
            '.' if chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) => {
                let (number, next) = lex_number(&chars, i).map_err(err)?;
                tokens.push(Token::Number(number));
                i = next;
            }
            '.' => {
                let chained = i > 0 && chars[i - 1] == ')';
                let (fields, next) = lex_fields(&chars, i);
                if fields.is_empty() {
                    if chars.get(i + 1).is_some_and(|&c| !c.is_whitespace() && !matches!(c, ')' | '|')) {
                        return Err(err(format!("bad character {:?} after '.'", chars[i + 1])));
                    }
                    tokens.push(Token::Dot);
                    i += 1;
                } else {
                    tokens.push(if chained {
                        Token::ChainField(fields)
                    } else {
                        Token::Field(fields)
                    });
                    i = next;
                }
            }
            c if c.is_ascii_digit() || ((c == '-' || c == '+') && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit() || *n == '.')) => {
                let (number, next) = lex_number(&chars, i).map_err(err)?;
                tokens.push(Token::Number(number));
                i = next;
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "true" => Token::Bool(true),
                    "false" => Token::Bool(false),
                    "nil" => Token::Nil,
                    _ => Token::Ident(word),
                });
            }
            other => return Err(err(format!("unexpected {:?} in command", other))),
        }
    }

    Ok(tokens)
}

/// Read a `.A.B` chain starting at a `.`; returns no fields if none follow
fn lex_fields(chars: &[char], mut i: usize) -> (Vec<String>, usize) {
    let mut fields = Vec::new();
    while i < chars.len() && chars[i] == '.' && chars.get(i + 1).is_some_and(|&c| is_ident_start(c)) {
        let start = i + 1;
        i = start;
        while i < chars.len() && is_ident_char(chars[i]) {
            i += 1;
        }
        fields.push(chars[start..i].iter().collect());
    }
    (fields, i)
}

fn lex_quoted(chars: &[char], start: usize) -> Result<(String, usize), String> {
    let mut out = String::new();
    let mut i = start + 1;
    loop {
        match chars.get(i) {
            None => return Err("unterminated quoted string".to_string()),
            Some('"') => return Ok((out, i + 1)),
            Some('\\') => {
                let escaped = chars
                    .get(i + 1)
                    .ok_or_else(|| "unterminated quoted string".to_string())?;
                out.push(unescape(*escaped)?);
                i += 2;
            }
            Some(&c) => {
                out.push(c);
                i += 1;
            }
        }
    }
}

fn lex_char(chars: &[char], start: usize) -> Result<(char, usize), String> {
    match (chars.get(start + 1), chars.get(start + 2), chars.get(start + 3)) {
        (Some('\\'), Some(&escaped), Some('\'')) => Ok((unescape(escaped)?, start + 4)),
        (Some(&c), Some('\''), _) if c != '\\' => Ok((c, start + 3)),
        _ => Err("malformed character constant".to_string()),
    }
}

fn unescape(c: char) -> Result<char, String> {
    match c {
        'n' => Ok('\n'),
        't' => Ok('\t'),
        'r' => Ok('\r'),
        '0' => Ok('\0'),
        '\\' | '"' | '\'' => Ok(c),
        other => Err(format!("unknown escape sequence: \\{}", other)),
    }
}

fn lex_number(chars: &[char], start: usize) -> Result<(JsonValue, usize), String> {
    let mut i = start;
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '.' | '_' | '+' | '-')) {
        // a sign only belongs to the number at the start or after an exponent
        if matches!(chars[i], '+' | '-') && i != start && !matches!(chars[i - 1], 'e' | 'E') {
            break;
        }
        i += 1;
    }
    let text: String = chars[start..i].iter().filter(|&&c| c != '_').collect();
    parse_number(&text)
        .map(|n| (n, i))
        .ok_or_else(|| format!("bad number syntax: {:?}", text))
}

fn parse_number(text: &str) -> Option<JsonValue> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let hex = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"));
    if let Some(hex) = hex {
        let value = i64::from_str_radix(hex, 16).ok()?;
        return Some(JsonValue::from(if negative { -value } else { value }));
    }
    if let Ok(value) = text.trim_start_matches('+').parse::<i64>() {
        return Some(JsonValue::from(value));
    }
    let value = text.trim_start_matches('+').parse::<f64>().ok()?;
    serde_json::Number::from_f64(value).map(JsonValue::Number)
}
