//! Template execution

use std::borrow::Cow;

use serde_json::Value as JsonValue;

use super::format::display;
use super::funcs::{call, is_true, kind};
use super::node::{Branch, Command, Node, Operand, Pipeline};
use crate::merge_engine::{MergeOptions, MissingKeyPolicy, ValueEscape};

/// Control flow out of a node list
#[derive(Debug, Clone, Copy, PartialEq)]
enum Flow {
    Normal,
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExecError {
    pub line: usize,
    pub message: String,
}

type ExecResult<T> = std::result::Result<T, ExecError>;

static NULL: JsonValue = JsonValue::Null;

pub(crate) struct State<'a> {
    options: &'a MergeOptions,
    /// `$` borrows the root; variables declared by actions own their values
    vars: Vec<(String, Cow<'a, JsonValue>)>,
    out: String,
    line: usize,
}

/// Run a parsed template against a root value
pub(crate) fn execute(nodes: &[Node], root: &JsonValue, options: &MergeOptions) -> ExecResult<String> {
    let mut state = State::new(root, options);
    state.walk_list(nodes, root)?;
    Ok(state.out)
}

impl<'a> State<'a> {
    fn new(root: &'a JsonValue, options: &'a MergeOptions) -> Self {
        Self {
            options,
            vars: vec![("$".to_string(), Cow::Borrowed(root))],
            out: String::new(),
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> ExecError {
        ExecError {
            line: self.line,
            message: message.into(),
        }
    }

    fn walk_list(&mut self, nodes: &[Node], dot: &JsonValue) -> ExecResult<Flow> {
        for node in nodes {
            let flow = self.walk(node, dot)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn walk(&mut self, node: &Node, dot: &JsonValue) -> ExecResult<Flow> {
        match node {
            Node::Text(text) => {
                self.out.push_str(text);
                Ok(Flow::Normal)
            }
            Node::Action(pipe) => {
                let value = self.eval_pipeline(pipe, dot)?;
                if pipe.decl.is_empty() {
                    self.print(&value);
                }
                Ok(Flow::Normal)
            }
            Node::If(branch) => self.walk_if_with(branch, dot, false),
            Node::With(branch) => self.walk_if_with(branch, dot, true),
            Node::Range(branch) => self.walk_range(branch, dot),
            Node::Break => Ok(Flow::Break),
            Node::Continue => Ok(Flow::Continue),
        }
    }

    fn print(&mut self, value: &JsonValue) {
        let text = display(value);
        match self.options.escape {
            ValueEscape::Xml => escape_xml_into(&mut self.out, &text),
            ValueEscape::None => self.out.push_str(&text),
        }
    }

    fn walk_if_with(&mut self, branch: &Branch, dot: &JsonValue, rebind: bool) -> ExecResult<Flow> {
        let scope = self.vars.len();
        let value = self.eval_pipeline(&branch.pipe, dot)?;

        let flow = if is_true(&value) {
            let inner_dot = if rebind { &value } else { dot };
            self.walk_list(&branch.list, inner_dot)?
        } else if let Some(else_list) = &branch.else_list {
            self.walk_list(else_list, dot)?
        } else {
            Flow::Normal
        };

        self.vars.truncate(scope);
        Ok(flow)
    }

    fn walk_range(&mut self, branch: &Branch, dot: &JsonValue) -> ExecResult<Flow> {
        let pipe = &branch.pipe;
        self.line = pipe.line;
        let value = self.eval_commands(&pipe.cmds, dot)?;

        let iterations: Vec<(JsonValue, JsonValue)> = match value {
            JsonValue::Null => Vec::new(),
            JsonValue::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (JsonValue::from(i), item))
                .collect(),
            JsonValue::Object(map) => {
                let mut entries: Vec<(String, JsonValue)> = map.into_iter().collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                entries.into_iter().map(|(k, v)| (JsonValue::String(k), v)).collect()
            }
            JsonValue::Number(n) => match n.as_i64() {
                Some(count) if count >= 0 => (0..count).map(|i| (JsonValue::from(i), JsonValue::from(i))).collect(),
                Some(_) => Vec::new(),
                None => return Err(self.error(format!("range can't iterate over {}", n))),
            },
            other => {
                return Err(self.error(format!("range can't iterate over {}", kind(&other))));
            }
        };

        if iterations.is_empty() {
            return match &branch.else_list {
                Some(else_list) => {
                    let scope = self.vars.len();
                    let flow = self.walk_list(else_list, dot);
                    self.vars.truncate(scope);
                    flow.map(|_| Flow::Normal)
                }
                None => Ok(Flow::Normal),
            };
        }

        let scope = self.vars.len();
        for (key, element) in iterations {
            self.vars.truncate(scope);
            match pipe.decl.as_slice() {
                [elem_var] => self.bind(elem_var, element.clone(), pipe.is_assign)?,
                [key_var, elem_var] => {
                    self.bind(key_var, key, pipe.is_assign)?;
                    self.bind(elem_var, element.clone(), pipe.is_assign)?;
                }
                _ => {}
            }
            if self.walk_list(&branch.list, &element)? == Flow::Break {
                break;
            }
        }
        self.vars.truncate(scope);
        Ok(Flow::Normal)
    }

    fn bind(&mut self, name: &str, value: JsonValue, assign: bool) -> ExecResult<()> {
        if assign {
            match self.vars.iter_mut().rev().find(|(n, _)| n == name) {
                Some(slot) => slot.1 = Cow::Owned(value),
                None => return Err(self.error(format!("undefined variable: {}", name))),
            }
        } else {
            self.vars.push((name.to_string(), Cow::Owned(value)));
        }
        Ok(())
    }

    fn eval_pipeline(&mut self, pipe: &Pipeline, dot: &JsonValue) -> ExecResult<JsonValue> {
        self.line = pipe.line;
        let value = self.eval_commands(&pipe.cmds, dot)?;
        if let Some(name) = pipe.decl.first() {
            self.bind(name, value.clone(), pipe.is_assign)?;
        }
        Ok(value)
    }

    fn eval_commands(&mut self, cmds: &[Command], dot: &JsonValue) -> ExecResult<JsonValue> {
        let mut value = None;
        for cmd in cmds {
            value = Some(self.eval_command(cmd, dot, value.take())?);
        }
        Ok(value.unwrap_or(JsonValue::Null))
    }

    /// `piped` is the previous command's result, passed as the final argument
    fn eval_command(&mut self, cmd: &Command, dot: &JsonValue, piped: Option<JsonValue>) -> ExecResult<JsonValue> {
        let Some((first, rest)) = cmd.args.split_first() else {
            return Ok(JsonValue::Null);
        };

        if let Operand::Function(name) = first {
            return self.eval_function(name, rest, dot, piped);
        }

        if !rest.is_empty() || piped.is_some() {
            return Err(self.error(format!("can't give argument to non-function {}", first)));
        }
        self.eval_arg(first, dot)
    }

    fn eval_function(&mut self, name: &str, rest: &[Operand], dot: &JsonValue, piped: Option<JsonValue>) -> ExecResult<JsonValue> {
        if name == "and" || name == "or" {
            let stop_on_true = name == "or";
            let total = rest.len() + usize::from(piped.is_some());
            if total == 0 {
                return Err(self.error(format!("wrong number of args for {}: want at least 1 got 0", name)));
            }
            let mut last = JsonValue::Null;
            for operand in rest {
                last = self.eval_arg(operand, dot)?;
                if is_true(&last) == stop_on_true {
                    return Ok(last);
                }
            }
            if let Some(value) = piped {
                last = value;
            }
            return Ok(last);
        }

        let mut args = Vec::with_capacity(rest.len() + 1);
        for operand in rest {
            args.push(self.eval_arg(operand, dot)?);
        }
        args.extend(piped);
        call(name, args).map_err(|message| self.error(message))
    }

    fn eval_arg(&mut self, operand: &Operand, dot: &JsonValue) -> ExecResult<JsonValue> {
        match operand {
            Operand::Dot => Ok(dot.clone()),
            Operand::Nil => Ok(JsonValue::Null),
            Operand::Bool(b) => Ok(JsonValue::Bool(*b)),
            Operand::Number(n) => Ok(n.clone()),
            Operand::Str(s) => Ok(JsonValue::String(s.clone())),
            Operand::Field(fields) => self.field_chain(dot, fields).cloned(),
            Operand::Variable { name, fields } => {
                let value = self.variable(name)?;
                self.field_chain(value, fields).cloned()
            }
            Operand::Function(name) => call(name, Vec::new()).map_err(|message| self.error(message)),
            Operand::Chain { inner, fields } => {
                let value = self.eval_arg(inner, dot)?;
                let leaf = self.field_chain(&value, fields)?.clone();
                Ok(leaf)
            }
            Operand::Pipe(pipe) => self.eval_commands(&pipe.cmds, dot),
        }
    }

    fn variable(&self, name: &str) -> ExecResult<&JsonValue> {
        self.vars
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| &**v)
            .ok_or_else(|| self.error(format!("undefined variable: {}", name)))
    }

    /// Follow `.A.B...` from `value` without copying anything along the way
    fn field_chain<'v>(&self, mut value: &'v JsonValue, fields: &[String]) -> ExecResult<&'v JsonValue> {
        for field in fields {
            value = match value {
                JsonValue::Object(map) => match map.get(field) {
                    Some(found) => found,
                    None => match self.options.missing_key {
                        MissingKeyPolicy::Zero => &NULL,
                        MissingKeyPolicy::Error => {
                            return Err(self.error(format!("map has no entry for key {:?}", field)));
                        }
                    },
                },
                JsonValue::Null => match self.options.missing_key {
                    MissingKeyPolicy::Zero => &NULL,
                    MissingKeyPolicy::Error => {
                        return Err(self.error(format!("nil pointer evaluating .{}", field)));
                    }
                },
                other => {
                    return Err(self.error(format!("can't evaluate field {} in type {}", field, kind(other))));
                }
            };
        }
        Ok(value)
    }
}

/// Escape the characters that would break XML character data or a
/// double-quoted attribute value
fn escape_xml_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}
