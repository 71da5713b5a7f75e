//! Parse tree for templates

use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    /// `{{pipeline}}`; prints unless the pipeline declares variables
    Action(Pipeline),
    If(Branch),
    Range(Branch),
    With(Branch),
    Break,
    Continue,
}

/// Shared shape of `if`, `range` and `with`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Branch {
    pub pipe: Pipeline,
    pub list: Vec<Node>,
    pub else_list: Option<Vec<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub line: usize,
    /// Variables declared (`:=`) or assigned (`=`) by this pipeline
    pub decl: Vec<String>,
    pub is_assign: bool,
    pub cmds: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Command {
    pub args: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Dot,
    Nil,
    Bool(bool),
    Number(JsonValue),
    Str(String),
    /// `.A.B`, relative to dot
    Field(Vec<String>),
    /// `$x.A.B`
    Variable { name: String, fields: Vec<String> },
    /// Builtin function name
    Function(String),
    /// `(pipeline).A.B`
    Chain { inner: Box<Operand>, fields: Vec<String> },
    /// `(pipeline)`
    Pipe(Box<Pipeline>),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Dot => write!(f, "."),
            Operand::Nil => write!(f, "nil"),
            Operand::Bool(b) => write!(f, "{}", b),
            Operand::Number(n) => write!(f, "{}", n),
            Operand::Str(s) => write!(f, "{:?}", s),
            Operand::Field(fields) => write!(f, ".{}", fields.join(".")),
            Operand::Variable { name, fields } if fields.is_empty() => write!(f, "{}", name),
            Operand::Variable { name, fields } => write!(f, "{}.{}", name, fields.join(".")),
            Operand::Function(name) => write!(f, "{}", name),
            Operand::Chain { inner, fields } => write!(f, "{}.{}", inner, fields.join(".")),
            Operand::Pipe(_) => write!(f, "(pipeline)"),
        }
    }
}
