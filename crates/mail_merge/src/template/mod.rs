//! Text template language
//!
//! A small action language over JSON data: `{{.Field}}` interpolation,
//! `if`/`range`/`with` blocks, variables, pipelines and a fixed set of
//! builtin functions. Templates are parsed once and may be executed many
//! times against different contexts.

mod exec;
mod format;
mod funcs;
mod lexer;
mod node;
mod parser;

use tracing::trace;

use crate::context::RenderContext;
use crate::error::{MailMergeError, Result};
use crate::merge_engine::MergeOptions;

/// Parse failure with the 1-based line it was found on
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// A parsed template
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    root: Vec<node::Node>,
}

impl Template {
    /// Parse template text; `name` is used in error messages
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self> {
        let name = name.into();
        let root = lexer::lex(text)
            .and_then(parser::parse)
            .map_err(|err| MailMergeError::TemplateSyntax {
                name: name.clone(),
                line: err.line,
                message: err.message,
            })?;
        trace!(template = %name, nodes = root.len(), "parsed template");
        Ok(Self { name, root })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute against a context; the result is the full rendered text or an error
    pub fn execute(&self, ctx: &RenderContext, options: &MergeOptions) -> Result<String> {
        exec::execute(&self.root, ctx.root(), options).map_err(|err| MailMergeError::TemplateExecution {
            name: self.name.clone(),
            line: err.line,
            message: err.message,
        })
    }
}
