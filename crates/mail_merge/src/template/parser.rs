//! Template parser
//!
//! Builds the node tree from lexed items. Control structures nest through
//! recursive list parsing; `{{else if}}` and `{{else with}}` become a single
//! nested branch in the else list, sharing the outer `{{end}}`.

use std::vec::IntoIter;

use super::funcs::is_builtin;
use super::lexer::{Item, Token};
use super::node::{Branch, Command, Node, Operand, Pipeline};
use super::SyntaxError;

/// How a list of nodes was terminated
enum Terminator {
    Eof,
    End,
    Else { tokens: Vec<Token>, line: usize },
}

#[derive(Clone, Copy, PartialEq)]
enum BranchKind {
    If,
    Range,
    With,
}

impl BranchKind {
    fn keyword(self) -> &'static str {
        match self {
            BranchKind::If => "if",
            BranchKind::Range => "range",
            BranchKind::With => "with",
        }
    }
}

pub(crate) struct Parser {
    items: IntoIter<Item>,
    /// Variables in scope, innermost last
    vars: Vec<String>,
    range_depth: usize,
    /// Line of the most recent action
    line: usize,
}

/// Parse lexed items into a node list
pub(crate) fn parse(items: Vec<Item>) -> Result<Vec<Node>, SyntaxError> {
    let mut parser = Parser {
        items: items.into_iter(),
        vars: vec!["$".to_string()],
        range_depth: 0,
        line: 1,
    };
    let (nodes, terminator) = parser.parse_list()?;
    match terminator {
        Terminator::Eof => Ok(nodes),
        Terminator::End => Err(SyntaxError::new(parser.line, "unexpected {{end}}")),
        Terminator::Else { line, .. } => Err(SyntaxError::new(line, "unexpected {{else}}")),
    }
}

impl Parser {
    fn parse_list(&mut self) -> Result<(Vec<Node>, Terminator), SyntaxError> {
        let mut nodes = Vec::new();

        while let Some(item) = self.items.next() {
            let (tokens, line) = match item {
                Item::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Item::Action { tokens, line } => (tokens, line),
            };
            self.line = line;

            let keyword = match tokens.first() {
                Some(Token::Ident(word)) => word.as_str(),
                _ => "",
            };

            match keyword {
                "end" => {
                    if tokens.len() > 1 {
                        return Err(SyntaxError::new(line, "unexpected tokens in end"));
                    }
                    return Ok((nodes, Terminator::End));
                }
                "else" => {
                    return Ok((
                        nodes,
                        Terminator::Else {
                            tokens: tokens[1..].to_vec(),
                            line,
                        },
                    ));
                }
                "if" => nodes.push(Node::If(self.parse_branch(BranchKind::If, &tokens[1..], line)?)),
                "range" => nodes.push(Node::Range(self.parse_branch(BranchKind::Range, &tokens[1..], line)?)),
                "with" => nodes.push(Node::With(self.parse_branch(BranchKind::With, &tokens[1..], line)?)),
                "break" | "continue" => {
                    if self.range_depth == 0 {
                        return Err(SyntaxError::new(line, format!("{{{{{}}}}} outside {{{{range}}}}", keyword)));
                    }
                    if tokens.len() > 1 {
                        return Err(SyntaxError::new(line, format!("unexpected tokens in {}", keyword)));
                    }
                    nodes.push(if keyword == "break" { Node::Break } else { Node::Continue });
                }
                "define" | "template" | "block" => {
                    return Err(SyntaxError::new(line, format!("unsupported action {{{{{}}}}}", keyword)));
                }
                _ => {
                    let pipe = self.parse_pipeline(&tokens, line, "command", false)?;
                    nodes.push(Node::Action(pipe));
                }
            }
        }

        Ok((nodes, Terminator::Eof))
    }

    fn parse_branch(&mut self, kind: BranchKind, tokens: &[Token], line: usize) -> Result<Branch, SyntaxError> {
        let scope = self.vars.len();
        let pipe = self.parse_pipeline(tokens, line, kind.keyword(), kind == BranchKind::Range)?;
        let body_scope = self.vars.len();

        if kind == BranchKind::Range {
            self.range_depth += 1;
        }
        let listed = self.parse_list();
        if kind == BranchKind::Range {
            self.range_depth -= 1;
        }
        let (list, terminator) = listed?;
        // variables declared in the body end at {{else}}
        self.vars.truncate(body_scope);

        let else_list = match terminator {
            Terminator::Eof => return Err(SyntaxError::new(line, format!("unexpected EOF in {{{{{}}}}}", kind.keyword()))),
            Terminator::End => None,
            Terminator::Else { tokens, line: else_line } => {
                let chained = match tokens.first() {
                    Some(Token::Ident(word)) if word == "if" && kind == BranchKind::If => Some(BranchKind::If),
                    Some(Token::Ident(word)) if word == "with" && kind == BranchKind::With => Some(BranchKind::With),
                    Some(_) => return Err(SyntaxError::new(else_line, "unexpected tokens in else")),
                    None => None,
                };
                match chained {
                    Some(BranchKind::If) => Some(vec![Node::If(self.parse_branch(BranchKind::If, &tokens[1..], else_line)?)]),
                    Some(_) => Some(vec![Node::With(self.parse_branch(BranchKind::With, &tokens[1..], else_line)?)]),
                    None => {
                        let (else_nodes, terminator) = self.parse_list()?;
                        match terminator {
                            Terminator::End => Some(else_nodes),
                            Terminator::Else { line, .. } => {
                                return Err(SyntaxError::new(line, format!("expected end; found {{{{else}}}} in {{{{{}}}}}", kind.keyword())));
                            }
                            Terminator::Eof => {
                                return Err(SyntaxError::new(else_line, format!("unexpected EOF in {{{{{}}}}}", kind.keyword())));
                            }
                        }
                    }
                }
            }
        };

        self.vars.truncate(scope);
        Ok(Branch { pipe, list, else_list })
    }

    /// Parse `[$a[, $b] (:=|=)] cmd | cmd ...`
    fn parse_pipeline(&mut self, tokens: &[Token], line: usize, context: &str, allow_two: bool) -> Result<Pipeline, SyntaxError> {
        let mut decl = Vec::new();
        let mut is_assign = false;
        let mut rest = tokens;

        let declared = match tokens {
            [Token::Variable(a, fa), Token::Comma, Token::Variable(b, fb), op @ (Token::Declare | Token::Assign), ..]
                if fa.is_empty() && fb.is_empty() =>
            {
                if !allow_two {
                    return Err(SyntaxError::new(line, format!("too many declarations in {}", context)));
                }
                Some((vec![a.clone(), b.clone()], op, 4))
            }
            [Token::Variable(a, fa), op @ (Token::Declare | Token::Assign), ..] if fa.is_empty() => {
                Some((vec![a.clone()], op, 2))
            }
            _ => None,
        };

        if let Some((names, op, consumed)) = declared {
            is_assign = *op == Token::Assign;
            if is_assign {
                for name in &names {
                    if !self.vars.contains(name) {
                        return Err(SyntaxError::new(line, format!("undefined variable {:?}", name)));
                    }
                }
            }
            decl = names;
            rest = &tokens[consumed..];
        }

        let mut cmds = Vec::new();
        for segment in split_pipes(rest) {
            if segment.is_empty() {
                return Err(SyntaxError::new(line, format!("missing command in {}", context)));
            }
            cmds.push(self.parse_command(segment, line)?);
        }
        if cmds.is_empty() {
            return Err(SyntaxError::new(line, format!("missing value for {}", context)));
        }

        if !is_assign {
            self.vars.extend(decl.iter().cloned());
        }

        Ok(Pipeline { line, decl, is_assign, cmds })
    }

    fn parse_command(&mut self, tokens: &[Token], line: usize) -> Result<Command, SyntaxError> {
        let mut args = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let operand = match &tokens[i] {
                Token::Dot => Operand::Dot,
                Token::Nil => Operand::Nil,
                Token::Bool(b) => Operand::Bool(*b),
                Token::Number(n) => Operand::Number(n.clone()),
                Token::Str(s) => Operand::Str(s.clone()),
                Token::Field(fields) => Operand::Field(fields.clone()),
                Token::Variable(name, fields) => {
                    if !self.vars.contains(name) {
                        return Err(SyntaxError::new(line, format!("undefined variable {:?}", name)));
                    }
                    Operand::Variable { name: name.clone(), fields: fields.clone() }
                }
                Token::Ident(name) => {
                    if !is_builtin(name) {
                        return Err(SyntaxError::new(line, format!("function {:?} not defined", name)));
                    }
                    Operand::Function(name.clone())
                }
                Token::LeftParen => {
                    let close = matching_paren(tokens, i)
                        .ok_or_else(|| SyntaxError::new(line, "unclosed left paren"))?;
                    let inner = self.parse_pipeline(&tokens[i + 1..close], line, "parenthesized pipeline", false)?;
                    if !inner.decl.is_empty() {
                        return Err(SyntaxError::new(line, "declaration in parenthesized pipeline"));
                    }
                    i = close;
                    let pipe = Operand::Pipe(Box::new(inner));
                    match tokens.get(i + 1) {
                        Some(Token::ChainField(fields)) => {
                            i += 1;
                            Operand::Chain { inner: Box::new(pipe), fields: fields.clone() }
                        }
                        _ => pipe,
                    }
                }
                Token::RightParen => return Err(SyntaxError::new(line, "unexpected right paren")),
                Token::ChainField(_) => return Err(SyntaxError::new(line, "unexpected field chain")),
                Token::Declare | Token::Assign => return Err(SyntaxError::new(line, "unexpected declaration")),
                Token::Comma => return Err(SyntaxError::new(line, "unexpected comma")),
                Token::Pipe => return Err(SyntaxError::new(line, "unexpected pipe")),
            };
            args.push(operand);
            i += 1;
        }

        if args.len() > 1 {
            let callable = matches!(args[0], Operand::Function(_) | Operand::Field(_) | Operand::Variable { .. } | Operand::Chain { .. });
            if !callable {
                return Err(SyntaxError::new(line, format!("can't give argument to non-function {}", args[0])));
            }
        }

        Ok(Command { args })
    }
}

/// Split tokens on top-level `|`
fn split_pipes(tokens: &[Token]) -> Vec<&[Token]> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LeftParen => depth += 1,
            Token::RightParen => depth = depth.saturating_sub(1),
            Token::Pipe if depth == 0 => {
                segments.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&tokens[start..]);
    segments
}

fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::LeftParen => depth += 1,
            Token::RightParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::lexer::lex;

    fn parse_str(src: &str) -> Result<Vec<Node>, SyntaxError> {
        parse(lex(src)?)
    }

    #[test]
    fn test_parse_range_with_else() {
        let nodes = parse_str("{{range .Items}}{{.Name}}{{else}}none{{end}}").unwrap();
        assert_eq!(nodes.len(), 1);
        let Node::Range(branch) = &nodes[0] else { panic!("expected range") };
        assert_eq!(branch.list.len(), 1);
        assert_eq!(branch.else_list, Some(vec![Node::Text("none".to_string())]));
    }

    #[test]
    fn test_parse_else_if_chain() {
        let nodes = parse_str("{{if .A}}a{{else if .B}}b{{else}}c{{end}}").unwrap();
        let Node::If(branch) = &nodes[0] else { panic!("expected if") };
        let else_list = branch.else_list.as_ref().unwrap();
        let Node::If(nested) = &else_list[0] else { panic!("expected nested if") };
        assert_eq!(nested.else_list, Some(vec![Node::Text("c".to_string())]));
    }

    #[test]
    fn test_parse_pipeline_commands() {
        let nodes = parse_str(r#"{{.Total | printf "%s"}}"#).unwrap();
        let Node::Action(pipe) = &nodes[0] else { panic!("expected action") };
        assert_eq!(pipe.cmds.len(), 2);
        assert_eq!(pipe.cmds[1].args[0], Operand::Function("printf".to_string()));
    }

    #[test]
    fn test_parse_range_declarations() {
        let nodes = parse_str("{{range $i, $e := .Items}}{{$i}}{{$e.Name}}{{end}}").unwrap();
        let Node::Range(branch) = &nodes[0] else { panic!("expected range") };
        assert_eq!(branch.pipe.decl, vec!["$i".to_string(), "$e".to_string()]);
    }

    #[test]
    fn test_variable_scope_ends_with_block() {
        let err = parse_str("{{if true}}{{$x := 1}}{{end}}{{$x}}").unwrap_err();
        assert!(err.message.contains("undefined variable"));
    }

    #[test]
    fn test_body_variable_not_visible_in_else() {
        let err = parse_str("{{if .A}}{{$x := 1}}{{else}}{{$x}}{{end}}").unwrap_err();
        assert_eq!(err.message, "undefined variable \"$x\"");

        let err = parse_str("{{with .A}}{{$y := .}}{{else with .B}}{{$y}}{{end}}").unwrap_err();
        assert!(err.message.contains("undefined variable"));
    }

    #[test]
    fn test_pipeline_variable_visible_in_else() {
        assert!(parse_str("{{if $x := .A}}{{$x}}{{else}}{{$x}}{{end}}").is_ok());
    }

    #[test]
    fn test_unbalanced_end() {
        let err = parse_str("{{range .Items}}x{{end}}{{end}}").unwrap_err();
        assert_eq!(err.message, "unexpected {{end}}");
    }

    #[test]
    fn test_missing_end() {
        let err = parse_str("{{range .Items}}\n{{.Name}}").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.message, "unexpected EOF in {{range}}");
    }

    #[test]
    fn test_break_outside_range() {
        assert!(parse_str("{{if true}}{{break}}{{end}}").is_err());
        assert!(parse_str("{{range .X}}{{if true}}{{break}}{{end}}{{end}}").is_ok());
    }

    #[test]
    fn test_unknown_function() {
        let err = parse_str("{{frobnicate .X}}").unwrap_err();
        assert_eq!(err.message, "function \"frobnicate\" not defined");
    }

    #[test]
    fn test_argument_to_literal() {
        assert!(parse_str(r#"{{"a" "b"}}"#).is_err());
    }

    #[test]
    fn test_parenthesized_chain() {
        let nodes = parse_str("{{(index .Items 0).Name}}").unwrap();
        let Node::Action(pipe) = &nodes[0] else { panic!("expected action") };
        assert!(matches!(&pipe.cmds[0].args[0], Operand::Chain { fields, .. } if fields == &vec!["Name".to_string()]));
    }
}
