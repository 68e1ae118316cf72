//! A small subset of Go's `text/template`.
//!
//! Supported actions: `{{.Var}}`, `{{if .X}}`, `{{if not .X}}`, `{{else}}`
//! and `{{end}}`, with `{{-` / `-}}` trimming adjacent whitespace. Variable
//! names are checked against a fixed set when the template is parsed.

use std::collections::BTreeMap;
use thiserror::Error;

/// Variables available to the statement template.
pub const FUNC_VARS: &[&str] = &[
    "Ctx",
    "CtxVar",
    "FuncName",
    "FuncBaseName",
    "PackageName",
    "ReceiverType",
    "ReceiverVar",
    "IsMethod",
    "IsPointerReceiver",
    "IsGeneric",
];

/// Variables available to a carrier accessor.
pub const ACCESSOR_VARS: &[&str] = &["Var"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed action starting at byte {offset}")]
    Unclosed { offset: usize },

    #[error("unsupported action `{{{{{action}}}}}` at byte {offset}")]
    BadAction { action: String, offset: usize },

    #[error("unknown template variable `.{name}`{}", hint(.suggestion))]
    UnknownVariable {
        name: String,
        suggestion: Option<String>,
    },

    #[error("`{{{{{keyword}}}}}` at byte {offset} has no matching `{{{{if}}}}`")]
    Unmatched { keyword: &'static str, offset: usize },

    #[error("`{{{{if}}}}` at byte {offset} is never closed with `{{{{end}}}}`")]
    MissingEnd { offset: usize },

    #[error("no value for `.{0}`")]
    MissingValue(String),
}

fn hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean `.{name}`?)"),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Bool(bool),
}

impl Value {
    /// Empty strings and `false` are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

pub type Vars = BTreeMap<&'static str, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Var(String),
    If {
        negate: bool,
        var: String,
        then: Vec<Piece>,
        otherwise: Vec<Piece>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    pieces: Vec<Piece>,
}

impl Template {
    /// Parse `source`, rejecting variables outside `known`.
    pub fn parse(source: &str, known: &[&str]) -> Result<Self, TemplateError> {
        let tokens = lex(source)?;
        let mut parser = Parser {
            tokens: tokens.into_iter(),
            known,
        };
        let (pieces, stop) = parser.sequence()?;
        match stop {
            Stop::Eof => Ok(Self {
                source: source.to_string(),
                pieces,
            }),
            Stop::Else(offset) => Err(TemplateError::Unmatched {
                keyword: "else",
                offset,
            }),
            Stop::End(offset) => Err(TemplateError::Unmatched {
                keyword: "end",
                offset,
            }),
        }
    }

    /// A template that renders a single variable.
    pub fn variable(name: &str) -> Self {
        Self {
            source: format!("{{{{.{name}}}}}"),
            pieces: vec![Piece::Var(name.to_string())],
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render(&self, vars: &Vars) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        render_into(&self.pieces, vars, &mut out)?;
        Ok(out)
    }
}

fn render_into(pieces: &[Piece], vars: &Vars, out: &mut String) -> Result<(), TemplateError> {
    for piece in pieces {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Var(name) => match lookup(vars, name)? {
                Value::Str(s) => out.push_str(s),
                Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            },
            Piece::If {
                negate,
                var,
                then,
                otherwise,
            } => {
                let branch = if lookup(vars, var)?.truthy() != *negate {
                    then
                } else {
                    otherwise
                };
                render_into(branch, vars, out)?;
            }
        }
    }
    Ok(())
}

fn lookup<'v>(vars: &'v Vars, name: &str) -> Result<&'v Value, TemplateError> {
    vars.get(name)
        .ok_or_else(|| TemplateError::MissingValue(name.to_string()))
}

#[derive(Debug)]
enum Token {
    Text(String),
    Action { body: String, offset: usize },
}

fn lex(source: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut offset = 0;
    let mut trim_next = false;

    while let Some(open) = rest.find("{{") {
        let mut text = &rest[..open];
        if trim_next {
            text = text.trim_start();
        }
        let after_open = &rest[open + 2..];
        let close = after_open
            .find("}}")
            .ok_or(TemplateError::Unclosed { offset: offset + open })?;
        let mut body = &after_open[..close];

        if let Some(stripped) = body.strip_prefix('-') {
            text = text.trim_end();
            body = stripped;
        }
        trim_next = false;
        if let Some(stripped) = body.strip_suffix('-') {
            trim_next = true;
            body = stripped;
        }

        if !text.is_empty() {
            tokens.push(Token::Text(text.to_string()));
        }
        tokens.push(Token::Action {
            body: body.trim().to_string(),
            offset: offset + open,
        });

        let consumed = open + 2 + close + 2;
        rest = &rest[consumed..];
        offset += consumed;
    }

    let tail = if trim_next { rest.trim_start() } else { rest };
    if !tail.is_empty() {
        tokens.push(Token::Text(tail.to_string()));
    }
    Ok(tokens)
}

enum Stop {
    Eof,
    Else(usize),
    End(usize),
}

struct Parser<'k> {
    tokens: std::vec::IntoIter<Token>,
    known: &'k [&'k str],
}

impl Parser<'_> {
    fn sequence(&mut self) -> Result<(Vec<Piece>, Stop), TemplateError> {
        let mut pieces = Vec::new();
        while let Some(token) = self.tokens.next() {
            let (body, offset) = match token {
                Token::Text(text) => {
                    pieces.push(Piece::Text(text));
                    continue;
                }
                Token::Action { body, offset } => (body, offset),
            };

            let words: Vec<&str> = body.split_whitespace().collect();
            match words.as_slice() {
                ["else"] => return Ok((pieces, Stop::Else(offset))),
                ["end"] => return Ok((pieces, Stop::End(offset))),
                ["if", var] => pieces.push(self.conditional(false, var, offset)?),
                ["if", "not", var] => pieces.push(self.conditional(true, var, offset)?),
                [var] if var.starts_with('.') => pieces.push(Piece::Var(self.variable(var, offset)?)),
                _ => {
                    return Err(TemplateError::BadAction {
                        action: body.clone(),
                        offset,
                    })
                }
            }
        }
        Ok((pieces, Stop::Eof))
    }

    fn conditional(&mut self, negate: bool, var: &str, offset: usize) -> Result<Piece, TemplateError> {
        let var = self.variable(var, offset)?;
        let (then, stop) = self.sequence()?;
        let otherwise = match stop {
            Stop::End(_) => Vec::new(),
            Stop::Else(_) => match self.sequence()? {
                (otherwise, Stop::End(_)) => otherwise,
                (_, Stop::Else(offset)) => {
                    return Err(TemplateError::Unmatched {
                        keyword: "else",
                        offset,
                    })
                }
                (_, Stop::Eof) => return Err(TemplateError::MissingEnd { offset }),
            },
            Stop::Eof => return Err(TemplateError::MissingEnd { offset }),
        };
        Ok(Piece::If {
            negate,
            var,
            then,
            otherwise,
        })
    }

    fn variable(&self, word: &str, offset: usize) -> Result<String, TemplateError> {
        let name = word.strip_prefix('.').unwrap_or(word);
        let valid = word.starts_with('.')
            && !name.is_empty()
            && name.chars().all(|c| c.is_alphanumeric() || c == '_');
        if !valid {
            return Err(TemplateError::BadAction {
                action: word.to_string(),
                offset,
            });
        }
        if !self.known.contains(&name) {
            return Err(TemplateError::UnknownVariable {
                name: name.to_string(),
                suggestion: suggest(name, self.known),
            });
        }
        Ok(name.to_string())
    }
}

/// Closest known name within a small edit distance.
fn suggest(name: &str, known: &[&str]) -> Option<String> {
    let lowered = name.to_lowercase();
    known
        .iter()
        .map(|candidate| (strsim::levenshtein(&lowered, &candidate.to_lowercase()), candidate))
        .filter(|(distance, candidate)| *distance <= (candidate.len() / 3).max(2))
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> Vars {
        let mut vars = Vars::new();
        vars.insert("Ctx", "ctx".into());
        vars.insert("FuncName", "svc.(*Server).Get".into());
        vars.insert("ReceiverVar", "".into());
        vars.insert("IsMethod", true.into());
        vars
    }

    #[test]
    fn renders_variables() {
        let template = Template::parse(
            "defer trace.Start({{.Ctx}}, \"{{.FuncName}}\").End()",
            FUNC_VARS,
        )
        .unwrap();
        assert_eq!(
            template.render(&vars()).unwrap(),
            "defer trace.Start(ctx, \"svc.(*Server).Get\").End()"
        );
    }

    #[test]
    fn conditionals_and_trimming() {
        let source = "{{if .IsMethod -}}\n  method\n{{- else -}}\n  func\n{{- end}}|{{if not .ReceiverVar}}anon{{end}}";
        let template = Template::parse(source, FUNC_VARS).unwrap();
        assert_eq!(template.render(&vars()).unwrap(), "method|anon");

        let mut plain = vars();
        plain.insert("IsMethod", false.into());
        assert_eq!(template.render(&plain).unwrap(), "func|anon");
    }

    #[test]
    fn unknown_variable_suggests_closest_name() {
        let err = Template::parse("{{.FuncNmae}}", FUNC_VARS).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownVariable {
                name: "FuncNmae".into(),
                suggestion: Some("FuncName".into()),
            }
        );
        assert!(err.to_string().contains("did you mean `.FuncName`"));

        let err = Template::parse("{{.Zzzzzzzzzz}}", FUNC_VARS).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::UnknownVariable { suggestion: None, .. }
        ));
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(
            Template::parse("{{.Ctx", FUNC_VARS),
            Err(TemplateError::Unclosed { offset: 0 })
        ));
        assert!(matches!(
            Template::parse("{{if .Ctx}}x", FUNC_VARS),
            Err(TemplateError::MissingEnd { .. })
        ));
        assert!(matches!(
            Template::parse("x{{end}}", FUNC_VARS),
            Err(TemplateError::Unmatched { keyword: "end", .. })
        ));
        assert!(matches!(
            Template::parse("{{range .Ctx}}{{end}}", FUNC_VARS),
            Err(TemplateError::BadAction { .. })
        ));
    }

    #[test]
    fn accessor_vars_are_separate() {
        let template = Template::parse("{{.Var}}.Context()", ACCESSOR_VARS).unwrap();
        let mut vars = Vars::new();
        vars.insert("Var", "r".into());
        assert_eq!(template.render(&vars).unwrap(), "r.Context()");
        assert!(Template::parse("{{.Ctx}}", ACCESSOR_VARS).is_err());
    }
}
