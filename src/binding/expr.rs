//! Binding expressions and `{{ }}` interpolation.

use std::fmt;

use serde_json::{Number, Value};

use super::{BindingError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// `root.seg.seg`; `root` is `$ctrl` or a scope local.
    Path { root: String, segments: Vec<String> },
    /// `$ctrl.method(args)`.
    Call { path: Vec<String>, args: Vec<Expr> },
    Not(Box<Expr>),
}

impl Expr {
    pub fn parse(input: &str) -> Result<Self> {
        ExprParser::new(input).parse()
    }

    pub fn is_assignable(&self) -> bool {
        matches!(self, Expr::Path { .. })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Path { root, segments } => {
                f.write_str(root)?;
                for segment in segments {
                    write!(f, ".{}", segment)?;
                }
                Ok(())
            }
            Expr::Call { path, args } => {
                write!(f, "{}(", path.join("."))?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Not(inner) => write!(f, "!{}", inner),
        }
    }
}

/// A piece of interpolated text.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Expr(Expr),
}

/// Splits `text` on `{{ }}` markers. `None` when there is nothing to bind.
pub fn parse_interpolation(text: &str) -> Result<Option<Vec<Part>>> {
    if !text.contains("{{") {
        return Ok(None);
    }
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        if start > 0 {
            parts.push(Part::Text(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| BindingError::Syntax {
            expression: text.to_string(),
            message: "unterminated interpolation".to_string(),
        })?;
        parts.push(Part::Expr(Expr::parse(&after[..end])?));
        rest = &after[end + 2..];
    }
    if !rest.is_empty() {
        parts.push(Part::Text(rest.to_string()));
    }
    Ok(Some(parts))
}

/// String form of a value inside interpolated text.
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct ExprParser<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> ExprParser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    pub fn parse(&mut self) -> Result<Expr> {
        self.skip_whitespace();
        let expr = self.parse_unary()?;
        self.skip_whitespace();
        if let Some(c) = self.current() {
            return Err(self.error(&format!("unexpected '{}'", c)));
        }
        Ok(expr)
    }

    fn current(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.current() {
            self.position += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn error(&self, message: &str) -> BindingError {
        BindingError::Syntax {
            expression: self.input.trim().to_string(),
            message: format!("{} at {}", message, self.position),
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        self.skip_whitespace();
        if self.current() == Some('!') {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.current() {
            Some('(') => {
                self.advance();
                let inner = self.parse_unary()?;
                self.skip_whitespace();
                self.expect(')')?;
                Ok(inner)
            }
            Some(quote @ ('\'' | '"')) => self.parse_string(quote),
            Some(c) if c.is_ascii_digit() || c == '-' => self.parse_number(),
            Some(c) if is_ident_start(c) => self.parse_reference(),
            Some(c) => Err(self.error(&format!("unexpected '{}'", c))),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.current() == Some(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<Expr> {
        self.advance();
        let mut value = String::new();
        loop {
            match self.current() {
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(Expr::Literal(Value::String(value)));
                }
                Some('\\') => {
                    self.advance();
                    if let Some(escaped) = self.current() {
                        value.push(escaped);
                        self.advance();
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Expr> {
        let start = self.position;
        if self.current() == Some('-') {
            self.advance();
        }
        while self
            .current()
            .is_some_and(|c| c.is_ascii_digit() || c == '.')
        {
            self.advance();
        }
        let text = &self.input[start..self.position];
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Expr::Literal(Value::from(int)));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(|n| Expr::Literal(Value::Number(n)))
            .ok_or_else(|| self.error(&format!("invalid number '{}'", text)))
    }

    fn parse_identifier(&mut self) -> Result<String> {
        let start = self.position;
        match self.current() {
            Some(c) if is_ident_start(c) => self.advance(),
            _ => return Err(self.error("expected identifier")),
        }
        while self
            .current()
            .is_some_and(|c| is_ident_start(c) || c.is_ascii_digit())
        {
            self.advance();
        }
        Ok(self.input[start..self.position].to_string())
    }

    fn parse_reference(&mut self) -> Result<Expr> {
        let root = self.parse_identifier()?;
        match root.as_str() {
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "null" | "undefined" => return Ok(Expr::Literal(Value::Null)),
            _ => {}
        }
        let mut segments = Vec::new();
        loop {
            self.skip_whitespace();
            if self.current() != Some('.') {
                break;
            }
            self.advance();
            self.skip_whitespace();
            segments.push(self.parse_identifier()?);
        }
        if self.current() != Some('(') {
            return Ok(Expr::Path { root, segments });
        }
        self.advance();
        let mut args = Vec::new();
        self.skip_whitespace();
        if self.current() == Some(')') {
            self.advance();
        } else {
            loop {
                args.push(self.parse_unary()?);
                self.skip_whitespace();
                match self.current() {
                    Some(',') => self.advance(),
                    Some(')') => {
                        self.advance();
                        break;
                    }
                    _ => return Err(self.error("expected ',' or ')'")),
                }
            }
        }
        let mut path = vec![root];
        path.extend(segments);
        Ok(Expr::Call { path, args })
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}
