//! Parsing of the literal lists accepted on the command line.
//!
//! Both Python literal syntax (`[('x', -5, 5), ]`) and JSON arrays
//! (`[["x", -5, 5]]`) are accepted: lists or tuples, single- or
//! double-quoted strings, integers, floats, booleans, and trailing commas.

use ht_types::{ConfigurationError, ConstantOverride, ParameterBound, ParameterValue};

pub const BOUNDS_FIELD: &str = "params_and_constraints";
pub const CONSTANTS_FIELD: &str = "constant_flags";

/// A parsed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    List(Vec<Literal>),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
}

impl Literal {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::None => "None",
        }
    }
}

/// Parse a complete literal, rejecting trailing input.
pub fn parse_literal(input: &str) -> Result<Literal, String> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos < parser.chars.len() {
        return Err(format!("unexpected trailing input at offset {}", parser.pos));
    }
    Ok(value)
}

/// Parse `[(name, lower, upper), ...]` into parameter bounds.
///
/// Only the shape is checked here; bound validity is checked by the run
/// configuration.
pub fn parse_bounds(input: &str) -> Result<Vec<ParameterBound>, ConfigurationError> {
    let invalid = |message: String| ConfigurationError::InvalidLiteral {
        field: BOUNDS_FIELD.to_string(),
        message,
    };

    let items = top_level_list(input).map_err(invalid)?;
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Literal::List(parts) if parts.len() == 3 => {
                let name = match &parts[0] {
                    Literal::Str(name) => name.clone(),
                    other => {
                        return Err(invalid(format!(
                            "entry {i}: name must be a string, got {}",
                            other.kind()
                        )))
                    }
                };
                let number = |part: &Literal, which: &str| {
                    part.as_f64().ok_or_else(|| {
                        invalid(format!(
                            "entry {i} ({name}): {which} limit must be a number, got {}",
                            part.kind()
                        ))
                    })
                };
                let lower = number(&parts[1], "lower")?;
                let upper = number(&parts[2], "upper")?;
                Ok(ParameterBound::new(name, lower, upper))
            }
            other => Err(invalid(format!(
                "entry {i}: expected (name, lower, upper), got {}",
                describe(&other)
            ))),
        })
        .collect()
}

/// Parse `[(name, value), ...]` into constant overrides. Blank input means
/// no constants.
pub fn parse_constants(input: &str) -> Result<Vec<ConstantOverride>, ConfigurationError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    let invalid = |message: String| ConfigurationError::InvalidLiteral {
        field: CONSTANTS_FIELD.to_string(),
        message,
    };

    let items = top_level_list(input).map_err(invalid)?;
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Literal::List(mut parts) if parts.len() == 2 => {
                let value = parts.pop().unwrap_or(Literal::None);
                let name = match parts.pop() {
                    Some(Literal::Str(name)) => name,
                    _ => return Err(invalid(format!("entry {i}: name must be a string"))),
                };
                let value = match value {
                    Literal::Str(v) => ParameterValue::Text(v),
                    Literal::Int(v) => ParameterValue::Int(v),
                    Literal::Float(v) => ParameterValue::Float(v),
                    Literal::Bool(v) => ParameterValue::Bool(v),
                    other => {
                        return Err(invalid(format!(
                            "entry {i} ({name}): unsupported value of type {}",
                            other.kind()
                        )))
                    }
                };
                Ok(ConstantOverride { name, value })
            }
            other => Err(invalid(format!(
                "entry {i}: expected (name, value), got {}",
                describe(&other)
            ))),
        })
        .collect()
}

fn top_level_list(input: &str) -> Result<Vec<Literal>, String> {
    match parse_literal(input)? {
        Literal::List(items) => Ok(items),
        other => Err(format!("expected a list, got {}", other.kind())),
    }
}

fn describe(literal: &Literal) -> String {
    match literal {
        Literal::List(items) => format!("a list of {} items", items.len()),
        other => other.kind().to_string(),
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Result<Literal, String> {
        self.skip_ws();
        match self.peek() {
            Some('[') => self.sequence(']'),
            Some('(') => self.sequence(')'),
            Some(q @ ('\'' | '"')) => self.string(q),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() => self.word(),
            Some(c) => Err(format!("unexpected character {c:?} at offset {}", self.pos)),
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn sequence(&mut self, close: char) -> Result<Literal, String> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(Literal::List(items));
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {}
                Some(c) => {
                    return Err(format!(
                        "expected ',' or {close:?} at offset {}, found {c:?}",
                        self.pos
                    ))
                }
                None => return Err(format!("unterminated sequence, expected {close:?}")),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<Literal, String> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                c if c == quote => return Ok(Literal::Str(out)),
                '\\' => {
                    let escaped = self
                        .peek()
                        .ok_or_else(|| format!("unterminated string starting at offset {start}"))?;
                    self.pos += 1;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
                c => out.push(c),
            }
        }
        Err(format!("unterminated string starting at offset {start}"))
    }

    fn number(&mut self) -> Result<Literal, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.' | '_'))
        {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().filter(|c| **c != '_').collect();
        if let Ok(v) = raw.parse::<i64>() {
            return Ok(Literal::Int(v));
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Literal::Float(v)),
            _ => Err(format!("invalid number {raw:?} at offset {start}")),
        }
    }

    fn word(&mut self) -> Result<Literal, String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Ok(Literal::Bool(true)),
            "False" | "false" => Ok(Literal::Bool(false)),
            "None" | "null" => Ok(Literal::None),
            _ => Err(format!("unexpected identifier {word:?} at offset {start}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_python_bounds() {
        let bounds = parse_bounds("[('x',-5,5),('learning_rate', 1e-5, 0.1),]").unwrap();
        assert_eq!(
            bounds,
            vec![
                ParameterBound::new("x", -5.0, 5.0),
                ParameterBound::new("learning_rate", 1e-5, 0.1),
            ]
        );
    }

    #[test]
    fn parses_json_bounds() {
        let bounds = parse_bounds(r#"[["x", -2.5, 2.5], ["y", 0, 1]]"#).unwrap();
        assert_eq!(bounds[0], ParameterBound::new("x", -2.5, 2.5));
        assert_eq!(bounds[1], ParameterBound::new("y", 0.0, 1.0));
    }

    #[test]
    fn bounds_shape_errors_name_the_field() {
        let err = parse_bounds("[('x', -5)]").unwrap_err();
        match err {
            ConfigurationError::InvalidLiteral { field, message } => {
                assert_eq!(field, BOUNDS_FIELD);
                assert!(message.contains("entry 0"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(parse_bounds("[('x', 'low', 5)]").is_err());
        assert!(parse_bounds("('x', -5, 5)").is_err());
        assert!(parse_bounds("'x'").is_err());
        assert!(parse_bounds("[('x', -5, 5)").is_err());
    }

    #[test]
    fn parses_mixed_constants() {
        let constants = parse_constants(
            "[('epochs', 10), (\"optimizer\", 'adam'), ('dropout', 0.5), ('nesterov', True)]",
        )
        .unwrap();
        assert_eq!(
            constants,
            vec![
                ConstantOverride::new("epochs", 10i64),
                ConstantOverride::new("optimizer", "adam"),
                ConstantOverride::new("dropout", 0.5),
                ConstantOverride::new("nesterov", true),
            ]
        );
    }

    #[test]
    fn blank_constants_are_empty() {
        assert!(parse_constants("").unwrap().is_empty());
        assert!(parse_constants("  ").unwrap().is_empty());
        assert!(parse_constants("[]").unwrap().is_empty());
    }

    #[test]
    fn constants_reject_nested_values() {
        let err = parse_constants("[('layers', [1, 2])]").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidLiteral { ref field, .. } if field == CONSTANTS_FIELD
        ));
    }

    #[test]
    fn literal_scalars() {
        assert_eq!(parse_literal("-3").unwrap(), Literal::Int(-3));
        assert_eq!(parse_literal("2.5e-3").unwrap(), Literal::Float(2.5e-3));
        assert_eq!(parse_literal("'it\\'s'").unwrap(), Literal::Str("it's".into()));
        assert_eq!(parse_literal("None").unwrap(), Literal::None);
        assert!(parse_literal("[1, 2] 3").is_err());
        assert!(parse_literal("nan").is_err());
    }
}
