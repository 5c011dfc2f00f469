use crate::lexer::{is_number_literal, STRING_MARKER};
use std::fmt;

/// Text printed for the undefined sentinel.
pub const UNDEFINED_TEXT: &str = "NIHIL";

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    /// A string literal, delimiters included.
    Str(String),
    Undefined,
}

impl Value {
    /// Classify raw text: a number literal, then a delimited string, else undefined.
    pub fn from_text(text: &str) -> Value {
        if is_number_literal(text) {
            if let Ok(n) = text.parse::<f64>() {
                return Value::Number(n);
            }
        }
        if is_string_literal(text) {
            return Value::Str(text.to_string());
        }
        Value::Undefined
    }

    /// Re-apply the conversion rule to an already typed value. Never changes it.
    pub fn normalize(self) -> Value {
        match self {
            Value::Number(n) => Value::Number(n),
            Value::Str(text) => Value::from_text(&text),
            Value::Undefined => Value::Undefined,
        }
    }

    /// Truthiness of a guard; only numbers have one.
    pub fn truthiness(&self) -> Option<bool> {
        match self {
            Value::Number(n) => Some(*n != 0.0),
            Value::Str(_) | Value::Undefined => None,
        }
    }

    pub fn from_bool(b: bool) -> Value {
        Value::Number(if b { 1.0 } else { 0.0 })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Undefined => "undefined",
        }
    }
}

fn is_string_literal(text: &str) -> bool {
    text.len() >= 2 && text.starts_with(STRING_MARKER) && text.ends_with(STRING_MARKER)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => {
                // Integral numbers keep one decimal place
                if n.is_finite() && n.fract() == 0.0 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
            Value::Undefined => write!(f, "{}", UNDEFINED_TEXT),
        }
    }
}
