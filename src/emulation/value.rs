//! Runtime values of the evaluable dialect.

use std::{collections::BTreeMap, fmt};

/// A value produced by the interpreter.
///
/// The variants mirror what folded macro code can produce: integers, strings, booleans,
/// arrays (lists) and keyword mappings. [`Value::Empty`] is the result of a procedure
/// that never assigned its return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A 64-bit signed integer.
    Int(i64),
    /// A string.
    Str(String),
    /// A boolean.
    Bool(bool),
    /// An ordered list, the dialect's rendition of a VBA array.
    List(Vec<Value>),
    /// A string-keyed mapping.
    Map(BTreeMap<String, Value>),
    /// No value.
    Empty,
}

impl Value {
    /// Name of the variant, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Empty => "empty",
        }
    }

    /// Truthiness as used by `if`, `while` and `bool()`.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(value) => *value != 0,
            Value::Str(value) => !value.is_empty(),
            Value::Bool(value) => *value,
            Value::List(values) => !values.is_empty(),
            Value::Map(values) => !values.is_empty(),
            Value::Empty => false,
        }
    }

    /// Renders the value as VBA literal source.
    ///
    /// Integers render as digits, strings double-quoted with inner quotes doubled, booleans
    /// as `True`/`False` and lists as an `Array(...)` call. Mappings and [`Value::Empty`]
    /// have no literal form.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use macroscope::emulation::Value;
    ///
    /// let value = Value::List(vec![Value::Int(1), Value::Str("a\"b".into())]);
    /// assert_eq!(value.to_literal().as_deref(), Some(r#"Array(1, "a""b")"#));
    /// assert_eq!(Value::Empty.to_literal(), None);
    /// ```
    #[must_use]
    pub fn to_literal(&self) -> Option<String> {
        match self {
            Value::Int(value) => Some(value.to_string()),
            Value::Str(value) => Some(quote(value)),
            Value::Bool(true) => Some("True".to_string()),
            Value::Bool(false) => Some("False".to_string()),
            Value::List(values) => {
                let items = values
                    .iter()
                    .map(Value::to_literal)
                    .collect::<Option<Vec<_>>>()?;
                Some(format!("Array({})", items.join(", ")))
            }
            Value::Map(_) | Value::Empty => None,
        }
    }
}

/// Double-quotes `text`, doubling inner quotes.
#[must_use]
pub fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Str(value) => f.write_str(&quote(value)),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::List(values) => {
                f.write_str("[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Value::Map(values) => {
                f.write_str("{")?;
                for (index, (key, value)) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {value}", quote(key))?;
                }
                f.write_str("}")
            }
            Value::Empty => f.write_str("Empty"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(values)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rustc_hash::FxHashMap;

    use super::*;
    use crate::emulation::{Evaluator, Interpreter};

    #[test]
    fn test_literals() {
        assert_eq!(Value::Int(-7).to_literal().as_deref(), Some("-7"));
        assert_eq!(Value::from("say \"hi\"").to_literal().as_deref(), Some("\"say \"\"hi\"\"\""));
        assert_eq!(Value::Bool(false).to_literal().as_deref(), Some("False"));
        assert_eq!(Value::List(vec![]).to_literal().as_deref(), Some("Array()"));
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::List(vec![Value::Int(2)])]).to_literal().as_deref(),
            Some("Array(1, Array(2))")
        );
        assert_eq!(Value::List(vec![Value::Empty]).to_literal(), None);
        assert_eq!(Value::Map(BTreeMap::new()).to_literal(), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::List(vec![Value::Empty]).is_truthy());
        assert!(!Value::Empty.is_truthy());
    }

    #[test]
    fn test_display() {
        let value = Value::List(vec![Value::Int(1), Value::from("x")]);
        assert_eq!(value.to_string(), "[1, \"x\"]");
        assert_eq!(value.type_name(), "list");
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            (-1_000_000_000i64..1_000_000_000).prop_map(Value::Int),
            "[ -~]{0,12}".prop_map(Value::Str),
            any::<bool>().prop_map(Value::Bool),
        ]
    }

    fn value() -> impl Strategy<Value = Value> {
        scalar().prop_recursive(3, 16, 4, |inner| {
            proptest::collection::vec(inner, 0..4).prop_map(Value::List)
        })
    }

    proptest! {
        #[test]
        fn prop_display_evaluates_back(value in value()) {
            let mut interpreter = Interpreter::default();
            let parsed = interpreter.evaluate(&value.to_string(), &FxHashMap::default()).unwrap();
            prop_assert_eq!(parsed, value);
        }

        #[test]
        fn prop_string_literal_unquotes(text in "[ -~]{0,24}") {
            let literal = Value::Str(text.clone()).to_literal().unwrap();
            prop_assert!(literal.starts_with('"') && literal.ends_with('"'));
            let inner = &literal[1..literal.len() - 1];
            prop_assert_eq!(inner.replace("\"\"", "\""), text);
        }
    }
}
