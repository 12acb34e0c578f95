//! The fixed built-in environment of the dialect.

use std::str::FromStr;

use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::emulation::{EvalError, Value};

/// A built-in callable.
///
/// The strum serialization is the name the dialect calls it by. [`Builtin::DisableErrors`]
/// and [`Builtin::MethodCall`] touch the interpreter's error state and are dispatched by
/// the interpreter itself; everything else is a pure function of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum Builtin {
    Str,
    Int,
    Bool,
    List,
    Chr,
    Ord,
    Asc,
    Len,
    Sgn,
    Abs,
    Upper,
    Lower,
    Strip,
    Lstrip,
    Rstrip,
    Reverse,
    Replace,
    Instr,
    DisableErrors,
    MethodCall,
}

/// `VBA.<name>` members and the built-in implementing them.
const VBA_FUNCTIONS: [(&str, Builtin); 19] = [
    ("Chr", Builtin::Chr),
    ("ChrW", Builtin::Chr),
    ("Asc", Builtin::Asc),
    ("AscW", Builtin::Asc),
    ("Len", Builtin::Len),
    ("UCase", Builtin::Upper),
    ("LCase", Builtin::Lower),
    ("Trim", Builtin::Strip),
    ("LTrim", Builtin::Lstrip),
    ("RTrim", Builtin::Rstrip),
    ("StrReverse", Builtin::Reverse),
    ("Replace", Builtin::Replace),
    ("InStr", Builtin::Instr),
    ("CStr", Builtin::Str),
    ("CInt", Builtin::Int),
    ("CLng", Builtin::Int),
    ("CBool", Builtin::Bool),
    ("Abs", Builtin::Abs),
    ("Sgn", Builtin::Sgn),
];

impl Builtin {
    pub(crate) fn lookup(name: &str) -> Option<Builtin> {
        Builtin::from_str(name).ok()
    }

    /// The built-in behind a `VBA.<method>` member.
    pub(crate) fn vba_member(method: &str) -> Option<Builtin> {
        VBA_FUNCTIONS
            .iter()
            .find(|(name, _)| *name == method)
            .map(|(_, builtin)| *builtin)
    }

    pub(crate) fn name(self) -> &'static str {
        self.into()
    }

    fn arity(self, args: &[Value], accepted: &[usize]) -> Result<(), EvalError> {
        if accepted.contains(&args.len()) {
            return Ok(());
        }
        let expected = accepted
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(EvalError::Arity {
            function: self.name().to_string(),
            expected,
            found: args.len(),
        })
    }

    fn mismatch(self, args: &[Value]) -> EvalError {
        let found = args.iter().map(Value::type_name).collect::<Vec<_>>().join(", ");
        EvalError::mismatch(self.name(), found)
    }

    /// Applies a pure built-in.
    pub(crate) fn apply(self, args: Vec<Value>) -> Result<Value, EvalError> {
        match self {
            Builtin::DisableErrors | Builtin::MethodCall => {
                Err(EvalError::NotImplemented(format!("{}() outside an interpreter", self.name())))
            }
            Builtin::Replace => {
                self.arity(&args, &[3])?;
                match args.as_slice() {
                    [Value::Str(text), Value::Str(find), Value::Str(with)] => {
                        if find.is_empty() {
                            Ok(Value::Str(text.clone()))
                        } else {
                            Ok(Value::Str(text.replace(find.as_str(), with)))
                        }
                    }
                    _ => Err(self.mismatch(&args)),
                }
            }
            Builtin::Instr => {
                self.arity(&args, &[2, 3])?;
                match args.as_slice() {
                    [Value::Str(text), Value::Str(find)] => Ok(Value::Int(instr(1, text, find))),
                    [Value::Int(start), Value::Str(text), Value::Str(find)] => {
                        if *start < 1 {
                            return Err(EvalError::IndexOutOfRange {
                                index: *start,
                                len: text.chars().count(),
                            });
                        }
                        Ok(Value::Int(instr(*start, text, find)))
                    }
                    _ => Err(self.mismatch(&args)),
                }
            }
            _ => {
                self.arity(&args, &[1])?;
                let [value] = <[Value; 1]>::try_from(args).map_err(|args| self.mismatch(&args))?;
                self.unary(value)
            }
        }
    }

    fn unary(self, value: Value) -> Result<Value, EvalError> {
        let result = match (self, &value) {
            (Builtin::Str, Value::Int(v)) => Value::Str(v.to_string()),
            (Builtin::Str, Value::Str(text)) => Value::Str(text.clone()),
            (Builtin::Str, Value::Bool(v)) => Value::Str(if *v { "True" } else { "False" }.to_string()),
            (Builtin::Str, Value::Empty) => Value::Str(String::new()),

            (Builtin::Int, Value::Int(v)) => Value::Int(*v),
            (Builtin::Int, Value::Bool(v)) => Value::Int(i64::from(*v)),
            (Builtin::Int, Value::Str(text)) => text
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| EvalError::mismatch("int", format!("'{text}'")))?,
            (Builtin::Int, Value::Empty) => Value::Int(0),

            (Builtin::Bool, _) => Value::Bool(value.is_truthy()),

            (Builtin::List, Value::List(values)) => Value::List(values.clone()),
            (Builtin::List, Value::Str(text)) => {
                Value::List(text.chars().map(|c| Value::Str(c.to_string())).collect())
            }

            (Builtin::Chr, Value::Int(code)) => u32::try_from(*code)
                .ok()
                .and_then(char::from_u32)
                .map(|c| Value::Str(c.to_string()))
                .ok_or_else(|| EvalError::mismatch("chr", format!("code point {code}")))?,

            (Builtin::Ord, Value::Str(text)) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Value::Int(i64::from(u32::from(c))),
                    _ => {
                        return Err(EvalError::mismatch(
                            "ord",
                            format!("string of length {}", text.chars().count()),
                        ))
                    }
                }
            }
            (Builtin::Asc, Value::Str(text)) => match text.chars().next() {
                Some(c) => Value::Int(i64::from(u32::from(c))),
                None => return Err(EvalError::mismatch("asc", "empty string")),
            },

            (Builtin::Len, Value::Str(text)) => Value::Int(count(text.chars().count())?),
            (Builtin::Len, Value::List(values)) => Value::Int(count(values.len())?),
            (Builtin::Len, Value::Map(values)) => Value::Int(count(values.len())?),

            (Builtin::Sgn, Value::Int(v)) => Value::Int(v.signum()),
            (Builtin::Abs, Value::Int(v)) => Value::Int(v.checked_abs().ok_or(EvalError::Overflow)?),

            (Builtin::Upper, Value::Str(text)) => Value::Str(text.to_uppercase()),
            (Builtin::Lower, Value::Str(text)) => Value::Str(text.to_lowercase()),
            (Builtin::Strip, Value::Str(text)) => Value::Str(text.trim_matches(' ').to_string()),
            (Builtin::Lstrip, Value::Str(text)) => Value::Str(text.trim_start_matches(' ').to_string()),
            (Builtin::Rstrip, Value::Str(text)) => Value::Str(text.trim_end_matches(' ').to_string()),

            (Builtin::Reverse, Value::Str(text)) => Value::Str(text.chars().rev().collect()),
            (Builtin::Reverse, Value::List(values)) => Value::List(values.iter().rev().cloned().collect()),

            _ => return Err(self.mismatch(std::slice::from_ref(&value))),
        };
        Ok(result)
    }
}

fn count(len: usize) -> Result<i64, EvalError> {
    i64::try_from(len).map_err(|_| EvalError::Overflow)
}

/// 1-based character position of `find` in `text` at or after `start`, 0 if absent.
fn instr(start: i64, text: &str, find: &str) -> i64 {
    let chars: Vec<char> = text.chars().collect();
    let needle: Vec<char> = find.chars().collect();
    let from = usize::try_from(start - 1).unwrap_or(usize::MAX);
    if from > chars.len() {
        return 0;
    }
    if needle.is_empty() {
        return start;
    }
    chars[from..]
        .windows(needle.len())
        .position(|window| window == needle.as_slice())
        .and_then(|offset| i64::try_from(from + offset + 1).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(builtin: Builtin, args: Vec<Value>) -> Result<Value, EvalError> {
        builtin.apply(args)
    }

    #[test]
    fn test_names() {
        assert_eq!(Builtin::lookup("disable_errors"), Some(Builtin::DisableErrors));
        assert_eq!(Builtin::lookup("lstrip"), Some(Builtin::Lstrip));
        assert_eq!(Builtin::lookup("Len"), None);
        assert_eq!(Builtin::vba_member("ChrW"), Some(Builtin::Chr));
        assert_eq!(Builtin::vba_member("Shell"), None);
    }

    #[test]
    fn test_conversions() -> Result<(), EvalError> {
        assert_eq!(call(Builtin::Str, vec![Value::Int(-3)])?, Value::from("-3"));
        assert_eq!(call(Builtin::Str, vec![Value::Empty])?, Value::from(""));
        assert_eq!(call(Builtin::Int, vec![Value::from(" 42 ")])?, Value::Int(42));
        assert_eq!(call(Builtin::Bool, vec![Value::Int(0)])?, Value::Bool(false));
        assert_eq!(
            call(Builtin::List, vec![Value::from("ab")])?,
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
        assert!(matches!(call(Builtin::Int, vec![Value::from("x")]), Err(EvalError::TypeMismatch { .. })));
        Ok(())
    }

    #[test]
    fn test_characters() -> Result<(), EvalError> {
        assert_eq!(call(Builtin::Chr, vec![Value::Int(65)])?, Value::from("A"));
        assert_eq!(call(Builtin::Asc, vec![Value::from("Abc")])?, Value::Int(65));
        assert!(call(Builtin::Ord, vec![Value::from("Abc")]).is_err());
        assert!(call(Builtin::Chr, vec![Value::Int(-1)]).is_err());
        assert!(call(Builtin::Asc, vec![Value::from("")]).is_err());
        Ok(())
    }

    #[test]
    fn test_strings() -> Result<(), EvalError> {
        assert_eq!(call(Builtin::Strip, vec![Value::from("  a b  ")])?, Value::from("a b"));
        assert_eq!(call(Builtin::Rstrip, vec![Value::from("\ta ")])?, Value::from("\ta"));
        assert_eq!(call(Builtin::Reverse, vec![Value::from("abc")])?, Value::from("cba"));
        assert_eq!(
            call(Builtin::Replace, vec![Value::from("aXbX"), Value::from("X"), Value::from("")])?,
            Value::from("ab")
        );
        assert_eq!(
            call(Builtin::Replace, vec![Value::from("ab"), Value::from(""), Value::from("z")])?,
            Value::from("ab")
        );
        assert_eq!(call(Builtin::Len, vec![Value::from("héllo")])?, Value::Int(5));
        Ok(())
    }

    #[test]
    fn test_instr() -> Result<(), EvalError> {
        let text = Value::from("abcabc");
        assert_eq!(call(Builtin::Instr, vec![text.clone(), Value::from("c")])?, Value::Int(3));
        assert_eq!(
            call(Builtin::Instr, vec![Value::Int(4), text.clone(), Value::from("c")])?,
            Value::Int(6)
        );
        assert_eq!(call(Builtin::Instr, vec![text.clone(), Value::from("z")])?, Value::Int(0));
        assert_eq!(
            call(Builtin::Instr, vec![Value::Int(99), text.clone(), Value::from("a")])?,
            Value::Int(0)
        );
        assert!(call(Builtin::Instr, vec![Value::Int(0), text, Value::from("a")]).is_err());
        Ok(())
    }

    #[test]
    fn test_arity() {
        assert!(matches!(
            call(Builtin::Len, vec![]),
            Err(EvalError::Arity { found: 0, .. })
        ));
        assert!(matches!(
            call(Builtin::Instr, vec![Value::Int(1)]),
            Err(EvalError::Arity { ref expected, .. }) if expected == "2 or 3"
        ));
    }
}
