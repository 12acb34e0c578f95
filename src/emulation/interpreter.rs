//! Tree-walking interpreter for the evaluable dialect.
//!
//! The interpreter only ever touches its own state: registered functions, the error
//! suppression flag and the recorded `Err` object. There is no I/O, no reflection and no
//! way to reach the host, so evaluating code lowered from hostile macros is safe. Runaway
//! code is stopped by [`EvalLimits`].

use std::{collections::BTreeMap, sync::Arc};

use log::debug;
use rustc_hash::FxHashMap;

use crate::emulation::{
    builtins::Builtin,
    parser::{parse_expression, parse_program, BinaryOp, CompareOp, Expr, FunctionDef, Stmt, Target, UnaryOp},
    EvalError, Evaluator, Value,
};

type Scope = FxHashMap<String, Value>;

/// Execution budgets of an [`Interpreter`].
///
/// Budgets apply per [`Evaluator::register`] or [`Evaluator::evaluate`] call and are
/// reported as [`EvalError::LimitExceeded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalLimits {
    /// Statements, loop iterations and calls executed before giving up.
    pub max_steps: u64,
    /// Deepest nesting of procedure calls.
    pub max_call_depth: usize,
    /// Longest string, in bytes, an operation may produce.
    pub max_string_len: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        EvalLimits {
            max_steps: 1_000_000,
            max_call_depth: 64,
            max_string_len: 1 << 20,
        }
    }
}

impl EvalLimits {
    /// Creates limits with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the step budget.
    #[must_use]
    pub fn with_max_steps(mut self, max: u64) -> Self {
        self.max_steps = max;
        self
    }

    /// Sets the call depth limit.
    #[must_use]
    pub fn with_max_call_depth(mut self, max: usize) -> Self {
        self.max_call_depth = max;
        self
    }

    /// Sets the string length limit.
    #[must_use]
    pub fn with_max_string_len(mut self, max: usize) -> Self {
        self.max_string_len = max;
        self
    }
}

/// State of the VBA `Err` object.
#[derive(Debug, Clone, Default)]
struct ErrorState {
    /// Set by `disable_errors()`, never cleared.
    suppressed: bool,
    /// Number and source of the last `Err.Raise`.
    raised: Option<(Value, Value)>,
}

enum Flow {
    Normal,
    Break,
    Return(Value),
}

/// The sandboxed evaluator used by the deobfuscation passes.
///
/// # Examples
///
/// ```rust
/// use macroscope::emulation::{Evaluator, Interpreter, Value};
///
/// let mut interpreter = Interpreter::default();
/// interpreter.register("Twice", "def Twice(x):\n  return (x * 2)\n")?;
///
/// let value = interpreter.evaluate("Twice(21)", &Default::default())?;
/// assert_eq!(value, Value::Int(42));
/// # Ok::<(), macroscope::emulation::EvalError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    functions: FxHashMap<String, Arc<FunctionDef>>,
    limits: EvalLimits,
    errors: ErrorState,
    steps: u64,
    depth: usize,
}

impl Interpreter {
    /// Creates an interpreter with the given budgets.
    #[must_use]
    pub fn new(limits: EvalLimits) -> Self {
        Interpreter {
            limits,
            ..Default::default()
        }
    }

    /// The configured budgets.
    #[must_use]
    pub fn limits(&self) -> EvalLimits {
        self.limits
    }

    /// Number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// True once some evaluated code called `disable_errors()`.
    #[must_use]
    pub fn errors_suppressed(&self) -> bool {
        self.errors.suppressed
    }

    fn reset(&mut self) {
        self.errors.raised = None;
        self.steps = 0;
        self.depth = 0;
    }

    fn tick(&mut self) -> Result<(), EvalError> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(EvalError::LimitExceeded("step"));
        }
        Ok(())
    }

    fn bounded(&self, value: Value) -> Result<Value, EvalError> {
        match &value {
            Value::Str(text) if text.len() > self.limits.max_string_len => {
                Err(EvalError::LimitExceeded("string length"))
            }
            _ => Ok(value),
        }
    }

    // Statements

    fn exec_block(&mut self, body: &[Stmt], scope: &mut Scope) -> Result<Flow, EvalError> {
        for stmt in body {
            self.tick()?;
            match stmt {
                Stmt::Def(def) => {
                    return Err(EvalError::NotImplemented(format!("nested definition of '{}'", def.name)))
                }
                Stmt::If(branches, otherwise) => {
                    let mut taken = None;
                    for (condition, branch) in branches {
                        if self.eval(condition, scope)?.is_truthy() {
                            taken = Some(branch);
                            break;
                        }
                    }
                    let flow = self.exec_block(taken.unwrap_or(otherwise), scope)?;
                    if !matches!(flow, Flow::Normal) {
                        return Ok(flow);
                    }
                }
                Stmt::While(condition, loop_body) => loop {
                    self.tick()?;
                    if !self.eval(condition, scope)?.is_truthy() {
                        break;
                    }
                    match self.exec_block(loop_body, scope)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }
                },
                Stmt::Assign(target, expr) => {
                    let value = self.eval(expr, scope)?;
                    self.assign(target, value, scope)?;
                }
                Stmt::Expr(expr) => {
                    self.eval(expr, scope)?;
                }
                Stmt::Return(expr) => {
                    let value = match expr {
                        Some(expr) => self.eval(expr, scope)?,
                        None => Value::Empty,
                    };
                    return Ok(Flow::Return(value));
                }
                Stmt::Break => return Ok(Flow::Break),
                Stmt::Pass => {}
            }
        }
        Ok(Flow::Normal)
    }

    fn assign(&mut self, target: &Target, value: Value, scope: &mut Scope) -> Result<(), EvalError> {
        match target {
            Target::Name(name) => {
                scope.insert(name.clone(), value);
            }
            Target::Index(name, index) => {
                let index = self.eval(index, scope)?;
                let container = scope
                    .get_mut(name)
                    .ok_or_else(|| EvalError::UndefinedName(name.clone()))?;
                match (container, index) {
                    (Value::List(items), Value::Int(index)) => {
                        let slot = position(index, items.len())?;
                        items[slot] = value;
                    }
                    (Value::Map(entries), Value::Str(key)) => {
                        entries.insert(key, value);
                    }
                    (container, index) => {
                        return Err(EvalError::mismatch(
                            "item assignment",
                            format!("{}[{}]", container.type_name(), index.type_name()),
                        ))
                    }
                }
            }
        }
        Ok(())
    }

    // Expressions

    fn eval(&mut self, expr: &Expr, scope: &mut Scope) -> Result<Value, EvalError> {
        match expr {
            Expr::Int(value) => Ok(Value::Int(*value)),
            Expr::Str(value) => Ok(Value::Str(value.clone())),
            Expr::Bool(value) => Ok(Value::Bool(*value)),
            Expr::Name(name) => scope
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedName(name.clone())),
            Expr::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(values))
            }
            Expr::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    let key = match self.eval(key, scope)? {
                        Value::Str(key) => key,
                        other => return Err(EvalError::mismatch("map key", other.type_name())),
                    };
                    let value = self.eval(value, scope)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            Expr::Unary(op, operand) => {
                let operand = self.eval(operand, scope)?;
                unary(*op, operand)
            }
            Expr::Binary(op @ (BinaryOp::And | BinaryOp::Or), left, right) => {
                self.logical(*op, left, right, scope)
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                let value = binary(*op, left, right)?;
                self.bounded(value)
            }
            Expr::Compare(op, left, right) => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                compare(*op, &left, &right).map(Value::Bool)
            }
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(name, args)
            }
            Expr::Index(base, index) => {
                let base = self.eval(base, scope)?;
                let index = self.eval(index, scope)?;
                subscript(base, index)
            }
            Expr::Slice(base, start, end) => {
                let base = self.eval(base, scope)?;
                let start = self.slice_bound(start.as_deref(), scope)?;
                let end = self.slice_bound(end.as_deref(), scope)?;
                slice(base, start, end)
            }
        }
    }

    fn slice_bound(&mut self, bound: Option<&Expr>, scope: &mut Scope) -> Result<Option<i64>, EvalError> {
        match bound {
            None => Ok(None),
            Some(expr) => match self.eval(expr, scope)? {
                Value::Int(value) => Ok(Some(value)),
                other => Err(EvalError::mismatch("slice", other.type_name())),
            },
        }
    }

    /// `and`/`or`: short-circuiting on booleans, bitwise on integers.
    fn logical(&mut self, op: BinaryOp, left: &Expr, right: &Expr, scope: &mut Scope) -> Result<Value, EvalError> {
        match self.eval(left, scope)? {
            Value::Bool(l) => {
                if (op == BinaryOp::And && !l) || (op == BinaryOp::Or && l) {
                    return Ok(Value::Bool(l));
                }
                match self.eval(right, scope)? {
                    Value::Bool(r) => Ok(Value::Bool(r)),
                    other => Err(EvalError::mismatch(op.symbol(), format!("bool, {}", other.type_name()))),
                }
            }
            Value::Int(l) => match self.eval(right, scope)? {
                Value::Int(r) if op == BinaryOp::And => Ok(Value::Int(l & r)),
                Value::Int(r) => Ok(Value::Int(l | r)),
                other => Err(EvalError::mismatch(op.symbol(), format!("int, {}", other.type_name()))),
            },
            other => Err(EvalError::mismatch(op.symbol(), other.type_name())),
        }
    }

    // Calls

    fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        self.tick()?;
        if let Some(builtin) = Builtin::lookup(name) {
            return self.builtin(builtin, args);
        }
        let def = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedName(name.to_string()))?;
        self.invoke(&def, args)
    }

    fn invoke(&mut self, def: &FunctionDef, mut args: Vec<Value>) -> Result<Value, EvalError> {
        if self.depth >= self.limits.max_call_depth {
            return Err(EvalError::LimitExceeded("call depth"));
        }

        let required = def.params.len();
        let accepted = match def.variadic {
            Some(_) => args.len() >= required,
            None => args.len() == required,
        };
        if !accepted {
            let expected = match def.variadic {
                Some(_) => format!("at least {required}"),
                None => required.to_string(),
            };
            return Err(EvalError::Arity {
                function: def.name.clone(),
                expected,
                found: args.len(),
            });
        }

        let rest = args.split_off(required);
        let mut scope: Scope = def.params.iter().cloned().zip(args).collect();
        if let Some(variadic) = &def.variadic {
            scope.insert(variadic.clone(), Value::List(rest));
        }

        self.depth += 1;
        let flow = self.exec_block(&def.body, &mut scope);
        self.depth -= 1;

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break => Ok(Value::Empty),
        }
    }

    fn builtin(&mut self, builtin: Builtin, args: Vec<Value>) -> Result<Value, EvalError> {
        match builtin {
            Builtin::DisableErrors => {
                if !args.is_empty() {
                    return Err(EvalError::Arity {
                        function: builtin.name().to_string(),
                        expected: "0".to_string(),
                        found: args.len(),
                    });
                }
                self.errors.suppressed = true;
                Ok(Value::Empty)
            }
            Builtin::MethodCall => match <[Value; 3]>::try_from(args) {
                Ok([Value::Str(object), Value::Str(method), Value::List(args)]) => {
                    self.method_call(&object, &method, args)
                }
                Ok(args) => {
                    let found = args.iter().map(Value::type_name).collect::<Vec<_>>().join(", ");
                    Err(EvalError::mismatch("method_call", found))
                }
                Err(args) => Err(EvalError::Arity {
                    function: builtin.name().to_string(),
                    expected: "3".to_string(),
                    found: args.len(),
                }),
            },
            _ => {
                let value = builtin.apply(args)?;
                self.bounded(value)
            }
        }
    }

    /// Members of the closed set of well-known objects.
    fn method_call(&mut self, object: &str, method: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        match (object, method) {
            ("Err", "Raise") => {
                if !self.errors.suppressed {
                    return Err(EvalError::NotImplemented(
                        "Err.Raise while errors are not suppressed".to_string(),
                    ));
                }
                let mut args = args.into_iter();
                let number = args.next().ok_or_else(|| EvalError::Arity {
                    function: "Err.Raise".to_string(),
                    expected: "1 or 2".to_string(),
                    found: 0,
                })?;
                let source = args.next().unwrap_or_else(|| Value::Str(String::new()));
                self.errors.raised = Some((number, source));
                Ok(Value::Empty)
            }
            ("Err", "Number") => self
                .errors
                .raised
                .as_ref()
                .map(|(number, _)| number.clone())
                .ok_or_else(|| EvalError::NotImplemented("Err.Number without a raised error".to_string())),
            ("Err", "Source") => self
                .errors
                .raised
                .as_ref()
                .map(|(_, source)| source.clone())
                .ok_or_else(|| EvalError::NotImplemented("Err.Source without a raised error".to_string())),
            ("Err", "Clear") => {
                self.errors.raised = None;
                Ok(Value::Empty)
            }
            ("VBA", _) => match Builtin::vba_member(method) {
                Some(builtin) => self.builtin(builtin, args),
                None => Err(EvalError::NotImplemented(format!("VBA.{method}"))),
            },
            _ => Err(EvalError::NotImplemented(format!("{object}.{method}"))),
        }
    }
}

impl Evaluator for Interpreter {
    fn register(&mut self, name: &str, code: &str) -> Result<(), EvalError> {
        self.reset();
        let program = parse_program(code)?;

        let mut definitions = Vec::new();
        for stmt in program {
            match stmt {
                Stmt::Def(def) => definitions.push(def),
                _ => {
                    return Err(EvalError::syntax(
                        1,
                        "only function definitions are allowed at the top level",
                    ))
                }
            }
        }
        if !definitions.iter().any(|def| def.name == name) {
            return Err(EvalError::NotDefined(name.to_string()));
        }

        for def in definitions {
            debug!("registered dialect function {}", def.name);
            self.functions.insert(def.name.clone(), def);
        }
        Ok(())
    }

    fn evaluate(&mut self, expression: &str, locals: &FxHashMap<String, Value>) -> Result<Value, EvalError> {
        self.reset();
        let expr = parse_expression(expression)?;
        let mut scope = locals.clone();
        self.eval(&expr, &mut scope)
    }

    fn is_registered(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

fn unary(op: UnaryOp, operand: Value) -> Result<Value, EvalError> {
    match (op, operand) {
        (UnaryOp::Neg, Value::Int(v)) => v.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
        (UnaryOp::Pos, Value::Int(v)) => Ok(Value::Int(v)),
        (UnaryOp::Not, Value::Bool(v)) => Ok(Value::Bool(!v)),
        (UnaryOp::Not, Value::Int(v)) => Ok(Value::Int(!v)),
        (op, other) => {
            let symbol = match op {
                UnaryOp::Neg => "unary -",
                UnaryOp::Pos => "unary +",
                UnaryOp::Not => "not",
            };
            Err(EvalError::mismatch(symbol, other.type_name()))
        }
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    let (l, r) = match (op, left, right) {
        (BinaryOp::Add, Value::Str(l), Value::Str(r)) => return Ok(Value::Str(l + &r)),
        (BinaryOp::Add, Value::List(mut l), Value::List(r)) => {
            l.extend(r);
            return Ok(Value::List(l));
        }
        (BinaryOp::Xor, Value::Bool(l), Value::Bool(r)) => return Ok(Value::Bool(l ^ r)),
        (_, Value::Int(l), Value::Int(r)) => (l, r),
        (op, left, right) => {
            return Err(EvalError::mismatch(
                op.symbol(),
                format!("{}, {}", left.type_name(), right.type_name()),
            ))
        }
    };

    let result = match op {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Sub => l.checked_sub(r),
        BinaryOp::Mul => l.checked_mul(r),
        BinaryOp::Div => {
            if r == 0 {
                return Err(EvalError::DivisionByZero);
            }
            l.checked_div(r).map(|q| if l % r != 0 && ((l < 0) != (r < 0)) { q - 1 } else { q })
        }
        BinaryOp::Mod => {
            if r == 0 {
                return Err(EvalError::DivisionByZero);
            }
            l.checked_rem(r).map(|m| if m != 0 && ((m < 0) != (r < 0)) { m + r } else { m })
        }
        BinaryOp::Pow => {
            if r < 0 {
                return Err(EvalError::mismatch("**", "negative exponent"));
            }
            u32::try_from(r).ok().and_then(|exp| l.checked_pow(exp))
        }
        BinaryOp::Xor => Some(l ^ r),
        BinaryOp::And => Some(l & r),
        BinaryOp::Or => Some(l | r),
    };
    result.map(Value::Int).ok_or(EvalError::Overflow)
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    let ordering = match (left, right) {
        _ if op == CompareOp::Eq => return Ok(left == right),
        _ if op == CompareOp::Ne => return Ok(left != right),
        (Value::Int(l), Value::Int(r)) => l.cmp(r),
        (Value::Str(l), Value::Str(r)) => l.cmp(r),
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        _ => {
            return Err(EvalError::mismatch(
                op.symbol(),
                format!("{}, {}", left.type_name(), right.type_name()),
            ))
        }
    };
    Ok(match op {
        CompareOp::Lt => ordering.is_lt(),
        CompareOp::Le => ordering.is_le(),
        CompareOp::Gt => ordering.is_gt(),
        CompareOp::Ge => ordering.is_ge(),
        CompareOp::Eq => ordering.is_eq(),
        CompareOp::Ne => ordering.is_ne(),
    })
}

/// Resolves a possibly negative index against `len`.
fn position(index: i64, len: usize) -> Result<usize, EvalError> {
    let length = i64::try_from(len).map_err(|_| EvalError::Overflow)?;
    let resolved = if index < 0 { index + length } else { index };
    if resolved < 0 || resolved >= length {
        return Err(EvalError::IndexOutOfRange { index, len });
    }
    usize::try_from(resolved).map_err(|_| EvalError::IndexOutOfRange { index, len })
}

/// Clamps a slice bound into `0..=len`.
fn bound(value: Option<i64>, len: usize, default: usize) -> usize {
    let Some(value) = value else {
        return default;
    };
    let length = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if value < 0 { value.saturating_add(length).max(0) } else { value.min(length) };
    usize::try_from(resolved).unwrap_or(default)
}

fn subscript(base: Value, index: Value) -> Result<Value, EvalError> {
    match (base, index) {
        (Value::List(mut items), Value::Int(index)) => {
            let slot = position(index, items.len())?;
            Ok(items.swap_remove(slot))
        }
        (Value::Str(text), Value::Int(index)) => {
            let chars: Vec<char> = text.chars().collect();
            let slot = position(index, chars.len())?;
            Ok(Value::Str(chars[slot].to_string()))
        }
        (Value::Map(mut entries), Value::Str(key)) => {
            entries.remove(&key).ok_or(EvalError::KeyNotFound(key))
        }
        (base, index) => Err(EvalError::mismatch(
            "subscript",
            format!("{}[{}]", base.type_name(), index.type_name()),
        )),
    }
}

fn slice(base: Value, start: Option<i64>, end: Option<i64>) -> Result<Value, EvalError> {
    match base {
        Value::List(items) => {
            let from = bound(start, items.len(), 0);
            let to = bound(end, items.len(), items.len());
            Ok(Value::List(items.get(from..to.max(from)).unwrap_or_default().to_vec()))
        }
        Value::Str(text) => {
            let chars: Vec<char> = text.chars().collect();
            let from = bound(start, chars.len(), 0);
            let to = bound(end, chars.len(), chars.len());
            Ok(Value::Str(chars.get(from..to.max(from)).unwrap_or_default().iter().collect()))
        }
        other => Err(EvalError::mismatch("slice", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> Result<Value, EvalError> {
        Interpreter::default().evaluate(source, &FxHashMap::default())
    }

    #[test]
    fn test_arithmetic() -> Result<(), EvalError> {
        assert_eq!(eval("(2 + (3 * (1 - 4)))")?, Value::Int(-7));
        assert_eq!(eval("-7 / 2")?, Value::Int(-4));
        assert_eq!(eval("-7 % 3")?, Value::Int(2));
        assert_eq!(eval("7 % -3")?, Value::Int(-2));
        assert_eq!(eval("2 ** 10")?, Value::Int(1024));
        assert_eq!(eval("6 ^ 3")?, Value::Int(5));
        assert_eq!(eval("6 and 3")?, Value::Int(2));
        assert_eq!(eval("not 0")?, Value::Int(-1));
        assert_eq!(eval("\"ab\" + \"cd\"")?, Value::from("abcd"));
        assert_eq!(eval("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("9223372036854775807 + 1"), Err(EvalError::Overflow));
        assert_eq!(eval("2 ** 64"), Err(EvalError::Overflow));
        assert!(matches!(eval("1 + \"a\""), Err(EvalError::TypeMismatch { .. })));
        Ok(())
    }

    #[test]
    fn test_logic_and_comparison() -> Result<(), EvalError> {
        assert_eq!(eval("False and undefined_name")?, Value::Bool(false));
        assert_eq!(eval("True or undefined_name")?, Value::Bool(true));
        assert_eq!(eval("(1 < 2) and (\"b\" > \"a\")")?, Value::Bool(true));
        assert_eq!(eval("1 == \"1\"")?, Value::Bool(false));
        assert!(eval("1 < \"1\"").is_err());
        assert!(eval("True and 1").is_err());
        Ok(())
    }

    #[test]
    fn test_collections() -> Result<(), EvalError> {
        assert_eq!(eval("[1, 2, 3][-1]")?, Value::Int(3));
        assert_eq!(eval("\"hello\"[1:3]")?, Value::from("el"));
        assert_eq!(eval("\"hello\"[3:99]")?, Value::from("lo"));
        assert_eq!(eval("\"hello\"[4:1]")?, Value::from(""));
        assert_eq!(eval("{\"k\": 5}[\"k\"]")?, Value::Int(5));
        assert_eq!(eval("[1][2]"), Err(EvalError::IndexOutOfRange { index: 2, len: 1 }));
        assert_eq!(eval("{\"k\": 5}[\"x\"]"), Err(EvalError::KeyNotFound("x".into())));
        Ok(())
    }

    #[test]
    fn test_functions() -> Result<(), EvalError> {
        let mut interpreter = Interpreter::default();
        interpreter.register(
            "Fact",
            "def Fact(n):\n  if (n <= 1):\n    return 1\n  return (n * Fact((n - 1)))\n",
        )?;
        interpreter.register(
            "Decode",
            "def Decode(s):\n  out = \"\"\n  i = 0\n  while (i < len(s)):\n    out = (out + chr((ord(s[i]) - 1)))\n    i = (i + 1)\n  return out\n",
        )?;
        interpreter.register("Sum", "def Sum(*args):\n  xs = list(args)\n  t = 0\n  while (len(xs) > 0):\n    t = (t + xs[0])\n    xs = xs[1:]\n  return t\n")?;
        interpreter.register("Nothing", "def Nothing():\n  pass\n")?;

        let locals = FxHashMap::default();
        assert_eq!(interpreter.evaluate("Fact(10)", &locals)?, Value::Int(3_628_800));
        assert_eq!(interpreter.evaluate("Decode(\"Ifmmp\")", &locals)?, Value::from("Hello"));
        assert_eq!(interpreter.evaluate("Sum(1, 2, 3)", &locals)?, Value::Int(6));
        assert_eq!(interpreter.evaluate("Nothing()", &locals)?, Value::Empty);
        assert!(interpreter.is_registered("Fact"));
        assert_eq!(interpreter.len(), 4);
        assert!(matches!(
            interpreter.evaluate("Fact(1, 2)", &locals),
            Err(EvalError::Arity { found: 2, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_locals_and_assignment() -> Result<(), EvalError> {
        let mut interpreter = Interpreter::default();
        interpreter.register("Put", "def Put(xs, i, v):\n  xs[i] = v\n  return xs\n")?;
        let mut locals = FxHashMap::default();
        locals.insert("data".to_string(), Value::List(vec![Value::Int(0), Value::Int(0)]));
        assert_eq!(
            interpreter.evaluate("Put(data, 1, 9)", &locals)?,
            Value::List(vec![Value::Int(0), Value::Int(9)])
        );
        assert_eq!(interpreter.evaluate("missing", &locals), Err(EvalError::UndefinedName("missing".into())));
        Ok(())
    }

    #[test]
    fn test_register_errors() {
        let mut interpreter = Interpreter::default();
        assert_eq!(
            interpreter.register("F", "def G():\n  return 1\n"),
            Err(EvalError::NotDefined("F".into()))
        );
        assert!(!interpreter.is_registered("G"));
        assert!(matches!(interpreter.register("F", "x = 1\n"), Err(EvalError::Syntax { .. })));
        assert!(matches!(interpreter.register("F", "def F(:\n"), Err(EvalError::Syntax { .. })));
        assert!(interpreter.is_empty());
    }

    #[test]
    fn test_limits() -> Result<(), EvalError> {
        let limits = EvalLimits::new().with_max_steps(1_000).with_max_call_depth(8).with_max_string_len(16);
        let mut interpreter = Interpreter::new(limits);
        interpreter.register("Spin", "def Spin():\n  while True:\n    pass\n")?;
        interpreter.register("Deep", "def Deep(n):\n  return Deep((n + 1))\n")?;
        interpreter.register("Grow", "def Grow(s):\n  while True:\n    s = (s + s)\n")?;

        let locals = FxHashMap::default();
        assert_eq!(interpreter.evaluate("Spin()", &locals), Err(EvalError::LimitExceeded("step")));
        assert_eq!(interpreter.evaluate("Deep(0)", &locals), Err(EvalError::LimitExceeded("call depth")));
        assert_eq!(
            interpreter.evaluate("Grow(\"ab\")", &locals),
            Err(EvalError::LimitExceeded("string length"))
        );
        Ok(())
    }

    #[test]
    fn test_error_object() -> Result<(), EvalError> {
        let mut interpreter = Interpreter::default();
        interpreter.register(
            "Stash",
            "def Stash():\n  disable_errors()\n  method_call(\"Err\", \"Raise\", [13, \"payload\"])\n  return method_call(\"Err\", \"Source\", [])\n",
        )?;
        interpreter.register("Loud", "def Loud():\n  method_call(\"Err\", \"Raise\", [5])\n")?;

        let locals = FxHashMap::default();
        assert!(matches!(interpreter.evaluate("Loud()", &locals), Err(EvalError::NotImplemented(_))));
        assert_eq!(interpreter.evaluate("Stash()", &locals)?, Value::from("payload"));
        assert!(interpreter.errors_suppressed());
        assert!(matches!(
            interpreter.evaluate("method_call(\"Err\", \"Number\", [])", &locals),
            Err(EvalError::NotImplemented(_))
        ));
        assert_eq!(
            interpreter.evaluate("method_call(\"VBA\", \"UCase\", [\"abc\"])", &locals)?,
            Value::from("ABC")
        );
        assert!(matches!(
            interpreter.evaluate("method_call(\"Shell\", \"Run\", [])", &locals),
            Err(EvalError::NotImplemented(_))
        ));
        Ok(())
    }
}
