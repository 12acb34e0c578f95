//! Static lowering tables: node kind policies, operators, library calls and keywords.

use crate::tree::NodeKind;

/// How a node kind may be lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lowering {
    /// Produces an expression; only valid where a value is expected.
    Value,
    /// Produces lines; only valid in statement position.
    Statement,
    /// A call that is an expression in value position and an expression line otherwise.
    Either,
    /// A wrapper with exactly one meaningful child, lowered as that child.
    Forward,
    /// Layout that contributes nothing.
    Skip,
    /// Everything else fails the translation.
    Unsupported,
}

pub(crate) fn lowering(kind: NodeKind) -> Lowering {
    match kind {
        NodeKind::ValueStmt
        | NodeKind::Literal
        | NodeKind::StringLiteral
        | NodeKind::ShortLiteral
        | NodeKind::IntegerLiteral
        | NodeKind::HexLiteral
        | NodeKind::OctLiteral
        | NodeKind::True
        | NodeKind::False
        | NodeKind::IcsSVariableOrProcedureCall
        | NodeKind::IcsSProcedureOrArrayCall
        | NodeKind::IcsSMembersCall => Lowering::Value,

        NodeKind::Block
        | NodeKind::LetStmt
        | NodeKind::SetStmt
        | NodeKind::ConstStmt
        | NodeKind::VariableStmt
        | NodeKind::IfThenElseStmt
        | NodeKind::WhileWendStmt
        | NodeKind::DoLoopStmt
        | NodeKind::ForNextStmt
        | NodeKind::OnErrorStmt => Lowering::Statement,

        NodeKind::IcsBProcedureCall | NodeKind::IcsBMemberProcedureCall => Lowering::Either,

        NodeKind::BlockStmt
        | NodeKind::ImplicitCallStmtInBlock
        | NodeKind::ImplicitCallStmtInStmt
        | NodeKind::IfConditionStmt
        | NodeKind::ArgCall
        | NodeKind::Subscript => Lowering::Forward,

        NodeKind::Ws
        | NodeKind::Newline
        | NodeKind::EndOfStatement
        | NodeKind::EndOfLine
        | NodeKind::Comment
        | NodeKind::RemComment
        | NodeKind::CommentToken => Lowering::Skip,

        _ => Lowering::Unsupported,
    }
}

/// Lowered form of a binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryTemplate {
    /// `(a OP b)`
    Infix(&'static str),
    /// `(str(a) + str(b))`
    Concat,
}

impl BinaryTemplate {
    pub(crate) fn render(self, left: &str, right: &str) -> String {
        match self {
            BinaryTemplate::Infix(op) => format!("({left} {op} {right})"),
            BinaryTemplate::Concat => format!("(str({left}) + str({right}))"),
        }
    }
}

/// Two-operand operators. `/` is missing on purpose: VBA divides in floating point.
///
/// `\` and `Mod` lower to the dialect's `/` and `%`, which round toward negative infinity
/// and take the sign of the divisor. VBA truncates toward zero instead, so folds with a
/// negative operand differ: `-7 \ 2` gives -4 (VBA -3) and `-7 Mod 3` gives 2 (VBA -1).
pub(crate) fn binary_operator(kind: NodeKind) -> Option<BinaryTemplate> {
    let op = match kind {
        NodeKind::Amp => return Some(BinaryTemplate::Concat),
        NodeKind::Plus => "+",
        NodeKind::Minus => "-",
        NodeKind::Mult => "*",
        NodeKind::IntDiv => "/",
        NodeKind::Mod => "%",
        NodeKind::Pow => "**",
        NodeKind::Xor => "^",
        NodeKind::And => "and",
        NodeKind::Or => "or",
        NodeKind::Eq => "==",
        NodeKind::Neq => "!=",
        NodeKind::Lt => "<",
        NodeKind::Leq => "<=",
        NodeKind::Gt => ">",
        NodeKind::Geq => ">=",
        _ => return None,
    };
    Some(BinaryTemplate::Infix(op))
}

/// One-operand operators.
pub(crate) fn unary_operator(kind: NodeKind) -> Option<&'static str> {
    match kind {
        NodeKind::Minus => Some("-"),
        NodeKind::Plus => Some("+"),
        NodeKind::Not => Some("not "),
        _ => None,
    }
}

/// A VBA library function with a fixed lowering.
pub(crate) struct LibraryCall {
    pub name: &'static str,
    pub arities: &'static [usize],
    pub render: fn(&[String]) -> String,
}

impl LibraryCall {
    /// An empty arity list accepts any argument count.
    pub(crate) fn accepts(&self, count: usize) -> bool {
        self.arities.is_empty() || self.arities.contains(&count)
    }
}

fn apply(function: &str, args: &[String]) -> String {
    format!("{function}({})", args.join(", "))
}

static LIBRARY: [LibraryCall; 25] = [
    LibraryCall { name: "UBound", arities: &[1], render: |a| format!("(len({}) - 1)", a[0]) },
    LibraryCall { name: "Len", arities: &[1], render: |a| apply("len", a) },
    LibraryCall { name: "Chr", arities: &[1], render: |a| apply("chr", a) },
    LibraryCall { name: "ChrW", arities: &[1], render: |a| apply("chr", a) },
    LibraryCall { name: "ChrB", arities: &[1], render: |a| apply("chr", a) },
    LibraryCall { name: "Asc", arities: &[1], render: |a| apply("asc", a) },
    LibraryCall { name: "AscW", arities: &[1], render: |a| apply("asc", a) },
    LibraryCall { name: "AscB", arities: &[1], render: |a| apply("asc", a) },
    LibraryCall {
        name: "Mid",
        arities: &[2, 3],
        render: |a| match a {
            [s, start] => format!("{s}[({start} - 1):]"),
            _ => format!("{}[({} - 1):(({} - 1) + {})]", a[0], a[1], a[1], a[2]),
        },
    },
    LibraryCall { name: "Left", arities: &[2], render: |a| format!("{}[:{}]", a[0], a[1]) },
    LibraryCall { name: "Right", arities: &[2], render: |a| format!("reverse(reverse({})[:{}])", a[0], a[1]) },
    LibraryCall { name: "Sgn", arities: &[1], render: |a| apply("sgn", a) },
    LibraryCall { name: "Abs", arities: &[1], render: |a| apply("abs", a) },
    LibraryCall { name: "UCase", arities: &[1], render: |a| apply("upper", a) },
    LibraryCall { name: "LCase", arities: &[1], render: |a| apply("lower", a) },
    LibraryCall { name: "Trim", arities: &[1], render: |a| apply("strip", a) },
    LibraryCall { name: "LTrim", arities: &[1], render: |a| apply("lstrip", a) },
    LibraryCall { name: "RTrim", arities: &[1], render: |a| apply("rstrip", a) },
    LibraryCall { name: "StrReverse", arities: &[1], render: |a| apply("reverse", a) },
    LibraryCall { name: "CStr", arities: &[1], render: |a| apply("str", a) },
    LibraryCall { name: "CInt", arities: &[1], render: |a| apply("int", a) },
    LibraryCall { name: "CLng", arities: &[1], render: |a| apply("int", a) },
    LibraryCall { name: "CBool", arities: &[1], render: |a| apply("bool", a) },
    LibraryCall { name: "Replace", arities: &[3], render: |a| apply("replace", a) },
    LibraryCall { name: "InStr", arities: &[2, 3], render: |a| apply("instr", a) },
];

static ARRAY: LibraryCall = LibraryCall {
    name: "Array",
    arities: &[],
    render: |a| format!("[{}]", a.join(", ")),
};

/// Looks up a library function. VBA names are case-insensitive.
pub(crate) fn library(name: &str) -> Option<&'static LibraryCall> {
    if ARRAY.name.eq_ignore_ascii_case(name) {
        return Some(&ARRAY);
    }
    LIBRARY.iter().find(|call| call.name.eq_ignore_ascii_case(name))
}

const KEYWORDS: [(&str, &str); 8] = [
    ("vbCrLf", "(chr(13) + chr(10))"),
    ("vbCr", "chr(13)"),
    ("vbLf", "chr(10)"),
    ("vbTab", "chr(9)"),
    ("vbNullString", "\"\""),
    ("vbNullChar", "chr(0)"),
    ("True", "True"),
    ("False", "False"),
];

/// The lowering of a bare library constant.
pub(crate) fn keyword(name: &str) -> Option<&'static str> {
    KEYWORDS
        .iter()
        .find(|(keyword, _)| keyword.eq_ignore_ascii_case(name))
        .map(|(_, lowered)| *lowered)
}

const ERR_MEMBERS: [&str; 4] = ["Raise", "Number", "Source", "Clear"];

const VBA_MEMBERS: [&str; 19] = [
    "Chr", "ChrW", "Asc", "AscW", "Len", "UCase", "LCase", "Trim", "LTrim", "RTrim", "StrReverse",
    "Replace", "InStr", "CStr", "CInt", "CLng", "CBool", "Abs", "Sgn",
];

/// Canonical `(object, method)` spelling of a member `method_call` can evaluate.
pub(crate) fn member(object: &str, method: &str) -> Option<(&'static str, &'static str)> {
    let (canonical, members): (&'static str, &[&'static str]) = if object.eq_ignore_ascii_case("Err") {
        ("Err", &ERR_MEMBERS)
    } else if object.eq_ignore_ascii_case("VBA") {
        ("VBA", &VBA_MEMBERS)
    } else {
        return None;
    };
    members
        .iter()
        .find(|m| m.eq_ignore_ascii_case(method))
        .map(|m| (canonical, *m))
}

/// True if reading `name` can never have an effect: library functions and constants.
#[must_use]
pub fn is_pure_builtin(name: &str) -> bool {
    library(name).is_some() || keyword(name).is_some()
}

/// Scalar parameter and variable types the dialect can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scalar {
    Int,
    Str,
    Bool,
    /// Untyped; no conversion and no default.
    Variant,
}

impl Scalar {
    pub(crate) fn from_base_type(kind: NodeKind) -> Option<Self> {
        match kind {
            NodeKind::Integer | NodeKind::Long | NodeKind::Byte => Some(Scalar::Int),
            NodeKind::String => Some(Scalar::Str),
            NodeKind::Boolean => Some(Scalar::Bool),
            NodeKind::Variant => Some(Scalar::Variant),
            _ => None,
        }
    }

    /// The conversion built-in applied to incoming parameters.
    pub(crate) fn conversion(self) -> Option<&'static str> {
        match self {
            Scalar::Int => Some("int"),
            Scalar::Str => Some("str"),
            Scalar::Bool => Some("bool"),
            Scalar::Variant => None,
        }
    }

    /// The value a `Dim` initializes the variable to.
    pub(crate) fn default_value(self) -> Option<&'static str> {
        match self {
            Scalar::Int => Some("0"),
            Scalar::Str => Some("\"\""),
            Scalar::Bool => Some("False"),
            Scalar::Variant => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn test_library_lookup_ignores_case() {
        assert_eq!(library("chr").map(|c| c.name), Some("Chr"));
        assert_eq!(library("MID").map(|c| c.name), Some("Mid"));
        assert!(library("MsgBox").is_none());
        assert!(library("Shell").is_none());
    }

    #[test]
    fn test_library_templates() {
        let mid = library("Mid").unwrap();
        assert!(mid.accepts(2) && mid.accepts(3) && !mid.accepts(1));
        assert_eq!((mid.render)(&args(&["s", "2"])), "s[(2 - 1):]");
        assert_eq!((mid.render)(&args(&["s", "2", "3"])), "s[(2 - 1):((2 - 1) + 3)]");

        let ubound = library("UBound").unwrap();
        assert_eq!((ubound.render)(&args(&["a"])), "(len(a) - 1)");

        let array = library("Array").unwrap();
        assert!(array.accepts(0) && array.accepts(7));
        assert_eq!((array.render)(&args(&["1", "2"])), "[1, 2]");

        let right = library("Right").unwrap();
        assert_eq!((right.render)(&args(&["s", "2"])), "reverse(reverse(s)[:2])");
    }

    #[test]
    fn test_operators() {
        assert_eq!(binary_operator(NodeKind::Plus).unwrap().render("a", "b"), "(a + b)");
        assert_eq!(binary_operator(NodeKind::Amp).unwrap().render("a", "1"), "(str(a) + str(1))");
        assert_eq!(binary_operator(NodeKind::Eq), Some(BinaryTemplate::Infix("==")));
        assert_eq!(binary_operator(NodeKind::Xor), Some(BinaryTemplate::Infix("^")));
        assert_eq!(binary_operator(NodeKind::Pow), Some(BinaryTemplate::Infix("**")));
        assert_eq!(binary_operator(NodeKind::Div), None);
        assert_eq!(binary_operator(NodeKind::Like), None);
        assert_eq!(unary_operator(NodeKind::Not), Some("not "));
        assert_eq!(unary_operator(NodeKind::Mult), None);
    }

    #[test]
    fn test_keywords_and_members() {
        assert_eq!(keyword("vbcrlf"), Some("(chr(13) + chr(10))"));
        assert_eq!(keyword("vbNullString"), Some("\"\""));
        assert_eq!(keyword("vbObjectError"), None);
        assert_eq!(member("Err", "Raise"), Some(("Err", "Raise")));
        assert_eq!(member("err", "number"), Some(("Err", "Number")));
        assert_eq!(member("vba", "chrw"), Some(("VBA", "ChrW")));
        assert_eq!(member("VBA", "Shell"), None);
        assert_eq!(member("WScript", "Echo"), None);
        assert!(is_pure_builtin("UCase"));
        assert!(is_pure_builtin("vbTab"));
        assert!(!is_pure_builtin("CreateObject"));
    }

    #[test]
    fn test_policies() {
        assert_eq!(lowering(NodeKind::ValueStmt), Lowering::Value);
        assert_eq!(lowering(NodeKind::LetStmt), Lowering::Statement);
        assert_eq!(lowering(NodeKind::IcsBProcedureCall), Lowering::Either);
        assert_eq!(lowering(NodeKind::BlockStmt), Lowering::Forward);
        assert_eq!(lowering(NodeKind::EndOfStatement), Lowering::Skip);
        assert_eq!(lowering(NodeKind::SelectCaseStmt), Lowering::Unsupported);
        assert_eq!(lowering(NodeKind::GoToStmt), Lowering::Unsupported);
        assert_eq!(lowering(NodeKind::DoubleLiteral), Lowering::Unsupported);
    }

    #[test]
    fn test_scalars() {
        assert_eq!(Scalar::from_base_type(NodeKind::Long), Some(Scalar::Int));
        assert_eq!(Scalar::from_base_type(NodeKind::Double), None);
        assert_eq!(Scalar::Str.default_value(), Some("\"\""));
        assert_eq!(Scalar::Variant.conversion(), None);
    }
}
