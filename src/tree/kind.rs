//! Grammar production and token kinds.
//!
//! The parser emits rule names (`valueStmt`, `ifThenElseStmt`, ...) for interior nodes and
//! ANTLR display names for tokens (`IDENTIFIER`, `WS`, `'+'`, `END_IF`, ...). Every name the
//! passes reason about is a [`NodeKind`] variant whose strum serialization is exactly the
//! name the parser emits. Names outside this set import as [`NodeKind::Unknown`]; the node
//! keeps its original spelling so export and diagnostics stay faithful.

use std::str::FromStr;

use strum::{EnumIter, EnumString, IntoStaticStr};

/// A grammar rule or token kind.
///
/// Interior rule kinds are `PascalCase` renditions of the rule name, token kinds are named
/// after the token (`Plus` for `'+'`, `EndIf` for `END_IF`).
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumString, IntoStaticStr, EnumIter)]
pub enum NodeKind {
    // Module structure
    #[strum(serialize = "startRule")]
    StartRule,
    #[strum(serialize = "module")]
    Module,
    #[strum(serialize = "moduleHeader")]
    ModuleHeader,
    #[strum(serialize = "moduleConfig")]
    ModuleConfig,
    #[strum(serialize = "moduleConfigElement")]
    ModuleConfigElement,
    #[strum(serialize = "moduleAttributes")]
    ModuleAttributes,
    #[strum(serialize = "moduleDeclarations")]
    ModuleDeclarations,
    #[strum(serialize = "moduleDeclarationsElement")]
    ModuleDeclarationsElement,
    #[strum(serialize = "moduleOption")]
    ModuleOption,
    #[strum(serialize = "moduleBody")]
    ModuleBody,
    #[strum(serialize = "moduleBodyElement")]
    ModuleBodyElement,
    #[strum(serialize = "attributeStmt")]
    AttributeStmt,

    // Procedures
    #[strum(serialize = "subStmt")]
    SubStmt,
    #[strum(serialize = "functionStmt")]
    FunctionStmt,
    #[strum(serialize = "propertyGetStmt")]
    PropertyGetStmt,
    #[strum(serialize = "propertyLetStmt")]
    PropertyLetStmt,
    #[strum(serialize = "propertySetStmt")]
    PropertySetStmt,
    #[strum(serialize = "argList")]
    ArgList,
    #[strum(serialize = "arg")]
    Arg,
    #[strum(serialize = "argDefaultValue")]
    ArgDefaultValue,
    #[strum(serialize = "visibility")]
    Visibility,

    // Statements
    #[strum(serialize = "block")]
    Block,
    #[strum(serialize = "blockStmt")]
    BlockStmt,
    #[strum(serialize = "constStmt")]
    ConstStmt,
    #[strum(serialize = "constSubStmt")]
    ConstSubStmt,
    #[strum(serialize = "variableStmt")]
    VariableStmt,
    #[strum(serialize = "variableListStmt")]
    VariableListStmt,
    #[strum(serialize = "variableSubStmt")]
    VariableSubStmt,
    #[strum(serialize = "letStmt")]
    LetStmt,
    #[strum(serialize = "setStmt")]
    SetStmt,
    #[strum(serialize = "ifThenElseStmt")]
    IfThenElseStmt,
    #[strum(serialize = "ifBlockStmt")]
    IfBlockStmt,
    #[strum(serialize = "ifConditionStmt")]
    IfConditionStmt,
    #[strum(serialize = "ifElseIfBlockStmt")]
    IfElseIfBlockStmt,
    #[strum(serialize = "ifElseBlockStmt")]
    IfElseBlockStmt,
    #[strum(serialize = "whileWendStmt")]
    WhileWendStmt,
    #[strum(serialize = "doLoopStmt")]
    DoLoopStmt,
    #[strum(serialize = "forNextStmt")]
    ForNextStmt,
    #[strum(serialize = "forEachStmt")]
    ForEachStmt,
    #[strum(serialize = "selectCaseStmt")]
    SelectCaseStmt,
    #[strum(serialize = "onErrorStmt")]
    OnErrorStmt,
    #[strum(serialize = "goToStmt")]
    GoToStmt,
    #[strum(serialize = "exitStmt")]
    ExitStmt,
    #[strum(serialize = "lineLabel")]
    LineLabel,
    #[strum(serialize = "redimStmt")]
    RedimStmt,
    #[strum(serialize = "explicitCallStmt")]
    ExplicitCallStmt,

    // Calls and expressions
    #[strum(serialize = "implicitCallStmt_InBlock")]
    ImplicitCallStmtInBlock,
    #[strum(serialize = "iCS_B_ProcedureCall")]
    IcsBProcedureCall,
    #[strum(serialize = "iCS_B_MemberProcedureCall")]
    IcsBMemberProcedureCall,
    #[strum(serialize = "implicitCallStmt_InStmt")]
    ImplicitCallStmtInStmt,
    #[strum(serialize = "iCS_S_VariableOrProcedureCall")]
    IcsSVariableOrProcedureCall,
    #[strum(serialize = "iCS_S_ProcedureOrArrayCall")]
    IcsSProcedureOrArrayCall,
    #[strum(serialize = "iCS_S_MembersCall")]
    IcsSMembersCall,
    #[strum(serialize = "iCS_S_MemberCall")]
    IcsSMemberCall,
    #[strum(serialize = "iCS_S_DictionaryCall")]
    IcsSDictionaryCall,
    #[strum(serialize = "dictionaryCallStmt")]
    DictionaryCallStmt,
    #[strum(serialize = "argsCall")]
    ArgsCall,
    #[strum(serialize = "argCall")]
    ArgCall,
    #[strum(serialize = "subscripts")]
    Subscripts,
    #[strum(serialize = "subscript")]
    Subscript,
    #[strum(serialize = "valueStmt")]
    ValueStmt,
    #[strum(serialize = "literal")]
    Literal,

    // Identifiers and types
    #[strum(serialize = "ambiguousIdentifier")]
    AmbiguousIdentifier,
    #[strum(serialize = "ambiguousKeyword")]
    AmbiguousKeyword,
    #[strum(serialize = "certainIdentifier")]
    CertainIdentifier,
    #[strum(serialize = "asTypeClause")]
    AsTypeClause,
    #[strum(serialize = "type")]
    Type,
    #[strum(serialize = "baseType")]
    BaseType,
    #[strum(serialize = "complexType")]
    ComplexType,
    #[strum(serialize = "typeHint")]
    TypeHint,

    // Separators
    #[strum(serialize = "endOfStatement")]
    EndOfStatement,
    #[strum(serialize = "endOfLine")]
    EndOfLine,
    #[strum(serialize = "comment")]
    Comment,
    #[strum(serialize = "remComment")]
    RemComment,

    // Literal tokens
    #[strum(serialize = "IDENTIFIER")]
    Identifier,
    #[strum(serialize = "STRINGLITERAL")]
    StringLiteral,
    #[strum(serialize = "SHORTLITERAL")]
    ShortLiteral,
    #[strum(serialize = "INTEGERLITERAL")]
    IntegerLiteral,
    #[strum(serialize = "DOUBLELITERAL")]
    DoubleLiteral,
    #[strum(serialize = "HEXLITERAL")]
    HexLiteral,
    #[strum(serialize = "OCTLITERAL")]
    OctLiteral,
    #[strum(serialize = "DATELITERAL")]
    DateLiteral,
    #[strum(serialize = "TRUE")]
    True,
    #[strum(serialize = "FALSE")]
    False,
    #[strum(serialize = "NOTHING")]
    Nothing,
    #[strum(serialize = "NULL")]
    Null,
    #[strum(serialize = "EMPTY")]
    Empty,

    // Layout tokens
    #[strum(serialize = "WS")]
    Ws,
    #[strum(serialize = "NEWLINE")]
    Newline,
    #[strum(serialize = "COMMENT")]
    CommentToken,
    #[strum(serialize = "EOF")]
    Eof,

    // Operator and punctuation tokens
    #[strum(serialize = "'+'")]
    Plus,
    #[strum(serialize = "'-'")]
    Minus,
    #[strum(serialize = "'*'")]
    Mult,
    #[strum(serialize = "'/'")]
    Div,
    #[strum(to_string = "'\\\\'", serialize = "'\\'")]
    IntDiv,
    #[strum(serialize = "'^'")]
    Pow,
    #[strum(serialize = "'&'")]
    Amp,
    #[strum(serialize = "'='")]
    Eq,
    #[strum(serialize = "'<>'")]
    Neq,
    #[strum(serialize = "'<'")]
    Lt,
    #[strum(serialize = "'<='")]
    Leq,
    #[strum(serialize = "'>'")]
    Gt,
    #[strum(serialize = "'>='")]
    Geq,
    #[strum(serialize = "'+='")]
    PlusEq,
    #[strum(serialize = "'-='")]
    MinusEq,
    #[strum(serialize = "':='")]
    Assign,
    #[strum(serialize = "'('")]
    LParen,
    #[strum(serialize = "')'")]
    RParen,
    #[strum(serialize = "','")]
    Comma,
    #[strum(serialize = "'.'")]
    Dot,
    #[strum(serialize = "'!'")]
    Exclamation,
    #[strum(serialize = "':'")]
    Colon,
    #[strum(serialize = "'$'")]
    Dollar,
    #[strum(serialize = "'%'")]
    Percent,
    #[strum(serialize = "'#'")]
    Hash,
    #[strum(serialize = "'@'")]
    At,

    // Operator keywords
    #[strum(serialize = "AND")]
    And,
    #[strum(serialize = "OR")]
    Or,
    #[strum(serialize = "XOR")]
    Xor,
    #[strum(serialize = "NOT")]
    Not,
    #[strum(serialize = "MOD")]
    Mod,
    #[strum(serialize = "EQV")]
    Eqv,
    #[strum(serialize = "IMP")]
    Imp,
    #[strum(serialize = "IS")]
    Is,
    #[strum(serialize = "LIKE")]
    Like,
    #[strum(serialize = "NEW")]
    New,
    #[strum(serialize = "ADDRESSOF")]
    AddressOf,
    #[strum(serialize = "TYPEOF")]
    TypeOf,

    // Statement keywords
    #[strum(serialize = "ATTRIBUTE")]
    Attribute,
    #[strum(serialize = "DIM")]
    Dim,
    #[strum(serialize = "CONST")]
    Const,
    #[strum(serialize = "STATIC")]
    Static,
    #[strum(serialize = "PUBLIC")]
    Public,
    #[strum(serialize = "PRIVATE")]
    Private,
    #[strum(serialize = "GLOBAL")]
    Global,
    #[strum(serialize = "FRIEND")]
    Friend,
    #[strum(serialize = "AS")]
    As,
    #[strum(serialize = "SET")]
    Set,
    #[strum(serialize = "LET")]
    Let,
    #[strum(serialize = "IF")]
    If,
    #[strum(serialize = "THEN")]
    Then,
    #[strum(serialize = "ELSE")]
    Else,
    #[strum(serialize = "ELSEIF")]
    ElseIf,
    #[strum(serialize = "END_IF")]
    EndIf,
    #[strum(serialize = "FOR")]
    For,
    #[strum(serialize = "EACH")]
    Each,
    #[strum(serialize = "IN")]
    In,
    #[strum(serialize = "TO")]
    To,
    #[strum(serialize = "STEP")]
    Step,
    #[strum(serialize = "NEXT")]
    Next,
    #[strum(serialize = "WHILE")]
    While,
    #[strum(serialize = "WEND")]
    Wend,
    #[strum(serialize = "DO")]
    Do,
    #[strum(serialize = "LOOP")]
    Loop,
    #[strum(serialize = "UNTIL")]
    Until,
    #[strum(serialize = "SUB")]
    Sub,
    #[strum(serialize = "FUNCTION")]
    Function,
    #[strum(serialize = "END_SUB")]
    EndSub,
    #[strum(serialize = "END_FUNCTION")]
    EndFunction,
    #[strum(serialize = "ON_ERROR")]
    OnError,
    #[strum(serialize = "ON_LOCAL_ERROR")]
    OnLocalError,
    #[strum(serialize = "RESUME")]
    Resume,
    #[strum(serialize = "GOTO")]
    GoTo,
    #[strum(serialize = "CALL")]
    Call,
    #[strum(serialize = "BYVAL")]
    ByVal,
    #[strum(serialize = "BYREF")]
    ByRef,
    #[strum(serialize = "OPTIONAL")]
    Optional,
    #[strum(serialize = "PARAMARRAY")]
    ParamArray,

    // Type keywords
    #[strum(serialize = "BOOLEAN")]
    Boolean,
    #[strum(serialize = "BYTE")]
    Byte,
    #[strum(serialize = "INTEGER")]
    Integer,
    #[strum(serialize = "LONG")]
    Long,
    #[strum(serialize = "SINGLE")]
    Single,
    #[strum(serialize = "DOUBLE")]
    Double,
    #[strum(serialize = "CURRENCY")]
    Currency,
    #[strum(serialize = "DATE")]
    Date,
    #[strum(serialize = "STRING")]
    String,
    #[strum(serialize = "VARIANT")]
    Variant,
    #[strum(serialize = "OBJECT")]
    Object,
    #[strum(serialize = "LEN")]
    Len,

    /// Any name not listed above.
    #[strum(serialize = "<unknown>")]
    Unknown,
}

impl NodeKind {
    /// Resolves a parser node name, falling back to [`NodeKind::Unknown`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        NodeKind::from_str(name).unwrap_or(NodeKind::Unknown)
    }

    /// The name the parser uses for this kind.
    ///
    /// [`NodeKind::Unknown`] has no canonical name; use
    /// [`Tree::kind_name`](crate::tree::Tree::kind_name) to get the original spelling.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// True for the token kinds that carry a literal value.
    #[must_use]
    pub fn is_literal_token(self) -> bool {
        matches!(
            self,
            NodeKind::StringLiteral
                | NodeKind::ShortLiteral
                | NodeKind::IntegerLiteral
                | NodeKind::DoubleLiteral
                | NodeKind::HexLiteral
                | NodeKind::OctLiteral
                | NodeKind::DateLiteral
        )
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_parser_names() {
        assert_eq!(NodeKind::from_name("valueStmt"), NodeKind::ValueStmt);
        assert_eq!(NodeKind::from_name("'+'"), NodeKind::Plus);
        assert_eq!(NodeKind::from_name("END_IF"), NodeKind::EndIf);
        assert_eq!(NodeKind::from_name("iCS_S_VariableOrProcedureCall"), NodeKind::IcsSVariableOrProcedureCall);
        assert_eq!(NodeKind::from_name("'\\\\'"), NodeKind::IntDiv);
        assert_eq!(NodeKind::from_name("'\\'"), NodeKind::IntDiv);
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(NodeKind::from_name("selectCaseStmtX"), NodeKind::Unknown);
        assert_eq!(NodeKind::from_name("Unknown"), NodeKind::Unknown);
        assert_eq!(NodeKind::from_name(""), NodeKind::Unknown);
    }

    #[test]
    fn test_names_round_trip() {
        for kind in NodeKind::iter().filter(|k| *k != NodeKind::Unknown) {
            assert_eq!(NodeKind::from_name(kind.name()), kind, "{kind:?}");
        }
    }
}
