//! Recursive descent parser for the evaluable dialect.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! program    := statement*
//! statement  := "def" NAME "(" params ")" ":" suite
//!             | "if" expr ":" suite ("elif" expr ":" suite)* ("else" ":" suite)?
//!             | "while" expr ":" suite
//!             | simple NEWLINE
//! simple     := "pass" | "break" | "return" expr? | target "=" expr | expr
//! suite      := simple NEWLINE | NEWLINE INDENT statement+ DEDENT
//!
//! expr       := or
//! or         := and ("or" and)*
//! and        := not ("and" not)*
//! not        := "not" not | comparison
//! comparison := xor (("==" | "!=" | "<" | "<=" | ">" | ">=") xor)?
//! xor        := sum ("^" sum)*
//! sum        := term (("+" | "-") term)*
//! term       := unary (("*" | "/" | "%") unary)*
//! unary      := ("-" | "+") unary | power
//! power      := postfix ("**" unary)?
//! postfix    := atom (call | "[" expr "]" | "[" expr? ":" expr? "]")*
//! atom       := INT | STR | "True" | "False" | NAME | "(" expr ")" | list | map
//! ```
//!
//! Calls are only allowed directly on names. Comparisons do not chain.

use std::sync::Arc;

use crate::emulation::{
    lexer::{tokenize, Spanned, Token},
    EvalError,
};

/// Words that cannot be used as names.
pub(crate) const KEYWORDS: [&str; 13] = [
    "def", "if", "elif", "else", "while", "pass", "break", "return", "and", "or", "not", "True", "False",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Xor,
    And,
    Or,
}

impl BinaryOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Xor => "^",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Int(i64),
    Str(String),
    Bool(bool),
    Name(String),
    List(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Slice(Box<Expr>, Option<Box<Expr>>, Option<Box<Expr>>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Target {
    Name(String),
    Index(String, Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub variadic: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stmt {
    Def(Arc<FunctionDef>),
    If(Vec<(Expr, Vec<Stmt>)>, Vec<Stmt>),
    While(Expr, Vec<Stmt>),
    Assign(Target, Expr),
    Expr(Expr),
    Return(Option<Expr>),
    Break,
    Pass,
}

/// Parses a whole program.
pub(crate) fn parse_program(source: &str) -> Result<Vec<Stmt>, EvalError> {
    let mut parser = Parser::new(tokenize(source)?);
    let mut program = Vec::new();
    while !parser.at(&Token::Eof) {
        program.push(parser.statement()?);
    }
    Ok(program)
}

/// Parses a single expression spanning the whole source.
pub(crate) fn parse_expression(source: &str) -> Result<Expr, EvalError> {
    let mut parser = Parser::new(tokenize(source)?);
    let expr = parser.expression()?;
    parser.expect(&Token::Newline)?;
    parser.expect(&Token::Eof)?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    loops: usize,
    functions: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Parser {
            tokens,
            pos: 0,
            loops: 0,
            functions: 0,
        }
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map_or(&Token::Eof, |spanned| &spanned.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |spanned| spanned.line)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn at_sym(&self, symbol: &str) -> bool {
        matches!(self.peek(), Token::Sym(s) if *s == symbol)
    }

    fn at_word(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Name(n) if n == word)
    }

    fn eat_sym(&mut self, symbol: &str) -> bool {
        let found = self.at_sym(symbol);
        if found {
            self.pos += 1;
        }
        found
    }

    fn eat_word(&mut self, word: &str) -> bool {
        let found = self.at_word(word);
        if found {
            self.pos += 1;
        }
        found
    }

    fn error(&self, message: impl Into<String>) -> EvalError {
        EvalError::syntax(self.line(), message)
    }

    fn expect(&mut self, token: &Token) -> Result<(), EvalError> {
        if self.at(token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {token:?}, found {:?}", self.peek())))
        }
    }

    fn expect_sym(&mut self, symbol: &str) -> Result<(), EvalError> {
        if self.eat_sym(symbol) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{symbol}', found {:?}", self.peek())))
        }
    }

    fn identifier(&mut self) -> Result<String, EvalError> {
        match self.advance() {
            Token::Name(name) if !KEYWORDS.contains(&name.as_str()) => Ok(name),
            other => Err(self.error(format!("expected a name, found {other:?}"))),
        }
    }

    // Statements

    fn statement(&mut self) -> Result<Stmt, EvalError> {
        if self.eat_word("def") {
            return self.definition();
        }
        if self.eat_word("if") {
            return self.conditional();
        }
        if self.eat_word("while") {
            let condition = self.expression()?;
            self.expect_sym(":")?;
            self.loops += 1;
            let body = self.suite();
            self.loops -= 1;
            return Ok(Stmt::While(condition, body?));
        }

        let stmt = self.simple()?;
        self.expect(&Token::Newline)?;
        Ok(stmt)
    }

    fn definition(&mut self) -> Result<Stmt, EvalError> {
        let name = self.identifier()?;
        self.expect_sym("(")?;
        let mut params = Vec::new();
        let mut variadic = None;
        while !self.at_sym(")") {
            if variadic.is_some() {
                return Err(self.error("no parameter may follow the variadic one"));
            }
            if self.eat_sym("*") {
                variadic = Some(self.identifier()?);
            } else {
                let param = self.identifier()?;
                if params.contains(&param) {
                    return Err(self.error(format!("duplicate parameter '{param}'")));
                }
                params.push(param);
            }
            if !self.eat_sym(",") {
                break;
            }
        }
        self.expect_sym(")")?;
        self.expect_sym(":")?;

        let loops = std::mem::take(&mut self.loops);
        self.functions += 1;
        let body = self.suite();
        self.functions -= 1;
        self.loops = loops;

        Ok(Stmt::Def(Arc::new(FunctionDef {
            name,
            params,
            variadic,
            body: body?,
        })))
    }

    fn conditional(&mut self) -> Result<Stmt, EvalError> {
        let mut branches = Vec::new();
        let condition = self.expression()?;
        self.expect_sym(":")?;
        branches.push((condition, self.suite()?));

        while self.eat_word("elif") {
            let condition = self.expression()?;
            self.expect_sym(":")?;
            branches.push((condition, self.suite()?));
        }

        let mut otherwise = Vec::new();
        if self.eat_word("else") {
            self.expect_sym(":")?;
            otherwise = self.suite()?;
        }
        Ok(Stmt::If(branches, otherwise))
    }

    fn suite(&mut self) -> Result<Vec<Stmt>, EvalError> {
        if !self.at(&Token::Newline) {
            let stmt = self.simple()?;
            self.expect(&Token::Newline)?;
            return Ok(vec![stmt]);
        }

        self.expect(&Token::Newline)?;
        self.expect(&Token::Indent)?;
        let mut body = Vec::new();
        while !self.at(&Token::Dedent) {
            if self.at(&Token::Eof) {
                return Err(self.error("unexpected end of input inside a block"));
            }
            body.push(self.statement()?);
        }
        self.expect(&Token::Dedent)?;
        Ok(body)
    }

    fn simple(&mut self) -> Result<Stmt, EvalError> {
        if self.eat_word("pass") {
            return Ok(Stmt::Pass);
        }
        if self.at_word("break") {
            if self.loops == 0 {
                return Err(self.error("'break' outside loop"));
            }
            self.pos += 1;
            return Ok(Stmt::Break);
        }
        if self.at_word("return") {
            if self.functions == 0 {
                return Err(self.error("'return' outside function"));
            }
            self.pos += 1;
            if self.at(&Token::Newline) {
                return Ok(Stmt::Return(None));
            }
            return Ok(Stmt::Return(Some(self.expression()?)));
        }

        let expr = self.expression()?;
        if !self.eat_sym("=") {
            return Ok(Stmt::Expr(expr));
        }

        let target = match expr {
            Expr::Name(name) => Target::Name(name),
            Expr::Index(base, index) => match *base {
                Expr::Name(name) => Target::Index(name, *index),
                _ => return Err(self.error("only names can be indexed on assignment")),
            },
            _ => return Err(self.error("invalid assignment target")),
        };
        Ok(Stmt::Assign(target, self.expression()?))
    }

    // Expressions

    fn expression(&mut self) -> Result<Expr, EvalError> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.and()?;
        while self.eat_word("or") {
            let right = self.and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.not()?;
        while self.eat_word("and") {
            let right = self.not()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, EvalError> {
        if self.eat_word("not") {
            let operand = self.not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison_op(&self) -> Option<CompareOp> {
        let Token::Sym(symbol) = self.peek() else {
            return None;
        };
        Some(match *symbol {
            "==" => CompareOp::Eq,
            "!=" => CompareOp::Ne,
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Le,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Ge,
            _ => return None,
        })
    }

    fn comparison(&mut self) -> Result<Expr, EvalError> {
        let left = self.xor()?;
        let Some(op) = self.comparison_op() else {
            return Ok(left);
        };
        self.pos += 1;
        let right = self.xor()?;
        if self.comparison_op().is_some() {
            return Err(self.error("chained comparisons are not supported"));
        }
        Ok(Expr::Compare(op, Box::new(left), Box::new(right)))
    }

    fn xor(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.sum()?;
        while self.eat_sym("^") {
            let right = self.sum()?;
            left = Expr::Binary(BinaryOp::Xor, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn sum(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.term()?;
        loop {
            let op = if self.eat_sym("+") {
                BinaryOp::Add
            } else if self.eat_sym("-") {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.unary()?;
        loop {
            let op = if self.eat_sym("*") {
                BinaryOp::Mul
            } else if self.eat_sym("/") {
                BinaryOp::Div
            } else if self.eat_sym("%") {
                BinaryOp::Mod
            } else {
                return Ok(left);
            };
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        if self.eat_sym("-") {
            // A negated literal is a literal, unless a postfix or power binds first.
            if let Token::Int(value) = self.peek() {
                let value = *value;
                let next = self.tokens.get(self.pos + 1).map(|s| &s.token);
                if !matches!(next, Some(Token::Sym("**" | "[" | "("))) {
                    self.pos += 1;
                    return Ok(Expr::Int(-value));
                }
            }
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        if self.eat_sym("+") {
            return Ok(Expr::Unary(UnaryOp::Pos, Box::new(self.unary()?)));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, EvalError> {
        let base = self.postfix()?;
        if self.eat_sym("**") {
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.atom()?;
        loop {
            if self.at_sym("(") {
                let Expr::Name(name) = expr else {
                    return Err(self.error("only names can be called"));
                };
                self.pos += 1;
                let args = self.sequence(")")?;
                expr = Expr::Call(name, args);
            } else if self.eat_sym("[") {
                let start = if self.at_sym(":") {
                    None
                } else {
                    Some(Box::new(self.expression()?))
                };
                if self.eat_sym(":") {
                    let end = if self.at_sym("]") {
                        None
                    } else {
                        Some(Box::new(self.expression()?))
                    };
                    self.expect_sym("]")?;
                    expr = Expr::Slice(Box::new(expr), start, end);
                } else {
                    self.expect_sym("]")?;
                    let Some(index) = start else {
                        return Err(self.error("empty index"));
                    };
                    expr = Expr::Index(Box::new(expr), index);
                }
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma separated expressions up to `close`, trailing comma allowed.
    fn sequence(&mut self, close: &str) -> Result<Vec<Expr>, EvalError> {
        let mut items = Vec::new();
        while !self.at_sym(close) {
            items.push(self.expression()?);
            if !self.eat_sym(",") {
                break;
            }
        }
        self.expect_sym(close)?;
        Ok(items)
    }

    fn atom(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Token::Int(value) => Ok(Expr::Int(value)),
            Token::Str(value) => Ok(Expr::Str(value)),
            Token::Name(name) if name == "True" => Ok(Expr::Bool(true)),
            Token::Name(name) if name == "False" => Ok(Expr::Bool(false)),
            Token::Name(name) if KEYWORDS.contains(&name.as_str()) => {
                Err(self.error(format!("unexpected keyword '{name}'")))
            }
            Token::Name(name) => Ok(Expr::Name(name)),
            Token::Sym("(") => {
                let inner = self.expression()?;
                self.expect_sym(")")?;
                Ok(inner)
            }
            Token::Sym("[") => Ok(Expr::List(self.sequence("]")?)),
            Token::Sym("{") => {
                let mut entries = Vec::new();
                while !self.at_sym("}") {
                    let key = self.expression()?;
                    self.expect_sym(":")?;
                    let value = self.expression()?;
                    entries.push((key, value));
                    if !self.eat_sym(",") {
                        break;
                    }
                }
                self.expect_sym("}")?;
                Ok(Expr::Map(entries))
            }
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }
}
