//! Tokenizer for the evaluable dialect.
//!
//! The dialect is indentation structured. The lexer works line by line: blank lines are
//! skipped, leading spaces open and close blocks through [`Token::Indent`] and
//! [`Token::Dedent`], and every logical line ends with [`Token::Newline`].

use crate::emulation::EvalError;

/// A dialect token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Int(i64),
    Str(String),
    Name(String),
    Sym(&'static str),
    Newline,
    Indent,
    Dedent,
    Eof,
}

/// A token and the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub line: usize,
}

const SYMBOLS: [&str; 22] = [
    "**", "==", "!=", "<=", ">=", "<", ">", "=", "+", "-", "*", "/", "%", "^", "(", ")", "[",
    "]", "{", "}", ",", ":",
];

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, EvalError> {
    let mut tokens = Vec::new();
    let mut indents = vec![0usize];

    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let content = raw.trim_end();
        if content.trim_start().is_empty() {
            continue;
        }

        let leading = &content[..content.len() - content.trim_start().len()];
        if leading.contains('\t') {
            return Err(EvalError::syntax(line, "tabs are not allowed in indentation"));
        }
        let width = leading.len();
        let current = indents.last().copied().unwrap_or(0);
        if width > current {
            indents.push(width);
            tokens.push(Spanned { token: Token::Indent, line });
        } else {
            while width < indents.last().copied().unwrap_or(0) {
                indents.pop();
                tokens.push(Spanned { token: Token::Dedent, line });
            }
            if width != indents.last().copied().unwrap_or(0) {
                return Err(EvalError::syntax(line, "inconsistent dedent"));
            }
        }

        lex_line(content.trim_start(), line, &mut tokens)?;
        tokens.push(Spanned { token: Token::Newline, line });
    }

    let last = source.lines().count().max(1);
    while indents.len() > 1 {
        indents.pop();
        tokens.push(Spanned { token: Token::Dedent, line: last });
    }
    tokens.push(Spanned { token: Token::Eof, line: last });
    Ok(tokens)
}

fn lex_line(text: &str, line: usize, out: &mut Vec<Spanned>) -> Result<(), EvalError> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        if c == ' ' {
            pos += 1;
            continue;
        }

        if c.is_ascii_digit() {
            let start = pos;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            let digits: String = chars[start..pos].iter().collect();
            let value = digits
                .parse::<i64>()
                .map_err(|_| EvalError::syntax(line, format!("integer literal '{digits}' out of range")))?;
            out.push(Spanned { token: Token::Int(value), line });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let name: String = chars[start..pos].iter().collect();
            out.push(Spanned { token: Token::Name(name), line });
            continue;
        }

        if c == '"' {
            pos += 1;
            let mut value = String::new();
            loop {
                match chars.get(pos) {
                    None => return Err(EvalError::syntax(line, "unterminated string literal")),
                    Some('"') if chars.get(pos + 1) == Some(&'"') => {
                        value.push('"');
                        pos += 2;
                    }
                    Some('"') => {
                        pos += 1;
                        break;
                    }
                    Some(other) => {
                        value.push(*other);
                        pos += 1;
                    }
                }
            }
            out.push(Spanned { token: Token::Str(value), line });
            continue;
        }

        let rest: String = chars[pos..chars.len().min(pos + 2)].iter().collect();
        let symbol = SYMBOLS.iter().find(|s| rest.starts_with(**s));
        match symbol {
            Some(symbol) => {
                out.push(Spanned { token: Token::Sym(*symbol), line });
                pos += symbol.chars().count();
            }
            None => return Err(EvalError::syntax(line, format!("unexpected character '{c}'"))),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .map(|tokens| tokens.into_iter().map(|t| t.token).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_expression_tokens() {
        assert_eq!(
            kinds("f(x) ** 2 >= \"a\"\"b\""),
            vec![
                Token::Name("f".into()),
                Token::Sym("("),
                Token::Name("x".into()),
                Token::Sym(")"),
                Token::Sym("**"),
                Token::Int(2),
                Token::Sym(">="),
                Token::Str("a\"b".into()),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_indentation() {
        let tokens = kinds("def f():\n  x = 1\n\n  if x:\n    pass\nf()\n");
        assert_eq!(tokens.iter().filter(|t| **t == Token::Indent).count(), 2);
        assert_eq!(tokens.iter().filter(|t| **t == Token::Dedent).count(), 2);
        assert_eq!(tokens.last(), Some(&Token::Eof));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(tokenize("\"open"), Err(EvalError::Syntax { line: 1, .. })));
        assert!(matches!(tokenize("a\n  b\n c"), Err(EvalError::Syntax { line: 3, .. })));
        assert!(matches!(tokenize("x = 1 ; y"), Err(EvalError::Syntax { .. })));
        assert!(matches!(tokenize("99999999999999999999"), Err(EvalError::Syntax { .. })));
    }
}
