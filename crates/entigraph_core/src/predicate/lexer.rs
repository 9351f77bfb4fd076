//! Lexer for predicate sources using logos.

use crate::error::{CoreError, CoreResult};
use logos::Logos;
use std::ops::Range;

/// Token types for the predicate language.
///
/// Keywords match case-insensitively.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub(crate) enum Token {
    // Comparison operators
    #[token("==")]
    #[token("=")]
    Eq,
    #[token("!=")]
    #[token("<>")]
    Ne,
    #[token("<=")]
    #[token("=<")]
    Le,
    #[token(">=")]
    #[token("=>")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    // Logical operators
    #[token("&&")]
    #[token("and", ignore(ascii_case))]
    And,
    #[token("||")]
    #[token("or", ignore(ascii_case))]
    Or,
    #[token("!")]
    #[token("not", ignore(ascii_case))]
    Not,

    // String operators
    #[token("beginswith", ignore(ascii_case))]
    BeginsWith,
    #[token("endswith", ignore(ascii_case))]
    EndsWith,
    #[token("contains", ignore(ascii_case))]
    Contains,
    #[token("like", ignore(ascii_case))]
    Like,
    #[token("in", ignore(ascii_case))]
    In,

    // Literals
    #[token("true", ignore(ascii_case))]
    #[token("yes", ignore(ascii_case))]
    True,
    #[token("false", ignore(ascii_case))]
    #[token("no", ignore(ascii_case))]
    False,
    #[token("nil", ignore(ascii_case))]
    #[token("null", ignore(ascii_case))]
    Null,
    #[token("truepredicate", ignore(ascii_case))]
    TruePredicate,
    #[token("falsepredicate", ignore(ascii_case))]
    FalsePredicate,

    // Positional argument
    #[token("%@")]
    Placeholder,

    // Option flags such as `[c]`
    #[regex(r"\[[a-zA-Z]*\]", |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_ascii_lowercase()
    })]
    Modifier(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len() - 1])
    })]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len() - 1])
    })]
    String(String),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    // Punctuation
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
}

fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some(other) => result.push(other),
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// A token with its byte range in the source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SpannedToken {
    pub(crate) token: Token,
    pub(crate) span: Range<usize>,
}

/// Splits `source` into tokens.
///
/// Unlike a lenient lexer, an unrecognized character is an error: predicates
/// are short and a skipped character would silently change their meaning.
pub(crate) fn tokenize(source: &str) -> CoreResult<Vec<SpannedToken>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(SpannedToken { token, span }),
            Err(()) => {
                return Err(CoreError::invalid_predicate(
                    span.start,
                    format!("unexpected input {:?}", lexer.slice()),
                ));
            }
        }
    }
    Ok(tokens)
}
