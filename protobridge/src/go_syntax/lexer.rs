//! Tokenizer for Go source files
//!
//! Produces the token stream the declaration parser walks. Comments are dropped, literals are kept
//! as raw text, and Go's automatic semicolon insertion is applied so the parser can rely on `;`
//! terminating every declaration.

use std::path::Path;

use error_stack::Report;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while, take_while1};
use nom::character::complete::{char, one_of};
use nom::combinator::{map, recognize};
use nom::sequence::{delimited, pair};
use nom::{IResult, Parser};

use crate::error::{Error, Result};

/// Keywords that end a statement when they are the last token on a line
const TERMINATING_KEYWORDS: [&str; 4] = ["break", "continue", "fallthrough", "return"];

/// Reserved words that never terminate a line
const KEYWORDS: [&str; 25] = [
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    Int,
    Float,
    Imaginary,
    Rune,
    String,
    RawString,
    Operator,
    Semicolon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub(crate) fn is_keyword(&self) -> bool {
        self.kind == TokenKind::Ident && KEYWORDS.contains(&self.text.as_str())
    }

    /// Whether a newline directly after this token ends the statement
    fn terminates_line(&self) -> bool {
        match self.kind {
            TokenKind::Ident => {
                !self.is_keyword() || TERMINATING_KEYWORDS.contains(&self.text.as_str())
            }
            TokenKind::Int
            | TokenKind::Float
            | TokenKind::Imaginary
            | TokenKind::Rune
            | TokenKind::String
            | TokenKind::RawString => true,
            TokenKind::Operator => matches!(self.text.as_str(), "++" | "--" | ")" | "]" | "}"),
            TokenKind::Semicolon => false,
        }
    }
}

/// One unit consumed by the lexer loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    Newline,
    Space,
    Comment,
    Token(TokenKind),
}

fn is_ident_start(c: char) -> bool { c.is_alphabetic() || c == '_' }

fn is_ident_continue(c: char) -> bool { c.is_alphanumeric() || c == '_' }

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(take_while1(is_ident_start), take_while(is_ident_continue))).parse(input)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("//"), take_while(|c: char| c != '\n'))).parse(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(delimited(tag("/*"), take_until("*/"), tag("*/"))).parse(input)
}

fn raw_string(input: &str) -> IResult<&str, &str> {
    recognize(delimited(char('`'), take_until("`"), char('`'))).parse(input)
}

/// Body of a quoted literal up to (not including) the closing quote; escapes are skipped over
fn quoted_body(quote: char) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input: &str| {
        let mut chars = input.char_indices();
        while let Some((index, c)) = chars.next() {
            match c {
                '\\' => {
                    chars.next();
                }
                '\n' => break,
                c if c == quote => return Ok((&input[index..], &input[..index])),
                _ => {}
            }
        }
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )))
    }
}

fn interpreted_string(input: &str) -> IResult<&str, &str> {
    recognize(delimited(char('"'), quoted_body('"'), char('"'))).parse(input)
}

fn rune_literal(input: &str) -> IResult<&str, &str> {
    recognize(delimited(char('\''), quoted_body('\''), char('\''))).parse(input)
}

/// Go numeric literal in any base, with `_` separators, exponents and an imaginary suffix
fn number_literal(input: &str) -> IResult<&str, (&str, TokenKind)> {
    let starts_number = input.starts_with(|c: char| c.is_ascii_digit())
        || (input.starts_with('.') && input[1..].starts_with(|c: char| c.is_ascii_digit()));
    if !starts_number {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )));
    }

    let hex = input.starts_with("0x") || input.starts_with("0X");
    let bytes = input.as_bytes();
    let mut end = 0;
    let mut kind = TokenKind::Int;
    while end < bytes.len() {
        let c = bytes[end] as char;
        let exponent = if hex { matches!(c, 'p' | 'P') } else { matches!(c, 'e' | 'E') };
        if exponent {
            kind = TokenKind::Float;
            end += 1;
            if end < bytes.len() && matches!(bytes[end], b'+' | b'-') {
                end += 1;
            }
        } else if c == '.' {
            if input[end..].starts_with("...") {
                break;
            }
            kind = TokenKind::Float;
            end += 1;
        } else if c.is_ascii_alphanumeric() || c == '_' {
            end += 1;
        } else {
            break;
        }
    }

    let text = &input[..end];
    if text.ends_with('i') {
        kind = TokenKind::Imaginary;
    }
    Ok((&input[end..], (text, kind)))
}

fn operator(input: &str) -> IResult<&str, &str> {
    alt((
        alt((tag("<<="), tag(">>="), tag("..."), tag("&^="))),
        alt((
            tag("+="),
            tag("&="),
            tag("&&"),
            tag("=="),
            tag("!="),
            tag("-="),
            tag("|="),
            tag("||"),
            tag("<="),
            tag("*="),
            tag("^="),
        )),
        alt((
            tag("<-"),
            tag(">="),
            tag("/="),
            tag("<<"),
            tag("++"),
            tag(":="),
            tag("%="),
            tag(">>"),
            tag("--"),
            tag("&^"),
        )),
        recognize(one_of("+-*/%&|^<>=!()[]{},.:~")),
    ))
    .parse(input)
}

fn lexeme(input: &str) -> IResult<&str, (&str, Lexeme)> {
    alt((
        map(recognize(char('\n')), |text| (text, Lexeme::Newline)),
        map(take_while1(|c: char| matches!(c, ' ' | '\t' | '\r' | '\u{feff}')), |text| {
            (text, Lexeme::Space)
        }),
        map(alt((line_comment, block_comment)), |text| (text, Lexeme::Comment)),
        map(raw_string, |text| (text, Lexeme::Token(TokenKind::RawString))),
        map(interpreted_string, |text| (text, Lexeme::Token(TokenKind::String))),
        map(rune_literal, |text| (text, Lexeme::Token(TokenKind::Rune))),
        map(number_literal, |(text, kind)| (text, Lexeme::Token(kind))),
        map(identifier, |text| (text, Lexeme::Token(TokenKind::Ident))),
        map(recognize(char(';')), |text| (text, Lexeme::Token(TokenKind::Semicolon))),
        map(operator, |text| (text, Lexeme::Token(TokenKind::Operator))),
    ))
    .parse(input)
}

fn insert_semicolon(tokens: &mut Vec<Token>, line: usize) {
    if tokens.last().is_some_and(Token::terminates_line) {
        tokens.push(Token {
            kind: TokenKind::Semicolon,
            text: "\n".to_string(),
            line,
        });
    }
}

/// Split Go source into tokens, applying automatic semicolon insertion
pub(crate) fn tokenize(path: &Path, source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut line = 1;

    while !rest.is_empty() {
        let Ok((remaining, (text, kind))) = lexeme(rest) else {
            let message = match rest.chars().next() {
                Some('"' | '\'') => "unterminated literal".to_string(),
                Some('`') => "unterminated raw string".to_string(),
                Some('/') if rest.starts_with("/*") => "unterminated block comment".to_string(),
                Some(c) => format!("unexpected character {c:?}"),
                None => "unexpected end of input".to_string(),
            };
            return Err(Report::new(Error::parse(path, line, message)));
        };

        match kind {
            Lexeme::Newline => insert_semicolon(&mut tokens, line),
            Lexeme::Comment if text.contains('\n') => insert_semicolon(&mut tokens, line),
            Lexeme::Space | Lexeme::Comment => {}
            Lexeme::Token(token_kind) => tokens.push(Token {
                kind: token_kind,
                text: text.to_string(),
                line,
            }),
        }

        line += text.matches('\n').count();
        rest = remaining;
    }
    insert_semicolon(&mut tokens, line);

    Ok(tokens)
}
