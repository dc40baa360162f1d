//! Nom-based tokenizer for ruleset source.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace1, not_line_ending, one_of},
    combinator::{map, recognize},
    error::{Error, ErrorKind},
    multi::many0_count,
    sequence::{pair, preceded},
    IResult,
};

use crate::error::{ParseError, ParseErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    LParen,
    RParen,
    Word(String),
    Str(String),
}

impl TokenKind {
    /// Human-readable description for error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::Word(w) => format!("'{}'", w),
            TokenKind::Str(s) => format!("string \"{}\"", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whitespace and `#` comments.
fn trivia(input: &str) -> IResult<&str, usize> {
    many0_count(alt((
        multispace1,
        recognize(pair(char('#'), not_line_ending)),
    )))(input)
}

fn word(input: &str) -> IResult<&str, TokenKind> {
    map(take_while1(is_word_char), |w: &str| {
        TokenKind::Word(w.to_string())
    })(input)
}

fn paren(input: &str) -> IResult<&str, TokenKind> {
    alt((
        map(char('('), |_| TokenKind::LParen),
        map(char(')'), |_| TokenKind::RParen),
    ))(input)
}

/// A double-quoted literal with `\"` and `\\` escapes.
///
/// Once the opening quote is consumed every failure is fatal: `Eof` for a
/// missing closing quote, `OneOf` for a bad escape.
fn string_literal(input: &str) -> IResult<&str, TokenKind> {
    let (mut rest, _) = char::<&str, Error<&str>>('"')(input)?;
    let mut out = String::new();
    loop {
        let (r, chunk) = take_while::<_, &str, Error<&str>>(|c| c != '"' && c != '\\')(rest)?;
        out.push_str(chunk);
        rest = r;
        match rest.chars().next() {
            Some('"') => return Ok((&rest[1..], TokenKind::Str(out))),
            Some(_) => {
                let escape: IResult<&str, char> = preceded(char('\\'), one_of("\"\\"))(rest);
                let (r, escaped) =
                    escape.map_err(|_| nom::Err::Failure(Error::new(rest, ErrorKind::OneOf)))?;
                out.push(escaped);
                rest = r;
            }
            None => return Err(nom::Err::Failure(Error::new(rest, ErrorKind::Eof))),
        }
    }
}

fn token(input: &str) -> IResult<&str, TokenKind> {
    alt((paren, string_literal, word))(input)
}

/// Split ruleset source into tokens.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let offset_of = |rest: &str| source.len() - rest.len();
    let mut tokens = Vec::new();
    let mut input = source;

    loop {
        // trivia never fails: many0_count accepts zero matches.
        if let Ok((rest, _)) = trivia(input) {
            input = rest;
        }
        if input.is_empty() {
            return Ok(tokens);
        }

        let start = offset_of(input);
        match token(input) {
            Ok((rest, kind)) => {
                tokens.push(Token {
                    kind,
                    offset: start,
                });
                input = rest;
            }
            Err(nom::Err::Failure(e)) => {
                let kind = match e.code {
                    ErrorKind::Eof => ParseErrorKind::UnterminatedString,
                    _ => ParseErrorKind::InvalidEscape,
                };
                let offset = match kind {
                    ParseErrorKind::UnterminatedString => start,
                    _ => offset_of(e.input),
                };
                return Err(ParseError::at(source, offset, kind));
            }
            Err(_) => {
                let c = input.chars().next().unwrap_or('\0');
                return Err(ParseError::at(
                    source,
                    start,
                    ParseErrorKind::UnexpectedChar(c),
                ));
            }
        }
    }
}
