//! Recursive-descent parser over the token stream.

use crate::ast::{Expr, Field, Op};
use crate::error::{ParseError, ParseErrorKind};
use crate::lex::{tokenize, Token, TokenKind};

/// Nesting limit for parentheses and `not`. Rulesets come from web forms.
pub(crate) const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

/// Parse ruleset source into a canonical expression.
pub(crate) fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ParseError::at(source, 0, ParseErrorKind::Empty));
    }

    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;

    if let Some(tok) = parser.peek() {
        let (offset, found) = (tok.offset, tok.kind.describe());
        return Err(parser.error_at(offset, ParseErrorKind::Trailing(found)));
    }
    Ok(expr)
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn error_at(&self, offset: usize, kind: ParseErrorKind) -> ParseError {
        ParseError::at(self.source, offset, kind)
    }

    /// Error for a missing/unexpected token at the current position.
    fn expected(&self, expected: &'static str) -> ParseError {
        match self.peek() {
            Some(tok) => self.error_at(
                tok.offset,
                ParseErrorKind::Expected {
                    expected,
                    found: tok.kind.describe(),
                },
            ),
            None => self.error_at(
                self.source.len(),
                ParseErrorKind::Expected {
                    expected,
                    found: "end of input".to_string(),
                },
            ),
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(
            self.peek(),
            Some(Token { kind: TokenKind::Word(w), .. }) if w.eq_ignore_ascii_case(keyword)
        )
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut children = vec![self.term()?];
        while self.at_keyword("or") {
            self.advance();
            children.push(self.term()?);
        }
        Ok(Expr::or(children))
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut children = vec![self.factor()?];
        while self.at_keyword("and") {
            self.advance();
            children.push(self.factor()?);
        }
        Ok(Expr::and(children))
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        let Some(tok) = self.peek().cloned() else {
            return Err(self.expected("a rule"));
        };

        match &tok.kind {
            TokenKind::LParen => {
                self.advance();
                self.nested(&tok, |p| {
                    let inner = p.expr()?;
                    match p.peek() {
                        Some(Token {
                            kind: TokenKind::RParen,
                            ..
                        }) => {
                            p.advance();
                            Ok(inner)
                        }
                        _ => Err(p.expected("')'")),
                    }
                })
            }
            TokenKind::Word(w) if w.eq_ignore_ascii_case("not") => {
                self.advance();
                self.nested(&tok, |p| p.factor().map(Expr::not))
            }
            TokenKind::Word(w) if w.eq_ignore_ascii_case("all") => {
                self.advance();
                Ok(Expr::All)
            }
            TokenKind::Word(w) if w.eq_ignore_ascii_case("none") => {
                self.advance();
                Ok(Expr::None)
            }
            TokenKind::Word(w) if w.eq_ignore_ascii_case("and") || w.eq_ignore_ascii_case("or") => {
                Err(self.expected("a rule"))
            }
            TokenKind::Word(w) => {
                let field = Field::from_name(w).ok_or_else(|| {
                    self.error_at(tok.offset, ParseErrorKind::UnknownField(w.clone()))
                })?;
                self.advance();
                self.predicate(field)
            }
            TokenKind::RParen | TokenKind::Str(_) => Err(self.expected("a rule")),
        }
    }

    fn predicate(&mut self, field: Field) -> Result<Expr, ParseError> {
        let op = match self.peek().cloned() {
            Some(Token {
                kind: TokenKind::Word(w),
                offset,
            }) => {
                let op = Op::from_name(&w)
                    .ok_or_else(|| self.error_at(offset, ParseErrorKind::UnknownOperator(w)))?;
                self.advance();
                op
            }
            _ => return Err(self.expected("an operator")),
        };

        match self.peek().cloned() {
            Some(Token {
                kind: TokenKind::Str(value),
                ..
            }) => {
                self.advance();
                Ok(Expr::predicate(field, op, value))
            }
            _ => Err(self.expected("a quoted string")),
        }
    }

    /// Run `f` one nesting level deeper, enforcing [`MAX_DEPTH`].
    fn nested<F>(&mut self, opener: &Token, f: F) -> Result<Expr, ParseError>
    where
        F: FnOnce(&mut Self) -> Result<Expr, ParseError>,
    {
        if self.depth >= MAX_DEPTH {
            return Err(self.error_at(opener.offset, ParseErrorKind::TooDeep(MAX_DEPTH)));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(src: &str) -> Expr {
        parse(src).unwrap()
    }

    fn kind(src: &str) -> ParseErrorKind {
        parse(src).unwrap_err().kind
    }

    #[test]
    fn test_precedence() {
        let a = Expr::predicate(Field::Project, Op::Is, "a");
        let b = Expr::predicate(Field::Project, Op::Is, "b");
        let c = Expr::predicate(Field::Branch, Op::Is, "c");
        assert_eq!(
            p(r#"project is "a" or project is "b" and branch is "c""#),
            Expr::Or(vec![a.clone(), Expr::And(vec![b.clone(), c.clone()])])
        );
        assert_eq!(
            p(r#"not project is "a" and branch is "c""#),
            Expr::And(vec![Expr::not(a), c])
        );
    }

    #[test]
    fn test_parentheses_flatten_same_operator() {
        assert_eq!(
            p("all or (none or (all))"),
            Expr::Or(vec![Expr::All, Expr::None, Expr::All])
        );
        assert_eq!(p("((all))"), Expr::All);
    }

    #[test]
    fn test_keywords_ignore_case() {
        assert_eq!(
            p(r#"NOT Author MATCHES "bot*""#),
            Expr::not(Expr::predicate(Field::Author, Op::Matches, "bot*"))
        );
    }

    #[test]
    fn test_empty_and_comment_only() {
        assert_eq!(kind(""), ParseErrorKind::Empty);
        assert_eq!(kind("  \n # nothing here\n"), ParseErrorKind::Empty);
    }

    #[test]
    fn test_unknown_field_and_operator() {
        assert_eq!(
            kind(r#"committer is "bob""#),
            ParseErrorKind::UnknownField("committer".to_string())
        );
        assert_eq!(
            kind(r#"author equals "bob""#),
            ParseErrorKind::UnknownOperator("equals".to_string())
        );
    }

    #[test]
    fn test_missing_pieces() {
        assert!(matches!(
            kind("project is"),
            ParseErrorKind::Expected { expected: "a quoted string", ref found } if found == "end of input"
        ));
        assert!(matches!(
            kind("(all"),
            ParseErrorKind::Expected { expected: "')'", .. }
        ));
        assert!(matches!(
            kind("all and"),
            ParseErrorKind::Expected { expected: "a rule", .. }
        ));
        assert!(matches!(
            kind("or all"),
            ParseErrorKind::Expected { expected: "a rule", .. }
        ));
    }

    #[test]
    fn test_trailing_input() {
        let err = parse(r#"all "extra""#).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::Trailing("string \"extra\"".to_string())
        );
        assert_eq!(err.offset, 4);
        assert_eq!(kind("all )"), ParseErrorKind::Trailing("')'".to_string()));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}all{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(kind(&deep), ParseErrorKind::TooDeep(MAX_DEPTH));

        let ok = format!("{}all{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(p(&ok), Expr::All);

        let nots = format!("{}all", "not ".repeat(MAX_DEPTH + 1));
        assert_eq!(kind(&nots), ParseErrorKind::TooDeep(MAX_DEPTH));
    }
}
