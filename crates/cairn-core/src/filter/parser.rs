//! Textual query language
//!
//! ```text
//! query    := or
//! or       := and ("or" and)*
//! and      := not ("and" not)*
//! not      := "not" not | compare
//! compare  := operand (op operand)?
//! operand  := "(" or ")" | @attribute | literal
//! literal  := number | "quoted" | bare-word | @@word | true | false | now
//! op       := ["~"] ("=" | "==" | "!=" | "<>" | "<" | "<=" | ">" | ">=" | "$")
//!
//! order-by := @attribute ["asc" | "desc"] ("," @attribute ["asc" | "desc"])*
//! ```
//!
//! Problems do not stop the parse: each one is recorded and parsing resumes
//! at the next token, so a single Parser error reports all of them.

use super::ast::{Expr, Literal};
use super::factory::ExpressionFactory;
use super::lexer::{tokenize, Spanned, Token};
use crate::adapter::SortKey;
use crate::errors::{RepoError, RepoErrorKind, Result};
use crate::tuple::Tuple;

struct Parser<'a, T: Tuple> {
    factory: &'a ExpressionFactory<T>,
    tokens: Vec<Spanned>,
    pos: usize,
    diagnostics: Vec<String>,
}

/// Parse `text` into a Boolean filter over `T`
///
/// # Errors
///
/// Returns a Parser error carrying every diagnostic recorded while parsing,
/// including type errors reported by the factory.
///
/// ```
/// use cairn_core::filter::{parse_filter, ExpressionFactory};
/// use cairn_core::model::Version;
///
/// let factory = ExpressionFactory::<Version>::new().unwrap();
/// let expr = parse_filter(&factory, "@versioncount > 1 and not @missing").unwrap();
/// assert!(expr.is_boolean());
/// ```
pub fn parse_filter<T: Tuple>(factory: &ExpressionFactory<T>, text: &str) -> Result<Expr<T>> {
    let mut parser = Parser::new(factory, text);
    if parser.tokens.is_empty() && parser.diagnostics.is_empty() {
        parser.diagnostics.push("query is empty".to_string());
    }

    let mut expr = parser.parse_or();
    while let Some(extra) = parser.peek().cloned() {
        parser.record_at(&extra, format!("unexpected {}", extra.token.describe()));
        parser.pos += 1;
        expr = None;
    }

    if let Some(e) = &expr {
        if !e.is_boolean() {
            parser
                .diagnostics
                .push(format!("query evaluates to {}, not Boolean", e.value_type()));
        }
    }

    parser.finish("parse_filter", text)?;
    expr.ok_or_else(|| {
        RepoError::new(RepoErrorKind::Parser)
            .with_op("parse_filter")
            .with_message(format!("could not parse '{}'", text))
    })
}

/// Parse comma-separated `@attr [asc|desc]` terms
///
/// # Errors
///
/// Returns a Parser error listing every malformed term or unknown
/// attribute.
pub fn parse_order_by<T: Tuple>(factory: &ExpressionFactory<T>, text: &str) -> Result<Vec<SortKey>> {
    let mut parser = Parser::new(factory, text);
    let mut keys = Vec::new();

    while parser.peek().is_some() {
        match parser.next() {
            Some(Spanned {
                token: Token::Attribute(name),
                column,
            }) => {
                match factory.schema().attribute(&name) {
                    Some(attr) => {
                        let descending = match parser.peek().map(|s| &s.token) {
                            Some(Token::Word(w)) if w.eq_ignore_ascii_case("desc") => {
                                parser.pos += 1;
                                true
                            }
                            Some(Token::Word(w)) if w.eq_ignore_ascii_case("asc") => {
                                parser.pos += 1;
                                false
                            }
                            _ => false,
                        };
                        keys.push(SortKey {
                            attribute: attr.name.to_string(),
                            descending,
                        });
                    }
                    None => parser.diagnostics.push(format!(
                        "column {}: {} has no attribute '{}'",
                        column,
                        factory.schema().entity(),
                        name
                    )),
                }
            }
            Some(other) => {
                parser.record_at(&other, format!("expected an attribute, found {}", other.token.describe()));
            }
            None => break,
        }

        match parser.next() {
            None => {}
            Some(Spanned {
                token: Token::Comma,
                ..
            }) => {
                if parser.peek().is_none() {
                    parser.diagnostics.push("trailing ','".to_string());
                }
            }
            Some(other) => {
                parser.record_at(&other, format!("expected ',', found {}", other.token.describe()));
            }
        }
    }

    parser.finish("parse_order_by", text)?;
    Ok(keys)
}

impl<'a, T: Tuple> Parser<'a, T> {
    fn new(factory: &'a ExpressionFactory<T>, text: &str) -> Self {
        let mut diagnostics = Vec::new();
        let tokens = tokenize(text, &mut diagnostics);
        Self {
            factory,
            tokens,
            pos: 0,
            diagnostics,
        }
    }

    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek().map(|s| &s.token) == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn record_at(&mut self, at: &Spanned, message: String) {
        self.diagnostics
            .push(format!("column {}: {}", at.column, message));
    }

    /// Record a factory rejection at `column`
    fn check(&mut self, column: usize, built: Result<Expr<T>>) -> Option<Expr<T>> {
        match built {
            Ok(expr) => Some(expr),
            Err(err) => {
                self.diagnostics
                    .push(format!("column {}: {}", column, err.message()));
                None
            }
        }
    }

    fn column(&self) -> usize {
        self.peek()
            .map(|s| s.column)
            .or_else(|| self.tokens.last().map(|s| s.column))
            .unwrap_or(1)
    }

    fn finish(self, op: &str, text: &str) -> Result<()> {
        if self.diagnostics.is_empty() {
            return Ok(());
        }
        Err(RepoError::new(RepoErrorKind::Parser)
            .with_op(op)
            .with_message(format!(
                "{} problem(s) in '{}'",
                self.diagnostics.len(),
                text
            ))
            .with_diagnostics(self.diagnostics))
    }

    fn parse_or(&mut self) -> Option<Expr<T>> {
        self.parse_connective(Token::Or, Self::parse_and)
    }

    fn parse_and(&mut self) -> Option<Expr<T>> {
        self.parse_connective(Token::And, Self::parse_not)
    }

    fn parse_connective(
        &mut self,
        word: Token,
        operand: fn(&mut Self) -> Option<Expr<T>>,
    ) -> Option<Expr<T>> {
        let column = self.column();
        let first = operand(self);
        if self.peek().map(|s| &s.token) != Some(&word) {
            return first;
        }

        let mut operands = vec![first];
        while self.eat(&word) {
            operands.push(operand(self));
        }
        let operands: Option<Vec<_>> = operands.into_iter().collect();
        let operands = operands?;
        let built = if word == Token::And {
            self.factory.and(operands)
        } else {
            self.factory.or(operands)
        };
        self.check(column, built)
    }

    fn parse_not(&mut self) -> Option<Expr<T>> {
        let column = self.column();
        if self.eat(&Token::Not) {
            let inner = self.parse_not()?;
            let built = self.factory.not(inner);
            return self.check(column, built);
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Option<Expr<T>> {
        let left = self.parse_operand();
        let (op, case_insensitive, column) = match self.peek() {
            Some(Spanned {
                token: Token::Op {
                    op,
                    case_insensitive,
                },
                column,
            }) => (*op, *case_insensitive, *column),
            _ => return left,
        };
        self.pos += 1;
        let right = self.parse_operand();

        let (left, right) = (left?, right?);
        let built = if case_insensitive {
            self.factory.compare_ignore_case(op, left, right)
        } else {
            self.factory.compare(op, left, right)
        };
        self.check(column, built)
    }

    fn parse_operand(&mut self) -> Option<Expr<T>> {
        let Some(spanned) = self.next() else {
            self.diagnostics.push(format!(
                "column {}: query ends where an operand was expected",
                self.column()
            ));
            return None;
        };

        match spanned.token {
            Token::LParen => {
                let inner = self.parse_or();
                if !self.eat(&Token::RParen) {
                    let at = self.column();
                    self.diagnostics.push(format!(
                        "column {}: missing ')' for '(' at column {}",
                        at, spanned.column
                    ));
                    return None;
                }
                inner
            }
            Token::Attribute(name) => {
                let built = self.factory.attribute(&name);
                self.check(spanned.column, built)
            }
            Token::Number(text) => self.number(&text, spanned.column),
            Token::Quoted(text) | Token::Word(text) => Some(self.factory.string(text)),
            Token::True => Some(self.factory.boolean(true)),
            Token::False => Some(self.factory.boolean(false)),
            Token::Now => Some(self.factory.now()),
            other => {
                self.diagnostics.push(format!(
                    "column {}: expected an operand, found {}",
                    spanned.column,
                    other.describe()
                ));
                None
            }
        }
    }

    fn number(&mut self, text: &str, column: usize) -> Option<Expr<T>> {
        if let Ok(v) = text.parse::<i64>() {
            return Some(match i32::try_from(v) {
                Ok(small) => self.factory.integer(small),
                Err(_) => self.factory.long(v),
            });
        }
        match text.parse::<f64>() {
            Ok(v) => Some(self.factory.literal(Literal::Double(v))),
            Err(_) => {
                self.diagnostics
                    .push(format!("column {}: '{}' is not a number", column, text));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ExprKind;
    use crate::model::{Tag, Version};

    fn factory() -> ExpressionFactory<Version> {
        ExpressionFactory::new().unwrap()
    }

    #[test]
    fn test_precedence() {
        let f = factory();
        let e = parse_filter(&f, "@missing or @corrupt and not @unhealthy").unwrap();
        assert_eq!(e.to_string(), "(@missing or (@corrupt and (not @unhealthy)))");
    }

    #[test]
    fn test_parentheses_and_flat_connectives() {
        let f = factory();
        let e = parse_filter(&f, "(@length > 10 or @length < 2) and @title ~$ 'Draft' and @inode != 0")
            .unwrap();
        match e.kind() {
            ExprKind::And(items) => assert_eq!(items.len(), 3),
            other => panic!("expected and, got {:?}", other),
        }
    }

    #[test]
    fn test_date_literals_promote() {
        let f = factory();
        let e = parse_filter(&f, "@imported >= \"2024-01-05 10:00 UTC\" and @lastseen < now").unwrap();
        assert!(e.is_boolean());
        assert!(parse_filter(&f, "@imported >= Comedy").is_err());
    }

    #[test]
    fn test_escaped_at_is_literal() {
        let f: ExpressionFactory<Tag> = ExpressionFactory::new().unwrap();
        let e = parse_filter(&f, "@description = @@home").unwrap();
        assert_eq!(e.to_string(), "(@description = \"@home\")");
    }

    #[test]
    fn test_diagnostics_accumulate() {
        let f = factory();
        let err = parse_filter(&f, "@nosuch = 1 and @title > 5 and @length = ").unwrap_err();
        assert_eq!(err.kind(), RepoErrorKind::Parser);
        assert_eq!(err.diagnostics().len(), 3, "{:?}", err.diagnostics());
        assert!(err.diagnostics()[0].contains("nosuch"));
    }

    #[test]
    fn test_non_boolean_query_rejected() {
        let f = factory();
        let err = parse_filter(&f, "@length").unwrap_err();
        assert!(err.diagnostics()[0].contains("not Boolean"));
        assert!(parse_filter(&f, "").is_err());
        assert!(parse_filter(&f, "@missing )").is_err());
    }

    #[test]
    fn test_order_by() {
        let f = factory();
        let keys = parse_order_by(&f, "@IMPORTED desc, @title").unwrap();
        assert_eq!(keys, vec![SortKey::desc("imported"), SortKey::asc("title")]);
        assert!(parse_order_by(&f, "").unwrap().is_empty());
        let err = parse_order_by(&f, "@colour, title,").unwrap_err();
        assert_eq!(err.diagnostics().len(), 3, "{:?}", err.diagnostics());
    }
}
