//! Recursive-descent parser for predicate sources.
//!
//! ```text
//! or         := and (OR and)*
//! and        := unary (AND unary)*
//! unary      := NOT unary | primary
//! primary    := '(' or ')' | TRUEPREDICATE | FALSEPREDICATE | comparison
//! comparison := ident op modifier? operand
//! operand    := literal | %@ | '{' operand (',' operand)* '}'
//! ```

use super::ast::{CompareOp, Predicate, TextOp};
use super::lexer::{tokenize, SpannedToken, Token};
use crate::error::{CoreError, CoreResult};
use crate::value::Value;

enum Operator {
    Compare(CompareOp),
    Text(TextOp),
    In,
}

pub(crate) struct Parser<'a> {
    tokens: Vec<SpannedToken>,
    pos: usize,
    end: usize,
    args: &'a [Value],
    next_arg: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &str, args: &'a [Value]) -> CoreResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            end: source.len(),
            args,
            next_arg: 0,
        })
    }

    pub(crate) fn parse(mut self) -> CoreResult<Predicate> {
        if self.tokens.is_empty() {
            return Err(CoreError::invalid_predicate(0, "empty predicate"));
        }
        let predicate = self.parse_or()?;
        if let Some(extra) = self.tokens.get(self.pos) {
            return Err(CoreError::invalid_predicate(
                extra.span.start,
                format!("unexpected {:?}", extra.token),
            ));
        }
        if self.next_arg != self.args.len() {
            return Err(CoreError::invalid_predicate(
                self.end,
                format!(
                    "{} argument(s) supplied for {} placeholder(s)",
                    self.args.len(),
                    self.next_arg
                ),
            ));
        }
        Ok(predicate)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |t| t.span.start)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> CoreResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn error(&self, message: impl Into<String>) -> CoreError {
        CoreError::invalid_predicate(self.position(), message)
    }

    fn parse_or(&mut self) -> CoreResult<Predicate> {
        let mut terms = vec![self.parse_and()?];
        while self.eat(&Token::Or) {
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Predicate::Or(terms)
        })
    }

    fn parse_and(&mut self) -> CoreResult<Predicate> {
        let mut terms = vec![self.parse_unary()?];
        while self.eat(&Token::And) {
            terms.push(self.parse_unary()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Predicate::And(terms)
        })
    }

    fn parse_unary(&mut self) -> CoreResult<Predicate> {
        if self.eat(&Token::Not) {
            return Ok(self.parse_unary()?.negate());
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> CoreResult<Predicate> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::TruePredicate) => {
                self.pos += 1;
                Ok(Predicate::Constant(true))
            }
            Some(Token::FalsePredicate) => {
                self.pos += 1;
                Ok(Predicate::Constant(false))
            }
            Some(Token::Ident(_)) => self.parse_comparison(),
            Some(other) => Err(self.error(format!("unexpected {other:?}"))),
            None => Err(self.error("unexpected end of predicate")),
        }
    }

    fn parse_comparison(&mut self) -> CoreResult<Predicate> {
        let Some(Token::Ident(key)) = self.advance() else {
            return Err(self.error("expected attribute name"));
        };

        let operator = match self.advance() {
            Some(Token::Eq) => Operator::Compare(CompareOp::Eq),
            Some(Token::Ne) => Operator::Compare(CompareOp::Ne),
            Some(Token::Lt) => Operator::Compare(CompareOp::Lt),
            Some(Token::Le) => Operator::Compare(CompareOp::Le),
            Some(Token::Gt) => Operator::Compare(CompareOp::Gt),
            Some(Token::Ge) => Operator::Compare(CompareOp::Ge),
            Some(Token::BeginsWith) => Operator::Text(TextOp::BeginsWith),
            Some(Token::EndsWith) => Operator::Text(TextOp::EndsWith),
            Some(Token::Contains) => Operator::Text(TextOp::Contains),
            Some(Token::Like) => Operator::Text(TextOp::Like),
            Some(Token::In) => Operator::In,
            _ => {
                self.pos = self.pos.saturating_sub(1);
                return Err(self.error(format!("expected operator after {key}")));
            }
        };

        let case_insensitive = self.parse_modifier()?;

        match operator {
            Operator::Compare(op) => {
                if case_insensitive && !matches!(op, CompareOp::Eq | CompareOp::Ne) {
                    return Err(self.error("[c] applies only to ==, != and string operators"));
                }
                let value = self.parse_operand()?;
                Ok(Predicate::Compare {
                    key,
                    op,
                    value,
                    case_insensitive,
                })
            }
            Operator::Text(op) => {
                let position = self.position();
                let pattern = Predicate::text_operand(position, self.parse_operand()?)?;
                Ok(Predicate::Text {
                    key,
                    op,
                    pattern,
                    case_insensitive,
                })
            }
            Operator::In => {
                self.expect(&Token::LBrace, "'{' after IN")?;
                let mut values = vec![self.parse_operand()?];
                while self.eat(&Token::Comma) {
                    values.push(self.parse_operand()?);
                }
                self.expect(&Token::RBrace, "'}'")?;
                Ok(Predicate::In {
                    key,
                    values,
                    case_insensitive,
                })
            }
        }
    }

    fn parse_modifier(&mut self) -> CoreResult<bool> {
        let Some(Token::Modifier(flags)) = self.peek() else {
            return Ok(false);
        };
        if flags != "c" {
            return Err(self.error(format!("unsupported modifier [{flags}]")));
        }
        self.pos += 1;
        Ok(true)
    }

    fn parse_operand(&mut self) -> CoreResult<Value> {
        let position = self.position();
        match self.advance() {
            Some(Token::Int(n)) => Ok(Value::Integer(n)),
            Some(Token::Float(x)) => Ok(Value::Float(x)),
            Some(Token::String(s)) => Ok(Value::Text(s)),
            Some(Token::True) => Ok(Value::Bool(true)),
            Some(Token::False) => Ok(Value::Bool(false)),
            Some(Token::Null) => Ok(Value::Null),
            Some(Token::Placeholder) => {
                let value = self.args.get(self.next_arg).cloned().ok_or_else(|| {
                    CoreError::invalid_predicate(
                        position,
                        format!("placeholder {} has no argument", self.next_arg + 1),
                    )
                })?;
                self.next_arg += 1;
                Ok(value)
            }
            Some(other) => Err(CoreError::invalid_predicate(
                position,
                format!("expected a value, found {other:?}"),
            )),
            None => Err(CoreError::invalid_predicate(position, "expected a value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Predicate {
        Predicate::parse(source, &[]).unwrap()
    }

    fn parse_err(source: &str, args: &[Value]) -> usize {
        match Predicate::parse(source, args) {
            Err(CoreError::InvalidPredicate { position, .. }) => position,
            other => panic!("expected InvalidPredicate, got {other:?}"),
        }
    }

    #[test]
    fn simple_comparison() {
        assert_eq!(parse("age < 30"), Predicate::compare("age", CompareOp::Lt, 30));
        assert_eq!(parse("name = 'Ahmed'"), Predicate::eq("name", "Ahmed"));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let p = parse("a == 1 OR b == 2 AND c == 3");
        assert_eq!(
            p,
            Predicate::Or(vec![
                Predicate::eq("a", 1),
                Predicate::And(vec![Predicate::eq("b", 2), Predicate::eq("c", 3)]),
            ])
        );
    }

    #[test]
    fn parentheses_and_not() {
        let p = parse("!(a == 1 || b == 2)");
        assert_eq!(
            p,
            Predicate::Not(Box::new(Predicate::Or(vec![
                Predicate::eq("a", 1),
                Predicate::eq("b", 2),
            ])))
        );
    }

    #[test]
    fn string_operators_with_modifier() {
        assert_eq!(
            parse("name BEGINSWITH[c] 'ah'"),
            Predicate::Text {
                key: "name".into(),
                op: TextOp::BeginsWith,
                pattern: "ah".into(),
                case_insensitive: true,
            }
        );
        assert!(matches!(
            parse("name like 'A*'"),
            Predicate::Text { op: TextOp::Like, .. }
        ));
    }

    #[test]
    fn in_list() {
        assert_eq!(
            parse("age IN {19, 29}"),
            Predicate::In {
                key: "age".into(),
                values: vec![Value::Integer(19), Value::Integer(29)],
                case_insensitive: false,
            }
        );
    }

    #[test]
    fn literal_keywords() {
        assert_eq!(parse("active == YES"), Predicate::eq("active", true));
        assert_eq!(parse("active == no"), Predicate::eq("active", false));
        assert_eq!(parse("email == nil"), Predicate::eq("email", Value::Null));
        assert_eq!(parse("TRUEPREDICATE"), Predicate::Constant(true));
        assert_eq!(parse("falsepredicate"), Predicate::Constant(false));
    }

    #[test]
    fn placeholders_bind_left_to_right() {
        let p = Predicate::parse(
            "name == %@ AND age IN {%@, 3}",
            &[Value::from("Ahmed"), Value::from(29)],
        )
        .unwrap();
        assert_eq!(
            p,
            Predicate::And(vec![
                Predicate::eq("name", "Ahmed"),
                Predicate::In {
                    key: "age".into(),
                    values: vec![Value::Integer(29), Value::Integer(3)],
                    case_insensitive: false,
                },
            ])
        );
    }

    #[test]
    fn argument_count_mismatch() {
        parse_err("name == %@", &[]);
        parse_err("name == 'x'", &[Value::from(1)]);
        parse_err("a == %@ AND b == %@", &[Value::from(1)]);
    }

    #[test]
    fn malformed_sources() {
        assert_eq!(parse_err("", &[]), 0);
        assert_eq!(parse_err("age <", &[]), 5);
        assert_eq!(parse_err("age 30", &[]), 4);
        parse_err("(age < 30", &[]);
        parse_err("age < 30)", &[]);
        parse_err("AND age < 30", &[]);
        parse_err("age IN 3", &[]);
    }

    #[test]
    fn string_operator_needs_text() {
        parse_err("name CONTAINS 3", &[]);
        parse_err("name CONTAINS %@", &[Value::from(3)]);
    }

    #[test]
    fn modifier_rules() {
        parse_err("age <[c] 3", &[]);
        parse_err("name ==[d] 'x'", &[]);
        assert!(matches!(
            parse("name ==[c] 'x'"),
            Predicate::Compare { case_insensitive: true, .. }
        ));
    }
}
