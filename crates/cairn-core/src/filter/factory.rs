use super::ast::{CompareOp, Expr, ExprKind, Literal};
use super::error::FilterError;
use crate::datetime::DateParser;
use crate::errors::Result;
use crate::tuple::{AttrType, Tuple, TupleSchema};
use chrono::{DateTime, Utc};

/// The only way to build filter trees over `T`
///
/// Every constructor type-checks its operands:
/// - Integer, Long and Double compare with each other
/// - an Instant compares with a String literal that parses as a date,
///   which is promoted to an Instant
/// - `$` and case-insensitive comparisons need String on both sides
/// - Boolean operands allow only `=` and `!=`
/// - and/or need at least two Boolean operands, not needs one
pub struct ExpressionFactory<T: Tuple> {
    schema: &'static TupleSchema<T>,
    dates: DateParser,
}

impl<T: Tuple> ExpressionFactory<T> {
    /// # Errors
    ///
    /// Returns a Configuration error if `T`'s descriptor is malformed.
    pub fn new() -> Result<Self> {
        Ok(Self {
            schema: T::schema()?,
            dates: DateParser::new(),
        })
    }

    /// Use `dates` when probing String literals against Instant operands
    pub fn with_date_parser(mut self, dates: DateParser) -> Self {
        self.dates = dates;
        self
    }

    pub fn schema(&self) -> &'static TupleSchema<T> {
        self.schema
    }

    /// Attribute reference, matched case-insensitively
    ///
    /// # Errors
    ///
    /// Returns an Expression error for an attribute `T` does not have.
    pub fn attribute(&self, name: &str) -> Result<Expr<T>> {
        let attr = self
            .schema
            .attribute(name)
            .ok_or_else(|| FilterError::UnknownAttribute {
                entity: self.schema.entity(),
                name: name.to_string(),
            })?;
        Ok(Expr::new(
            ExprKind::Attribute {
                name: attr.name,
                ty: attr.ty,
            },
            attr.ty,
        ))
    }

    pub fn literal(&self, value: Literal) -> Expr<T> {
        let ty = value.attr_type();
        Expr::new(ExprKind::Literal(value), ty)
    }

    pub fn integer(&self, value: i32) -> Expr<T> {
        self.literal(Literal::Integer(value))
    }

    pub fn long(&self, value: i64) -> Expr<T> {
        self.literal(Literal::Long(value))
    }

    pub fn double(&self, value: f64) -> Expr<T> {
        self.literal(Literal::Double(value))
    }

    pub fn string(&self, value: impl Into<String>) -> Expr<T> {
        self.literal(Literal::String(value.into()))
    }

    pub fn boolean(&self, value: bool) -> Expr<T> {
        self.literal(Literal::Boolean(value))
    }

    pub fn instant(&self, value: DateTime<Utc>) -> Expr<T> {
        self.literal(Literal::Instant(value))
    }

    /// `now`, resolved when the tree is compiled
    pub fn now(&self) -> Expr<T> {
        self.literal(Literal::DateText("now".to_string()))
    }

    /// Case-sensitive comparison
    ///
    /// # Errors
    ///
    /// Returns an Expression error when the operand types do not fit `op`.
    pub fn compare(&self, op: CompareOp, left: Expr<T>, right: Expr<T>) -> Result<Expr<T>> {
        self.build_comparison(op, false, left, right)
    }

    /// Case-insensitive comparison (`~=`, `~$`, ...)
    ///
    /// # Errors
    ///
    /// Returns an Expression error unless both operands are String.
    pub fn compare_ignore_case(
        &self,
        op: CompareOp,
        left: Expr<T>,
        right: Expr<T>,
    ) -> Result<Expr<T>> {
        self.build_comparison(op, true, left, right)
    }

    /// `@attribute = value` shorthand
    ///
    /// # Errors
    ///
    /// Returns an Expression error for an unknown attribute or mismatched
    /// types.
    pub fn attr_eq(&self, attribute: &str, value: Expr<T>) -> Result<Expr<T>> {
        self.compare(CompareOp::Eq, self.attribute(attribute)?, value)
    }

    /// # Errors
    ///
    /// Returns an Expression error unless there are at least two Boolean
    /// operands.
    pub fn and(&self, operands: Vec<Expr<T>>) -> Result<Expr<T>> {
        check_connective("and", &operands)?;
        Ok(Expr::new(ExprKind::And(operands), AttrType::Boolean))
    }

    /// # Errors
    ///
    /// Returns an Expression error unless there are at least two Boolean
    /// operands.
    pub fn or(&self, operands: Vec<Expr<T>>) -> Result<Expr<T>> {
        check_connective("or", &operands)?;
        Ok(Expr::new(ExprKind::Or(operands), AttrType::Boolean))
    }

    /// # Errors
    ///
    /// Returns an Expression error when `operand` is not Boolean.
    pub fn not(&self, operand: Expr<T>) -> Result<Expr<T>> {
        if !operand.is_boolean() {
            return Err(FilterError::NonBooleanOperand {
                connective: "not",
                index: 0,
                found: operand.value_type(),
            }
            .into());
        }
        Ok(Expr::new(ExprKind::Not(Box::new(operand)), AttrType::Boolean))
    }

    fn build_comparison(
        &self,
        op: CompareOp,
        case_insensitive: bool,
        left: Expr<T>,
        right: Expr<T>,
    ) -> Result<Expr<T>> {
        let lt = left.value_type();
        let rt = right.value_type();
        let symbol = op.symbol();

        if case_insensitive || op == CompareOp::SubstringOf {
            if lt != AttrType::String || rt != AttrType::String {
                return Err(FilterError::RequiresString {
                    op: symbol,
                    left: lt,
                    right: rt,
                }
                .into());
            }
            return Ok(comparison(op, case_insensitive, left, right));
        }

        if lt.is_numeric() && rt.is_numeric() {
            return Ok(comparison(op, false, left, right));
        }

        if lt == rt {
            if lt == AttrType::Boolean && op.is_ordering() {
                return Err(FilterError::BooleanOrdering { op: symbol }.into());
            }
            return Ok(comparison(op, false, left, right));
        }

        match (lt, rt) {
            (AttrType::Instant, AttrType::String) => {
                let right = self.promote(right, op, lt, rt)?;
                Ok(comparison(op, false, left, right))
            }
            (AttrType::String, AttrType::Instant) => {
                let left = self.promote(left, op, lt, rt)?;
                Ok(comparison(op, false, left, right))
            }
            _ => Err(FilterError::TypeMismatch {
                op: symbol,
                left: lt,
                right: rt,
            }
            .into()),
        }
    }

    /// Turn a date-like String literal into an Instant literal
    fn promote(&self, expr: Expr<T>, op: CompareOp, lt: AttrType, rt: AttrType) -> Result<Expr<T>> {
        let Some(text) = expr.as_string_literal() else {
            return Err(FilterError::TypeMismatch {
                op: op.symbol(),
                left: lt,
                right: rt,
            }
            .into());
        };
        if self.dates.probe(text).is_none() {
            return Err(FilterError::UnparseableInstant {
                text: text.to_string(),
            }
            .into());
        }
        Ok(self.literal(Literal::DateText(text.to_string())))
    }
}

fn comparison<T: Tuple>(
    op: CompareOp,
    case_insensitive: bool,
    left: Expr<T>,
    right: Expr<T>,
) -> Expr<T> {
    Expr::new(
        ExprKind::Comparison {
            op,
            case_insensitive,
            left: Box::new(left),
            right: Box::new(right),
        },
        AttrType::Boolean,
    )
}

fn check_connective<T: Tuple>(connective: &'static str, operands: &[Expr<T>]) -> Result<()> {
    if operands.len() < 2 {
        return Err(FilterError::TooFewOperands {
            connective,
            found: operands.len(),
        }
        .into());
    }
    if let Some((index, bad)) = operands.iter().enumerate().find(|(_, e)| !e.is_boolean()) {
        return Err(FilterError::NonBooleanOperand {
            connective,
            index,
            found: bad.value_type(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RepoErrorKind;
    use crate::model::{Tag, Version};

    fn versions() -> ExpressionFactory<Version> {
        ExpressionFactory::new().unwrap()
    }

    #[test]
    fn test_numeric_types_mix() {
        let f = versions();
        let e = f
            .compare(CompareOp::Gt, f.attribute("length").unwrap(), f.double(2.5))
            .unwrap();
        assert!(e.is_boolean());
        f.compare(CompareOp::Eq, f.attribute("versioncount").unwrap(), f.long(3))
            .unwrap();
    }

    #[test]
    fn test_string_vs_numeric_rejected() {
        let f = versions();
        let err = f
            .compare(CompareOp::Eq, f.attribute("title").unwrap(), f.integer(1))
            .unwrap_err();
        assert_eq!(err.kind(), RepoErrorKind::Expression);
    }

    #[test]
    fn test_instant_promotes_parseable_string() {
        let f = versions();
        let e = f
            .compare(
                CompareOp::Ge,
                f.attribute("imported").unwrap(),
                f.string("2024-01-05"),
            )
            .unwrap();
        match e.kind() {
            ExprKind::Comparison { right, .. } => {
                assert_eq!(right.value_type(), AttrType::Instant)
            }
            other => panic!("unexpected node {:?}", other),
        }
        assert!(f
            .compare(
                CompareOp::Ge,
                f.attribute("imported").unwrap(),
                f.string("Comedy")
            )
            .is_err());
    }

    #[test]
    fn test_instant_vs_string_attribute_rejected() {
        let f = versions();
        assert!(f
            .compare(
                CompareOp::Eq,
                f.attribute("imported").unwrap(),
                f.attribute("title").unwrap()
            )
            .is_err());
    }

    #[test]
    fn test_substring_and_case_insensitive_need_strings() {
        let f = versions();
        f.compare(
            CompareOp::SubstringOf,
            f.string("draft"),
            f.attribute("title").unwrap(),
        )
        .unwrap();
        assert!(f
            .compare_ignore_case(CompareOp::Eq, f.attribute("length").unwrap(), f.integer(1))
            .is_err());
        assert!(f
            .compare(
                CompareOp::SubstringOf,
                f.attribute("imported").unwrap(),
                f.string("2024-01-05")
            )
            .is_err());
    }

    #[test]
    fn test_boolean_ordering_rejected() {
        let f = versions();
        f.compare(CompareOp::Eq, f.attribute("missing").unwrap(), f.boolean(true))
            .unwrap();
        assert!(f
            .compare(CompareOp::Lt, f.attribute("missing").unwrap(), f.boolean(true))
            .is_err());
    }

    #[test]
    fn test_connectives() {
        let f = versions();
        let a = f.attribute("missing").unwrap();
        let b = f.attribute("corrupt").unwrap();
        assert!(f.and(vec![a.clone()]).is_err());
        assert!(f.or(vec![a.clone(), f.integer(1)]).is_err());
        assert!(f.not(f.attribute("title").unwrap()).is_err());
        let e = f.and(vec![a, f.not(b).unwrap()]).unwrap();
        assert_eq!(e.to_string(), "(@missing and (not @corrupt))");
    }

    #[test]
    fn test_unknown_attribute() {
        let f: ExpressionFactory<Tag> = ExpressionFactory::new().unwrap();
        let err = f.attribute("imported").unwrap_err();
        assert!(err.message().contains("Tag has no attribute"));
        assert_eq!(f.attribute("TYPE").unwrap().to_string(), "@type");
    }
}
