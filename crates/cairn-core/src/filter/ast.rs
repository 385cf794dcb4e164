use crate::tuple::{AttrType, Tuple};
use chrono::{DateTime, Utc};
use std::fmt;
use std::marker::PhantomData;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `a $ b` holds when `a` occurs within `b`
    SubstringOf,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::SubstringOf => "$",
        }
    }

    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge
        )
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Typed constants
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i32),
    Long(i64),
    Double(f64),
    String(String),
    Boolean(bool),
    Instant(DateTime<Utc>),
    /// Date text that probed successfully; resolved again when compiled
    DateText(String),
}

impl Literal {
    pub fn attr_type(&self) -> AttrType {
        match self {
            Literal::Integer(_) => AttrType::Integer,
            Literal::Long(_) => AttrType::Long,
            Literal::Double(_) => AttrType::Double,
            Literal::String(_) => AttrType::String,
            Literal::Boolean(_) => AttrType::Boolean,
            Literal::Instant(_) | Literal::DateText(_) => AttrType::Instant,
        }
    }
}

/// Node kinds of a filter tree
#[derive(Debug, Clone)]
pub enum ExprKind<T> {
    Literal(Literal),
    Attribute {
        name: &'static str,
        ty: AttrType,
    },
    Comparison {
        op: CompareOp,
        case_insensitive: bool,
        left: Box<Expr<T>>,
        right: Box<Expr<T>>,
    },
    And(Vec<Expr<T>>),
    Or(Vec<Expr<T>>),
    Not(Box<Expr<T>>),
}

/// A well-typed filter tree over entity `T`
///
/// Only [`super::ExpressionFactory`] creates these, so a value of this type
/// is always valid for `T`.
#[derive(Debug, Clone)]
pub struct Expr<T> {
    kind: ExprKind<T>,
    ty: AttrType,
    entity: PhantomData<fn() -> T>,
}

impl<T: Tuple> Expr<T> {
    pub(crate) fn new(kind: ExprKind<T>, ty: AttrType) -> Self {
        Self {
            kind,
            ty,
            entity: PhantomData,
        }
    }

    pub fn kind(&self) -> &ExprKind<T> {
        &self.kind
    }

    /// Type the node evaluates to
    pub fn value_type(&self) -> AttrType {
        self.ty
    }

    pub fn is_boolean(&self) -> bool {
        self.ty == AttrType::Boolean
    }

    pub(crate) fn as_string_literal(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Literal(Literal::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl<T: Tuple> fmt::Display for Expr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(Literal::String(s)) => write!(f, "{:?}", s),
            ExprKind::Literal(Literal::DateText(s)) => write!(f, "{:?}", s),
            ExprKind::Literal(Literal::Instant(t)) => write!(f, "{:?}", t.to_rfc3339()),
            ExprKind::Literal(Literal::Integer(v)) => write!(f, "{}", v),
            ExprKind::Literal(Literal::Long(v)) => write!(f, "{}", v),
            ExprKind::Literal(Literal::Double(v)) => write!(f, "{}", v),
            ExprKind::Literal(Literal::Boolean(v)) => write!(f, "{}", v),
            ExprKind::Attribute { name, .. } => write!(f, "@{}", name),
            ExprKind::Comparison {
                op,
                case_insensitive,
                left,
                right,
            } => {
                let tilde = if *case_insensitive { "~" } else { "" };
                write!(f, "({} {}{} {})", left, tilde, op, right)
            }
            ExprKind::And(items) | ExprKind::Or(items) => {
                let word = if matches!(self.kind, ExprKind::And(_)) {
                    " and "
                } else {
                    " or "
                };
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(word)?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            ExprKind::Not(inner) => write!(f, "(not {})", inner),
        }
    }
}
