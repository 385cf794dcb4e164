use crate::errors::{RepoError, RepoErrorKind};
use crate::tuple::AttrType;
use thiserror::Error;

/// Construction-time expression failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("{entity} has no attribute '{name}'")]
    UnknownAttribute { entity: &'static str, name: String },

    #[error("cannot compare {left} with {right} using '{op}'")]
    TypeMismatch {
        op: &'static str,
        left: AttrType,
        right: AttrType,
    },

    #[error("'{op}' requires String operands, found {left} and {right}")]
    RequiresString {
        op: &'static str,
        left: AttrType,
        right: AttrType,
    },

    #[error("'{op}' is not defined on Boolean operands")]
    BooleanOrdering { op: &'static str },

    #[error("'{text}' is not a recognizable date/time")]
    UnparseableInstant { text: String },

    #[error("{connective} needs at least two operands, found {found}")]
    TooFewOperands {
        connective: &'static str,
        found: usize,
    },

    #[error("{connective} operand {index} is {found}, not Boolean")]
    NonBooleanOperand {
        connective: &'static str,
        index: usize,
        found: AttrType,
    },
}

impl From<FilterError> for RepoError {
    fn from(err: FilterError) -> Self {
        RepoError::new(RepoErrorKind::Expression)
            .with_op("build_expression")
            .with_message(err.to_string())
            .with_source(err)
    }
}
