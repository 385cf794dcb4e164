//! Typed filter expressions
//!
//! Trees are built only through an [`ExpressionFactory`] bound to one
//! entity, which type-checks every node as it is created. The textual
//! query language in [`parser`] produces the same trees.

mod ast;
mod error;
mod factory;
mod lexer;
pub mod parser;

pub use ast::{CompareOp, Expr, ExprKind, Literal};
pub use error::FilterError;
pub use factory::ExpressionFactory;
pub use parser::{parse_filter, parse_order_by};
