//! Lowers filter trees to SQLite `WHERE` text
//!
//! Strings and doubles travel as numbered parameters (`?1`, `?2`, ...);
//! integers, booleans and instants are embedded. Instants are resolved
//! through the date parser here and embedded as Unix milliseconds, the same
//! representation the columns use.
//!
//! NULL is an ordinary value: `=` and `!=` compile to `IS` / `IS NOT`, and
//! every other comparison is false when either side is NULL, so `not`
//! always sees a definite truth value. Case-insensitive operators fold
//! through [`FOLD_FUNCTION`], which lower-cases the full Unicode range.

use super::quote;
use crate::errors::Result;
use cairn_core::datetime::DateParser;
use cairn_core::filter::{CompareOp, Expr, ExprKind, Literal};
use cairn_core::tuple::{AttrType, Tuple};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;

/// SQL name of the Unicode lower-casing function used by `~` operators
pub const FOLD_FUNCTION: &str = "cairn_fold";

/// Register [`FOLD_FUNCTION`] on a connection
///
/// # Errors
///
/// Returns the driver error if registration fails.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

/// SQL fragment plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Compile `expr` to a parenthesized predicate
///
/// # Errors
///
/// Returns a Parser error if a date literal no longer resolves.
pub fn compile<T: Tuple>(expr: &Expr<T>, dates: &DateParser) -> Result<CompiledFilter> {
    let mut params = Vec::new();
    let sql = predicate(expr, dates, &mut params)?;
    Ok(CompiledFilter { sql, params })
}

/// Compile in a position that needs a truth value
fn predicate<T: Tuple>(expr: &Expr<T>, dates: &DateParser, params: &mut Vec<SqlValue>) -> Result<String> {
    match expr.kind() {
        ExprKind::Attribute {
            name,
            ty: AttrType::Boolean,
        } => Ok(format!("(COALESCE({}, 0) <> 0)", quote(name))),
        _ => operand(expr, dates, params),
    }
}

fn operand<T: Tuple>(expr: &Expr<T>, dates: &DateParser, params: &mut Vec<SqlValue>) -> Result<String> {
    match expr.kind() {
        ExprKind::Literal(literal) => literal_sql(literal, dates, params),
        ExprKind::Attribute { name, .. } => Ok(quote(name)),
        ExprKind::Comparison {
            op,
            case_insensitive,
            left,
            right,
        } => {
            let mut l = operand(left, dates, params)?;
            let mut r = operand(right, dates, params)?;
            if *case_insensitive {
                l = format!("{}({})", FOLD_FUNCTION, l);
                r = format!("{}({})", FOLD_FUNCTION, r);
            }
            Ok(match op {
                CompareOp::Eq | CompareOp::Ne => format!("({} {} {})", l, sql_operator(*op), r),
                CompareOp::SubstringOf => format!("COALESCE(instr({}, {}) > 0, 0)", r, l),
                other => format!("COALESCE({} {} {}, 0)", l, sql_operator(*other), r),
            })
        }
        ExprKind::And(items) => fold(items, " AND ", dates, params),
        ExprKind::Or(items) => fold(items, " OR ", dates, params),
        ExprKind::Not(inner) => Ok(format!("(NOT {})", predicate(inner, dates, params)?)),
    }
}

fn fold<T: Tuple>(
    items: &[Expr<T>],
    connective: &str,
    dates: &DateParser,
    params: &mut Vec<SqlValue>,
) -> Result<String> {
    let parts = items
        .iter()
        .map(|item| predicate(item, dates, params))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("({})", parts.join(connective)))
}

fn literal_sql(literal: &Literal, dates: &DateParser, params: &mut Vec<SqlValue>) -> Result<String> {
    Ok(match literal {
        Literal::Integer(v) => v.to_string(),
        Literal::Long(v) => v.to_string(),
        Literal::Double(v) => bind(params, SqlValue::Real(*v)),
        Literal::String(s) => bind(params, SqlValue::Text(s.clone())),
        Literal::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
        Literal::Instant(t) => t.timestamp_millis().to_string(),
        Literal::DateText(text) => dates.parse(text)?.timestamp_millis().to_string(),
    })
}

/// Numbered placeholder, so operands may be emitted out of push order
fn bind(params: &mut Vec<SqlValue>, value: SqlValue) -> String {
    params.push(value);
    format!("?{}", params.len())
}

fn sql_operator(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "IS",
        CompareOp::Ne => "IS NOT",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
        CompareOp::SubstringOf => "$",
    }
}
