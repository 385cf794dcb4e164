#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Property tests for the expression type rules

use cairn_core::errors::RepoErrorKind;
use cairn_core::filter::{parse_filter, CompareOp, ExpressionFactory};
use cairn_core::model::Version;
use cairn_core::tuple::{AttrType, Tuple};
use proptest::prelude::*;

const OPS: [CompareOp; 7] = [
    CompareOp::Eq,
    CompareOp::Ne,
    CompareOp::Lt,
    CompareOp::Le,
    CompareOp::Gt,
    CompareOp::Ge,
    CompareOp::SubstringOf,
];

fn attribute_names() -> Vec<&'static str> {
    Version::schema().unwrap().attribute_names()
}

/// Expected verdict for comparing two attributes
fn allowed(op: CompareOp, case_insensitive: bool, left: AttrType, right: AttrType) -> bool {
    if case_insensitive || op == CompareOp::SubstringOf {
        return left == AttrType::String && right == AttrType::String;
    }
    if left.is_numeric() && right.is_numeric() {
        return true;
    }
    if left != right {
        return false;
    }
    !(left == AttrType::Boolean && op.is_ordering())
}

proptest! {
    #[test]
    fn attribute_pairs_follow_type_rules(
        l in 0usize..21,
        r in 0usize..21,
        op in 0usize..7,
        ci in any::<bool>(),
    ) {
        let names = attribute_names();
        let f = ExpressionFactory::<Version>::new().unwrap();
        let schema = f.schema();
        let (left, right) = (names[l], names[r]);
        let op = OPS[op];
        let expected = allowed(
            op,
            ci,
            schema.type_of(left).unwrap(),
            schema.type_of(right).unwrap(),
        );

        let built = if ci {
            f.compare_ignore_case(op, f.attribute(left).unwrap(), f.attribute(right).unwrap())
        } else {
            f.compare(op, f.attribute(left).unwrap(), f.attribute(right).unwrap())
        };

        prop_assert_eq!(built.is_ok(), expected, "{} {:?} {}", left, op, right);
        if let Err(err) = built {
            prop_assert_eq!(err.kind(), RepoErrorKind::Expression);
        }
    }

    #[test]
    fn numeric_literals_compare_with_numeric_attributes(n in any::<i64>(), x in -1.0e9f64..1.0e9) {
        let f = ExpressionFactory::<Version>::new().unwrap();
        for attr in ["length", "inode", "versioncount", "linkcount"] {
            prop_assert!(f.compare(CompareOp::Le, f.attribute(attr).unwrap(), f.long(n)).is_ok());
            prop_assert!(f.compare(CompareOp::Gt, f.double(x), f.attribute(attr).unwrap()).is_ok());
            prop_assert!(f.compare(CompareOp::Eq, f.attribute(attr).unwrap(), f.string("1")).is_err());
        }
    }

    #[test]
    fn connectives_need_two_boolean_operands(count in 0usize..5) {
        let f = ExpressionFactory::<Version>::new().unwrap();
        let operands: Vec<_> = (0..count).map(|_| f.attribute("missing").unwrap()).collect();
        prop_assert_eq!(f.and(operands.clone()).is_ok(), count >= 2);
        prop_assert_eq!(f.or(operands).is_ok(), count >= 2);
    }

    #[test]
    fn parser_never_panics(text in "[@a-z0-9 ()=<>!~$'\",.]{0,40}") {
        let f = ExpressionFactory::<Version>::new().unwrap();
        if let Err(err) = parse_filter(&f, &text) {
            prop_assert!(matches!(err.kind(), RepoErrorKind::Parser));
            prop_assert!(!err.diagnostics().is_empty());
        }
    }
}

#[test]
fn test_instant_string_pairs() {
    let f = ExpressionFactory::<Version>::new().unwrap();
    for text in ["2024-01-05", "Jan 5, 2024", "01/05/24 10:30", "now", "2024-01-05T10:00:00Z"] {
        assert!(
            f.compare(CompareOp::Lt, f.attribute("imported").unwrap(), f.string(text))
                .is_ok(),
            "{} should promote",
            text
        );
    }
    for text in ["Comedy", "12", ""] {
        assert!(f
            .compare(CompareOp::Lt, f.attribute("imported").unwrap(), f.string(text))
            .is_err());
    }
}
