use decaf_common::CompileError;

use crate::ast::nodes::{BinaryOp, OpFamily, UnaryOp};

use super::types::Type;

/// Check a binary operation and return the result type.
///
/// Operands must match exactly; the error type is not special-cased.
pub fn check_binary_op(left: &Type, op: BinaryOp, right: &Type) -> Result<Type, CompileError> {
    let result = match op.family() {
        OpFamily::Mul | OpFamily::Add => both(left, right, &Type::Int).then_some(Type::Int),
        OpFamily::Rel => both(left, right, &Type::Int).then_some(Type::Boolean),
        OpFamily::Eq => (left == right && is_equatable(left)).then_some(Type::Boolean),
        OpFamily::Cond => both(left, right, &Type::Boolean).then_some(Type::Boolean),
    };
    result.ok_or_else(|| unsupported(op.symbol()))
}

/// Check a unary operation and return the result type.
pub fn check_unary_op(op: UnaryOp, operand: &Type) -> Result<Type, CompileError> {
    let expected = match op {
        UnaryOp::Neg => Type::Int,
        UnaryOp::Not => Type::Boolean,
    };
    if *operand == expected {
        Ok(expected)
    } else {
        Err(unsupported(op.symbol()))
    }
}

/// Check the value of an assignment against its target.
pub fn check_assignment(target: &Type, value: &Type) -> Result<(), CompileError> {
    if target == value {
        Ok(())
    } else {
        Err(unsupported("="))
    }
}

fn both(left: &Type, right: &Type, expected: &Type) -> bool {
    left == expected && right == expected
}

fn is_equatable(ty: &Type) -> bool {
    matches!(ty, Type::Int | Type::Char | Type::Boolean)
}

fn unsupported(op: &str) -> CompileError {
    CompileError::UnsupportedOperand { op: op.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn int_arithmetic() {
        for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div, BinaryOp::Mod] {
            assert_eq!(check_binary_op(&Type::Int, op, &Type::Int), Ok(Type::Int));
        }
    }

    #[test]
    fn arithmetic_rejects_mixed_operands() {
        assert_eq!(
            check_binary_op(&Type::Int, BinaryOp::Add, &Type::Boolean),
            Err(CompileError::UnsupportedOperand { op: "+".into() })
        );
        assert!(check_binary_op(&Type::Char, BinaryOp::Mul, &Type::Char).is_err());
    }

    #[test]
    fn relational_returns_boolean() {
        assert_eq!(
            check_binary_op(&Type::Int, BinaryOp::Lt, &Type::Int),
            Ok(Type::Boolean)
        );
        assert!(check_binary_op(&Type::Char, BinaryOp::Gte, &Type::Char).is_err());
    }

    #[test]
    fn equality_over_scalar_types() {
        for ty in [Type::Int, Type::Char, Type::Boolean] {
            assert_eq!(check_binary_op(&ty, BinaryOp::Eq, &ty), Ok(Type::Boolean));
        }
        assert!(check_binary_op(&Type::Int, BinaryOp::Neq, &Type::Char).is_err());
        let point = Type::Struct("Point".into());
        assert!(check_binary_op(&point, BinaryOp::Eq, &point).is_err());
        assert!(check_binary_op(&Type::Void, BinaryOp::Eq, &Type::Void).is_err());
    }

    #[test]
    fn conditional_requires_boolean() {
        assert_eq!(
            check_binary_op(&Type::Boolean, BinaryOp::And, &Type::Boolean),
            Ok(Type::Boolean)
        );
        assert!(check_binary_op(&Type::Int, BinaryOp::Or, &Type::Boolean).is_err());
    }

    #[test]
    fn error_operands_are_not_absorbed() {
        assert!(check_binary_op(&Type::Error, BinaryOp::Add, &Type::Int).is_err());
        assert!(check_unary_op(UnaryOp::Not, &Type::Error).is_err());
    }

    #[test]
    fn unary_operators() {
        assert_eq!(check_unary_op(UnaryOp::Neg, &Type::Int), Ok(Type::Int));
        assert_eq!(
            check_unary_op(UnaryOp::Neg, &Type::Boolean),
            Err(CompileError::UnsupportedOperand { op: "-".into() })
        );
        assert_eq!(check_unary_op(UnaryOp::Not, &Type::Boolean), Ok(Type::Boolean));
        assert_eq!(
            check_unary_op(UnaryOp::Not, &Type::Int),
            Err(CompileError::UnsupportedOperand { op: "!".into() })
        );
    }

    #[test]
    fn assignment_needs_exact_match() {
        assert_eq!(check_assignment(&Type::Char, &Type::Char), Ok(()));
        assert_eq!(
            check_assignment(&Type::Int, &Type::Char),
            Err(CompileError::UnsupportedOperand { op: "=".into() })
        );
    }
}
