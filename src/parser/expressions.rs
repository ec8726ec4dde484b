//! Arithmetic in amounts
//!
//! An amount can be written as a parenthesised expression with `+ - * /`, e.g. `(123 * 3)`.
//! Expressions are evaluated with exact rationals, so `(0.1 + 0.2)` is exactly `0.3`.

use num::rational::BigRational;
use num::Zero;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;

use super::utils::parse_rational;
use super::{GrammarParser, Rule};
use crate::ParserError;

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Number(BigRational),
    UnaryExpr {
        op: Unary,
        child: Box<Node>,
    },
    BinaryExpr {
        op: Binary,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unary {
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binary {
    Add,
    Subtract,
    Mult,
    Div,
}

/// Builds the abstract syntax tree, to be able to evaluate expressions
///
/// This all comes from the defined grammar.pest
pub fn build_root_node_from_expression(expression: &str) -> Result<Node, ParserError> {
    let mut parsed = GrammarParser::parse(Rule::amount_expr, expression).map_err(|e| {
        let column = match e.line_col {
            LineColLocation::Pos((_, col)) => col,
            LineColLocation::Span((_, col), _) => col,
        };
        expression_error(expression, format!("unexpected input at column {}", column))
    })?;
    let root = parsed
        .next()
        .and_then(|amount| amount.into_inner().next())
        .ok_or_else(|| expression_error(expression, "empty expression"))?;

    build_ast_from_expr(root, expression)
}

/// Parses and evaluates an expression
pub fn eval_expression(expression: &str) -> Result<BigRational, ParserError> {
    let root = build_root_node_from_expression(expression)?;
    eval(&root).map_err(|reason| expression_error(expression, reason))
}

pub fn eval(node: &Node) -> Result<BigRational, String> {
    match node {
        Node::Number(n) => Ok(n.clone()),
        Node::UnaryExpr { op, child } => {
            let value = eval(child)?;
            match op {
                Unary::Neg => Ok(-value),
            }
        }
        Node::BinaryExpr { op, lhs, rhs } => {
            let left = eval(lhs)?;
            let right = eval(rhs)?;
            match op {
                Binary::Add => Ok(left + right),
                Binary::Subtract => Ok(left - right),
                Binary::Mult => Ok(left * right),
                Binary::Div => {
                    if right.is_zero() {
                        Err("division by zero".to_string())
                    } else {
                        Ok(left / right)
                    }
                }
            }
        }
    }
}

fn expression_error<T: ToString>(expression: &str, reason: T) -> ParserError {
    ParserError::Expression {
        expression: expression.to_string(),
        reason: reason.to_string(),
    }
}

fn build_ast_from_expr(pair: Pair<Rule>, expression: &str) -> Result<Node, ParserError> {
    let malformed = || expression_error(expression, "malformed expression");
    match pair.as_rule() {
        Rule::additive_expr | Rule::multiplicative_expr => {
            let mut inner = pair.into_inner();
            let first = inner.next().ok_or_else(malformed)?;
            let mut lhs = build_ast_from_expr(first, expression)?;
            while let Some(operator) = inner.next() {
                let op = match operator.as_str() {
                    "+" => Binary::Add,
                    "-" => Binary::Subtract,
                    "*" => Binary::Mult,
                    "/" => Binary::Div,
                    _ => return Err(malformed()),
                };
                let rhs = build_ast_from_expr(inner.next().ok_or_else(malformed)?, expression)?;
                lhs = parse_binary_expr(op, lhs, rhs);
            }
            Ok(lhs)
        }
        Rule::primary => {
            let mut inner = pair.into_inner();
            let first = inner.next().ok_or_else(malformed)?;
            match first.as_rule() {
                Rule::neg => {
                    let child = build_ast_from_expr(inner.next().ok_or_else(malformed)?, expression)?;
                    Ok(parse_unary_expr(Unary::Neg, child))
                }
                Rule::number => Ok(Node::Number(parse_rational(first.as_str())?)),
                Rule::additive_expr => build_ast_from_expr(first, expression),
                _ => Err(malformed()),
            }
        }
        _ => Err(malformed()),
    }
}

fn parse_binary_expr(operation: Binary, lhs: Node, rhs: Node) -> Node {
    Node::BinaryExpr {
        op: operation,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn parse_unary_expr(operation: Unary, child: Node) -> Node {
    Node::UnaryExpr {
        op: operation,
        child: Box::new(child),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::BigInt;

    fn ratio(numer: i64, denom: i64) -> BigRational {
        BigRational::new(BigInt::from(numer), BigInt::from(denom))
    }

    #[test]
    fn simple_products() {
        assert_eq!(eval_expression("(123 * 3)").unwrap(), ratio(369, 1));
        assert_eq!(eval_expression("(123*2)").unwrap(), ratio(246, 1));
    }

    #[test]
    fn precedence() {
        assert_eq!(eval_expression("(123*2+3)").unwrap(), ratio(249, 1));
        assert_eq!(eval_expression("(3 + 123*2)").unwrap(), ratio(249, 1));
        assert_eq!(eval_expression("((3 + 1) * 2)").unwrap(), ratio(8, 1));
        assert_eq!(eval_expression("(10 - 4 - 3)").unwrap(), ratio(3, 1));
        assert_eq!(eval_expression("(12 / 3 / 2)").unwrap(), ratio(2, 1));
    }

    #[test]
    fn negation() {
        assert_eq!(eval_expression("(-5 * 2)").unwrap(), ratio(-10, 1));
        assert_eq!(eval_expression("(1 - -2)").unwrap(), ratio(3, 1));
    }

    #[test]
    fn decimals_stay_exact() {
        assert_eq!(eval_expression("(0.1 + 0.2)").unwrap(), ratio(3, 10));
        assert_eq!(eval_expression("(10 / 3)").unwrap(), ratio(10, 3));
        assert_eq!(eval_expression("(10 / 3 * 3)").unwrap(), ratio(10, 1));
    }

    #[test]
    fn tree_shape() {
        let node = build_root_node_from_expression("(1 + 2 * 3)").unwrap();
        match node {
            Node::BinaryExpr { op, rhs, .. } => {
                assert_eq!(op, Binary::Add);
                assert!(matches!(*rhs, Node::BinaryExpr { op: Binary::Mult, .. }));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn errors() {
        assert!(matches!(
            eval_expression("(123 * )"),
            Err(ParserError::Expression { .. })
        ));
        assert!(eval_expression("(1 + 2").is_err());
        assert_eq!(
            eval_expression("(1 / 0)").unwrap_err().to_string(),
            "invalid amount expression (1 / 0): division by zero"
        );
    }
}
