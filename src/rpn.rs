//! Shunting-yard conversion of the optimized infix sequence into postfix order.

use crate::config::Limits;
use crate::error::{CompileError, GroupFault, Limit, Result};
use crate::node::{LogicalOp, Node};

/// An entry on the operator stack.
#[derive(Debug, Clone, Copy)]
enum Pending {
    Operator(LogicalOp),
    /// An open group, remembering the source offset of its `(`
    Group(usize),
}

/// Convert optimizer output into postfix order.
///
/// `And` binds tighter than `Or` and equal precedence associates to the left.
/// The result holds only `Conditional` and `Operator` nodes.
pub fn to_postfix(nodes: &[Node], limits: &Limits) -> Result<Vec<Node>> {
    let mut output = Vec::with_capacity(nodes.len());
    let mut stack: Vec<Pending> = Vec::new();

    for (index, node) in nodes.iter().enumerate() {
        match node {
            Node::Conditional { .. } => output.push(node.clone()),
            Node::Operator { kind } => {
                while let Some(&Pending::Operator(top)) = stack.last() {
                    if top.precedence() < kind.precedence() {
                        break;
                    }
                    output.push(Node::Operator { kind: top });
                    stack.pop();
                }
                push_bounded(&mut stack, Pending::Operator(*kind), limits)?;
            }
            Node::StartGroup { offset } => push_bounded(&mut stack, Pending::Group(*offset), limits)?,
            Node::EndGroup { offset } => loop {
                match stack.pop() {
                    Some(Pending::Operator(kind)) => output.push(Node::Operator { kind }),
                    Some(Pending::Group(_)) => break,
                    None => {
                        return Err(CompileError::UnbalancedGroup {
                            offset: *offset,
                            fault: GroupFault::Unmatched,
                        });
                    }
                }
            },
            Node::Field { .. }
            | Node::Condition { .. }
            | Node::Constant { .. }
            | Node::Parameter { .. } => {
                return Err(CompileError::optimization(
                    index,
                    format!("{} reached postfix conversion unoptimized", node.describe()),
                ));
            }
        }
    }

    while let Some(pending) = stack.pop() {
        match pending {
            Pending::Operator(kind) => output.push(Node::Operator { kind }),
            Pending::Group(offset) => {
                return Err(CompileError::UnbalancedGroup {
                    offset,
                    fault: GroupFault::Unclosed,
                });
            }
        }
    }

    Ok(output)
}

fn push_bounded(stack: &mut Vec<Pending>, pending: Pending, limits: &Limits) -> Result<()> {
    if stack.len() >= limits.max_stack_depth {
        return Err(CompileError::LimitExceeded {
            limit: Limit::StackDepth,
            max: limits.max_stack_depth,
        });
    }
    stack.push(pending);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{CompOp, Value};

    fn cond(field: &str) -> Node {
        Node::conditional(field, CompOp::Equals, Value::Constant("x".to_string()))
    }

    fn and() -> Node {
        Node::Operator { kind: LogicalOp::And }
    }

    fn or() -> Node {
        Node::Operator { kind: LogicalOp::Or }
    }

    fn open(offset: usize) -> Node {
        Node::StartGroup { offset }
    }

    fn close(offset: usize) -> Node {
        Node::EndGroup { offset }
    }

    fn postfix(nodes: &[Node]) -> Result<Vec<Node>> {
        to_postfix(nodes, &Limits::default())
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        // A OR B AND C => A B C AND OR
        let input = vec![cond("A"), or(), cond("B"), and(), cond("C")];
        assert_eq!(
            postfix(&input).unwrap(),
            vec![cond("A"), cond("B"), cond("C"), and(), or()]
        );
    }

    #[test]
    fn test_and_then_or() {
        // A AND B OR C => A B AND C OR
        let input = vec![cond("A"), and(), cond("B"), or(), cond("C")];
        assert_eq!(
            postfix(&input).unwrap(),
            vec![cond("A"), cond("B"), and(), cond("C"), or()]
        );
    }

    #[test]
    fn test_grouping_overrides_precedence() {
        // (A OR B) AND C => A B OR C AND
        let input = vec![
            open(0), cond("A"), or(), cond("B"), close(19), and(), cond("C"),
        ];
        assert_eq!(
            postfix(&input).unwrap(),
            vec![cond("A"), cond("B"), or(), cond("C"), and()]
        );
    }

    #[test]
    fn test_equal_precedence_is_left_associative() {
        // A AND B AND C => A B AND C AND
        let input = vec![cond("A"), and(), cond("B"), and(), cond("C")];
        assert_eq!(
            postfix(&input).unwrap(),
            vec![cond("A"), cond("B"), and(), cond("C"), and()]
        );
    }

    #[test]
    fn test_operator_count_is_operands_minus_one() {
        let input = vec![
            open(0), cond("A"), or(), open(14), cond("B"), and(), cond("C"),
            close(35), close(36), or(), cond("D"), and(), cond("E"),
        ];
        let output = postfix(&input).unwrap();
        let operands = output.iter().filter(|n| matches!(n, Node::Conditional { .. })).count();
        let operators = output.iter().filter(|n| matches!(n, Node::Operator { .. })).count();
        assert_eq!(operands, 5);
        assert_eq!(operators, operands - 1);
        assert!(!output.iter().any(|n| matches!(n, Node::StartGroup { .. } | Node::EndGroup { .. })));
    }

    #[test]
    fn test_single_operand_group() {
        let input = vec![open(0), cond("A"), close(10)];
        assert_eq!(postfix(&input).unwrap(), vec![cond("A")]);
    }

    #[test]
    fn test_unclosed_group() {
        let input = vec![cond("A"), and(), open(14), cond("B"), or(), cond("C")];
        assert_eq!(
            postfix(&input).unwrap_err(),
            CompileError::UnbalancedGroup { offset: 14, fault: GroupFault::Unclosed }
        );
    }

    #[test]
    fn test_unmatched_end_group() {
        let input = vec![cond("A"), close(9), and(), cond("B")];
        assert_eq!(
            postfix(&input).unwrap_err(),
            CompileError::UnbalancedGroup { offset: 9, fault: GroupFault::Unmatched }
        );
    }

    #[test]
    fn test_raw_triple_is_defect() {
        let input = vec![Node::field("A"), Node::Condition { op: CompOp::Equals }, Node::constant("x")];
        let err = postfix(&input).unwrap_err();
        assert!(matches!(err, CompileError::Optimization { index: 0, .. }));
        assert!(err.is_defect());
    }

    #[test]
    fn test_stack_depth_limit() {
        let limits = Limits { max_stack_depth: 3, ..Limits::default() };
        let mut input: Vec<Node> = (0..4).map(open).collect();
        input.push(cond("A"));
        input.extend((14..18).map(close));
        assert_eq!(
            to_postfix(&input, &limits).unwrap_err(),
            CompileError::LimitExceeded { limit: Limit::StackDepth, max: 3 }
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(postfix(&[]).unwrap(), vec![]);
    }
}
