//! Collapses `Field, Condition, value` triples into single `Conditional` units.
//!
//! After this pass the only node kinds left are `Conditional`, `Operator`,
//! `StartGroup` and `EndGroup`, so the postfix stage only has to shunt
//! connectives and group markers.

use crate::config::Limits;
use crate::error::{CompileError, Limit, Result};
use crate::node::{Node, Value};

/// Optimize a flat parser sequence. Running it on an already optimized
/// sequence returns an equal sequence.
pub fn optimize(nodes: &[Node], limits: &Limits) -> Result<Vec<Node>> {
    let mut output = Vec::with_capacity(nodes.len());
    let mut conditions = 0usize;
    let mut index = 0;

    while index < nodes.len() {
        let node = &nodes[index];
        match node {
            Node::Field { path } => {
                let (op, value) = match (nodes.get(index + 1), nodes.get(index + 2)) {
                    (Some(Node::Condition { op }), Some(value)) => match Value::from_node(value) {
                        Some(value) => (*op, value),
                        None => {
                            return Err(CompileError::optimization(
                                index + 2,
                                format!("{} cannot be the value of [{}]", value.describe(), path),
                            ));
                        }
                    },
                    _ => {
                        return Err(CompileError::optimization(
                            index,
                            format!("[{}] is not followed by a condition and a value", path),
                        ));
                    }
                };
                output.push(Node::conditional(path.as_str(), op, value));
                conditions += 1;
                index += 3;
            }
            Node::Condition { .. } => {
                return Err(CompileError::optimization(
                    index,
                    format!("{} has no field on its left", node.describe()),
                ));
            }
            Node::Constant { .. } | Node::Parameter { .. } => {
                return Err(CompileError::optimization(
                    index,
                    format!("{} is not part of a condition", node.describe()),
                ));
            }
            Node::Conditional { .. } => {
                output.push(node.clone());
                conditions += 1;
                index += 1;
            }
            Node::Operator { .. } | Node::StartGroup { .. } | Node::EndGroup { .. } => {
                output.push(node.clone());
                index += 1;
            }
        }

        if conditions > limits.max_conditions {
            return Err(CompileError::LimitExceeded {
                limit: Limit::Conditions,
                max: limits.max_conditions,
            });
        }
    }

    Ok(output)
}
