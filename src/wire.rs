//! Serializes a postfix sequence into the nested wire document handed to the
//! query execution service.

use serde::Serialize;

use crate::config::Limits;
use crate::error::{CompileError, Limit, Result};
use crate::node::{CompOp, LogicalOp, Node, Value};

/// How a leaf value is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Literal,
    Parameter,
}

/// A single comparison, `{field, condition, value, kind}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireLeaf {
    pub field: String,
    pub condition: CompOp,
    /// Literal text, or the parameter name without `@`
    pub value: String,
    pub kind: ValueKind,
}

/// A logical connective over two sub-elements, `{operator, left, right}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireBinary {
    pub operator: LogicalOp,
    pub left: Box<WireElement>,
    pub right: Box<WireElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireElement {
    Leaf(WireLeaf),
    Binary(WireBinary),
}

impl WireElement {
    pub fn leaf(field: impl Into<String>, condition: CompOp, value: &Value) -> Self {
        let (value, kind) = match value {
            Value::Constant(text) => (text.clone(), ValueKind::Literal),
            Value::Parameter(name) => (name.clone(), ValueKind::Parameter),
        };
        WireElement::Leaf(WireLeaf { field: field.into(), condition, value, kind })
    }

    pub fn binary(operator: LogicalOp, left: WireElement, right: WireElement) -> Self {
        WireElement::Binary(WireBinary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Number of leaves under this element.
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(element) = pending.pop() {
            match element {
                WireElement::Leaf(_) => count += 1,
                WireElement::Binary(binary) => {
                    pending.push(&binary.right);
                    pending.push(&binary.left);
                }
            }
        }
        count
    }

    fn write_xml(&self, out: &mut String) {
        let mut pending = vec![XmlStep::Open(self)];
        while let Some(step) = pending.pop() {
            match step {
                XmlStep::Open(WireElement::Leaf(leaf)) => {
                    out.push_str(&format!(
                        r#"<Expression Column="{}" Operator="{}">"#,
                        escape_xml(&leaf.field),
                        leaf.condition.wire_name()
                    ));
                    let tag = match leaf.kind {
                        ValueKind::Literal => "String",
                        ValueKind::Parameter => "Parameter",
                    };
                    out.push_str(&format!("<{tag}>{}</{tag}></Expression>", escape_xml(&leaf.value)));
                }
                XmlStep::Open(WireElement::Binary(binary)) => {
                    out.push_str(&format!(r#"<Group GroupOperator="{:?}">"#, binary.operator));
                    pending.push(XmlStep::Close);
                    pending.push(XmlStep::Open(&binary.right));
                    pending.push(XmlStep::Open(&binary.left));
                }
                XmlStep::Close => out.push_str("</Group>"),
            }
        }
    }
}

/// Pending work while rendering XML without recursion.
enum XmlStep<'a> {
    Open(&'a WireElement),
    Close,
}

/// The compiled predicate; `root` is `None` for a query without a predicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WireDocument {
    pub root: Option<WireElement>,
}

impl WireDocument {
    pub fn new(root: Option<WireElement>) -> Self {
        Self { root }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.root)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.root)
    }

    /// Render as the service's XML expression tree.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        if let Some(root) = &self.root {
            root.write_xml(&mut out);
        }
        out
    }
}

/// Replay a postfix sequence against an evaluation stack.
///
/// Exactly one element must remain at the end. Anything else means an
/// earlier stage let a malformed sequence through.
pub fn serialize(postfix: &[Node], limits: &Limits) -> Result<WireElement> {
    let mut stack: Vec<WireElement> = Vec::new();

    for (index, node) in postfix.iter().enumerate() {
        let element = match node {
            Node::Conditional { field, op, value } => WireElement::leaf(field.as_str(), *op, value),
            Node::Operator { kind } => match (stack.pop(), stack.pop()) {
                (Some(right), Some(left)) => WireElement::binary(*kind, left, right),
                _ => {
                    return Err(CompileError::stack_imbalance(format!(
                        "operator {} at node {} has fewer than two operands",
                        kind.keyword(),
                        index
                    )));
                }
            },
            Node::Field { .. }
            | Node::Condition { .. }
            | Node::Constant { .. }
            | Node::Parameter { .. }
            | Node::StartGroup { .. }
            | Node::EndGroup { .. } => {
                return Err(CompileError::stack_imbalance(format!(
                    "{} at node {} is not valid postfix input",
                    node.describe(),
                    index
                )));
            }
        };

        if stack.len() >= limits.max_stack_depth {
            return Err(CompileError::LimitExceeded {
                limit: Limit::StackDepth,
                max: limits.max_stack_depth,
            });
        }
        stack.push(element);
    }

    let root = stack.pop();
    match (root, stack.is_empty()) {
        (Some(root), true) => Ok(root),
        (None, _) => Err(CompileError::stack_imbalance("postfix sequence produced no element")),
        (Some(_), false) => Err(CompileError::stack_imbalance(format!(
            "{} elements left on the stack",
            stack.len() + 1
        ))),
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cond(field: &str, value: &str) -> Node {
        Node::conditional(field, CompOp::Equals, Value::Constant(value.to_string()))
    }

    fn op(kind: LogicalOp) -> Node {
        Node::Operator { kind }
    }

    fn leaf(field: &str, value: &str) -> WireElement {
        WireElement::leaf(field, CompOp::Equals, &Value::Constant(value.to_string()))
    }

    #[test]
    fn test_single_leaf() {
        let root = serialize(&[cond("System.State", "Closed")], &Limits::default()).unwrap();
        assert_eq!(
            root,
            WireElement::Leaf(WireLeaf {
                field: "System.State".to_string(),
                condition: CompOp::Equals,
                value: "Closed".to_string(),
                kind: ValueKind::Literal,
            })
        );
    }

    #[test]
    fn test_parameter_leaf_keeps_bare_name() {
        let node = Node::conditional("System.TeamProject", CompOp::Equals, Value::Parameter("project".to_string()));
        let root = serialize(&[node], &Limits::default()).unwrap();
        let WireElement::Leaf(leaf) = root else {
            panic!("Expected a leaf");
        };
        assert_eq!(leaf.value, "project");
        assert_eq!(leaf.kind, ValueKind::Parameter);
    }

    #[test]
    fn test_same_operator_chain_is_left_deep() {
        // A B AND C AND
        let postfix = vec![
            cond("A", "1"), cond("B", "2"), op(LogicalOp::And), cond("C", "3"), op(LogicalOp::And),
        ];
        let root = serialize(&postfix, &Limits::default()).unwrap();
        assert_eq!(
            root,
            WireElement::binary(
                LogicalOp::And,
                WireElement::binary(LogicalOp::And, leaf("A", "1"), leaf("B", "2")),
                leaf("C", "3"),
            )
        );
        assert_eq!(root.leaf_count(), 3);
    }

    #[test]
    fn test_operator_takes_two_most_recent_operands() {
        // A B C AND OR => Or(A, And(B, C))
        let postfix = vec![
            cond("A", "1"), cond("B", "2"), cond("C", "3"), op(LogicalOp::And), op(LogicalOp::Or),
        ];
        let root = serialize(&postfix, &Limits::default()).unwrap();
        assert_eq!(
            root,
            WireElement::binary(
                LogicalOp::Or,
                leaf("A", "1"),
                WireElement::binary(LogicalOp::And, leaf("B", "2"), leaf("C", "3")),
            )
        );
    }

    #[test]
    fn test_stack_imbalance() {
        let limits = Limits::default();
        assert!(matches!(serialize(&[], &limits), Err(CompileError::StackImbalance { .. })));
        assert!(matches!(
            serialize(&[cond("A", "1"), op(LogicalOp::And)], &limits),
            Err(CompileError::StackImbalance { .. })
        ));
        let err = serialize(&[cond("A", "1"), cond("B", "2")], &limits).unwrap_err();
        assert!(matches!(err, CompileError::StackImbalance { .. }));
        assert!(err.is_defect());
        assert!(matches!(
            serialize(&[Node::StartGroup { offset: 0 }, cond("A", "1")], &limits),
            Err(CompileError::StackImbalance { .. })
        ));
    }

    #[test]
    fn test_evaluation_stack_limit() {
        let limits = Limits { max_stack_depth: 2, ..Limits::default() };
        let postfix = vec![cond("A", "1"), cond("B", "2"), cond("C", "3"), op(LogicalOp::And), op(LogicalOp::And)];
        assert_eq!(
            serialize(&postfix, &limits).unwrap_err(),
            CompileError::LimitExceeded { limit: Limit::StackDepth, max: 2 }
        );
    }

    #[test]
    fn test_json_shape() {
        let root = WireElement::binary(
            LogicalOp::Or,
            leaf("System.State", "New"),
            WireElement::leaf("System.AssignedTo", CompOp::NotEquals, &Value::Parameter("me".to_string())),
        );
        let document = WireDocument::new(Some(root));
        let value: serde_json::Value = serde_json::from_str(&document.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "operator": "Or",
                "left": { "field": "System.State", "condition": "Equals", "value": "New", "kind": "literal" },
                "right": { "field": "System.AssignedTo", "condition": "NotEquals", "value": "me", "kind": "parameter" }
            })
        );
    }

    #[test]
    fn test_empty_document() {
        let document = WireDocument::default();
        assert_eq!(document.to_json().unwrap(), "null");
        assert_eq!(document.to_xml(), "");
    }

    #[test]
    fn test_xml_rendering() {
        let root = WireElement::binary(
            LogicalOp::And,
            WireElement::leaf("System.TeamProject", CompOp::Equals, &Value::Parameter("project".to_string())),
            WireElement::leaf("System.Title", CompOp::Contains, &Value::Constant("<a & 'b'>".to_string())),
        );
        assert_eq!(
            WireDocument::new(Some(root)).to_xml(),
            concat!(
                r#"<Group GroupOperator="And">"#,
                r#"<Expression Column="System.TeamProject" Operator="equals"><Parameter>project</Parameter></Expression>"#,
                r#"<Expression Column="System.Title" Operator="contains"><String>&lt;a &amp; &apos;b&apos;&gt;</String></Expression>"#,
                "</Group>"
            )
        );
    }

    #[test]
    fn test_xml_nested_groups_keep_operand_order() {
        // A AND (B OR C)
        let root = WireElement::binary(
            LogicalOp::And,
            leaf("A", "1"),
            WireElement::binary(LogicalOp::Or, leaf("B", "2"), leaf("C", "3")),
        );
        assert_eq!(root.leaf_count(), 3);
        assert_eq!(
            WireDocument::new(Some(root)).to_xml(),
            concat!(
                r#"<Group GroupOperator="And">"#,
                r#"<Expression Column="A" Operator="equals"><String>1</String></Expression>"#,
                r#"<Group GroupOperator="Or">"#,
                r#"<Expression Column="B" Operator="equals"><String>2</String></Expression>"#,
                r#"<Expression Column="C" Operator="equals"><String>3</String></Expression>"#,
                "</Group>",
                "</Group>"
            )
        );
    }
}
