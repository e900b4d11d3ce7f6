//! The node model flowing through every compiler stage.

use serde::Serialize;

/// A single unit of a predicate, from raw parse output through postfix order.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Bracketed field reference, e.g. `[System.Id]`
    Field { path: String },
    /// Comparison operator between a field and its value
    Condition { op: CompOp },
    /// Literal value, quotes removed and `''` unescaped
    Constant { text: String },
    /// Bound placeholder, stored without the leading `@`
    Parameter { name: String },
    /// Logical connective
    Operator { kind: LogicalOp },
    /// `(`, with its byte offset in the query text
    StartGroup { offset: usize },
    /// `)`, with its byte offset in the query text
    EndGroup { offset: usize },
    /// A collapsed `Field, Condition, value` triple, only produced by the optimizer
    Conditional { field: String, op: CompOp, value: Value },
}

impl Node {
    pub fn field(path: impl Into<String>) -> Self {
        Node::Field { path: path.into() }
    }

    pub fn constant(text: impl Into<String>) -> Self {
        Node::Constant { text: text.into() }
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Node::Parameter { name: name.into() }
    }

    pub fn conditional(field: impl Into<String>, op: CompOp, value: Value) -> Self {
        Node::Conditional { field: field.into(), op, value }
    }

    /// Short human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Node::Field { path } => format!("field [{}]", path),
            Node::Condition { op } => format!("condition `{}`", op.symbol()),
            Node::Constant { text } => format!("constant '{}'", text),
            Node::Parameter { name } => format!("parameter @{}", name),
            Node::Operator { kind } => format!("operator {}", kind.keyword()),
            Node::StartGroup { .. } => "`(`".to_string(),
            Node::EndGroup { .. } => "`)`".to_string(),
            Node::Conditional { field, op, value } => {
                format!("conditional [{}] {} {}", field, op.symbol(), value)
            }
        }
    }
}

/// The right-hand side of a conditional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Constant(String),
    Parameter(String),
}

impl Value {
    /// Converts a raw value node, returning `None` for every other node kind.
    pub fn from_node(node: &Node) -> Option<Self> {
        match node {
            Node::Constant { text } => Some(Value::Constant(text.clone())),
            Node::Parameter { name } => Some(Value::Parameter(name.clone())),
            Node::Field { .. }
            | Node::Condition { .. }
            | Node::Operator { .. }
            | Node::StartGroup { .. }
            | Node::EndGroup { .. }
            | Node::Conditional { .. } => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Constant(text) => write!(f, "'{}'", text.replace('\'', "''")),
            Value::Parameter(name) => write!(f, "@{}", name),
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CompOp {
    Equals,          // =
    NotEquals,       // <>
    Less,            // <
    Greater,         // >
    LessOrEquals,    // <=
    GreaterOrEquals, // >=
    Contains,
    NotContains,
    Under,
    NotUnder,
    Ever,
}

impl CompOp {
    /// The operator as written in query text.
    pub fn symbol(self) -> &'static str {
        match self {
            CompOp::Equals => "=",
            CompOp::NotEquals => "<>",
            CompOp::Less => "<",
            CompOp::Greater => ">",
            CompOp::LessOrEquals => "<=",
            CompOp::GreaterOrEquals => ">=",
            CompOp::Contains => "CONTAINS",
            CompOp::NotContains => "NOT CONTAINS",
            CompOp::Under => "UNDER",
            CompOp::NotUnder => "NOT UNDER",
            CompOp::Ever => "EVER",
        }
    }

    /// The operator name used by the query service's XML expressions.
    pub fn wire_name(self) -> &'static str {
        match self {
            CompOp::Equals => "equals",
            CompOp::NotEquals => "notEquals",
            CompOp::Less => "less",
            CompOp::Greater => "greater",
            CompOp::LessOrEquals => "lessOrEquals",
            CompOp::GreaterOrEquals => "greaterOrEquals",
            CompOp::Contains => "contains",
            CompOp::NotContains => "notContains",
            CompOp::Under => "under",
            CompOp::NotUnder => "notUnder",
            CompOp::Ever => "ever",
        }
    }
}

/// Logical connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    /// Binding strength; `And` binds tighter than `Or`.
    pub fn precedence(self) -> u8 {
        match self {
            LogicalOp::And => 2,
            LogicalOp::Or => 1,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}
