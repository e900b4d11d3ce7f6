use thiserror::Error;

/// Which way a parenthesis failed to pair up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFault {
    /// A `(` that is never closed
    Unclosed,
    /// A `)` with no open group
    Unmatched,
}

impl std::fmt::Display for GroupFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupFault::Unclosed => write!(f, "unclosed `(`"),
            GroupFault::Unmatched => write!(f, "`)` without a matching `(`"),
        }
    }
}

/// The bounded resources of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    GroupDepth,
    StackDepth,
    Conditions,
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Limit::GroupDepth => write!(f, "group nesting depth"),
            Limit::StackDepth => write!(f, "stack depth"),
            Limit::Conditions => write!(f, "condition count"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("Optimization error at node {index}: {message}")]
    Optimization { index: usize, message: String },
    #[error("Unbalanced group at offset {offset}: {fault}")]
    UnbalancedGroup { offset: usize, fault: GroupFault },
    #[error("Stack imbalance: {message}")]
    StackImbalance { message: String },
    #[error("Limit exceeded: {limit} is larger than {max}")]
    LimitExceeded { limit: Limit, max: usize },
}

pub type Result<T> = std::result::Result<T, CompileError>;

impl CompileError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax { offset, message: message.into() }
    }

    pub(crate) fn optimization(index: usize, message: impl Into<String>) -> Self {
        Self::Optimization { index, message: message.into() }
    }

    pub(crate) fn stack_imbalance(message: impl Into<String>) -> Self {
        Self::StackImbalance { message: message.into() }
    }

    /// True when the error points at a defect in the pipeline itself rather
    /// than at the query text the caller supplied.
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::Optimization { .. } | Self::StackImbalance { .. })
    }
}
