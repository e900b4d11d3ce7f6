//! Compiles the WHERE clause of a stored work-item query into the nested
//! wire document consumed by the query execution service.
//!
//! ```text
//! text ─ Lexer ─ Parser ─▶ [Node] ─ optimize ─▶ [Node] ─ to_postfix ─▶ [Node] ─ serialize ─▶ WireElement
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod lexer;
pub mod node;
pub mod optimizer;
pub mod parser;
pub mod rpn;
pub mod token;
pub mod wire;

pub use compiler::QueryCompiler;
pub use config::{CompilerConfig, Limits};
pub use error::CompileError;
pub use wire::{WireDocument, WireElement};
