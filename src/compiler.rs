//! Query compiler that runs the full predicate pipeline:
//! lex → parse → optimize → postfix → wire document.

use tracing::{debug, error, warn};

use crate::config::{CompilerConfig, Limits};
use crate::error::{CompileError, Result};
use crate::lexer::Lexer;
use crate::node::Node;
use crate::optimizer;
use crate::parser::Parser;
use crate::rpn;
use crate::wire::{self, WireDocument};

/// Compiles stored query text into wire documents. Immutable once built, so
/// one instance can serve any number of callers.
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    config: CompilerConfig,
}

impl QueryCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a loaded config. `max_conditions` is clamped to
    /// [`crate::config::MAX_CONDITIONS_CEILING`] since it bounds the wire tree's height.
    pub fn from_config(mut config: CompilerConfig) -> Self {
        let limits = config.limits.clamped();
        if limits != config.limits {
            warn!(
                requested = config.limits.max_conditions,
                max = limits.max_conditions,
                "max_conditions clamped"
            );
            config.limits = limits;
        }
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    fn limits(&self) -> &Limits {
        &self.config.limits
    }

    /// Lex and parse the text into the flat, source-ordered node sequence.
    pub fn parse(&self, text: &str) -> Result<Vec<Node>> {
        let tokens: Vec<_> = Lexer::new(text).collect();
        Parser::new(&tokens).with_limits(self.limits()).parse()
    }

    /// Run every stage up to and including the postfix transform.
    pub fn to_postfix(&self, text: &str) -> Result<Vec<Node>> {
        self.postfix_stages(text).inspect_err(|err| report(text, err))
    }

    fn postfix_stages(&self, text: &str) -> Result<Vec<Node>> {
        let nodes = self.parse(text)?;
        debug!(nodes = nodes.len(), "parsed predicate");

        let optimized = optimizer::optimize(&nodes, self.limits())?;
        debug!(nodes = optimized.len(), "optimized predicate");

        let postfix = rpn::to_postfix(&optimized, self.limits())?;
        debug!(nodes = postfix.len(), "converted predicate to postfix");
        Ok(postfix)
    }

    /// Compile a stored query into its wire document.
    pub fn compile(&self, text: &str) -> Result<WireDocument> {
        let document = self.postfix_stages(text).and_then(|postfix| {
            if postfix.is_empty() {
                debug!("query has no predicate");
                return Ok(WireDocument::default());
            }
            let root = wire::serialize(&postfix, self.limits())?;
            debug!(leaves = root.leaf_count(), "serialized wire document");
            Ok(WireDocument::new(Some(root)))
        });
        document.inspect_err(|err| report(text, err))
    }
}

/// Defects are logged loudly; everything else is the caller's to surface.
fn report(text: &str, err: &CompileError) {
    if err.is_defect() {
        error!(error = %err, query = text, "predicate compiler defect");
    } else {
        debug!(error = %err, "predicate rejected");
    }
}
