//! Block list to template source.
//!
//! ```text
//! Blocks → per-kind generation rule → joined template source
//! ```
//!
//! Compilation is total and deterministic: the same block list always
//! yields byte-identical source, and a block that cannot be generated is
//! skipped instead of failing the whole report.
//!
//! # Example
//!
//! ```
//! use kpi_report::blocks::{Block, BlockKind, SingleValueBlock};
//! use kpi_report::compile::compile;
//!
//! let blocks = vec![Block::with_id(
//!     "v1",
//!     BlockKind::SingleValue(SingleValueBlock {
//!         kpi_id: Some(7),
//!         field_key: "total_budget".into(),
//!         sub_field_key: None,
//!         entry_index: 0,
//!     }),
//! )];
//! let source = compile(&blocks);
//! assert!(source.contains(r#"get_kpi_field_value(kpis, 7, "total_budget", None, 0)"#));
//! ```

use crate::blocks::{Block, BlockId};
use crate::codegen::{self, SkipReason};

/// Source emitted for an empty block list.
pub const EMPTY_PLACEHOLDER: &str =
    "<p class=\"report-empty\">No content blocks defined for this report.</p>";

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Source emitted when the block list is empty.
    pub empty_placeholder: String,

    /// Text placed between consecutive blocks.
    pub block_separator: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            empty_placeholder: EMPTY_PLACEHOLDER.to_string(),
            block_separator: "\n".to_string(),
        }
    }
}

impl CompileOptions {
    /// Set the empty-list placeholder.
    pub fn with_empty_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.empty_placeholder = placeholder.into();
        self
    }

    /// Set the separator between blocks.
    pub fn with_block_separator(mut self, separator: impl Into<String>) -> Self {
        self.block_separator = separator.into();
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// A block the compiler left out of the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBlock {
    pub id: BlockId,
    pub type_name: &'static str,
    pub reason: SkipReason,
}

/// Result of compiling a block list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutput {
    /// The generated template source.
    pub source: String,

    /// Number of blocks that produced markup.
    pub emitted: usize,

    /// Blocks that produced nothing, in list order.
    pub skipped: Vec<SkippedBlock>,
}

// ============================================================================
// Compilation Functions
// ============================================================================

/// Compile a block list with default options.
pub fn compile(blocks: &[Block]) -> String {
    compile_with(blocks, &CompileOptions::default()).source
}

/// Compile a block list.
pub fn compile_with(blocks: &[Block], options: &CompileOptions) -> CompileOutput {
    if blocks.is_empty() {
        return CompileOutput {
            source: options.empty_placeholder.clone(),
            emitted: 0,
            skipped: Vec::new(),
        };
    }

    let mut parts = Vec::with_capacity(blocks.len());
    let mut skipped = Vec::new();

    for block in blocks {
        match codegen::generate(block) {
            Ok(markup) => parts.push(markup),
            Err(reason) => {
                log::debug!(
                    "skipping {} block {}: {}",
                    block.type_name(),
                    block.id,
                    reason
                );
                skipped.push(SkippedBlock {
                    id: block.id.clone(),
                    type_name: block.type_name(),
                    reason,
                });
            }
        }
    }

    CompileOutput {
        emitted: parts.len(),
        source: parts.join(&options.block_separator),
        skipped,
    }
}
