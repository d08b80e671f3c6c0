//! Block list / raw template reconciliation.
//!
//! A report template has exactly one authoritative body. While the block
//! list is authoritative, the raw source is derived from it and read-only.
//! Adopting the generated source as raw discards the block list, and there
//! is no way back.
//!
//! - [`record`] holds the persisted record and the save-boundary policy
//!   ([`apply_update`]).
//! - [`session`] is the in-memory editing session that produces updates.
//! - [`fingerprint`] hashes saved bodies so acknowledgements can be matched.

pub mod fingerprint;
pub mod record;
pub mod session;

use thiserror::Error;

use crate::blocks::BlockId;

pub use fingerprint::fingerprint;
pub use record::{apply_update, Authority, BlocksPatch, ReportTemplate, TemplateUpdate};
pub use session::{EditorSession, RawEditor, SaveTicket};

/// Errors raised by the save boundary and the editing session.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("raw source cannot be saved while the block list is authoritative")]
    RawWhileBlocksAuthoritative,

    #[error("a raw template cannot be converted back into blocks")]
    NoReverseTransition,

    #[error("update sets both the block list and the raw source")]
    BothBodies,

    #[error("cannot save an empty block list")]
    EmptyBlockList,

    #[error("the block list can only be cleared together with a raw source")]
    ClearWithoutRaw,

    #[error("the raw editor is read-only while the block list is authoritative")]
    RawEditorReadOnly,

    #[error("the block list is not authoritative")]
    NotBlocksAuthoritative,

    #[error("block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("position {index} is out of range for {len} blocks")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("failed to fingerprint body: {0}")]
    Fingerprint(#[from] serde_json::Error),
}
