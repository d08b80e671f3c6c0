//! The persisted report template record and the save-boundary policy.

use serde::{Deserialize, Serialize};

use super::ReconcileError;
use crate::blocks::de::stored_blocks;
use crate::blocks::Block;

/// Which body of a template is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    /// The block list is the source; the raw body is stale.
    Blocks,
    /// The raw body is the source; there is no block list.
    Raw,
}

/// A stored report template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportTemplate {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "stored_blocks")]
    pub body_blocks: Option<Vec<Block>>,
    #[serde(default)]
    pub body_template: Option<String>,
}

impl ReportTemplate {
    pub fn authority(&self) -> Authority {
        match &self.body_blocks {
            Some(blocks) if !blocks.is_empty() => Authority::Blocks,
            _ => Authority::Raw,
        }
    }

    /// Neither body has ever been written.
    pub fn is_pristine(&self) -> bool {
        self.body_template.is_none() && self.body_blocks.as_ref().is_none_or(Vec::is_empty)
    }
}

/// A change to `body_blocks`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlocksPatch {
    /// Persist this block list.
    Replace(Vec<Block>),
    /// Discard the block list. Serializes as `null`.
    Clear,
}

/// The body part of a template update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemplateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_blocks: Option<BlocksPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_template: Option<String>,
}

impl TemplateUpdate {
    pub fn blocks(blocks: Vec<Block>) -> Self {
        Self {
            body_blocks: Some(BlocksPatch::Replace(blocks)),
            body_template: None,
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            body_blocks: None,
            body_template: Some(text.into()),
        }
    }

    /// Adopt `text` as the raw body and discard the block list.
    pub fn adopt_raw(text: impl Into<String>) -> Self {
        Self {
            body_blocks: Some(BlocksPatch::Clear),
            body_template: Some(text.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.body_blocks.is_none() && self.body_template.is_none()
    }
}

/// Apply a body update to a stored record, enforcing the one-way policy.
///
/// Returns the authority after the update. A rejected update leaves the
/// record unchanged.
pub fn apply_update(
    record: &mut ReportTemplate,
    update: TemplateUpdate,
) -> Result<Authority, ReconcileError> {
    let current = record.authority();

    let result = match (update.body_blocks, update.body_template) {
        (None, None) => Ok(current),

        (Some(BlocksPatch::Replace(_)), Some(_)) => Err(ReconcileError::BothBodies),

        (Some(BlocksPatch::Replace(blocks)), None) => {
            if blocks.is_empty() {
                Err(ReconcileError::EmptyBlockList)
            } else if current == Authority::Raw && !record.is_pristine() {
                Err(ReconcileError::NoReverseTransition)
            } else {
                record.body_blocks = Some(blocks);
                Ok(Authority::Blocks)
            }
        }

        (Some(BlocksPatch::Clear), None) => Err(ReconcileError::ClearWithoutRaw),

        (Some(BlocksPatch::Clear), Some(text)) => {
            if current == Authority::Blocks {
                log::info!(
                    "template {:?}: block list discarded, raw body adopted",
                    record.id
                );
            }
            record.body_blocks = None;
            record.body_template = Some(text);
            Ok(Authority::Raw)
        }

        (None, Some(text)) => {
            if current == Authority::Blocks {
                Err(ReconcileError::RawWhileBlocksAuthoritative)
            } else {
                record.body_template = Some(text);
                Ok(Authority::Raw)
            }
        }
    };

    if let Err(e) = &result {
        log::warn!("template {:?}: save rejected: {}", record.id, e);
    }
    result
}
