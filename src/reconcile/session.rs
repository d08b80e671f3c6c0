//! The in-memory editing session for one report template.

use super::fingerprint::fingerprint;
use super::record::{Authority, ReportTemplate, TemplateUpdate};
use super::ReconcileError;
use crate::blocks::{Block, BlockId, BlockKind};
use crate::compile::{compile_with, CompileOptions};

/// What the raw editor shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEditor<'a> {
    pub text: &'a str,
    /// False while the block list is authoritative; the text is then the
    /// generated source.
    pub writable: bool,
}

/// Identifies one save request so a late acknowledgement can be matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    pub revision: u64,
    /// SHA-256 of the update that was sent.
    pub fingerprint: String,
    pub authority: Authority,
}

/// Editing state for one report template.
///
/// Every edit bumps the revision and, in blocks mode, recompiles the
/// generated source. The session never reads blocks back out of raw text.
#[derive(Debug, Clone)]
pub struct EditorSession {
    template_id: Option<i64>,
    mode: Authority,
    server_authority: Authority,
    blocks: Vec<Block>,
    raw_text: String,
    generated: String,
    options: CompileOptions,
    revision: u64,
    saved_revision: u64,
    acked_revision: Option<u64>,
    // The server has not yet confirmed the block list was cleared.
    pending_clear: bool,
}

impl EditorSession {
    pub fn load(record: &ReportTemplate) -> Self {
        Self::load_with(record, CompileOptions::default())
    }

    /// Start a session from a stored record.
    ///
    /// A pristine record starts in blocks mode with an empty list.
    pub fn load_with(record: &ReportTemplate, options: CompileOptions) -> Self {
        let server_authority = record.authority();
        let mode = if record.is_pristine() {
            Authority::Blocks
        } else {
            server_authority
        };
        let blocks = match mode {
            Authority::Blocks => record.body_blocks.clone().unwrap_or_default(),
            Authority::Raw => Vec::new(),
        };

        let mut session = Self {
            template_id: record.id,
            mode,
            server_authority,
            blocks,
            raw_text: record.body_template.clone().unwrap_or_default(),
            generated: String::new(),
            options,
            revision: 0,
            saved_revision: 0,
            acked_revision: None,
            pending_clear: false,
        };
        session.regenerate();
        log::debug!(
            "template {:?}: session loaded in {:?} mode ({} blocks)",
            session.template_id,
            session.mode,
            session.blocks.len()
        );
        session
    }

    pub fn mode(&self) -> Authority {
        self.mode
    }

    /// Authority of the last body the server acknowledged.
    pub fn server_authority(&self) -> Authority {
        self.server_authority
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Source compiled from the current block list. Empty in raw mode.
    pub fn generated_source(&self) -> &str {
        &self.generated
    }

    pub fn raw_editor(&self) -> RawEditor<'_> {
        match self.mode {
            Authority::Blocks => RawEditor {
                text: &self.generated,
                writable: false,
            },
            Authority::Raw => RawEditor {
                text: &self.raw_text,
                writable: true,
            },
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    /// Replace the raw text. Only allowed in raw mode.
    pub fn edit_raw(&mut self, text: impl Into<String>) -> Result<(), ReconcileError> {
        if self.mode != Authority::Raw {
            log::warn!(
                "template {:?}: raw edit rejected in blocks mode",
                self.template_id
            );
            return Err(ReconcileError::RawEditorReadOnly);
        }
        self.raw_text = text.into();
        self.touch();
        Ok(())
    }

    /// Append a new block with a fresh id.
    pub fn add_block(&mut self, kind: BlockKind) -> Result<BlockId, ReconcileError> {
        let len = self.blocks.len();
        self.insert_block(len, kind)
    }

    pub fn insert_block(&mut self, index: usize, kind: BlockKind) -> Result<BlockId, ReconcileError> {
        self.require_blocks()?;
        let len = self.blocks.len();
        if index > len {
            return Err(ReconcileError::IndexOutOfRange { index, len });
        }
        let block = Block::new(kind);
        let id = block.id.clone();
        self.blocks.insert(index, block);
        self.touch();
        Ok(id)
    }

    /// Replace a block's configuration, keeping its id and position.
    pub fn update_block(&mut self, id: &BlockId, kind: BlockKind) -> Result<(), ReconcileError> {
        self.require_blocks()?;
        let index = self.position(id)?;
        self.blocks[index].kind = kind;
        self.touch();
        Ok(())
    }

    /// Swap a block with its predecessor. Returns false if it is already first.
    pub fn move_up(&mut self, id: &BlockId) -> Result<bool, ReconcileError> {
        self.require_blocks()?;
        let index = self.position(id)?;
        if index == 0 {
            return Ok(false);
        }
        self.blocks.swap(index - 1, index);
        self.touch();
        Ok(true)
    }

    /// Swap a block with its successor. Returns false if it is already last.
    pub fn move_down(&mut self, id: &BlockId) -> Result<bool, ReconcileError> {
        self.require_blocks()?;
        let index = self.position(id)?;
        if index + 1 >= self.blocks.len() {
            return Ok(false);
        }
        self.blocks.swap(index, index + 1);
        self.touch();
        Ok(true)
    }

    pub fn delete_block(&mut self, id: &BlockId) -> Result<Block, ReconcileError> {
        self.require_blocks()?;
        let index = self.position(id)?;
        let block = self.blocks.remove(index);
        self.touch();
        Ok(block)
    }

    /// Adopt the generated source as the raw template and discard the
    /// block list. This cannot be undone.
    ///
    /// Returns the save request for the transition.
    pub fn adopt_generated_as_raw(&mut self) -> Result<(TemplateUpdate, SaveTicket), ReconcileError> {
        self.require_blocks()?;
        log::info!(
            "template {:?}: adopting generated source as raw, discarding {} blocks",
            self.template_id,
            self.blocks.len()
        );
        self.raw_text = std::mem::take(&mut self.generated);
        self.blocks.clear();
        self.mode = Authority::Raw;
        self.pending_clear = true;
        self.touch();
        self.save()
    }

    /// Build the update for the current state.
    ///
    /// Until the server acknowledges an adoption, raw saves keep clearing
    /// the block list so a retry cannot be rejected.
    pub fn save(&self) -> Result<(TemplateUpdate, SaveTicket), ReconcileError> {
        let update = match self.mode {
            Authority::Blocks => {
                if self.blocks.is_empty() {
                    log::warn!(
                        "template {:?}: save rejected: {}",
                        self.template_id,
                        ReconcileError::EmptyBlockList
                    );
                    return Err(ReconcileError::EmptyBlockList);
                }
                TemplateUpdate::blocks(self.blocks.clone())
            }
            Authority::Raw if self.pending_clear => TemplateUpdate::adopt_raw(self.raw_text.clone()),
            Authority::Raw => TemplateUpdate::raw(self.raw_text.clone()),
        };
        let ticket = SaveTicket {
            revision: self.revision,
            fingerprint: fingerprint(&update)?,
            authority: self.mode,
        };
        log::debug!(
            "template {:?}: saving revision {} ({:?})",
            self.template_id,
            ticket.revision,
            ticket.authority
        );
        Ok((update, ticket))
    }

    /// Record a successful save. Returns true if the session is now clean.
    ///
    /// Acknowledgements older than one already seen are ignored.
    pub fn on_saved(&mut self, ticket: &SaveTicket) -> bool {
        if self.acked_revision.is_some_and(|acked| ticket.revision <= acked) {
            log::debug!(
                "template {:?}: ignoring stale acknowledgement for revision {}",
                self.template_id,
                ticket.revision
            );
            return false;
        }
        self.acked_revision = Some(ticket.revision);

        if self.server_authority != ticket.authority {
            log::info!(
                "template {:?}: server now {:?}-authoritative",
                self.template_id,
                ticket.authority
            );
        }
        self.server_authority = ticket.authority;
        if ticket.authority == Authority::Raw {
            self.pending_clear = false;
        }

        if ticket.revision == self.revision {
            self.saved_revision = self.revision;
            true
        } else {
            log::debug!(
                "template {:?}: revision {} saved, session is at {}",
                self.template_id,
                ticket.revision,
                self.revision
            );
            false
        }
    }

    /// Record a failed save. In-memory edits are kept so the save can be retried.
    pub fn on_save_failed(&mut self, ticket: &SaveTicket, reason: &str) {
        log::warn!(
            "template {:?}: save of revision {} failed, edits kept: {}",
            self.template_id,
            ticket.revision,
            reason
        );
    }

    fn require_blocks(&self) -> Result<(), ReconcileError> {
        match self.mode {
            Authority::Blocks => Ok(()),
            Authority::Raw => Err(ReconcileError::NotBlocksAuthoritative),
        }
    }

    fn position(&self, id: &BlockId) -> Result<usize, ReconcileError> {
        self.blocks
            .iter()
            .position(|b| &b.id == id)
            .ok_or_else(|| ReconcileError::BlockNotFound(id.clone()))
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.regenerate();
    }

    fn regenerate(&mut self) {
        self.generated = match self.mode {
            Authority::Blocks => compile_with(&self.blocks, &self.options).source,
            Authority::Raw => String::new(),
        };
    }
}
