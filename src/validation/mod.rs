//! Editor-time validation of blocks against the metadata catalog.
//!
//! The compiler skips what it cannot generate without complaint. These
//! checks are what the editor shows the user instead, so a half-configured
//! block is visible before it silently renders nothing.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::blocks::{Block, BlockId, BlockKind, Cell, KpiCell, SingleValueBlock};
use crate::formula::{self, lexer, FieldRef};
use crate::metadata::Catalog;

/// Field keys that can be written bare inside a formula.
static BARE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Whether a key reads back as a field reference when written bare in a
/// formula. Keywords match the identifier shape but lex as functions.
fn is_formula_safe(key: &str) -> bool {
    BARE_KEY_RE.is_match(key) && !lexer::is_keyword(key)
}

/// Position of a cell inside a `simple_table` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub cell: usize,
}

/// What is wrong.
#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    /// Two blocks share an id.
    DuplicateBlockId,
    /// The block type is not known to the compiler.
    UnsupportedType,
    /// No KPI selected.
    MissingKpi,
    /// No field selected.
    BlankFieldKey,
    /// No formula text.
    BlankFormula,
    UnknownKpi(i64),
    UnknownDomain(i64),
    UnknownField { kpi_id: Option<i64>, field_key: String },
    UnknownSubField {
        kpi_id: i64,
        field_key: String,
        sub_field_key: String,
    },
    /// A group function is set but no sub-field to aggregate.
    GroupFnWithoutSubField,
    /// "As group" on a field without repeating rows.
    GroupOnScalarField { field_key: String },
    /// A key that cannot appear bare inside a formula.
    NotFormulaSafe { key: String },
    FormulaSyntax(String),
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub block_id: BlockId,
    pub cell: Option<CellRef>,
    pub issue: Issue,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::DuplicateBlockId => write!(f, "duplicate block id"),
            Issue::UnsupportedType => write!(f, "unsupported block type"),
            Issue::MissingKpi => write!(f, "no KPI selected"),
            Issue::BlankFieldKey => write!(f, "no field selected"),
            Issue::BlankFormula => write!(f, "formula is empty"),
            Issue::UnknownKpi(id) => write!(f, "KPI {} is not available to this report", id),
            Issue::UnknownDomain(id) => write!(f, "domain {} does not exist", id),
            Issue::UnknownField {
                kpi_id: Some(kpi_id),
                field_key,
            } => write!(f, "KPI {} has no field '{}'", kpi_id, field_key),
            Issue::UnknownField {
                kpi_id: None,
                field_key,
            } => write!(f, "no KPI has a field '{}'", field_key),
            Issue::UnknownSubField {
                kpi_id,
                field_key,
                sub_field_key,
            } => write!(
                f,
                "field '{}' of KPI {} has no sub-field '{}'",
                field_key, kpi_id, sub_field_key
            ),
            Issue::GroupFnWithoutSubField => {
                write!(f, "a group function needs a sub-field to aggregate")
            }
            Issue::GroupOnScalarField { field_key } => {
                write!(f, "field '{}' has no rows to show as a group", field_key)
            }
            Issue::NotFormulaSafe { key } => {
                write!(f, "key '{}' cannot be used inside a formula", key)
            }
            Issue::FormulaSyntax(message) => write!(f, "{}", message),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell {
            Some(CellRef { row, cell }) => write!(
                f,
                "block {} (row {}, cell {}): {}",
                self.block_id,
                row + 1,
                cell + 1,
                self.issue
            ),
            None => write!(f, "block {}: {}", self.block_id, self.issue),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a block list.
pub fn validate(blocks: &[Block], catalog: &Catalog) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_unique_ids(blocks, &mut errors);

    for block in blocks {
        let mut ctx = BlockContext {
            block_id: &block.id,
            catalog,
            errors: &mut errors,
        };
        match &block.kind {
            BlockKind::Title(_)
            | BlockKind::SectionHeading(_)
            | BlockKind::Spacer(_)
            | BlockKind::Text(_) => {}
            BlockKind::DomainList(b) | BlockKind::DomainCategories(b) | BlockKind::DomainKpis(b) => {
                for &id in &b.domain_ids {
                    if catalog.domain(id).is_none() {
                        ctx.push(None, Issue::UnknownDomain(id));
                    }
                }
            }
            BlockKind::KpiTable(b) => ctx.kpi_selection(&b.kpi_ids, &b.field_keys),
            BlockKind::KpiGrid(b) | BlockKind::KpiList(b) => {
                ctx.kpi_selection(&b.kpi_ids, &b.field_keys)
            }
            BlockKind::SimpleTable(b) => {
                for (r, row) in b.rows.iter().enumerate() {
                    for (c, cell) in row.cells.iter().enumerate() {
                        ctx.cell(CellRef { row: r, cell: c }, cell);
                    }
                }
            }
            BlockKind::SingleValue(b) => ctx.single_value(b),
            BlockKind::Unsupported => ctx.push(None, Issue::UnsupportedType),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_unique_ids(blocks: &[Block], errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for block in blocks {
        if !seen.insert(&block.id) {
            errors.push(ValidationError {
                block_id: block.id.clone(),
                cell: None,
                issue: Issue::DuplicateBlockId,
            });
        }
    }
}

struct BlockContext<'a> {
    block_id: &'a BlockId,
    catalog: &'a Catalog,
    errors: &'a mut Vec<ValidationError>,
}

impl BlockContext<'_> {
    fn push(&mut self, cell: Option<CellRef>, issue: Issue) {
        self.errors.push(ValidationError {
            block_id: self.block_id.clone(),
            cell,
            issue,
        });
    }

    fn kpi_selection(&mut self, kpi_ids: &[i64], field_keys: &[String]) {
        for &id in kpi_ids {
            if self.catalog.kpi(id).is_none() {
                self.push(None, Issue::UnknownKpi(id));
            }
        }
        for key in field_keys {
            let found = if kpi_ids.is_empty() {
                self.catalog.has_field_key(key)
            } else {
                kpi_ids
                    .iter()
                    .any(|&id| self.catalog.field(id, key).is_some())
            };
            if !found {
                self.push(
                    None,
                    Issue::UnknownField {
                        kpi_id: None,
                        field_key: key.clone(),
                    },
                );
            }
        }
    }

    fn single_value(&mut self, block: &SingleValueBlock) {
        let Some(kpi_id) = block.kpi_id else {
            self.push(None, Issue::MissingKpi);
            return;
        };
        self.field_reference(None, kpi_id, &block.field_key, block.sub_field_key.as_deref());
    }

    fn cell(&mut self, at: CellRef, cell: &Cell) {
        match cell {
            Cell::Text(_) | Cell::Unsupported => {}
            Cell::Kpi(c) => self.kpi_cell(at, c),
            Cell::Formula(c) => {
                let Some(kpi_id) = c.kpi_id else {
                    self.push(Some(at), Issue::MissingKpi);
                    return;
                };
                if c.formula.trim().is_empty() {
                    self.push(Some(at), Issue::BlankFormula);
                    return;
                }
                self.formula(at, kpi_id, &c.formula);
            }
        }
    }

    fn kpi_cell(&mut self, at: CellRef, cell: &KpiCell) {
        let Some(kpi_id) = cell.kpi_id else {
            self.push(Some(at), Issue::MissingKpi);
            return;
        };
        let sub_field = cell.sub_field_key.as_deref().filter(|s| !s.trim().is_empty());
        if !self.field_reference(Some(at), kpi_id, &cell.field_key, sub_field) {
            return;
        }

        let field_key = cell.field_key.trim();
        if cell.as_group {
            let repeating = self
                .catalog
                .field(kpi_id, field_key)
                .is_some_and(|f| f.field_type.is_repeating());
            if !repeating {
                self.push(
                    Some(at),
                    Issue::GroupOnScalarField {
                        field_key: field_key.to_string(),
                    },
                );
            }
        } else if let Some(func) = cell.sub_field_group_fn {
            match sub_field {
                None => self.push(Some(at), Issue::GroupFnWithoutSubField),
                Some(sub) => {
                    let keys = if func.takes_sub_field() {
                        vec![field_key, sub]
                    } else {
                        vec![field_key]
                    };
                    for key in keys {
                        if !is_formula_safe(key) {
                            self.push(
                                Some(at),
                                Issue::NotFormulaSafe {
                                    key: key.to_string(),
                                },
                            );
                        }
                    }
                }
            }
        }
    }

    /// Check a KPI/field/sub-field triple. Returns false when the field
    /// itself could not be resolved.
    fn field_reference(
        &mut self,
        at: Option<CellRef>,
        kpi_id: i64,
        field_key: &str,
        sub_field_key: Option<&str>,
    ) -> bool {
        let field_key = field_key.trim();
        if field_key.is_empty() {
            self.push(at, Issue::BlankFieldKey);
            return false;
        }
        let Some(kpi) = self.catalog.kpi(kpi_id) else {
            self.push(at, Issue::UnknownKpi(kpi_id));
            return false;
        };
        let Some(field) = kpi.field(field_key) else {
            self.push(
                at,
                Issue::UnknownField {
                    kpi_id: Some(kpi_id),
                    field_key: field_key.to_string(),
                },
            );
            return false;
        };
        if let Some(sub) = sub_field_key.map(str::trim).filter(|s| !s.is_empty()) {
            if field.sub_field(sub).is_none() {
                self.push(
                    at,
                    Issue::UnknownSubField {
                        kpi_id,
                        field_key: field_key.to_string(),
                        sub_field_key: sub.to_string(),
                    },
                );
            }
        }
        true
    }

    fn formula(&mut self, at: CellRef, kpi_id: i64, text: &str) {
        let result = formula::parse(text);
        if result.has_errors() {
            for diag in result.errors() {
                self.push(Some(at), Issue::FormulaSyntax(diag.message.clone()));
            }
            return;
        }
        let Some(expr) = result.expr else {
            return;
        };
        if self.catalog.kpi(kpi_id).is_none() {
            self.push(Some(at), Issue::UnknownKpi(kpi_id));
            return;
        }
        let mut reported: Vec<Issue> = Vec::new();
        for reference in expr.references() {
            if let Some(issue) = self.formula_reference(kpi_id, reference) {
                if !reported.contains(&issue) {
                    reported.push(issue.clone());
                    self.push(Some(at), issue);
                }
            }
        }
    }

    /// Resolve one formula reference against the catalog.
    fn formula_reference(&self, kpi_id: i64, reference: FieldRef<'_>) -> Option<Issue> {
        let unknown_field = |kpi_id: i64, field_key: &str| Issue::UnknownField {
            kpi_id: Some(kpi_id),
            field_key: field_key.to_string(),
        };
        match reference {
            FieldRef::Scalar(key) | FieldRef::Rows(key) => self
                .catalog
                .field(kpi_id, key)
                .is_none()
                .then(|| unknown_field(kpi_id, key)),
            // An unknown repeating field is already reported as `Rows`.
            FieldRef::SubField {
                field_key,
                sub_field_key,
            } => {
                let field = self.catalog.field(kpi_id, field_key)?;
                field.sub_field(sub_field_key).is_none().then(|| Issue::UnknownSubField {
                    kpi_id,
                    field_key: field_key.to_string(),
                    sub_field_key: sub_field_key.to_string(),
                })
            }
            FieldRef::OtherKpi {
                kpi_id: other,
                field_key,
            } => match self.catalog.kpi(other) {
                None => Some(Issue::UnknownKpi(other)),
                Some(kpi) => kpi
                    .field(field_key)
                    .is_none()
                    .then(|| unknown_field(other, field_key)),
            },
        }
    }
}
