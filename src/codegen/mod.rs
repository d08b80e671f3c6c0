//! Per-kind generation rules.
//!
//! Each block kind has exactly one rule. The dispatch in [`generate`] is an
//! exhaustive match, so a new [`BlockKind`] variant does not build until it
//! has a rule here.

mod basic;
mod domain;
mod kpi;
mod table;

use thiserror::Error;

use crate::blocks::{Block, BlockKind};

pub use kpi::KpiLayout;

/// Why a block produced no markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("unsupported block type")]
    UnsupportedType,

    #[error("no KPI selected")]
    MissingKpi,

    #[error("no field selected")]
    BlankFieldKey,
}

/// Generate the markup for one block.
pub fn generate(block: &Block) -> Result<String, SkipReason> {
    let markup = match &block.kind {
        BlockKind::Title(b) => basic::title(b),
        BlockKind::SectionHeading(b) => basic::section_heading(b),
        BlockKind::Spacer(b) => basic::spacer(b),
        BlockKind::Text(b) => basic::text(b),
        BlockKind::DomainList(b) => domain::domain_list(&b.domain_ids),
        BlockKind::DomainCategories(b) => domain::domain_categories(&b.domain_ids),
        BlockKind::DomainKpis(b) => domain::domain_kpis(&b.domain_ids),
        BlockKind::KpiTable(b) => kpi::kpi_block(
            &b.kpi_ids,
            &b.field_keys,
            KpiLayout::Table {
                one_table_per_kpi: b.one_table_per_kpi,
            },
        ),
        BlockKind::KpiGrid(b) => kpi::kpi_block(&b.kpi_ids, &b.field_keys, KpiLayout::Grid),
        BlockKind::KpiList(b) => kpi::kpi_block(&b.kpi_ids, &b.field_keys, KpiLayout::List),
        BlockKind::SimpleTable(b) => table::simple_table(b),
        BlockKind::SingleValue(b) => table::single_value(b)?,
        BlockKind::Unsupported => return Err(SkipReason::UnsupportedType),
    };
    Ok(markup)
}
