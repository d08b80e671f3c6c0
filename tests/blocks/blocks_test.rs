use kpi_report::blocks::{
    load_blocks, load_blocks_value, Block, BlockId, BlockKind, BlockLoadError, Cell, FormulaCell,
    KpiCell, SimpleTableBlock, SingleValueBlock, TableRow, TextCell, TitleBlock,
};
use kpi_report::formula::AggregateFn;
use serde_json::json;

#[test]
fn test_load_mixed_list_in_order() {
    let blocks = load_blocks(
        r#"[
            {"id": "t", "type": "title", "useTemplateName": true},
            {"id": "h", "type": "section_heading", "text": "Budget", "level": 3},
            {"id": "v", "type": "single_value", "kpiId": 7, "fieldKey": "total_budget", "entryIndex": 0}
        ]"#,
    )
    .unwrap();

    let ids: Vec<&str> = blocks.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["t", "h", "v"]);
    assert_eq!(
        blocks[2].kind,
        BlockKind::SingleValue(SingleValueBlock {
            kpi_id: Some(7),
            field_key: "total_budget".into(),
            sub_field_key: None,
            entry_index: 0,
        })
    );
}

#[test]
fn test_missing_config_takes_defaults() {
    let blocks = load_blocks(r#"[{"id": "t", "type": "title"}, {"id": "k", "type": "kpi_table"}]"#)
        .unwrap();
    assert_eq!(blocks[0].kind, BlockKind::Title(TitleBlock::default()));
    assert_eq!(blocks[1].kind, BlockKind::default_for("kpi_table").unwrap());
}

#[test]
fn test_simple_table_cells() {
    let value = json!([{
        "id": "tbl",
        "type": "simple_table",
        "rows": [{"cells": [
            {"type": "text", "text": "<b>bold</b>"},
            {"type": "formula", "kpiId": 3, "formula": "a + SUM_ITEMS(rows, val)", "entryIndex": 1},
            {"type": "kpi", "kpiId": 2, "fieldKey": "rows", "subFieldKey": "amt",
             "subFieldGroupFn": "AVG_ITEMS", "asGroup": false},
            {"type": "sparkline"}
        ]}]
    }]);
    let blocks = load_blocks_value(value).unwrap();
    let BlockKind::SimpleTable(table) = &blocks[0].kind else {
        panic!("expected simple_table");
    };
    assert_eq!(
        table.rows[0].cells,
        vec![
            Cell::Text(TextCell {
                text: "<b>bold</b>".into()
            }),
            Cell::Formula(FormulaCell {
                kpi_id: Some(3),
                formula: "a + SUM_ITEMS(rows, val)".into(),
                entry_index: 1,
            }),
            Cell::Kpi(
                KpiCell::new(2, "rows")
                    .with_sub_field("amt")
                    .with_group_fn(AggregateFn::Avg)
            ),
            Cell::Unsupported,
        ]
    );
}

#[test]
fn test_lenient_cell_fields() {
    let value = json!([{
        "id": "tbl",
        "type": "simple_table",
        "rows": [{"cells": [
            {"type": "text", "content": "legacy key"},
            {"type": "kpi", "kpiId": 2, "fieldKey": "rows", "subFieldGroupFn": "",
             "asGroup": null, "entryIndex": null}
        ]}]
    }]);
    let blocks = load_blocks_value(value).unwrap();
    let BlockKind::SimpleTable(table) = &blocks[0].kind else {
        panic!("expected simple_table");
    };
    assert_eq!(table.rows[0].cells[0], Cell::text("legacy key"));
    assert_eq!(table.rows[0].cells[1], Cell::kpi(2, "rows"));
}

#[test]
fn test_round_trip_through_json() {
    let blocks = vec![
        Block::with_id(
            "tbl",
            BlockKind::SimpleTable(SimpleTableBlock {
                rows: vec![TableRow::new(vec![
                    Cell::text("Total"),
                    KpiCell::new(4, "lines").grouped().at_entry(2).into(),
                ])],
            }),
        ),
        Block::with_id("x", BlockKind::default_for("domain_kpis").unwrap()),
    ];
    let json = serde_json::to_string(&blocks).unwrap();
    assert_eq!(load_blocks(&json).unwrap(), blocks);
}

#[test]
fn test_unsupported_block_is_kept() {
    let blocks = load_blocks(r#"[{"id": "c", "type": "chart"}]"#).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].type_name(), "unsupported");
}

#[test]
fn test_generated_ids_are_unique() {
    let a = BlockId::generate();
    let b = BlockId::generate();
    assert_ne!(a, b);
    assert_eq!(a.as_str().len(), 36);
}

#[test]
fn test_not_a_list() {
    assert!(matches!(load_blocks("\"text\""), Err(BlockLoadError::NotAList("a string"))));
    assert!(matches!(load_blocks("[1,"), Err(BlockLoadError::Json(_))));
}
