use kpi_report::blocks::{Block, BlockKind, DomainBlock, KpiBlock, KpiTableBlock};
use kpi_report::compile::compile;

fn kpi_table(kpi_ids: Vec<i64>, field_keys: Vec<&str>, one_table_per_kpi: bool) -> String {
    compile(&[Block::with_id(
        "k",
        BlockKind::KpiTable(KpiTableBlock {
            kpi_ids,
            field_keys: field_keys.into_iter().map(String::from).collect(),
            one_table_per_kpi,
        }),
    )])
}

fn assert_balanced(out: &str) {
    assert_eq!(
        out.matches("{% for").count(),
        out.matches("{% endfor %}").count(),
        "unbalanced for in:\n{}",
        out
    );
    assert_eq!(
        out.matches("{% if").count(),
        out.matches("{% endif %}").count(),
        "unbalanced if in:\n{}",
        out
    );
}

#[test]
fn test_wildcard_selects_all_kpis_and_fields() {
    let out = kpi_table(vec![], vec![], true);
    assert!(out.contains("{% for kpi in kpis %}"));
    assert!(out.contains("{% for field in entry.fields %}"));
    assert!(!out.contains("{% set"));
    assert!(!out.contains("kpi_ids_set"));
    assert_balanced(&out);
}

#[test]
fn test_kpi_ids_without_field_keys_are_filtered() {
    let out = kpi_table(vec![4], vec![], true);
    assert!(out.contains("{% set kpi_ids_set = [4] %}"));
    assert!(out.contains("{% for kpi in kpis if kpi.kpi_id in kpi_ids_set %}"));
    assert!(!out.contains("{% for kpi in kpis %}"));
    assert!(!out.contains("field_keys_list"));
    assert_balanced(&out);
}

#[test]
fn test_kpi_ids_and_field_keys() {
    let out = kpi_table(vec![1, 2], vec!["budget", "spent"], false);
    assert!(out.starts_with(
        "{% set kpi_ids_set = [1, 2] %}\n{% set field_keys_list = [\"budget\", \"spent\"] %}\n"
    ));
    assert!(out.contains("{% for field_key in field_keys_list %}"));
    assert!(out.contains("{% for field in entry.fields if field.field_key == field_key %}"));
    assert_balanced(&out);
}

#[test]
fn test_one_table_per_kpi_toggle() {
    let per_kpi = kpi_table(vec![], vec![], true);
    assert!(per_kpi.contains("<h3 class=\"report-kpi-name\">{{ kpi.kpi_name }}</h3>"));
    assert!(!per_kpi.contains("<th>KPI</th>"));

    let combined = kpi_table(vec![], vec![], false);
    assert!(combined.starts_with("<table class=\"report-kpi-table\">"));
    assert!(combined.contains("<th>KPI</th>"));
}

#[test]
fn test_repeating_values_nest_a_table() {
    let out = kpi_table(vec![], vec![], true);
    assert!(out.contains(
        "{% if field.field_type == \"multi_line_items\" %}{% if field.value %}<table class=\"report-items\">"
    ));
    assert!(out.contains("{{ field.value if field.value is not none else \"\" }}"));
}

#[test]
fn test_grid_and_list() {
    let grid = compile(&[Block::with_id(
        "g",
        BlockKind::KpiGrid(KpiBlock {
            kpi_ids: vec![9],
            field_keys: vec![],
        }),
    )]);
    assert!(grid.contains("<div class=\"report-kpi-grid\">"));
    assert!(grid.contains("<div class=\"report-kpi-card\">"));
    assert!(grid.contains("if kpi.kpi_id in kpi_ids_set"));
    assert_balanced(&grid);

    let list = compile(&[Block::with_id("l", BlockKind::KpiList(KpiBlock::default()))]);
    assert!(list.contains("<dl class=\"report-kpi-list\">"));
    assert!(list.contains("<dt>{{ kpi.kpi_name }}</dt>"));
    assert!(list.contains("{{ field.field_name }}"));
    assert_balanced(&list);
}

#[test]
fn test_domain_blocks() {
    let all = compile(&[Block::with_id(
        "d",
        BlockKind::DomainList(DomainBlock::default()),
    )]);
    assert!(all.contains("{% for domain in domains %}"));
    assert!(!all.contains("domain.id in"));
    assert_balanced(&all);

    let some = compile(&[Block::with_id(
        "d",
        BlockKind::DomainKpis(DomainBlock {
            domain_ids: vec![2, 8],
        }),
    )]);
    assert!(some.contains("{% if domain.id in [2, 8] %}"));
    assert!(some.contains("{% for kpi in category.kpis %}"));
    assert_balanced(&some);
}
