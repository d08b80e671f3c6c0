use kpi_report::blocks::{
    Block, BlockId, BlockKind, Cell, DomainBlock, FormulaCell, KpiBlock, KpiCell, SimpleTableBlock,
    SingleValueBlock, TableRow,
};
use kpi_report::formula::AggregateFn;
use kpi_report::metadata::Catalog;
use kpi_report::validation::{validate, CellRef, Issue, ValidationError};

fn catalog() -> Catalog {
    Catalog::from_json(
        r#"{
            "kpis": [
                {"id": 7, "name": "Budget", "fields": [
                    {"key": "total_budget", "name": "Total", "field_type": "number"},
                    {"key": "notes", "name": "Notes", "field_type": "multi_line_text"},
                    {"key": "lines", "name": "Lines", "field_type": "multi_line_items",
                     "sub_fields": [
                        {"key": "amount", "name": "Amount", "field_type": "number"},
                        {"key": "label", "name": "Label", "field_type": "single_line_text"}
                     ]},
                    {"key": "odd key", "name": "Odd", "field_type": "multi_line_items",
                     "sub_fields": [{"key": "v", "field_type": "number"}]},
                    {"key": "ROUND", "name": "Rounds", "field_type": "multi_line_items",
                     "sub_fields": [{"key": "v", "field_type": "number"}]}
                ]},
                {"id": 9, "name": "Staff", "fields": [
                    {"key": "headcount", "name": "Headcount", "field_type": "number"}
                ]}
            ],
            "domains": [{"id": 1, "name": "Finance", "categories": []}]
        }"#,
    )
    .unwrap()
}

fn table(cells: Vec<Cell>) -> Block {
    Block::with_id(
        "tbl",
        BlockKind::SimpleTable(SimpleTableBlock {
            rows: vec![TableRow::new(cells)],
        }),
    )
}

fn issues(blocks: &[Block]) -> Vec<Issue> {
    match validate(blocks, &catalog()) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.into_iter().map(|e| e.issue).collect(),
    }
}

#[test]
fn test_valid_report() {
    let blocks = vec![
        Block::with_id("title", BlockKind::default_for("title").unwrap()),
        Block::with_id(
            "v",
            BlockKind::SingleValue(SingleValueBlock {
                kpi_id: Some(7),
                field_key: "total_budget".into(),
                sub_field_key: None,
                entry_index: 0,
            }),
        ),
        table(vec![
            Cell::text("Total"),
            KpiCell::new(7, "lines")
                .with_sub_field("amount")
                .with_group_fn(AggregateFn::Sum)
                .into(),
            KpiCell::new(7, "lines").grouped().into(),
            Cell::formula(7, "total_budget - SUM_ITEMS(lines, amount)", 0),
        ]),
        Block::with_id(
            "d",
            BlockKind::DomainList(DomainBlock {
                domain_ids: vec![1],
            }),
        ),
    ];
    assert_eq!(validate(&blocks, &catalog()), Ok(()));
}

#[test]
fn test_duplicate_ids() {
    let blocks = vec![
        Block::with_id("same", BlockKind::default_for("spacer").unwrap()),
        Block::with_id("same", BlockKind::default_for("text").unwrap()),
    ];
    assert_eq!(issues(&blocks), vec![Issue::DuplicateBlockId]);
}

#[test]
fn test_single_value_problems() {
    let mut block = SingleValueBlock {
        kpi_id: None,
        field_key: "total_budget".into(),
        sub_field_key: None,
        entry_index: 0,
    };
    let check = |b: &SingleValueBlock| issues(&[Block::with_id("v", BlockKind::SingleValue(b.clone()))]);

    assert_eq!(check(&block), vec![Issue::MissingKpi]);

    block.kpi_id = Some(99);
    assert_eq!(check(&block), vec![Issue::UnknownKpi(99)]);

    block.kpi_id = Some(7);
    block.field_key = " ".into();
    assert_eq!(check(&block), vec![Issue::BlankFieldKey]);

    block.field_key = "nope".into();
    assert_eq!(
        check(&block),
        vec![Issue::UnknownField {
            kpi_id: Some(7),
            field_key: "nope".into()
        }]
    );

    block.field_key = "lines".into();
    block.sub_field_key = Some("qty".into());
    assert_eq!(
        check(&block),
        vec![Issue::UnknownSubField {
            kpi_id: 7,
            field_key: "lines".into(),
            sub_field_key: "qty".into()
        }]
    );
}

#[test]
fn test_kpi_cell_problems_carry_position() {
    let blocks = vec![table(vec![
        Cell::text("ok"),
        KpiCell::new(7, "lines").with_group_fn(AggregateFn::Avg).into(),
        KpiCell::new(7, "notes").grouped().into(),
        KpiCell::new(7, "odd key")
            .with_sub_field("v")
            .with_group_fn(AggregateFn::Max)
            .into(),
    ])];
    let errors = validate(&blocks, &catalog()).unwrap_err();
    assert_eq!(
        errors,
        vec![
            ValidationError {
                block_id: BlockId::from("tbl"),
                cell: Some(CellRef { row: 0, cell: 1 }),
                issue: Issue::GroupFnWithoutSubField,
            },
            ValidationError {
                block_id: BlockId::from("tbl"),
                cell: Some(CellRef { row: 0, cell: 2 }),
                issue: Issue::GroupOnScalarField {
                    field_key: "notes".into()
                },
            },
            ValidationError {
                block_id: BlockId::from("tbl"),
                cell: Some(CellRef { row: 0, cell: 3 }),
                issue: Issue::NotFormulaSafe {
                    key: "odd key".into()
                },
            },
        ]
    );
    assert_eq!(
        errors[1].to_string(),
        "block tbl (row 1, cell 3): field 'notes' has no rows to show as a group"
    );
}

#[test]
fn test_formula_cells() {
    assert_eq!(
        issues(&[table(vec![Cell::Formula(FormulaCell {
            kpi_id: None,
            formula: "1".into(),
            entry_index: 0,
        })])]),
        vec![Issue::MissingKpi]
    );
    assert_eq!(
        issues(&[table(vec![Cell::formula(7, "   ", 0)])]),
        vec![Issue::BlankFormula]
    );
    assert_eq!(
        issues(&[table(vec![Cell::formula(7, "total_budget + ghost", 0)])]),
        vec![Issue::UnknownField {
            kpi_id: Some(7),
            field_key: "ghost".into()
        }]
    );
    let syntax = issues(&[table(vec![Cell::formula(7, "SUM_ITEMS(lines)", 0)])]);
    assert!(!syntax.is_empty());
    assert!(syntax.iter().all(|i| matches!(i, Issue::FormulaSyntax(_))));
}

#[test]
fn test_selection_blocks() {
    let blocks = vec![
        Block::with_id(
            "g",
            BlockKind::KpiGrid(KpiBlock {
                kpi_ids: vec![7, 8],
                field_keys: vec!["total_budget".into(), "ghost".into()],
            }),
        ),
        Block::with_id(
            "d",
            BlockKind::DomainCategories(DomainBlock {
                domain_ids: vec![1, 5],
            }),
        ),
        Block::with_id("u", BlockKind::Unsupported),
    ];
    assert_eq!(
        issues(&blocks),
        vec![
            Issue::UnknownKpi(8),
            Issue::UnknownField {
                kpi_id: None,
                field_key: "ghost".into()
            },
            Issue::UnknownDomain(5),
            Issue::UnsupportedType,
        ]
    );
}

#[test]
fn test_formula_sub_fields_are_checked() {
    let formula_issues = |text: &str| issues(&[table(vec![Cell::formula(7, text, 0)])]);

    assert_eq!(
        formula_issues("SUM_ITEMS(lines, qty)"),
        vec![Issue::UnknownSubField {
            kpi_id: 7,
            field_key: "lines".into(),
            sub_field_key: "qty".into()
        }]
    );
    assert_eq!(
        formula_issues("SUM_ITEMS_WHERE(lines, amount, grade, op_gte, 60)"),
        vec![Issue::UnknownSubField {
            kpi_id: 7,
            field_key: "lines".into(),
            sub_field_key: "grade".into()
        }]
    );
    // The unknown field is reported once, not once per sub-field.
    assert_eq!(
        formula_issues("SUM_ITEMS_WHERE(ghost, amount, label, op_eq, x)"),
        vec![Issue::UnknownField {
            kpi_id: Some(7),
            field_key: "ghost".into()
        }]
    );
    assert_eq!(
        formula_issues(r#"COUNT_ITEMS_WHERE(lines, label, op_eq, "A") + SUM_ITEMS(lines, amount)"#),
        vec![]
    );
}

#[test]
fn test_formula_kpi_field_targets_are_checked() {
    let formula_issues = |text: &str| issues(&[table(vec![Cell::formula(7, text, 0)])]);

    assert_eq!(formula_issues(r#"total_budget / KPI_FIELD(9, "headcount")"#), vec![]);
    assert_eq!(
        formula_issues(r#"KPI_FIELD(42, "headcount")"#),
        vec![Issue::UnknownKpi(42)]
    );
    assert_eq!(
        formula_issues(r#"KPI_FIELD(9, "salary")"#),
        vec![Issue::UnknownField {
            kpi_id: Some(9),
            field_key: "salary".into()
        }]
    );
}

#[test]
fn test_keyword_field_key_is_not_formula_safe() {
    let blocks = vec![table(vec![KpiCell::new(7, "ROUND")
        .with_sub_field("v")
        .with_group_fn(AggregateFn::Sum)
        .into()])];
    assert_eq!(
        issues(&blocks),
        vec![Issue::NotFormulaSafe {
            key: "ROUND".into()
        }]
    );
}
