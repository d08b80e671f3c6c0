use kpi_report::blocks::{Block, BlockKind, Cell, KpiCell, SimpleTableBlock, TableRow};
use kpi_report::compile::compile;
use kpi_report::config::EvaluationSettings;
use kpi_report::dataset::ReportData;
use kpi_report::evaluate::{evaluate_snippet, EvaluateError, SnippetRequest};
use kpi_report::formula::{AggregateFn, FormulaError};
use serde_json::json;

fn data() -> ReportData {
    serde_json::from_value(json!({
        "template_name": "Annual report",
        "template_id": 11,
        "year": 2025,
        "kpis": [
            {
                "kpi_id": 3,
                "kpi_name": "Enrollment",
                "entries": [
                    {"entry_id": 1, "fields": [
                        {"field_key": "a", "field_name": "A", "value": 10, "field_type": "number"}
                    ]},
                    {"entry_id": 2, "fields": [
                        {"field_key": "a", "field_name": "A", "value": 2.5, "field_type": "number"},
                        {"field_key": "title", "field_name": "Title", "value": "Spring", "field_type": "single_line_text"},
                        {"field_key": "rows", "field_name": "Rows", "field_type": "multi_line_items",
                         "value": [{"val": 4, "who": "x"}, {"val": 6, "who": "y"}]}
                    ]}
                ]
            },
            {
                "kpi_id": 8,
                "kpi_name": "Staff",
                "entries": [{"fields": [
                    {"field_key": "headcount", "value": 4, "field_type": "number"}
                ]}]
            }
        ],
        "domains": []
    }))
    .unwrap()
}

fn settings() -> EvaluationSettings {
    EvaluationSettings {
        empty_value: "n/a".into(),
        decimal_places: None,
    }
}

fn formula(expression: &str, entry_index: u32) -> SnippetRequest {
    SnippetRequest::Formula {
        kpi_id: 3,
        expression: expression.into(),
        entry_index,
    }
}

fn value(field_key: &str, sub: Option<&str>, func: Option<AggregateFn>) -> SnippetRequest {
    SnippetRequest::KpiValue {
        kpi_id: 3,
        field_key: field_key.into(),
        sub_field_key: sub.map(String::from),
        sub_field_group_fn: func,
        entry_index: 1,
    }
}

#[test]
fn test_formula_against_entry() {
    let data = data();
    assert_eq!(
        evaluate_snippet(&data, &formula("a + SUM_ITEMS(rows, val)", 1), &settings()).unwrap(),
        "12.5"
    );
    assert_eq!(
        evaluate_snippet(&data, &formula("a * 2", 0), &settings()).unwrap(),
        "20"
    );
    assert_eq!(
        evaluate_snippet(&data, &formula(r#"a * KPI_FIELD(8, "headcount")"#, 1), &settings())
            .unwrap(),
        "10"
    );
}

#[test]
fn test_unresolvable_values_use_empty_value() {
    let data = data();
    for request in [
        formula("a / 0", 1),
        formula("missing + 1", 1),
        formula("a", 5),
        value("missing", None, None),
    ] {
        assert_eq!(evaluate_snippet(&data, &request, &settings()).unwrap(), "n/a");
    }
}

#[test]
fn test_bad_requests_are_errors() {
    let data = data();
    assert_eq!(
        evaluate_snippet(&data, &formula("  ", 0), &settings()),
        Err(EvaluateError::Formula(FormulaError::Empty))
    );
    assert!(matches!(
        evaluate_snippet(&data, &formula("SUM_ITEMS(rows)", 0), &settings()),
        Err(EvaluateError::Formula(FormulaError::Syntax(_)))
    ));
    assert_eq!(
        evaluate_snippet(&data, &value(" ", None, None), &settings()),
        Err(EvaluateError::BlankFieldKey)
    );
}

#[test]
fn test_kpi_values() {
    let data = data();
    assert_eq!(
        evaluate_snippet(&data, &value("title", None, None), &settings()).unwrap(),
        "Spring"
    );
    assert_eq!(
        evaluate_snippet(&data, &value("rows", Some("who"), None), &settings()).unwrap(),
        "x, y"
    );
    assert_eq!(
        evaluate_snippet(&data, &value("rows", Some("val"), Some(AggregateFn::Avg)), &settings())
            .unwrap(),
        "5"
    );
    assert_eq!(
        evaluate_snippet(&data, &value("rows", Some("val"), Some(AggregateFn::Count)), &settings())
            .unwrap(),
        "2"
    );
}

#[test]
fn test_decimal_places() {
    let settings = EvaluationSettings {
        empty_value: String::new(),
        decimal_places: Some(2),
    };
    assert_eq!(
        evaluate_snippet(&data(), &formula("a / 3", 1), &settings).unwrap(),
        "0.83"
    );
}

#[test]
fn test_preview_markup_matches_compiled_cell() {
    let cell = KpiCell::new(3, "rows")
        .with_sub_field("val")
        .with_group_fn(AggregateFn::Sum)
        .at_entry(1);
    let compiled = compile(&[Block::with_id(
        "t",
        BlockKind::SimpleTable(SimpleTableBlock {
            rows: vec![TableRow::new(vec![Cell::Kpi(cell)])],
        }),
    )]);
    let preview = value("rows", Some("val"), Some(AggregateFn::Sum)).to_markup();
    assert!(compiled.contains(&format!("<td>{}</td>", preview)));

    let scalar = value("title", None, None).to_markup();
    assert_eq!(
        scalar,
        r#"{{ get_kpi_field_value(kpis, 3, "title", None, 1) }}"#
    );
    assert_eq!(
        formula("  a + 1 ", 1).to_markup(),
        r#"{{ evaluate_report_formula(kpis, 3, "a + 1", 1) }}"#
    );
}

#[test]
fn test_empty_sum_displays_unsigned_zero() {
    let data: ReportData = serde_json::from_value(json!({
        "template_name": "Annual report",
        "year": 2025,
        "kpis": [{
            "kpi_id": 3,
            "kpi_name": "Enrollment",
            "entries": [{"fields": [
                {"field_key": "rows", "field_type": "multi_line_items", "value": []},
                {"field_key": "graded", "field_type": "multi_line_items",
                 "value": [{"amt": 4, "grade": 10}]}
            ]}]
        }],
        "domains": []
    }))
    .unwrap();
    let settings = EvaluationSettings {
        empty_value: String::new(),
        decimal_places: Some(2),
    };
    for expression in [
        "SUM_ITEMS(rows, amt)",
        "SUM_ITEMS_WHERE(graded, amt, grade, op_gt, 50)",
    ] {
        assert_eq!(
            evaluate_snippet(&data, &formula(expression, 0), &settings).unwrap(),
            "0.00"
        );
    }
    assert_eq!(
        evaluate_snippet(
            &data,
            &formula("SUM_ITEMS_WHERE(graded, amt, nosuch, op_gt, 50)", 0),
            &settings
        )
        .unwrap(),
        ""
    );
}
