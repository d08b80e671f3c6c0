use insta::assert_snapshot;
use kpi_report::formula::{parse_formula, AggregateFn};
use kpi_report::markup::escape::{escape_html, escape_string_literal, unescape_string_literal};
use kpi_report::markup::snippet::{
    formula, grouped_aggregate, items_list, repeating_rows_table, scalar_value,
};

/// Pull the first double-quoted literal after `marker` and unescape it.
fn quoted_after(snippet: &str, marker: &str) -> String {
    let start = snippet.find(marker).expect("marker present") + marker.len();
    let rest = &snippet[start..];
    let rest = rest.strip_prefix('"').expect("literal starts with a quote");
    let mut end = 0;
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        match (escaped, c) {
            (true, _) => escaped = false,
            (false, '\\') => escaped = true,
            (false, '"') => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    unescape_string_literal(&rest[..end])
}

#[test]
fn test_scalar_value_snapshot() {
    assert_snapshot!(
        scalar_value(7, "total_budget", None, 0),
        @r#"{{ get_kpi_field_value(kpis, 7, "total_budget", None, 0) }}"#
    );
}

#[test]
fn test_scalar_value_with_sub_field_snapshot() {
    assert_snapshot!(
        scalar_value(12, "line_items", Some("amount"), 3),
        @r#"{{ get_kpi_field_value(kpis, 12, "line_items", "amount", 3) }}"#
    );
}

#[test]
fn test_formula_snapshot() {
    assert_snapshot!(
        formula(3, 1, "a + SUM_ITEMS(rows, val)"),
        @r#"{{ evaluate_report_formula(kpis, 3, "a + SUM_ITEMS(rows, val)", 1) }}"#
    );
}

#[test]
fn test_grouped_aggregate_snapshot() {
    assert_snapshot!(
        grouped_aggregate(5, "enrollment", "score", AggregateFn::Sum, 2),
        @r#"{{ evaluate_report_formula(kpis, 5, "SUM_ITEMS(enrollment, score)", 2) }}"#
    );
}

#[test]
fn test_grouped_aggregate_is_a_valid_formula() {
    for func in AggregateFn::ALL {
        let out = grouped_aggregate(5, "enrollment", "score", func, 0);
        let text = quoted_after(&out, "evaluate_report_formula(kpis, 5, ");
        assert!(parse_formula(&text).is_ok(), "{} should parse", text);
    }
}

#[test]
fn test_field_key_escaping_round_trip() {
    for key in [r"back\slash", r#"say "hi""#, r#"\"both\""#, r"trailing\"] {
        let out = scalar_value(1, key, None, 0);
        assert_eq!(quoted_after(&out, "get_kpi_field_value(kpis, 1, "), key);
    }
}

#[test]
fn test_formula_text_escaping_round_trip() {
    let text = r#"COUNT_ITEMS_WHERE(rows, label, op_eq, "a\\b \"c\"")"#;
    let out = formula(3, 0, text);
    assert_eq!(quoted_after(&out, "evaluate_report_formula(kpis, 3, "), text);
    assert_eq!(escape_string_literal(r#"\""#), r#"\\\""#);
}

#[test]
fn test_string_escaping_never_html_escapes() {
    let out = scalar_value(1, "<a&b>", None, 0);
    assert!(out.contains(r#""<a&b>""#));
    assert_eq!(escape_html("<a&b>"), "&lt;a&amp;b&gt;");
}

#[test]
fn test_repeating_rows_table_shape() {
    let out = repeating_rows_table(4, "rows", 0);
    assert!(out.starts_with("{% for kpi in kpis if kpi.kpi_id == 4 %}"));
    assert!(out.contains("<table class=\"report-items\">"));
    assert!(out.contains("{% for key in field.value[0].keys() %}"));
    assert!(out.ends_with("{% endif %}{% endfor %}{% endif %}{% endfor %}"));
    assert_eq!(out.matches("{% for").count(), out.matches("{% endfor %}").count());
    assert_eq!(out.matches("{% if").count(), out.matches("{% endif %}").count());
}

#[test]
fn test_items_list_shape() {
    let out = items_list("field.value").finish();
    assert!(out.starts_with("<ul class=\"report-items\">{% for row in field.value %}"));
    assert!(out.ends_with("{% endfor %}</ul>"));
}
