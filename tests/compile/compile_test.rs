use kpi_report::blocks::{
    Block, BlockKind, Cell, HeadingBlock, SimpleTableBlock, SingleValueBlock, SpacerBlock,
    SpacerSize, TableRow, TextBlock, TitleBlock,
};
use kpi_report::codegen::SkipReason;
use kpi_report::compile::{compile, compile_with, CompileOptions, EMPTY_PLACEHOLDER};

fn single_value(id: &str, kpi_id: Option<i64>, field_key: &str) -> Block {
    Block::with_id(
        id,
        BlockKind::SingleValue(SingleValueBlock {
            kpi_id,
            field_key: field_key.into(),
            sub_field_key: None,
            entry_index: 0,
        }),
    )
}

fn sample_report() -> Vec<Block> {
    vec![
        Block::with_id("title", BlockKind::Title(TitleBlock::default())),
        Block::with_id(
            "heading",
            BlockKind::SectionHeading(HeadingBlock {
                text: "Finance & Budget".into(),
                level: 2,
            }),
        ),
        Block::with_id(
            "spacer",
            BlockKind::Spacer(SpacerBlock {
                size: SpacerSize::Small,
            }),
        ),
        single_value("value", Some(7), "total_budget"),
        Block::with_id("kpis", BlockKind::default_for("kpi_table").unwrap()),
        Block::with_id("domains", BlockKind::default_for("domain_categories").unwrap()),
    ]
}

#[test]
fn test_empty_list_compiles_to_placeholder() {
    let source = compile(&[]);
    assert_eq!(source, EMPTY_PLACEHOLDER);
    assert!(!source.is_empty());
}

#[test]
fn test_compile_is_idempotent() {
    let blocks = sample_report();
    let first = compile(&blocks);
    let second = compile(&blocks);
    assert_eq!(first, second);
    assert_eq!(compile(&blocks.clone()), first);
}

#[test]
fn test_blocks_emitted_in_order() {
    let source = compile(&sample_report());
    let title = source.find("{{ template_name }}").unwrap();
    let heading = source.find("Finance &amp; Budget").unwrap();
    let spacer = source.find("height: 16px").unwrap();
    let value = source.find("get_kpi_field_value").unwrap();
    let kpis = source.find("report-kpi-table").unwrap();
    let domains = source.find("report-categories").unwrap();
    assert!(title < heading && heading < spacer && spacer < value);
    assert!(value < kpis && kpis < domains);
}

#[test]
fn test_single_value_scenario() {
    let source = compile(&[single_value("v", Some(7), "total_budget")]);
    assert_eq!(
        source,
        r#"<p class="report-single-value">{{ get_kpi_field_value(kpis, 7, "total_budget", None, 0) }}</p>"#
    );
}

#[test]
fn test_simple_table_scenario() {
    let block = Block::with_id(
        "tbl",
        BlockKind::SimpleTable(SimpleTableBlock {
            rows: vec![TableRow::new(vec![
                Cell::text("<b>bold</b>"),
                Cell::formula(3, "a + SUM_ITEMS(rows, val)", 1),
            ])],
        }),
    );
    let source = compile(&[block]);
    assert_eq!(
        source,
        concat!(
            "<table class=\"report-simple-table\">\n",
            "<tbody>\n",
            "<tr><td>&lt;b&gt;bold&lt;/b&gt;</td>",
            "<td>{{ evaluate_report_formula(kpis, 3, \"a + SUM_ITEMS(rows, val)\", 1) }}</td></tr>\n",
            "</tbody>\n",
            "</table>"
        )
    );
}

#[test]
fn test_malformed_blocks_are_skipped() {
    let blocks = vec![
        single_value("blank", Some(7), "  "),
        single_value("no-kpi", None, "total_budget"),
        Block::with_id("chart", BlockKind::Unsupported),
        Block::with_id(
            "ok",
            BlockKind::Text(TextBlock {
                content: "<p>kept</p>".into(),
            }),
        ),
    ];
    let output = compile_with(&blocks, &CompileOptions::default());

    assert_eq!(output.source, "<div class=\"report-text\"><p>kept</p></div>");
    assert_eq!(output.emitted, 1);
    let reasons: Vec<(&str, SkipReason)> = output
        .skipped
        .iter()
        .map(|s| (s.id.as_str(), s.reason))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("blank", SkipReason::BlankFieldKey),
            ("no-kpi", SkipReason::MissingKpi),
            ("chart", SkipReason::UnsupportedType),
        ]
    );
}

#[test]
fn test_custom_options() {
    let options = CompileOptions::default()
        .with_empty_placeholder("<p>Nothing here</p>")
        .with_block_separator("\n\n");
    assert_eq!(compile_with(&[], &options).source, "<p>Nothing here</p>");

    let blocks = vec![
        Block::with_id("a", BlockKind::Text(TextBlock { content: "A".into() })),
        Block::with_id("b", BlockKind::Text(TextBlock { content: "B".into() })),
    ];
    assert_eq!(
        compile_with(&blocks, &options).source,
        "<div class=\"report-text\">A</div>\n\n<div class=\"report-text\">B</div>"
    );
}

#[test]
fn test_text_block_embeds_snippets_verbatim() {
    let content = r#"Budget: {{ get_kpi_field_value(kpis, 7, "total_budget", None, 0) }}"#;
    let source = compile(&[Block::with_id(
        "t",
        BlockKind::Text(TextBlock {
            content: content.into(),
        }),
    )]);
    assert!(source.contains(content));
}

#[test]
fn test_title_custom_text_is_escaped() {
    let source = compile(&[Block::with_id(
        "t",
        BlockKind::Title(TitleBlock {
            use_template_name: true,
            custom_text: Some("R&D <2025>".into()),
        }),
    )]);
    assert!(source.contains("R&amp;D &lt;2025&gt;"));
    assert!(!source.contains("template_name"));
    assert!(source.contains("{{ year }}"));
}

#[test]
fn test_literal_braces_do_not_become_template_syntax() {
    let source = compile(&[
        Block::with_id(
            "h",
            BlockKind::SectionHeading(HeadingBlock {
                text: "Plan {{".into(),
                level: 2,
            }),
        ),
        Block::with_id(
            "tbl",
            BlockKind::SimpleTable(SimpleTableBlock {
                rows: vec![TableRow::new(vec![Cell::text(
                    "50% off {% endfor %} {{ kpis }} {# note #}",
                )])],
            }),
        ),
    ]);
    assert!(source.contains(r#"<h2 class="report-heading">Plan &#123;&#123;</h2>"#));
    assert!(source.contains(
        "<td>50% off &#123;% endfor %&#125; &#123;&#123; kpis &#125;&#125; &#123;# note #&#125;</td>"
    ));
    assert!(!source.contains("{{"));
    assert!(!source.contains("{%"));
    assert!(!source.contains("{#"));
}
