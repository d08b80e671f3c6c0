//! Domain listings: domains, domains with categories, and domains with
//! categories and their KPIs.

use crate::markup::escape::int_list;
use crate::markup::MarkupWriter;

pub(super) fn domain_list(domain_ids: &[i64]) -> String {
    domain_loop(domain_ids, "report-domain-list", |_| {})
}

pub(super) fn domain_categories(domain_ids: &[i64]) -> String {
    domain_loop(domain_ids, "report-domain-categories", |w| {
        w.open("ul", "report-categories")
            .directive("for category in domain.categories")
            .open_plain("li")
            .interpolate("category.name")
            .close("li")
            .end_for()
            .close("ul")
            .newline();
    })
}

pub(super) fn domain_kpis(domain_ids: &[i64]) -> String {
    domain_loop(domain_ids, "report-domain-kpis", |w| {
        w.directive("for category in domain.categories")
            .newline()
            .open("h3", "report-category-name")
            .interpolate("category.name")
            .close("h3")
            .newline()
            .open("ul", "report-kpis")
            .directive("for kpi in category.kpis")
            .open_plain("li")
            .interpolate("kpi.kpi_name")
            .close("li")
            .end_for()
            .close("ul")
            .newline()
            .end_for()
            .newline();
    })
}

/// Iterate every domain, restricted to `domain_ids` when non-empty, and
/// emit the domain name followed by `body`.
fn domain_loop(domain_ids: &[i64], class: &str, body: impl FnOnce(&mut MarkupWriter)) -> String {
    let mut w = MarkupWriter::new();
    w.open("div", class).newline();
    w.directive("for domain in domains").newline();
    if !domain_ids.is_empty() {
        w.directive(&format!("if domain.id in {}", int_list(domain_ids)))
            .newline();
    }
    w.open("h2", "report-domain-name")
        .interpolate("domain.name")
        .close("h2")
        .newline();
    body(&mut w);
    if !domain_ids.is_empty() {
        w.end_if().newline();
    }
    w.end_for().newline();
    w.close("div");
    w.finish()
}
