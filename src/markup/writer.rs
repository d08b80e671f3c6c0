//! Chained builder for target markup.

use std::fmt;

/// Accumulates markup: HTML tags, `{% ... %}` directives and
/// `{{ ... }}` interpolations.
///
/// Every method returns `&mut Self` so emission reads top to bottom:
///
/// ```
/// use kpi_report::markup::MarkupWriter;
///
/// let mut w = MarkupWriter::new();
/// w.directive("for kpi in kpis").open("p", "name").interpolate("kpi.kpi_name").close("p").end_for();
/// assert_eq!(
///     w.finish(),
///     r#"{% for kpi in kpis %}<p class="name">{{ kpi.kpi_name }}</p>{% endfor %}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupWriter {
    out: String,
}

impl MarkupWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push text verbatim.
    pub fn raw(&mut self, text: &str) -> &mut Self {
        self.out.push_str(text);
        self
    }

    /// `<tag class="class">`
    pub fn open(&mut self, tag: &str, class: &str) -> &mut Self {
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push_str(" class=\"");
        self.out.push_str(class);
        self.out.push_str("\">");
        self
    }

    /// `<tag>`
    pub fn open_plain(&mut self, tag: &str) -> &mut Self {
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push('>');
        self
    }

    /// `</tag>`
    pub fn close(&mut self, tag: &str) -> &mut Self {
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
        self
    }

    /// `{% statement %}`
    pub fn directive(&mut self, statement: &str) -> &mut Self {
        self.out.push_str("{% ");
        self.out.push_str(statement);
        self.out.push_str(" %}");
        self
    }

    /// `{{ expression }}`
    pub fn interpolate(&mut self, expression: &str) -> &mut Self {
        self.out.push_str("{{ ");
        self.out.push_str(expression);
        self.out.push_str(" }}");
        self
    }

    pub fn end_for(&mut self) -> &mut Self {
        self.directive("endfor")
    }

    pub fn end_if(&mut self) -> &mut Self {
        self.directive("endif")
    }

    pub fn newline(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    /// Append another writer's output.
    pub fn append(&mut self, other: &MarkupWriter) -> &mut Self {
        self.out.push_str(&other.out);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }
}

impl fmt::Display for MarkupWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.out)
    }
}
