//! Title, heading, spacer and free text.

use crate::blocks::{HeadingBlock, SpacerBlock, TextBlock, TitleBlock};
use crate::markup::{escape_html, MarkupWriter};

pub(super) fn title(block: &TitleBlock) -> String {
    let mut w = MarkupWriter::new();
    let custom = block
        .custom_text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    match custom {
        Some(text) => {
            w.open("h1", "report-title")
                .raw(&escape_html(text))
                .close("h1")
                .newline();
        }
        None if block.use_template_name => {
            w.open("h1", "report-title")
                .interpolate("template_name")
                .close("h1")
                .newline();
        }
        None => {}
    }
    w.open("p", "report-year").interpolate("year").close("p");
    w.finish()
}

pub(super) fn section_heading(block: &HeadingBlock) -> String {
    let tag = format!("h{}", block.level.clamp(1, 4));
    let text = match block.text.trim() {
        "" => "Section",
        t => t,
    };
    let mut w = MarkupWriter::new();
    w.open(&tag, "report-heading")
        .raw(&escape_html(text))
        .close(&tag);
    w.finish()
}

pub(super) fn spacer(block: &SpacerBlock) -> String {
    format!(
        "<div class=\"report-spacer\" style=\"height: {}px\"></div>",
        block.size.height_px()
    )
}

/// Content is emitted verbatim. Embedded snippets must survive untouched.
pub(super) fn text(block: &TextBlock) -> String {
    let mut w = MarkupWriter::new();
    w.open("div", "report-text").raw(&block.content).close("div");
    w.finish()
}
