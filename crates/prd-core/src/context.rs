//! Document context for the conversational agent

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag};
use prd_state::{DocumentState, SectionCatalog};
use std::ops::Range;

/// Context used before any section exists
pub const EMPTY_DOCUMENT: &str = "No PRD document has been created yet.";

const STRIPPED_LANGUAGES: [&str; 2] = ["html", "mermaid"];

/// All section contents in catalog order, joined by blank lines, with
/// `html` and `mermaid` code blocks removed
#[must_use]
pub fn document_context(catalog: &SectionCatalog, document: &DocumentState) -> String {
    let full = catalog
        .ids()
        .filter_map(|id| document.content(id.as_str()))
        .filter(|content| !content.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    strip_code_blocks(&full)
}

/// Same as [`document_context`], substituting [`EMPTY_DOCUMENT`] when blank
#[must_use]
pub fn conversation_context(catalog: &SectionCatalog, document: &DocumentState) -> String {
    let context = document_context(catalog, document);
    if context.trim().is_empty() {
        EMPTY_DOCUMENT.to_string()
    } else {
        context
    }
}

/// Remove fenced `html` and `mermaid` blocks from markdown text
#[must_use]
pub fn strip_code_blocks(markdown: &str) -> String {
    // a start event's range spans the whole block
    let ranges: Vec<Range<usize>> = Parser::new(markdown)
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                let lang = lang.split_whitespace().next().unwrap_or_default().to_lowercase();
                STRIPPED_LANGUAGES.contains(&lang.as_str()).then_some(range)
            }
            _ => None,
        })
        .collect();

    let mut out = String::with_capacity(markdown.len());
    let mut cursor = 0;
    for range in ranges {
        if range.start < cursor {
            continue;
        }
        out.push_str(&markdown[cursor..range.start]);
        cursor = range.end;
    }
    out.push_str(&markdown[cursor..]);
    out
}
