//! Pseudo-markdown to HTML conversion for the `System.Description` field.
//!
//! Azure DevOps stores descriptions as HTML, but clients (usually an LLM)
//! send plain text where line breaks are often the two-character escape
//! `\n` rather than a real newline. The conversion is line oriented:
//!
//! | Input line            | Output                                |
//! |-----------------------|---------------------------------------|
//! | `**Objective**`       | `<p><strong>Objective</strong></p>`   |
//! | `## Objective`        | `<p><strong>Objective</strong></p>`   |
//! | `- item`, `* item`, `• item` | `<li>item</li>` inside `<ul>`  |
//! | `1. item`             | `<li>item</li>` inside `<ol>`         |
//! | anything else         | `<p>line</p>`                         |
//!
//! Blank lines separate sections. Lists never stay open across a section
//! boundary. Anything that does not match a rule falls through to a plain
//! paragraph, so formatting never fails.

/// Kind of the list currently open in a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

/// Classified input line, borrowing the text to emit.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Header(&'a str),
    Item(ListKind, &'a str),
    Paragraph(&'a str),
}

const BULLET_PREFIXES: [&str; 3] = ["- ", "* ", "• "];

/// Convert a raw description into an HTML fragment.
///
/// Empty input is returned unchanged.
pub fn format_description(description: &str) -> String {
    if description.is_empty() {
        return String::new();
    }

    let normalized = description.replace("\\n", "\n").replace("\r\n", "\n");

    normalized
        .split("\n\n")
        .filter_map(format_section)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// [`format_description`] for optional fields; `None` stays `None`.
pub fn format_optional_description(description: Option<&str>) -> Option<String> {
    description.map(format_description)
}

/// Format one blank-line separated section. `None` if it has no content.
fn format_section(section: &str) -> Option<String> {
    let mut writer = SectionWriter::default();

    for line in section.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
        match classify(line) {
            Line::Header(text) => {
                writer.close_list();
                writer.push(format!("<p><strong>{}</strong></p>", text));
            }
            Line::Item(kind, text) => {
                writer.open_list(kind);
                writer.push(format!("<li>{}</li>", text));
            }
            Line::Paragraph(text) => {
                writer.close_list();
                writer.push(format!("<p>{}</p>", text));
            }
        }
    }

    writer.finish()
}

fn classify(line: &str) -> Line<'_> {
    if line.starts_with("**") && line.ends_with("**") {
        // "**" and "***" overlap themselves and have no inner text
        let inner = if line.len() >= 4 {
            &line[2..line.len() - 2]
        } else {
            ""
        };
        return Line::Header(inner);
    }

    if let Some(text) = line.strip_prefix("## ") {
        return Line::Header(text);
    }

    if let Some(text) = BULLET_PREFIXES
        .iter()
        .find_map(|prefix| line.strip_prefix(*prefix))
    {
        return Line::Item(ListKind::Unordered, text);
    }

    if let Some(text) = strip_ordinal(line) {
        return Line::Item(ListKind::Ordered, text);
    }

    Line::Paragraph(line)
}

/// `"12. Ship it"` -> `Some("Ship it")`
fn strip_ordinal(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix('.').map(str::trim)
}

/// Output lines of one section plus the open-list state.
#[derive(Debug, Default)]
struct SectionWriter {
    lines: Vec<String>,
    open: Option<ListKind>,
}

impl SectionWriter {
    fn push(&mut self, html: String) {
        self.lines.push(html);
    }

    fn open_list(&mut self, kind: ListKind) {
        if self.open == Some(kind) {
            return;
        }
        self.close_list();
        self.lines.push(format!("<{}>", kind.tag()));
        self.open = Some(kind);
    }

    fn close_list(&mut self) {
        if let Some(kind) = self.open.take() {
            self.lines.push(format!("</{}>", kind.tag()));
        }
    }

    fn finish(mut self) -> Option<String> {
        self.close_list();
        if self.lines.is_empty() {
            None
        } else {
            Some(self.lines.join("\n"))
        }
    }
}
