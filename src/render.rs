//! Message rendering for the terminal
//!
//! [`render_message`] splits a stored message into fenced C code blocks and
//! prose. Prose is broken into lines classified as list items, horizontal
//! rules or paragraphs, each carrying bold and inline-code spans. Only this
//! light markup is recognized; everything else passes through as text.

use crate::providers::{Message, Role};
use colored::Colorize;
use regex::Regex;
use std::sync::OnceLock;

/// A display segment of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Body of a ```` ```c ```` fenced block, fences removed
    Code { text: String },
    /// Text outside code fences
    Prose(Prose),
}

/// Prose between code blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prose {
    /// Source text with surrounding newlines removed
    pub text: String,
    /// Classified lines of `text`
    pub lines: Vec<ProseLine>,
}

/// One line of prose
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProseLine {
    /// Line starting with `1.`, `*` or `-` followed by whitespace
    ListItem(Vec<Span>),
    /// A line consisting of `---`
    Rule,
    /// Any other line, including blank ones
    Paragraph(Vec<Span>),
}

/// Inline run of text within a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Bold(String),
    Code(String),
}

fn code_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```c.*?```").expect("static pattern"))
}

fn list_item() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+\.|[*-])\s").expect("static pattern"))
}

fn inline_markup() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*|`([^`]+)`").expect("static pattern"))
}

/// Split a message into display segments
///
/// Blank messages (such as the placeholder of a reply that has not started)
/// produce no segments. User messages are shown verbatim as a single prose
/// segment; only model messages are scanned for code fences and markup. An
/// unterminated fence is left in the prose until its closing fence arrives.
///
/// # Examples
///
/// ```
/// use ctutor::providers::Message;
/// use ctutor::render::{render_message, Segment};
///
/// let segments = render_message(&Message::model("Try:\n```c\nint x = 1;\n```\nDone."));
/// assert_eq!(segments.len(), 3);
/// assert_eq!(segments[1], Segment::Code { text: "int x = 1;".to_string() });
/// ```
pub fn render_message(message: &Message) -> Vec<Segment> {
    let content = &message.content;
    if content.trim().is_empty() {
        return Vec::new();
    }

    if message.role == Role::User {
        return vec![Segment::Prose(Prose {
            text: content.clone(),
            lines: content
                .lines()
                .map(|line| ProseLine::Paragraph(vec![Span::Text(line.to_string())]))
                .collect(),
        })];
    }

    let mut segments = Vec::new();
    let mut cursor = 0;

    for fence in code_fence().find_iter(content) {
        push_prose(&mut segments, &content[cursor..fence.start()]);
        segments.push(Segment::Code {
            text: fence_body(fence.as_str()).to_string(),
        });
        cursor = fence.end();
    }
    push_prose(&mut segments, &content[cursor..]);

    segments
}

fn fence_body(block: &str) -> &str {
    let body = block.strip_prefix("```c").unwrap_or(block);
    let body = body.strip_prefix('\n').unwrap_or(body);
    let body = body.strip_suffix("```").unwrap_or(body);
    body.strip_suffix('\n').unwrap_or(body)
}

fn push_prose(segments: &mut Vec<Segment>, raw: &str) {
    let text = raw.trim_matches(|c| c == '\n' || c == '\r');
    if text.trim().is_empty() {
        return;
    }

    segments.push(Segment::Prose(Prose {
        text: text.to_string(),
        lines: text.lines().map(classify_line).collect(),
    }));
}

fn classify_line(line: &str) -> ProseLine {
    let trimmed = line.trim();
    if list_item().is_match(trimmed) {
        ProseLine::ListItem(parse_spans(line))
    } else if trimmed == "---" {
        ProseLine::Rule
    } else {
        ProseLine::Paragraph(parse_spans(line))
    }
}

/// Split a line into text, bold and inline-code spans
fn parse_spans(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    for caps in inline_markup().captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > cursor {
            spans.push(Span::Text(line[cursor..whole.start()].to_string()));
        }
        if let Some(bold) = caps.get(1) {
            spans.push(Span::Bold(bold.as_str().to_string()));
        } else if let Some(code) = caps.get(2) {
            spans.push(Span::Code(code.as_str().to_string()));
        }
        cursor = whole.end();
    }

    if cursor < line.len() {
        spans.push(Span::Text(line[cursor..].to_string()));
    }
    spans
}

impl Segment {
    /// Render for an ANSI terminal
    pub fn to_ansi(&self) -> String {
        match self {
            Segment::Code { text } => {
                let mut out = format!("{}\n", "C Code".dimmed());
                for line in text.lines() {
                    out.push_str(&format!("    {}\n", line.green()));
                }
                out
            }
            Segment::Prose(prose) => {
                let mut out = String::new();
                for line in &prose.lines {
                    match line {
                        ProseLine::ListItem(spans) => {
                            out.push_str("  ");
                            out.push_str(&spans_to_ansi(spans));
                        }
                        ProseLine::Rule => out.push_str(&"─".repeat(40).dimmed().to_string()),
                        ProseLine::Paragraph(spans) => out.push_str(&spans_to_ansi(spans)),
                    }
                    out.push('\n');
                }
                out
            }
        }
    }
}

fn spans_to_ansi(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|span| match span {
            Span::Text(text) => text.clone(),
            Span::Bold(text) => text.bold().to_string(),
            Span::Code(text) => text.cyan().to_string(),
        })
        .collect()
}

/// Render a whole message for an ANSI terminal
pub fn message_to_ansi(message: &Message) -> String {
    render_message(message)
        .iter()
        .map(Segment::to_ansi)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Span {
        Span::Text(s.to_string())
    }

    #[test]
    fn test_render_prose_code_prose() {
        let message = Message::model("Use **bold** and `code` then:\n```c\nint x = 1;\n```\nDone.");
        let segments = render_message(&message);

        assert_eq!(
            segments,
            vec![
                Segment::Prose(Prose {
                    text: "Use **bold** and `code` then:".to_string(),
                    lines: vec![ProseLine::Paragraph(vec![
                        text("Use "),
                        Span::Bold("bold".to_string()),
                        text(" and "),
                        Span::Code("code".to_string()),
                        text(" then:"),
                    ])],
                }),
                Segment::Code {
                    text: "int x = 1;".to_string()
                },
                Segment::Prose(Prose {
                    text: "Done.".to_string(),
                    lines: vec![ProseLine::Paragraph(vec![text("Done.")])],
                }),
            ]
        );
    }

    #[test]
    fn test_blank_messages_render_nothing() {
        assert!(render_message(&Message::placeholder()).is_empty());
        assert!(render_message(&Message::model(" \n\t")).is_empty());
        assert!(render_message(&Message::user("   ")).is_empty());
    }

    #[test]
    fn test_user_message_is_verbatim() {
        let segments = render_message(&Message::user("is **this** `bold`?\n```c\nx\n```"));
        assert_eq!(segments.len(), 1);
        let Segment::Prose(prose) = &segments[0] else {
            panic!("expected prose");
        };
        assert_eq!(prose.lines[0], ProseLine::Paragraph(vec![text("is **this** `bold`?")]));
        assert_eq!(prose.lines.len(), 4);
    }

    #[test]
    fn test_list_items_and_rules() {
        let segments = render_message(&Message::model("1. first\n- second\n* third\n  ---\n-not a list"));
        let Segment::Prose(prose) = &segments[0] else {
            panic!("expected prose");
        };
        assert_eq!(
            prose.lines,
            vec![
                ProseLine::ListItem(vec![text("1. first")]),
                ProseLine::ListItem(vec![text("- second")]),
                ProseLine::ListItem(vec![text("* third")]),
                ProseLine::Rule,
                ProseLine::Paragraph(vec![text("-not a list")]),
            ]
        );
    }

    #[test]
    fn test_unterminated_fence_stays_prose() {
        let segments = render_message(&Message::model("Here:\n```c\nint main(void) {"));
        assert_eq!(segments.len(), 1);
        assert!(matches!(segments[0], Segment::Prose(_)));
    }

    #[test]
    fn test_adjacent_code_blocks() {
        let segments = render_message(&Message::model("```c\na();\n```\n```c\nb();\n```"));
        assert_eq!(
            segments,
            vec![
                Segment::Code {
                    text: "a();".to_string()
                },
                Segment::Code {
                    text: "b();".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_other_languages_are_prose() {
        let segments = render_message(&Message::model("```python\nprint(1)\n```"));
        assert_eq!(segments.len(), 1);
        assert!(matches!(segments[0], Segment::Prose(_)));
    }

    #[test]
    fn test_unclosed_bold_is_text() {
        assert_eq!(parse_spans("a **b"), vec![text("a **b")]);
        assert_eq!(parse_spans("``"), vec![text("``")]);
    }

    #[test]
    fn test_to_ansi_contains_content() {
        colored::control::set_override(false);
        let out = message_to_ansi(&Message::model("- **x**\n```c\nint y;\n```"));
        assert_eq!(out, "  - x\n\nC Code\n    int y;\n");
    }
}
