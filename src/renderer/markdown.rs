use crate::renderer::{SyntaxCache, Table};
use pulldown_cmark::{CodeBlockKind, Event, Options as ParseOptions, Parser, Tag};
use std::fmt::Write;
use syntect::easy::HighlightLines;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};
use textwrap::{wrap, Options};

const CODE_INDENT: &str = "    ";

/// Renders assistant replies as wrapped, ANSI-styled terminal text.
pub struct MarkdownRenderer {
    wrap_options: Options<'static>,
    highlight: bool,
}

#[derive(Default)]
struct RenderState {
    output: String,
    paragraph: String,
    code_language: Option<String>,
    list_depth: usize,
    ordered: Vec<Option<u64>>,
    table: Option<Table>,
    row: Vec<String>,
    cell: String,
}

impl MarkdownRenderer {
    pub fn new(width: usize) -> Self {
        let wrap_options = Options::new(width.max(20))
            .initial_indent("  ")
            .subsequent_indent("  ");

        Self {
            wrap_options,
            highlight: true,
        }
    }

    /// Skips syntect; code blocks are only indented.
    pub fn without_highlighting(mut self) -> Self {
        self.highlight = false;
        self
    }

    pub fn width(&self) -> usize {
        self.wrap_options.width
    }

    pub fn render(&self, text: &str) -> String {
        let mut state = RenderState {
            output: String::with_capacity(text.len() * 2),
            ..Default::default()
        };

        for event in Parser::new_ext(text, ParseOptions::ENABLE_TABLES) {
            match event {
                Event::Start(Tag::Table(alignments)) => {
                    self.flush_paragraph(&mut state);
                    state.table = Some(Table::new(alignments));
                }
                Event::End(Tag::Table(_)) => {
                    if let Some(table) = state.table.take() {
                        state.output.push_str(&table.render(self.width()));
                        state.output.push('\n');
                    }
                }
                Event::Start(Tag::TableHead) | Event::Start(Tag::TableRow) => state.row.clear(),
                Event::Start(Tag::TableCell) => state.cell.clear(),
                Event::End(Tag::TableCell) => {
                    let cell = std::mem::take(&mut state.cell);
                    state.row.push(cell.trim().to_string());
                }
                Event::End(Tag::TableHead) => {
                    let row = std::mem::take(&mut state.row);
                    if let Some(table) = state.table.as_mut() {
                        table.set_header(row);
                    }
                }
                Event::End(Tag::TableRow) => {
                    let row = std::mem::take(&mut state.row);
                    if let Some(table) = state.table.as_mut() {
                        table.add_row(row);
                    }
                }
                Event::Text(text) | Event::Code(text) if state.table.is_some() => state.cell.push_str(&text),
                Event::SoftBreak | Event::HardBreak if state.table.is_some() => state.cell.push(' '),
                // Cell widths are measured on plain text, so inline styling is dropped.
                Event::Start(Tag::Emphasis | Tag::Strong | Tag::Strikethrough)
                | Event::End(Tag::Emphasis | Tag::Strong | Tag::Strikethrough)
                    if state.table.is_some() => {}
                Event::Start(Tag::CodeBlock(kind)) => {
                    self.flush_paragraph(&mut state);
                    state.code_language = Some(match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => lang.to_string(),
                        _ => "txt".to_string(),
                    });
                    state.output.push('\n');
                }
                Event::End(Tag::CodeBlock(_)) => {
                    state.code_language = None;
                    state.output.push('\n');
                }
                Event::Text(text) if state.code_language.is_some() => {
                    let language = state.code_language.clone().unwrap_or_default();
                    self.push_code(&mut state.output, &text, &language);
                }
                Event::Start(Tag::Heading(..)) => {
                    self.flush_paragraph(&mut state);
                    state.paragraph.push_str("\x1B[1;4m");
                }
                Event::End(Tag::Heading(..)) => {
                    state.paragraph.push_str("\x1B[22;24m");
                    self.flush_paragraph(&mut state);
                    state.output.push('\n');
                }
                Event::Start(Tag::List(start)) => {
                    self.flush_paragraph(&mut state);
                    state.list_depth += 1;
                    state.ordered.push(start);
                }
                Event::End(Tag::List(_)) => {
                    self.flush_paragraph(&mut state);
                    state.list_depth = state.list_depth.saturating_sub(1);
                    state.ordered.pop();
                    if state.list_depth == 0 {
                        state.output.push('\n');
                    }
                }
                Event::Start(Tag::Item) => {
                    self.flush_paragraph(&mut state);
                    let marker = match state.ordered.last_mut() {
                        Some(Some(n)) => {
                            let marker = format!("{n}. ");
                            *n += 1;
                            marker
                        }
                        _ => "• ".to_string(),
                    };
                    state.paragraph.push_str(&marker);
                }
                Event::End(Tag::Item) => self.flush_paragraph(&mut state),
                Event::End(Tag::Paragraph) => {
                    self.flush_paragraph(&mut state);
                    if state.list_depth == 0 {
                        state.output.push('\n');
                    }
                }
                Event::Start(Tag::Emphasis) => state.paragraph.push_str("\x1B[3m"),
                Event::End(Tag::Emphasis) => state.paragraph.push_str("\x1B[23m"),
                Event::Start(Tag::Strong) => state.paragraph.push_str("\x1B[1m"),
                Event::End(Tag::Strong) => state.paragraph.push_str("\x1B[22m"),
                Event::Code(text) => {
                    state.paragraph.push('`');
                    state.paragraph.push_str(&text);
                    state.paragraph.push('`');
                }
                Event::Text(text) => state.paragraph.push_str(&text),
                Event::SoftBreak => state.paragraph.push(' '),
                Event::HardBreak => {
                    self.flush_paragraph(&mut state);
                }
                Event::Rule => {
                    self.flush_paragraph(&mut state);
                    let _ = writeln!(state.output, "  {}\n", "─".repeat(self.width().saturating_sub(4)));
                }
                _ => {}
            }
        }

        self.flush_paragraph(&mut state);
        state.output.trim_end().to_string()
    }

    fn push_code(&self, output: &mut String, text: &str, language: &str) {
        if !self.highlight {
            for line in LinesWithEndings::from(text) {
                output.push_str(CODE_INDENT);
                output.push_str(line);
            }
            return;
        }

        let cache = SyntaxCache::global();
        let mut highlighter = HighlightLines::new(cache.get_syntax(language), cache.get_theme());
        for line in LinesWithEndings::from(text) {
            output.push_str(CODE_INDENT);
            match highlighter.highlight_line(line, &cache.syntax_set) {
                Ok(ranges) => output.push_str(&as_24_bit_terminal_escaped(&ranges[..], false)),
                Err(_) => output.push_str(line),
            }
        }
        output.push_str("\x1B[39;49m");
    }

    fn flush_paragraph(&self, state: &mut RenderState) {
        if state.paragraph.is_empty() {
            return;
        }

        if state.list_depth > 0 {
            let initial = "  ".repeat(state.list_depth);
            let subsequent = format!("{initial}    ");
            let options = Options::new(self.width())
                .initial_indent(&initial)
                .subsequent_indent(&subsequent);
            for line in wrap(&state.paragraph, &options) {
                let _ = writeln!(state.output, "{line}");
            }
        } else {
            for line in wrap(&state.paragraph, &self.wrap_options) {
                let _ = writeln!(state.output, "{line}");
            }
        }
        state.paragraph.clear();
    }
}
