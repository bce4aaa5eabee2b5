use pulldown_cmark::Alignment;
use textwrap::core::display_width;
use textwrap::wrap;

const MIN_COLUMN_WIDTH: usize = 3;

/// A Markdown table collected from parser events, drawn with box characters.
#[derive(Debug, Default)]
pub struct Table {
    alignments: Vec<Alignment>,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(alignments: Vec<Alignment>) -> Self {
        Self {
            alignments,
            ..Default::default()
        }
    }

    pub fn set_header(&mut self, cells: Vec<String>) {
        self.header = cells;
    }

    pub fn add_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn columns(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain([self.alignments.len(), self.header.len()])
            .max()
            .unwrap_or(0)
    }

    /// Natural column widths, narrowed widest-first until the table fits `max_width`.
    fn column_widths(&self, max_width: usize) -> Vec<usize> {
        let columns = self.columns();
        let mut widths = vec![MIN_COLUMN_WIDTH; columns];
        for row in std::iter::once(&self.header).chain(&self.rows) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(display_width(cell));
            }
        }

        // "  │ " + " │ " between cells + " │"
        let chrome = 3 * columns + 3;
        let available = max_width.saturating_sub(chrome);
        while widths.iter().sum::<usize>() > available {
            let widest = widths
                .iter()
                .enumerate()
                .max_by_key(|(_, width)| **width)
                .map(|(i, width)| (i, *width));
            match widest {
                Some((i, width)) if width > MIN_COLUMN_WIDTH => widths[i] -= 1,
                _ => break,
            }
        }
        widths
    }

    pub fn render(&self, max_width: usize) -> String {
        if self.columns() == 0 {
            return String::new();
        }

        let widths = self.column_widths(max_width);
        let mut output = String::new();
        push_border(&mut output, &widths, ['┌', '┬', '┐']);
        self.push_row(&mut output, &self.header, &widths);
        push_border(&mut output, &widths, ['├', '┼', '┤']);
        for row in &self.rows {
            self.push_row(&mut output, row, &widths);
        }
        push_border(&mut output, &widths, ['└', '┴', '┘']);
        output
    }

    /// Cells wider than their column wrap onto extra lines of the same row.
    fn push_row(&self, output: &mut String, cells: &[String], widths: &[usize]) {
        let wrapped: Vec<Vec<String>> = widths
            .iter()
            .enumerate()
            .map(|(i, &width)| {
                let content = cells.get(i).map(String::as_str).unwrap_or("");
                wrap(content, width).into_iter().map(|line| line.into_owned()).collect()
            })
            .collect();
        let height = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);

        for line in 0..height {
            output.push_str("  │");
            for (i, &width) in widths.iter().enumerate() {
                let text = wrapped[i].get(line).map(String::as_str).unwrap_or("");
                let alignment = self.alignments.get(i).cloned().unwrap_or(Alignment::None);
                output.push(' ');
                output.push_str(&pad(text, width, alignment));
                output.push_str(" │");
            }
            output.push('\n');
        }
    }
}

fn push_border(output: &mut String, widths: &[usize], [left, middle, right]: [char; 3]) {
    output.push_str("  ");
    output.push(left);
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            output.push(middle);
        }
        output.push_str(&"─".repeat(width + 2));
    }
    output.push(right);
    output.push('\n');
}

fn pad(text: &str, width: usize, alignment: Alignment) -> String {
    let spaces = width.saturating_sub(display_width(text));
    let (left, right) = match alignment {
        Alignment::Right => (spaces, 0),
        Alignment::Center => (spaces / 2, spaces - spaces / 2),
        Alignment::Left | Alignment::None => (0, spaces),
    };
    format!("{}{text}{}", " ".repeat(left), " ".repeat(right))
}
