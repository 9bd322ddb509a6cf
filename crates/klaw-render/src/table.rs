use owo_colors::OwoColorize;

/// Terminal style of a single cell. Applied after padding so escape codes
/// never count towards column width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Plain,
    Dim,
    Red,
    Green,
    Yellow,
    Cyan,
    Bold,
}

impl Tone {
    fn paint(self, text: &str) -> String {
        match self {
            Tone::Plain => text.to_string(),
            Tone::Dim => text.dimmed().to_string(),
            Tone::Red => text.red().to_string(),
            Tone::Green => text.green().to_string(),
            Tone::Yellow => text.yellow().to_string(),
            Tone::Cyan => text.cyan().to_string(),
            Tone::Bold => text.bold().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub tone: Tone,
}

impl Cell {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Plain)
    }

    fn width(&self) -> usize {
        self.text.chars().count()
    }

    pub fn styled(&self, colors: bool) -> String {
        if colors {
            self.tone.paint(&self.text)
        } else {
            self.text.clone()
        }
    }
}

const TOP: [&str; 3] = ["╭", "┬", "╮"];
const MIDDLE: [&str; 3] = ["├", "┼", "┤"];
const BOTTOM: [&str; 3] = ["╰", "┴", "╯"];
const HORIZONTAL: &str = "─";
const VERTICAL: &str = "│";

#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (idx, cell) in row.iter().enumerate() {
                if idx >= widths.len() {
                    widths.push(0);
                }
                widths[idx] = widths[idx].max(cell.width());
            }
        }
        widths
    }

    /// Render with rounded box glyphs; `colors` toggles ANSI styling.
    pub fn render(&self, colors: bool) -> String {
        let widths = self.widths();
        let mut out = String::new();

        out.push_str(&rule(&widths, TOP));
        let header_cells: Vec<Cell> = self
            .headers
            .iter()
            .map(|header| Cell::new(header.clone(), Tone::Bold))
            .collect();
        out.push_str(&line(&header_cells, &widths, colors));
        if !self.rows.is_empty() {
            out.push_str(&rule(&widths, MIDDLE));
        }
        for row in &self.rows {
            out.push_str(&line(row, &widths, colors));
        }
        out.push_str(&rule(&widths, BOTTOM));
        out
    }
}

fn rule(widths: &[usize], glyphs: [&str; 3]) -> String {
    let segments: Vec<String> = widths.iter().map(|w| HORIZONTAL.repeat(w + 2)).collect();
    format!("{}{}{}\n", glyphs[0], segments.join(glyphs[1]), glyphs[2])
}

fn line(cells: &[Cell], widths: &[usize], colors: bool) -> String {
    let mut out = String::from(VERTICAL);
    for (idx, width) in widths.iter().enumerate() {
        let empty = Cell::plain("");
        let cell = cells.get(idx).unwrap_or(&empty);
        let text = cell.styled(colors);
        let pad = " ".repeat(width.saturating_sub(cell.width()));
        out.push_str(&format!(" {}{} {}", text, pad, VERTICAL));
    }
    out.push('\n');
    out
}
