//! Fixed-width table output, optionally colored, optionally mirrored to a
//! log file.

use crossterm::style::{Attribute, Color, ContentStyle, StyledContent};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

/// Default column width
pub const WIDTH: usize = 7;

/// Terminal styling of a single cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Style {
    pub fg: Option<Color>,
    pub bright: bool,
    pub dim: bool,
}

impl Style {
    pub const PLAIN: Style = Style {
        fg: None,
        bright: false,
        dim: false,
    };

    pub fn bright() -> Self {
        Style {
            bright: true,
            ..Style::PLAIN
        }
    }

    pub fn dim() -> Self {
        Style {
            dim: true,
            ..Style::PLAIN
        }
    }

    pub fn fg(color: Color) -> Self {
        Style {
            fg: Some(color),
            ..Style::bright()
        }
    }

    fn content_style(&self) -> ContentStyle {
        let mut style = ContentStyle::new();
        style.foreground_color = self.fg;
        if self.bright {
            style.attributes.set(Attribute::Bold);
        }
        if self.dim {
            style.attributes.set(Attribute::Dim);
        }
        style
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Blank,
    Text(String, Style),
}

impl Cell {
    pub fn plain(v: impl ToString) -> Self {
        Cell::Text(v.to_string(), Style::PLAIN)
    }

    pub fn styled(v: impl ToString, style: Style) -> Self {
        Cell::Text(v.to_string(), style)
    }

    fn render(&self, width: usize, color: bool) -> String {
        match self {
            Cell::Blank => " ".repeat(width),
            Cell::Text(s, style) => {
                let pad = " ".repeat(width.saturating_sub(s.chars().count()));
                if color && *style != Style::PLAIN {
                    format!("{}{}", pad, StyledContent::new(style.content_style(), s))
                } else {
                    format!("{}{}", pad, s)
                }
            }
        }
    }
}

/// Render cells right-aligned in columns of `width`, separated by a space
pub fn render(cells: &[Cell], width: usize, color: bool) -> String {
    cells
        .iter()
        .map(|c| c.render(width, color))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Destination of the monitor table
pub struct Sink {
    out: Box<dyn Write>,
    log: Option<PathBuf>,
    color: bool,
    header_logged: bool,
}

impl Sink {
    pub fn new(out: Box<dyn Write>, log: Option<PathBuf>, color: bool) -> Self {
        Sink {
            out,
            log,
            color,
            header_logged: false,
        }
    }

    pub fn stdout(log: Option<PathBuf>, color: bool) -> Self {
        Sink::new(Box::new(io::stdout()), log, color)
    }

    /// A row that is also appended to the log file
    pub fn row(&mut self, cells: &[Cell]) -> io::Result<()> {
        self.print(cells, "\n")?;
        self.append_log(cells)
    }

    /// The header row, logged only the first time
    pub fn header(&mut self, cells: &[Cell]) -> io::Result<()> {
        self.print(cells, "\n")?;
        if !self.header_logged {
            self.header_logged = true;
            self.append_log(cells)?;
        }
        Ok(())
    }

    /// A row left on the cursor line, overwritten by whatever follows
    pub fn transient(&mut self, cells: &[Cell]) -> io::Result<()> {
        self.print(cells, "\r")
    }

    /// A row shown on screen only
    pub fn display(&mut self, cells: &[Cell]) -> io::Result<()> {
        self.print(cells, "\n")
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)?;
        self.out.flush()
    }

    fn print(&mut self, cells: &[Cell], end: &str) -> io::Result<()> {
        write!(self.out, "{}{}", render(cells, WIDTH, self.color), end)?;
        self.out.flush()
    }

    fn append_log(&mut self, cells: &[Cell]) -> io::Result<()> {
        if let Some(path) = &self.log {
            let mut f = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(f, "{}", render(cells, WIDTH, false))?;
        }
        Ok(())
    }
}
