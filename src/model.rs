//! Document model consumed by the flow engine.
//!
//! A read-only projection of the state tree, rebuilt on every export and never
//! persisted. See [`crate::projection::project`].

use crate::state::{record_field, record_has_content, FigureRef, Record, TableRef};

/// A column of an object table: record field and printed header.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub key: String,
    pub header: String,
}

impl Column {
    pub fn new(key: &str, header: &str) -> Self {
        Self {
            key: key.to_string(),
            header: header.to_string(),
        }
    }
}

/// Build a column map from `(key, header)` pairs.
pub fn columns(pairs: &[(&str, &str)]) -> Vec<Column> {
    pairs.iter().map(|(k, h)| Column::new(k, h)).collect()
}

/// Structured records rendered through a column map.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTable {
    /// Bold label drawn above the table.
    pub caption: Option<String>,
    pub columns: Vec<Column>,
    pub rows: Vec<Record>,
}

impl RecordTable {
    pub fn filled_rows(&self) -> impl Iterator<Item = &Record> {
        self.rows.iter().filter(|r| record_has_content(r))
    }

    pub fn is_empty(&self) -> bool {
        self.filled_rows().next().is_none()
    }

    /// Header row followed by one row per filled record.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        let mut grid = vec![self.columns.iter().map(|c| c.header.clone()).collect()];
        grid.extend(
            self.filled_rows()
                .map(|r| self.columns.iter().map(|c| record_field(r, &c.key)).collect()),
        );
        grid
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Subheading(String),
    /// Free text; blank lines separate paragraphs.
    Paragraph(String),
    Records(RecordTable),
    /// Raw grid, first row is the header.
    Grid(Vec<Vec<String>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub ordinal: usize,
    pub title: String,
    /// Short name used in the "Figures – …" and "Tables – …" headings.
    pub label: String,
    pub blocks: Vec<Block>,
    /// Deferred to the end of the section, in encounter order.
    pub figures: Vec<FigureRef>,
    pub tables: Vec<TableRef>,
}

impl Section {
    pub fn heading(&self) -> String {
        format!("{}. {}", self.ordinal, self.title)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.figures.is_empty() && self.tables.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub institute: String,
    pub faculty: String,
    pub division: String,
    pub year: String,
    pub sections: Vec<Section>,
}

impl ReportDocument {
    pub fn cover_title(&self) -> String {
        format!("{} – Annual Report {}", self.institute, self.year)
    }

    pub fn running_header(&self) -> String {
        format!("{} | Annual Report {}", self.institute, self.year)
    }

    /// Sections that will actually be printed.
    pub fn printed_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|s| !s.is_empty())
    }
}
