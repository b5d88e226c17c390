//! The document flow engine.
//!
//! Lays a [`ReportDocument`] out onto fixed-size pages. A single vertical
//! cursor (top-down, in points) is threaded through every drawing operation;
//! whenever content would cross the bottom margin a new page is started and
//! the cursor returns to the top margin.
//!
//! The output is a list of positioned [`DrawOp`]s per page, which the `pdf`
//! module serializes. Keeping layout free of any PDF types lets tests inspect
//! exactly what was placed where.

mod figure;
mod table;
pub mod text;

pub use figure::{decode_figure, RasterImage};

use crate::config::PageSetup;
use crate::model::{Block, ReportDocument, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
}

/// What a piece of text is, so callers can find it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    Title,
    Heading,
    Subheading,
    Body,
    /// Bold label above an object table.
    Label,
    Caption,
    HeaderCell,
    Cell,
    RunningHeader,
    Footer,
}

/// One positioned drawing primitive. `y` grows downwards from the top edge;
/// for text it is the baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        text: String,
        font: Font,
        size: f32,
        color: Rgb,
        role: TextRole,
    },
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    },
    Image {
        /// Index into [`LayoutDocument::images`].
        image: usize,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    pub fn texts(&self, role: TextRole) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(move |op| match op {
            DrawOp::Text { text, role: r, .. } if *r == role => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn image_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Image { .. }))
            .count()
    }
}

/// Finished layout: pages plus the decoded images they reference.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDocument {
    pub width: f32,
    pub height: f32,
    pub pages: Vec<Page>,
    pub images: Vec<RasterImage>,
}

impl LayoutDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every text with the given role, in page order.
    pub fn texts(&self, role: TextRole) -> Vec<&str> {
        self.pages.iter().flat_map(|p| p.texts(role)).collect()
    }
}

pub struct FlowEngine {
    setup: PageSetup,
    pages: Vec<Page>,
    cursor: f32,
    headings: usize,
    images: Vec<RasterImage>,
}

impl FlowEngine {
    pub fn new(setup: PageSetup) -> Self {
        let cursor = setup.margin_top;
        Self {
            setup,
            pages: vec![Page::default()],
            cursor,
            headings: 0,
            images: Vec::new(),
        }
    }

    pub fn setup(&self) -> &PageSetup {
        &self.setup
    }

    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.cursor = self.setup.margin_top;
        log::trace!("page break -> page {}", self.pages.len());
    }

    /// Start a new page when the cursor is already past `limit`.
    fn break_if_past(&mut self, limit: f32) {
        if self.cursor > limit {
            self.new_page();
        }
    }

    fn draw(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    fn text_at(&mut self, x: f32, y: f32, text: &str, font: Font, size: f32, role: TextRole) {
        self.draw(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
            font,
            size,
            color: Rgb::BLACK,
            role,
        });
    }

    fn line(&mut self, text: &str, font: Font, size: f32, role: TextRole) {
        let (x, y) = (self.setup.margin_left, self.cursor);
        self.text_at(x, y, text, font, size, role);
    }

    /// Report title and faculty line at the top of the first page.
    pub fn write_cover(&mut self, title: &str, faculty: &str) {
        self.line(title, Font::Bold, 18.0, TextRole::Title);
        self.cursor += 24.0;
        self.line(&format!("Faculty: {}", faculty), Font::Regular, 12.0, TextRole::Title);
        self.cursor += 30.0;
    }

    /// Section heading. Every heading after the first starts a new page.
    pub fn write_heading(&mut self, label: &str) {
        if self.headings > 0 {
            self.new_page();
        }
        self.headings += 1;
        let size = self.setup.heading_size;
        self.line(label, Font::Bold, size, TextRole::Heading);
        self.cursor += self.setup.heading_advance;
    }

    /// Sub-heading; only breaks when too little room is left on the page.
    pub fn write_subheading(&mut self, text: &str) {
        self.break_if_past(self.setup.bottom_limit() - self.setup.subheading_min_room);
        let size = self.setup.subheading_size;
        self.line(text, Font::Bold, size, TextRole::Subheading);
        self.cursor += self.setup.subheading_advance;
    }

    /// Word-wrapped body text. Returns the cursor after the last line.
    pub fn write_paragraph(&mut self, text: &str) -> f32 {
        let paras = text::paragraphs(text);
        let (size, width) = (self.setup.body_size, self.setup.content_width());

        for (idx, para) in paras.iter().enumerate() {
            for line in text::wrap(para, Font::Regular, size, width) {
                self.break_if_past(self.setup.bottom_limit());
                self.line(&line, Font::Regular, size, TextRole::Body);
                self.cursor += self.setup.body_leading;
            }
            if idx + 1 < paras.len() {
                self.cursor += self.setup.paragraph_gap;
            }
        }
        self.cursor
    }

    /// Wrapped caption lines at caption size.
    fn write_caption(&mut self, text: &str) {
        let (size, width) = (self.setup.caption_size, self.setup.content_width());
        for line in text::wrap(text, Font::Regular, size, width) {
            self.break_if_past(self.setup.bottom_limit() - 20.0);
            self.line(&line, Font::Regular, size, TextRole::Caption);
            self.cursor += self.setup.caption_leading;
        }
    }

    /// Heading, body, then the section's figures and tables.
    pub fn emit_section(&mut self, section: &Section) {
        log::debug!(
            "section {} starts on page {}",
            section.heading(),
            self.page_count()
        );
        self.write_heading(&section.heading());
        for block in &section.blocks {
            match block {
                Block::Subheading(t) => self.write_subheading(t),
                Block::Paragraph(t) => {
                    self.write_paragraph(t);
                }
                Block::Records(t) => self.render_object_table(t),
                Block::Grid(rows) => self.render_grid_table(rows),
            }
        }
        self.render_section_figures(&section.label, &section.figures);
        self.render_section_tables(&section.label, &section.tables);
    }

    /// Cover block, then every section that has content.
    pub fn emit_document(&mut self, doc: &ReportDocument) {
        self.write_cover(&doc.cover_title(), &doc.faculty);
        for section in doc.printed_sections() {
            self.emit_section(section);
        }
    }

    /// Stamp the running header and "Page i of N" footer on every page.
    ///
    /// Runs after layout because N is only known then.
    pub fn finalize(mut self, header: &str) -> LayoutDocument {
        let total = self.pages.len();
        let (width, height) = (self.setup.width, self.setup.height);
        let left = self.setup.margin_left;

        for (i, page) in self.pages.iter_mut().enumerate() {
            let footer = format!("Page {} of {}", i + 1, total);
            let footer_x = (width - text::text_width(&footer, Font::Italic, 9.0)) / 2.0;
            for (x, y, text, role) in [
                (left, 30.0, header.to_string(), TextRole::RunningHeader),
                (footer_x, height - 30.0, footer, TextRole::Footer),
            ] {
                page.ops.push(DrawOp::Text {
                    x,
                    y,
                    text,
                    font: Font::Italic,
                    size: 9.0,
                    color: Rgb::BLACK,
                    role,
                });
            }
        }

        LayoutDocument {
            width,
            height,
            pages: self.pages,
            images: self.images,
        }
    }
}

/// Lay out a whole report.
pub fn layout_document(doc: &ReportDocument, setup: &PageSetup) -> LayoutDocument {
    let mut engine = FlowEngine::new(setup.clone());
    engine.emit_document(doc);
    let layout = engine.finalize(&doc.running_header());
    log::info!(
        "laid out {} pages, {} images",
        layout.page_count(),
        layout.images.len()
    );
    layout
}
