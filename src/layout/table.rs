//! Paginated grid tables with a repeating header row.

use super::text::{longest_word, text_width, wrap};
use super::{DrawOp, FlowEngine, Font, Rgb, TextRole};
use crate::model::RecordTable;
use crate::state::TableRef;

const CELL_PADDING: f32 = 4.0;
const LINE_FACTOR: f32 = 1.15;
const HEAD_FILL: Rgb = Rgb(102, 126, 234);
const GRID_LINE: Rgb = Rgb(180, 180, 180);
const BODY_TEXT: Rgb = Rgb(40, 40, 40);

/// Space left under a table before the next block.
const TABLE_TRAILER: f32 = 16.0;

/// Column widths that fill `total`.
///
/// Columns start at their natural (unwrapped) width. If that overflows,
/// each column keeps at least its longest word and the remaining room is
/// shared in proportion to how much each would still like.
pub(super) fn column_widths(grid: &[Vec<String>], size: f32, total: f32) -> Vec<f32> {
    let ncols = grid.iter().map(Vec::len).max().unwrap_or(0);
    if ncols == 0 {
        return Vec::new();
    }

    let mut natural = vec![2.0 * CELL_PADDING; ncols];
    let mut minimum = vec![2.0 * CELL_PADDING; ncols];
    for (r, row) in grid.iter().enumerate() {
        let font = if r == 0 { Font::Bold } else { Font::Regular };
        for (c, cell) in row.iter().enumerate() {
            let widest_line = cell
                .split('\n')
                .map(|l| text_width(l, font, size))
                .fold(0.0, f32::max);
            natural[c] = natural[c].max(widest_line + 2.0 * CELL_PADDING);
            minimum[c] = minimum[c].max(longest_word(cell, font, size) + 2.0 * CELL_PADDING);
        }
    }

    let natural_sum: f32 = natural.iter().sum();
    if natural_sum <= total {
        return natural.iter().map(|w| w * total / natural_sum).collect();
    }

    let min_sum: f32 = minimum.iter().sum();
    if min_sum >= total {
        return vec![total / ncols as f32; ncols];
    }

    let spare = total - min_sum;
    let wanted = natural_sum - min_sum;
    natural
        .iter()
        .zip(&minimum)
        .map(|(n, m)| m + (n - m) * spare / wanted)
        .collect()
}

struct LaidRow {
    cells: Vec<Vec<String>>,
    height: f32,
}

impl FlowEngine {
    fn lay_row(&self, row: &[String], widths: &[f32], font: Font) -> LaidRow {
        let size = self.setup.table_font_size;
        let cells: Vec<Vec<String>> = widths
            .iter()
            .enumerate()
            .map(|(c, w)| {
                let cell = row.get(c).map(String::as_str).unwrap_or("");
                wrap(cell, font, size, (w - 2.0 * CELL_PADDING).max(1.0))
            })
            .collect();
        let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
        LaidRow {
            cells,
            height: lines as f32 * size * LINE_FACTOR + 2.0 * CELL_PADDING,
        }
    }

    fn draw_row(&mut self, row: &LaidRow, widths: &[f32], header: bool) {
        let size = self.setup.table_font_size;
        let (font, color, role) = if header {
            (Font::Bold, Rgb::WHITE, TextRole::HeaderCell)
        } else {
            (Font::Regular, BODY_TEXT, TextRole::Cell)
        };

        let top = self.cursor;
        let mut x = self.setup.margin_left;
        for (lines, w) in row.cells.iter().zip(widths) {
            self.draw(DrawOp::Rect {
                x,
                y: top,
                w: *w,
                h: row.height,
                fill: header.then_some(HEAD_FILL),
                stroke: Some(GRID_LINE),
            });
            let mut baseline = top + CELL_PADDING + size;
            for line in lines {
                if line.is_empty() {
                    baseline += size * LINE_FACTOR;
                    continue;
                }
                self.draw(DrawOp::Text {
                    x: x + CELL_PADDING,
                    y: baseline,
                    text: line.clone(),
                    font,
                    size,
                    color,
                    role,
                });
                baseline += size * LINE_FACTOR;
            }
            x += w;
        }
        self.cursor = top + row.height;
    }

    /// Height of the header plus the first body row, the least of `grid`
    /// that may start a page.
    fn table_lead_height(&self, grid: &[Vec<String>]) -> f32 {
        let widths = column_widths(grid, self.setup.table_font_size, self.setup.content_width());
        grid.iter()
            .take(2)
            .enumerate()
            .map(|(r, row)| {
                let font = if r == 0 { Font::Bold } else { Font::Regular };
                self.lay_row(row, &widths, font).height
            })
            .sum()
    }

    /// Start a new page unless `height` more points fit above the bottom
    /// margin. A fresh page is never broken again.
    fn keep_together(&mut self, height: f32) {
        if self.cursor > self.setup.margin_top
            && self.cursor + height > self.setup.bottom_limit()
        {
            self.new_page();
        }
    }

    /// Draw `grid` starting `gap` below the cursor. The first row is the
    /// header and is repeated at the top of every continuation page. A body
    /// row taller than a whole page is drawn anyway and overflows.
    fn draw_table(&mut self, grid: &[Vec<String>], gap: f32) {
        let Some((head, body)) = grid.split_first() else {
            return;
        };
        let widths = column_widths(grid, self.setup.table_font_size, self.setup.content_width());
        let head = self.lay_row(head, &widths, Font::Bold);
        let bottom = self.setup.bottom_limit();

        self.cursor += gap;
        let first_height = body
            .first()
            .map(|r| self.lay_row(r, &widths, Font::Regular).height)
            .unwrap_or(0.0);
        if self.cursor + head.height + first_height > bottom {
            self.new_page();
        }
        self.draw_row(&head, &widths, true);

        let mut rows_on_page = 0;
        for row in body {
            let laid = self.lay_row(row, &widths, Font::Regular);
            if rows_on_page > 0 && self.cursor + laid.height > bottom {
                self.new_page();
                self.draw_row(&head, &widths, true);
                rows_on_page = 0;
            }
            self.draw_row(&laid, &widths, false);
            rows_on_page += 1;
        }

        self.cursor += TABLE_TRAILER;
    }

    /// Caption lines plus the start of the table below them.
    fn caption_lead_height(&self, caption: &str, grid: &[Vec<String>]) -> f32 {
        let lines = wrap(
            caption,
            Font::Regular,
            self.setup.caption_size,
            self.setup.content_width(),
        )
        .len();
        lines as f32 * self.setup.caption_leading + 10.0 + self.table_lead_height(grid)
    }

    /// Raw grid, first row as header.
    pub fn render_grid_table(&mut self, rows: &[Vec<String>]) {
        self.draw_table(rows, 10.0);
    }

    /// Records through a column map, with an optional bold label above.
    /// Records with no text in any field are dropped.
    pub fn render_object_table(&mut self, table: &RecordTable) {
        if table.is_empty() {
            return;
        }
        let grid = table.to_grid();
        let label = table.caption.as_deref().filter(|c| !c.trim().is_empty());
        let label_height = if label.is_some() { 16.0 } else { 0.0 };
        self.keep_together(label_height + 4.0 + self.table_lead_height(&grid));

        if let Some(label) = label {
            self.line(label, Font::Bold, 12.0, TextRole::Label);
            self.cursor += 16.0;
        }
        self.draw_table(&grid, 4.0);
    }

    /// "Tables – <label>" followed by each table with its caption line.
    pub fn render_section_tables(&mut self, label: &str, tables: &[TableRef]) {
        if tables.is_empty() {
            return;
        }
        let captions: Vec<String> = tables
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let number = if t.local_index > 0 { t.local_index as usize } else { i + 1 };
                format!("Table {}: {}", number, t.caption.trim())
            })
            .collect();

        self.break_if_past(self.setup.bottom_limit() - 40.0);
        self.keep_together(16.0 + self.caption_lead_height(&captions[0], &tables[0].rows));
        let size = self.setup.subheading_size;
        self.line(&format!("Tables – {}", label), Font::Bold, size, TextRole::Subheading);
        self.cursor += 16.0;

        for (caption, t) in captions.iter().zip(tables) {
            self.keep_together(self.caption_lead_height(caption, &t.rows));
            self.write_caption(caption);
            self.render_grid_table(&t.rows);
        }
    }
}
