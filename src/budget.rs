//! Budget utilization table with a synthetic "Total" row.
//!
//! The totals row is recomputed after every mutation: numeric columns are
//! summed over the other rows, percentage columns are the plain mean of the
//! per-row percentages (not a ratio of the sums).

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

const TOTAL_HEAD: &str = "Total";

const DEFAULT_HEADS: [&str; 8] = [
    "GIA General, Other than NEH TSP & SCSP",
    "GIA Capital, Other than NEH TSP & SCSP",
    "GIA General, NEH",
    "GIA Capital, NEH",
    "GIA General, TSP",
    "GIA Capital, TSP",
    "GIA General, SCSP",
    "GIA Capital, SCSP",
];

/// One line of the budget utilization annexure.
///
/// Values are kept as the strings the user typed; the percentage fields are
/// derived by [`BudgetTable::recompute`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetRow {
    pub head: String,
    /// Revised estimate.
    pub re: String,
    /// Total expenditure against the revised estimate.
    pub exp: String,
    pub exp_pct: String,
    /// Budget estimate.
    pub be: String,
    /// Expenditure up to the reporting date against the budget estimate.
    pub upto: String,
    pub upto_pct: String,
}

impl BudgetRow {
    pub fn new(head: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            ..Self::default()
        }
    }

    pub fn is_total(&self) -> bool {
        self.head.trim().eq_ignore_ascii_case("total")
    }
}

/// The user-editable columns. Percentages are derived and not listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetColumn {
    Head,
    Re,
    Exp,
    Be,
    Upto,
}

/// Blank or non-numeric cells count as zero.
fn num(s: &str) -> f64 {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn fixed2(v: f64) -> String {
    format!("{:.2}", v)
}

/// Sums are left blank when they come out as zero, matching the editor.
fn sum_cell(v: f64) -> String {
    if v == 0.0 { String::new() } else { fixed2(v) }
}

fn percentage(part: &str, whole: &str) -> String {
    let (part, whole) = (num(part), num(whole));
    if part == 0.0 || whole == 0.0 {
        String::new()
    } else {
        fixed2(part * 100.0 / whole)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetTable {
    pub rows: Vec<BudgetRow>,
}

impl BudgetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The eight grant-in-aid heads followed by the totals row.
    pub fn with_default_heads() -> Self {
        let mut table = Self {
            rows: DEFAULT_HEADS.iter().map(|h| BudgetRow::new(*h)).collect(),
        };
        table.recompute();
        table
    }

    pub fn total(&self) -> Option<&BudgetRow> {
        self.rows.iter().find(|r| r.is_total())
    }

    pub fn entries(&self) -> impl Iterator<Item = &BudgetRow> {
        self.rows.iter().filter(|r| !r.is_total())
    }

    /// True once any entry has an amount typed in; heads alone do not count.
    pub fn has_amounts(&self) -> bool {
        self.entries().any(|r| {
            [&r.re, &r.exp, &r.be, &r.upto]
                .iter()
                .any(|v| !v.trim().is_empty())
        })
    }

    /// Insert a new row just above the totals row.
    pub fn add_row(&mut self, head: impl Into<String>) -> usize {
        self.rows.push(BudgetRow::new(head));
        self.recompute();
        self.rows.len().saturating_sub(2)
    }

    /// Set one user-editable cell and recompute.
    ///
    /// A head edit may neither turn an entry into a second "Total" nor rename
    /// the totals row into an entry.
    pub fn edit_cell(&mut self, index: usize, column: BudgetColumn, value: &str) -> Result<()> {
        let row = self
            .rows
            .get_mut(index)
            .ok_or(ReportError::NoSuchRow(index))?;
        if column == BudgetColumn::Head && row.is_total() != BudgetRow::new(value).is_total() {
            return Err(ReportError::ReservedHead(index));
        }
        let value = value.to_string();
        match column {
            BudgetColumn::Head => row.head = value,
            BudgetColumn::Re => row.re = value,
            BudgetColumn::Exp => row.exp = value,
            BudgetColumn::Be => row.be = value,
            BudgetColumn::Upto => row.upto = value,
        }
        self.recompute();
        Ok(())
    }

    pub fn delete_row(&mut self, index: usize) -> Result<BudgetRow> {
        if index >= self.rows.len() {
            return Err(ReportError::NoSuchRow(index));
        }
        let removed = self.rows.remove(index);
        self.recompute();
        Ok(removed)
    }

    /// Sort entries alphabetically by head; the totals row stays last.
    pub fn sort_by_head(&mut self) {
        self.rows
            .sort_by(|a, b| a.head.to_lowercase().cmp(&b.head.to_lowercase()));
        self.recompute();
    }

    /// Re-derive percentages and the totals row.
    ///
    /// Collapses duplicate totals rows into one, creates it when missing and
    /// moves it to the bottom.
    pub fn recompute(&mut self) {
        let (mut entries, totals): (Vec<BudgetRow>, Vec<BudgetRow>) =
            self.rows.drain(..).partition(|r| !r.is_total());

        let mut sums = [0.0f64; 4];
        let mut pct_sums = [0.0f64; 2];

        for row in entries.iter_mut() {
            row.exp_pct = percentage(&row.exp, &row.re);
            row.upto_pct = percentage(&row.upto, &row.be);

            sums[0] += num(&row.re);
            sums[1] += num(&row.exp);
            sums[2] += num(&row.be);
            sums[3] += num(&row.upto);
            pct_sums[0] += num(&row.exp_pct);
            pct_sums[1] += num(&row.upto_pct);
        }

        let mut total = totals
            .into_iter()
            .next()
            .unwrap_or_else(|| BudgetRow::new(TOTAL_HEAD));
        total.re = sum_cell(sums[0]);
        total.exp = sum_cell(sums[1]);
        total.be = sum_cell(sums[2]);
        total.upto = sum_cell(sums[3]);

        if entries.is_empty() {
            total.exp_pct.clear();
            total.upto_pct.clear();
        } else {
            let n = entries.len() as f64;
            total.exp_pct = fixed2(pct_sums[0] / n);
            total.upto_pct = fixed2(pct_sums[1] / n);
        }

        entries.push(total);
        self.rows = entries;
    }

    /// Header and body cells for rendering, totals row included.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        let mut grid = vec![
            [
                "Head",
                "RE",
                "Total Expenditure",
                "Total Expenditure (%)",
                "BE",
                "Upto 31-12",
                "Upto 31-12 (%)",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>(),
        ];
        grid.extend(self.rows.iter().map(|r| {
            vec![
                r.head.clone(),
                r.re.clone(),
                r.exp.clone(),
                r.exp_pct.clone(),
                r.be.clone(),
                r.upto.clone(),
                r.upto_pct.clone(),
            ]
        }));
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_garbage_cells_are_zero() {
        assert_eq!(num(""), 0.0);
        assert_eq!(num("abc"), 0.0);
        assert_eq!(num(" 12.5 "), 12.5);
    }

    #[test]
    fn entries_cannot_be_renamed_to_total() {
        let mut table = BudgetTable::with_default_heads();
        table.edit_cell(0, BudgetColumn::Re, "100").unwrap();
        assert!(matches!(
            table.edit_cell(0, BudgetColumn::Head, " total "),
            Err(ReportError::ReservedHead(0))
        ));
        let last = table.rows.len() - 1;
        assert!(table.edit_cell(last, BudgetColumn::Head, "Misc").is_err());
        assert_eq!(table.rows.len(), 9);
        assert_eq!(table.total().map(|t| t.re.as_str()), Some("100.00"));
    }

    #[test]
    fn percentage_needs_both_operands() {
        assert_eq!(percentage("50", "200"), "25.00");
        assert_eq!(percentage("", "200"), "");
        assert_eq!(percentage("50", "0"), "");
    }
}
