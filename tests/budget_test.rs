use annual_report::budget::{BudgetColumn, BudgetTable};

fn last_is_total(table: &BudgetTable) -> bool {
    table.rows.last().is_some_and(|r| r.is_total())
        && table.rows.iter().filter(|r| r.is_total()).count() == 1
}

#[test]
fn test_default_heads_have_an_empty_total() {
    let table = BudgetTable::with_default_heads();
    assert_eq!(table.rows.len(), 9);
    assert!(last_is_total(&table));

    let total = table.total().unwrap();
    assert_eq!(total.re, "", "zero sums are left blank");
    assert_eq!(total.exp_pct, "0.00");
}

#[test]
fn test_totals_follow_every_edit() {
    let mut table = BudgetTable::new();
    let a = table.add_row("Salaries");
    let b = table.add_row("Equipment");
    assert_eq!((a, b), (0, 1));
    assert!(last_is_total(&table));

    table.edit_cell(a, BudgetColumn::Re, "100").unwrap();
    table.edit_cell(a, BudgetColumn::Exp, "50").unwrap();
    table.edit_cell(b, BudgetColumn::Re, "200").unwrap();
    table.edit_cell(b, BudgetColumn::Exp, "50").unwrap();

    assert_eq!(table.rows[a].exp_pct, "50.00");
    assert_eq!(table.rows[b].exp_pct, "25.00");

    let total = table.total().unwrap();
    assert_eq!(total.re, "300.00");
    assert_eq!(total.exp, "100.00");
    assert_eq!(total.exp_pct, "37.50", "total percentage is the mean of row percentages");
    assert_eq!(total.be, "");

    table.delete_row(a).unwrap();
    let total = table.total().unwrap();
    assert_eq!(total.re, "200.00");
    assert_eq!(total.exp_pct, "25.00");
    assert!(last_is_total(&table));
}

#[test]
fn test_sort_keeps_total_last() {
    let mut table = BudgetTable::new();
    table.add_row("zeta");
    table.add_row("Alpha");
    table.add_row("middle");
    table.sort_by_head();

    let heads: Vec<&str> = table.rows.iter().map(|r| r.head.as_str()).collect();
    assert_eq!(heads, vec!["Alpha", "middle", "zeta", "Total"]);
}

#[test]
fn test_non_numeric_cells_count_as_zero() {
    let mut table = BudgetTable::new();
    let i = table.add_row("Misc");
    table.edit_cell(i, BudgetColumn::Be, "n/a").unwrap();
    table.edit_cell(i, BudgetColumn::Upto, "10").unwrap();
    assert_eq!(table.rows[i].upto_pct, "", "no percentage against a zero estimate");
    assert_eq!(table.total().unwrap().upto, "10.00");
}

#[test]
fn test_out_of_range_row_is_rejected() {
    let mut table = BudgetTable::with_default_heads();
    assert!(table.edit_cell(42, BudgetColumn::Re, "1").is_err());
    assert!(table.delete_row(42).is_err());
}

#[test]
fn test_duplicate_totals_collapse() {
    let mut table = BudgetTable::new();
    table.add_row("TOTAL");
    table.add_row("Rent");
    table.add_row("total");
    assert!(last_is_total(&table));
    assert_eq!(table.rows.len(), 2);
}
