use std::fs;

use annual_report::config::PageSetup;
use annual_report::downloader::{export_bundle, export_pdf};
use annual_report::layout::{layout_document, TextRole};
use annual_report::loader::load_table;
use annual_report::model::Block;
use annual_report::projection::project;
use annual_report::saving::deserialize_from_memory;
use annual_report::state::{ContentItem, ReportState, Subsection};
use annual_report::validate::{validate, EXECUTIVE_SUMMARY_MAX};
use serde_json::json;
use tempfile::tempdir;

fn filled_state() -> ReportState {
    let mut state = ReportState::default();
    state.basic_info.institute_name_short = "ICAR IIHR".to_string();
    state.basic_info.faculty_name = "Dr. A Rao".to_string();
    state.basic_info.year = "2024".to_string();

    let rows = vec![
        vec!["Course".to_string(), "Students".to_string()],
        vec!["Hort 101".to_string(), "42".to_string()],
    ];
    let table = state.local_counters.new_table("Courses", rows);
    let mut block = ContentItem::with_text("Two courses ran this year, see [TAB-1].");
    block.tables.push(table);
    state.sections.academic_activities.push(Subsection {
        key: "teaching".to_string(),
        title: "Teaching".to_string(),
        blocks: vec![block],
    });
    state
}

#[test]
fn test_placeholders_become_labels() {
    let doc = project(&filled_state());
    let academic = doc
        .printed_sections()
        .find(|s| s.title == "Academic Activities")
        .expect("academic section is printed");
    assert!(academic.blocks.contains(&Block::Paragraph(
        "Two courses ran this year, see Table 1.".to_string()
    )));
    assert_eq!(academic.tables.len(), 1, "tables are deferred to the section end");
}

// A draft saved by an older editor: inverted percentage, stale total in the middle
fn stale_budget_draft() -> ReportState {
    let draft = json!({
        "basic_info": { "institute_name_short": "IIHR", "year": "2024" },
        "sections": { "annexures": { "budget_utilization": { "rows": [
            { "head": "GIA General", "re": "100", "exp": "50", "exp_pct": "200.00" },
            { "head": "Total", "re": "100.00", "exp": "50.00", "exp_pct": "200.00" },
            { "head": "GIA Capital", "re": "200", "exp": "50" }
        ] } } }
    });
    deserialize_from_memory(draft.to_string().as_bytes()).unwrap()
}

#[test]
fn test_stale_budget_is_recomputed_on_export() {
    let state = stale_budget_draft();
    let layout = layout_document(&project(&state), &PageSetup::default());
    let cells: Vec<&str> = layout
        .texts(TextRole::Cell)
        .into_iter()
        .filter(|c| !c.is_empty())
        .collect();
    assert_eq!(
        cells,
        vec![
            "GIA General", "100", "50", "50.00",
            "GIA Capital", "200", "50", "25.00",
            "Total", "300.00", "100.00", "37.50", "0.00",
        ]
    );
    assert_eq!(
        state.sections.annexures.budget_utilization.table.rows[1].head,
        "Total",
        "projection leaves the stored state alone"
    );
}

#[test]
fn test_pdf_export_names_and_magic() {
    let export = export_pdf(&filled_state(), &PageSetup::default()).unwrap();
    assert_eq!(export.file_name, "ICAR_IIHR_AnnualReport_2024_Dr._A_Rao.pdf");
    assert_eq!(export.mime_type, "application/pdf");
    assert!(export.bytes.starts_with(b"%PDF"));
}

#[test]
fn test_pdf_export_is_deterministic() {
    let state = filled_state();
    let a = export_pdf(&state, &PageSetup::default()).unwrap();
    let b = export_pdf(&state, &PageSetup::default()).unwrap();
    assert_eq!(a.bytes, b.bytes);
}

#[test]
fn test_bundle_is_a_zip_with_both_files() {
    let export = export_bundle(&filled_state(), &PageSetup::default()).unwrap();
    assert_eq!(export.file_name, "ICAR_IIHR_AnnualReport_2024_Dr._A_Rao.zip");
    assert!(export.bytes.starts_with(b"PK\x03\x04"), "zip local file header");

    for name in [
        "ICAR_IIHR_AnnualReport_2024_Dr._A_Rao.pdf",
        "ICAR_IIHR_AnnualReport_2024_Dr._A_Rao.json",
    ] {
        assert!(
            export.bytes.windows(name.len()).any(|w| w == name.as_bytes()),
            "archive should list {}",
            name
        );
    }
}

#[test]
fn test_load_csv_table_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("staff.csv");
    fs::write(&path, "\u{feff}Name,Post\r\n\"Rao, A\",Scientist\r\n\r\n").unwrap();

    let rows = load_table(&path).unwrap();
    assert_eq!(rows, vec![vec!["Name", "Post"], vec!["Rao, A", "Scientist"]]);
}

#[test]
fn test_validation_messages() {
    let mut state = filled_state();
    assert!(validate(&state).is_empty(), "a tidy report validates");

    state.basic_info.executive_summary = "word ".repeat(EXECUTIVE_SUMMARY_MAX + 1);
    state.sections.academic_activities[0].blocks[0].text = "See [Figure 2] below.".to_string();

    let errors = validate(&state);
    assert!(errors.contains(&"Executive Summary exceeds 350 words.".to_string()));
    assert!(
        errors.iter().any(|e| e.contains("invalid citation format")),
        "{:?}",
        errors
    );
}
