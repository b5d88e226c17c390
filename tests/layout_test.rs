use std::io::Cursor;

use annual_report::config::PageSetup;
use annual_report::layout::{layout_document, DrawOp, FlowEngine, LayoutDocument, TextRole};
use annual_report::model::{columns, Block, RecordTable, ReportDocument, Section};
use annual_report::projection::project;
use annual_report::state::{
    ContentItem, FigureRef, Project, Record, ReportState, Subheading, Subsection, TableRef,
    UNASSIGNED_DIVISION,
};
use base64::Engine;
use serde_json::json;

// Helper: a small solid PNG as base64
fn tiny_png(width: u32, height: u32) -> String {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
        .expect("encode png");
    base64::engine::general_purpose::STANDARD.encode(&buf)
}

fn figure(n: u32, caption: &str, base64: String) -> FigureRef {
    FigureRef {
        id: format!("fig_{}", n),
        local_index: n,
        caption: caption.to_string(),
        cite_placeholder: format!("[FIG-{}]", n),
        base64,
        file_name: format!("fig{}.png", n),
        mime_type: "image/png".to_string(),
    }
}

fn table(n: u32, caption: &str, rows: &[&[&str]]) -> TableRef {
    TableRef {
        id: format!("tbl_{}", n),
        local_index: n,
        caption: caption.to_string(),
        cite_placeholder: format!("[TAB-{}]", n),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    }
}

fn section(ordinal: usize, title: &str, blocks: Vec<Block>) -> Section {
    Section {
        ordinal,
        title: title.to_string(),
        label: title.to_string(),
        blocks,
        figures: Vec::new(),
        tables: Vec::new(),
    }
}

fn document(sections: Vec<Section>) -> ReportDocument {
    ReportDocument {
        institute: "IIHR".to_string(),
        faculty: "Dr. Rao".to_string(),
        division: String::new(),
        year: "2024".to_string(),
        sections,
    }
}

// Helper: page and baseline of the first text with this role and content
fn position(layout: &LayoutDocument, role: TextRole, needle: &str) -> (usize, f32) {
    for (p, page) in layout.pages.iter().enumerate() {
        for op in &page.ops {
            if let DrawOp::Text { text, role: r, y, .. } = op {
                if *r == role && text.starts_with(needle) {
                    return (p, *y);
                }
            }
        }
    }
    panic!("no {:?} text starting with {:?}", role, needle);
}

#[test]
fn test_hello_world_end_to_end() {
    let mut s = section(1, "Research", vec![Block::Paragraph("Hello world".to_string())]);
    s.figures.push(figure(1, "Field trial", tiny_png(40, 20)));
    s.tables.push(table(1, "Yield", &[&["Crop", "t/ha"], &["Rice", "4.2"]]));
    let layout = layout_document(&document(vec![s]), &PageSetup::default());

    assert_eq!(layout.texts(TextRole::Heading), vec!["1. Research"]);
    assert_eq!(layout.texts(TextRole::Body), vec!["Hello world"]);
    assert_eq!(layout.images.len(), 1, "one embedded image");
    assert_eq!(layout.pages.iter().map(|p| p.image_count()).sum::<usize>(), 1);

    let captions = layout.texts(TextRole::Caption);
    assert_eq!(captions, vec!["Figure 1: Field trial", "Table 1: Yield"]);
    assert_eq!(layout.texts(TextRole::HeaderCell), vec!["Crop", "t/ha"]);
    assert_eq!(layout.texts(TextRole::Cell), vec!["Rice", "4.2"]);

    let paragraph = position(&layout, TextRole::Body, "Hello world");
    let table_caption = position(&layout, TextRole::Caption, "Table 1");
    assert!(paragraph < table_caption, "table comes after the paragraph");
}

#[test]
fn test_layout_is_idempotent() {
    let mut state = ReportState::default();
    state.basic_info.institute_name_short = "IIHR".to_string();
    state.basic_info.executive_summary = "A year of steady progress. ".repeat(120);
    state.sections.academic_activities.push(Subsection {
        key: "teaching".to_string(),
        title: "Teaching".to_string(),
        blocks: vec![ContentItem::with_text("Courses were run [TAB-1].")],
    });

    let doc = project(&state);
    let first = layout_document(&doc, &PageSetup::default());
    let second = layout_document(&project(&state), &PageSetup::default());

    assert_eq!(first.page_count(), second.page_count());
    assert_eq!(first.texts(TextRole::Heading), second.texts(TextRole::Heading));
    assert_eq!(first, second);
}

#[test]
fn test_empty_sections_are_not_printed() {
    let mut state = ReportState::default();
    state.basic_info.institute_name_short = "IIHR".to_string();
    state.sections.academic_activities.push(Subsection::default());
    state.sections.academic_activities.push(Subsection {
        blocks: vec![ContentItem::default(), ContentItem::with_text("  ")],
        ..Subsection::default()
    });

    let layout = layout_document(&project(&state), &PageSetup::default());
    assert_eq!(layout.texts(TextRole::Heading), vec!["0. Basic Information"]);
    assert_eq!(layout.page_count(), 1);
}

#[test]
fn test_empty_report_is_a_title_page() {
    let layout = layout_document(&project(&ReportState::default()), &PageSetup::default());
    assert_eq!(layout.page_count(), 1);
    assert!(layout.texts(TextRole::Heading).is_empty());
    assert_eq!(layout.texts(TextRole::Title).len(), 2, "title and faculty line");
    assert_eq!(layout.texts(TextRole::Footer), vec!["Page 1 of 1"]);
}

#[test]
fn test_every_section_after_the_first_starts_a_page() {
    let doc = document(vec![
        section(0, "One", vec![Block::Paragraph("a".into())]),
        section(1, "Two", vec![Block::Paragraph("b".into())]),
        section(2, "Three", vec![Block::Paragraph("c".into())]),
    ]);
    let layout = layout_document(&doc, &PageSetup::default());
    assert_eq!(layout.page_count(), 3);
    for (i, page) in layout.pages.iter().enumerate() {
        assert_eq!(page.texts(TextRole::Heading).count(), 1, "one heading on page {}", i + 1);
    }
}

#[test]
fn test_long_paragraph_continues_without_loss() {
    let words: Vec<String> = (0..3000).map(|i| format!("w{}", i)).collect();
    let mut engine = FlowEngine::new(PageSetup::default());
    engine.write_paragraph(&words.join(" "));
    let layout = engine.finalize("header");

    assert!(layout.page_count() > 1, "text should spill onto further pages");
    let printed: Vec<&str> = layout
        .texts(TextRole::Body)
        .into_iter()
        .flat_map(|line| line.split(' '))
        .collect();
    assert_eq!(printed.len(), words.len(), "no words lost or duplicated");
    assert!(printed.iter().zip(&words).all(|(a, b)| a == b));

    let bottom = PageSetup::default().bottom_limit();
    for page in &layout.pages {
        for op in &page.ops {
            if let DrawOp::Text { role: TextRole::Body, y, .. } = op {
                assert!(*y <= bottom + 14.0, "line at {} runs past the bottom margin", y);
            }
        }
    }
}

#[test]
fn test_table_header_repeats_on_each_page() {
    let mut grid = vec![vec!["Name".to_string(), "Value".to_string()]];
    grid.extend((0..200).map(|i| vec![format!("row {}", i), i.to_string()]));

    let mut engine = FlowEngine::new(PageSetup::default());
    engine.render_grid_table(&grid);
    let layout = engine.finalize("");

    assert!(layout.page_count() > 1);
    let headers = layout
        .texts(TextRole::HeaderCell)
        .into_iter()
        .filter(|t| *t == "Name")
        .count();
    assert_eq!(headers, layout.page_count(), "header repeated once per page");
    assert_eq!(layout.texts(TextRole::Cell).len(), 400, "every body cell drawn once");
}

#[test]
fn test_figures_numbered_in_order_and_bad_ones_skipped() {
    let png = tiny_png(8, 8);
    let mut first = section(1, "Research", vec![Block::Paragraph("See [FIG-1].".into())]);
    first.figures.push(figure(1, "a", png.clone()));
    first.figures.push(figure(2, "broken", "not base64 at all!".to_string()));
    let mut second = section(2, "Outreach", vec![Block::Paragraph("x".into())]);
    second.figures.push(figure(3, "c", png));

    let layout = layout_document(&document(vec![first, second]), &PageSetup::default());
    assert_eq!(layout.texts(TextRole::Caption), vec!["Figure 1: a", "Figure 3: c"]);
    assert_eq!(layout.images.len(), 2);
}

#[test]
fn test_running_header_and_footer_on_every_page() {
    let doc = document(vec![
        section(0, "One", vec![Block::Paragraph("a".into())]),
        section(1, "Two", vec![Block::Paragraph("b".into())]),
    ]);
    let layout = layout_document(&doc, &PageSetup::default());
    assert_eq!(
        layout.texts(TextRole::RunningHeader),
        vec!["IIHR | Annual Report 2024"; 2]
    );
    assert_eq!(layout.texts(TextRole::Footer), vec!["Page 1 of 2", "Page 2 of 2"]);
}

fn record(value: serde_json::Value) -> Record {
    serde_json::from_value(value).expect("record object")
}

#[test]
fn test_object_table_prints_filled_records_through_the_column_map() {
    let staff = RecordTable {
        caption: Some("Scientific Staff".to_string()),
        columns: columns(&[("name", "Name"), ("role", "Role")]),
        rows: vec![
            record(json!({ "name": " ", "role": "", "notes": "" })),
            record(json!({ "name": "Dr. Rao", "role": "PI", "notes": "not printed" })),
        ],
    };
    let doc = document(vec![section(0, "Staff", vec![Block::Records(staff)])]);
    let layout = layout_document(&doc, &PageSetup::default());

    assert_eq!(layout.texts(TextRole::Label), vec!["Scientific Staff"]);
    assert_eq!(layout.texts(TextRole::HeaderCell), vec!["Name", "Role"]);
    assert_eq!(layout.texts(TextRole::Cell), vec!["Dr. Rao", "PI"]);
    let label = position(&layout, TextRole::Label, "Scientific Staff");
    assert!(label < position(&layout, TextRole::HeaderCell, "Name"));
}

#[test]
fn test_object_table_without_filled_records_is_skipped() {
    let empty = RecordTable {
        caption: Some("Visitors".to_string()),
        columns: columns(&[("name", "Name")]),
        rows: vec![record(json!({ "name": "", "date": null }))],
    };
    let doc = document(vec![section(
        0,
        "Visitors",
        vec![Block::Paragraph("x".into()), Block::Records(empty)],
    )]);
    let layout = layout_document(&doc, &PageSetup::default());
    assert!(layout.texts(TextRole::Label).is_empty());
    assert!(layout.texts(TextRole::HeaderCell).is_empty());
}

#[test]
fn test_research_project_empty_at_every_level_is_not_printed() {
    let mut state = ReportState::default();
    state.basic_info.institute_name_short = "IIHR".to_string();
    state.sections.research_accomplishments.divisions.insert(
        UNASSIGNED_DIVISION.to_string(),
        vec![Project {
            project_title: "   ".to_string(),
            subheadings: vec![
                Subheading::default(),
                Subheading {
                    title: String::new(),
                    blocks: vec![ContentItem::default(), ContentItem::with_text("\n ")],
                },
            ],
        }],
    );

    let doc = project(&state);
    assert!(doc.printed_sections().all(|s| s.title != "Research Accomplishments"));
    let layout = layout_document(&doc, &PageSetup::default());
    assert_eq!(layout.texts(TextRole::Heading), vec!["0. Basic Information"]);
    assert!(layout.texts(TextRole::Subheading).is_empty());
}

#[test]
fn test_table_caption_stays_with_its_header() {
    let t = table(1, "Cap", &[&["H"], &["v"]]);
    for filler in 40..56 {
        let mut engine = FlowEngine::new(PageSetup::default());
        engine.write_paragraph(&vec!["filler"; filler].join("\n"));
        engine.render_section_tables("Results", std::slice::from_ref(&t));
        let layout = engine.finalize("");

        let (caption_page, _) = position(&layout, TextRole::Caption, "Table 1: Cap");
        let (header_page, _) = position(&layout, TextRole::HeaderCell, "H");
        assert_eq!(caption_page, header_page, "caption orphaned after {} lines", filler);
        let (label_page, _) = position(&layout, TextRole::Subheading, "Tables");
        assert_eq!(label_page, header_page);
    }
}

#[test]
fn test_object_table_label_stays_with_its_header() {
    let staff = RecordTable {
        caption: Some("Staff".to_string()),
        columns: columns(&[("name", "Name")]),
        rows: vec![record(json!({ "name": "Dr. Rao" }))],
    };
    for filler in 40..56 {
        let mut engine = FlowEngine::new(PageSetup::default());
        engine.write_paragraph(&vec!["filler"; filler].join("\n"));
        engine.render_object_table(&staff);
        let layout = engine.finalize("");

        let (label_page, _) = position(&layout, TextRole::Label, "Staff");
        let (header_page, _) = position(&layout, TextRole::HeaderCell, "Name");
        assert_eq!(label_page, header_page, "label orphaned after {} lines", filler);
    }
}
