//! State tree → document model.
//!
//! Every section is built by its own function which filters out empty
//! content at each nesting level. Sections that end up with nothing to print
//! are still returned; the flow engine skips them.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::duration::describe_duration;
use crate::model::{columns, Block, Column, RecordTable, ReportDocument, Section};
use crate::state::{
    has_text, record_field, record_has_content, Collaboration, ContentItem, FigureRef,
    NoteEntry, Record, ReportState, SectionKey, TableRef,
};

lazy_static! {
    static ref FIG_PLACEHOLDER: Regex = Regex::new(r"\[FIG-(\d+)\]").unwrap();
    static ref TAB_PLACEHOLDER: Regex = Regex::new(r"\[TAB-(\d+)\]").unwrap();
}

pub const DEFAULT_INSTITUTE: &str = "ICAR-Institute";
pub const DEFAULT_FACULTY: &str = "Faculty";

/// `[FIG-3]` → `Figure 3`, `[TAB-2]` → `Table 2`.
pub fn replace_placeholders(text: &str) -> String {
    let text = FIG_PLACEHOLDER.replace_all(text, "Figure $1");
    TAB_PLACEHOLDER.replace_all(&text, "Table $1").into_owned()
}

fn or_default(value: &str, fallback: &str) -> String {
    if has_text(value) {
        value.trim().to_string()
    } else {
        fallback.to_string()
    }
}

/// Accumulates one section's body and its deferred attachments.
struct SectionBuilder {
    key: SectionKey,
    label: &'static str,
    blocks: Vec<Block>,
    figures: Vec<FigureRef>,
    tables: Vec<TableRef>,
}

impl SectionBuilder {
    fn new(key: SectionKey) -> Self {
        Self::labelled(key, key.title())
    }

    fn labelled(key: SectionKey, label: &'static str) -> Self {
        Self {
            key,
            label,
            blocks: Vec::new(),
            figures: Vec::new(),
            tables: Vec::new(),
        }
    }

    fn subheading(&mut self, text: impl Into<String>) {
        self.blocks.push(Block::Subheading(text.into()));
    }

    /// Placeholders are substituted here; blank text is dropped.
    fn paragraph(&mut self, text: &str) {
        if has_text(text) {
            self.blocks.push(Block::Paragraph(replace_placeholders(text)));
        }
    }

    fn records(&mut self, caption: Option<&str>, columns: Vec<Column>, rows: Vec<Record>) {
        let table = RecordTable {
            caption: caption.map(str::to_string),
            columns,
            rows,
        };
        if !table.is_empty() {
            self.blocks.push(Block::Records(table));
        }
    }

    fn grid(&mut self, rows: Vec<Vec<String>>) {
        if !rows.is_empty() {
            self.blocks.push(Block::Grid(rows));
        }
    }

    fn attach(&mut self, figures: &[FigureRef], tables: &[TableRef]) {
        self.figures.extend_from_slice(figures);
        self.tables.extend_from_slice(tables);
    }

    /// Block title as a sub-heading, then its text and attachments.
    fn content_item(&mut self, item: &ContentItem) {
        if has_text(&item.title) {
            self.subheading(item.title.trim());
        }
        self.paragraph(&item.text);
        self.attach(&item.figures, &item.tables);
    }

    fn finish(self) -> Section {
        Section {
            ordinal: self.key.ordinal(),
            title: self.key.title().to_string(),
            label: self.label.to_string(),
            blocks: self.blocks,
            figures: self.figures,
            tables: self.tables,
        }
    }
}

/// Fill blank `duration` cells from `start_date` / `end_date`.
fn with_durations(rows: &[Record]) -> Vec<Record> {
    rows.iter()
        .map(|r| {
            let mut r = r.clone();
            if !has_text(&record_field(&r, "duration")) {
                let d = describe_duration(
                    &record_field(&r, "start_date"),
                    &record_field(&r, "end_date"),
                );
                if !d.is_empty() {
                    r.insert("duration".to_string(), Value::String(d));
                }
            }
            r
        })
        .collect()
}

fn filled(rows: &[Record]) -> Vec<Record> {
    rows.iter().filter(|r| record_has_content(r)).cloned().collect()
}

/// Build the document model for an export.
pub fn project(state: &ReportState) -> ReportDocument {
    let bi = &state.basic_info;
    let sections = vec![
        basic_info(state),
        research(state),
        subsections(
            SectionKey::AcademicActivities,
            &state.sections.academic_activities,
            "Academic Subsection",
        ),
        subsections(
            SectionKey::OutreachActivities,
            &state.sections.outreach_activities,
            "Outreach Subsection",
        ),
        other_institutional(state),
        training(state),
        conferences(state),
        linkages(state),
        awards(state),
        publications(state),
        annexures(state),
    ];

    let doc = ReportDocument {
        institute: or_default(&bi.institute_name_short, DEFAULT_INSTITUTE),
        faculty: or_default(&bi.faculty_name, DEFAULT_FACULTY),
        division: bi.division.label(),
        year: or_default(&bi.year, &chrono::Local::now().format("%Y").to_string()),
        sections,
    };
    log::debug!(
        "projected {} of {} sections with content",
        doc.printed_sections().count(),
        doc.sections.len()
    );
    doc
}

fn basic_info(state: &ReportState) -> Section {
    let bi = &state.basic_info;
    let mut b = SectionBuilder::new(SectionKey::BasicInfo);
    if !bi.has_content() {
        return b.finish();
    }

    let mut lines = vec![
        format!("Institute: {}", bi.institute_name_short.trim()),
        format!("Faculty Name: {}", bi.faculty_name.trim()),
    ];
    let division = bi.division.label();
    if has_text(&division) {
        lines.push(format!("Division: {}", division));
    }
    lines.push(format!("Year: {}", bi.year.trim()));

    let mut text = lines.join("\n");
    if has_text(&bi.summary) {
        text.push_str("\n\nShort summary:\n");
        text.push_str(&bi.summary);
    }
    if has_text(&bi.executive_summary) {
        text.push_str("\n\nExecutive Summary:\n");
        text.push_str(&bi.executive_summary);
    }
    b.paragraph(&text);
    b.finish()
}

fn research(state: &ReportState) -> Section {
    let mut b = SectionBuilder::new(SectionKey::ResearchAccomplishments);

    let projects = state
        .sections
        .research_accomplishments
        .projects()
        .filter(|p| !p.is_empty());

    for (p_idx, project) in projects.enumerate() {
        let title = or_default(&project.project_title, &format!("Project {}", p_idx + 1));
        b.subheading(format!("1.{} {}", p_idx + 1, title));

        for (s_idx, sub) in project.subheadings.iter().filter(|s| !s.is_empty()).enumerate() {
            b.subheading(or_default(&sub.title, &format!("Subheading {}", s_idx + 1)));
            for block in sub.blocks.iter().filter(|blk| !blk.is_empty()) {
                b.content_item(block);
            }
        }
    }
    b.finish()
}

fn subsections(
    key: SectionKey,
    subs: &[crate::state::Subsection],
    fallback: &str,
) -> Section {
    let mut b = SectionBuilder::new(key);
    for (idx, sub) in subs.iter().filter(|s| !s.is_empty()).enumerate() {
        let label = if has_text(&sub.title) {
            sub.title.trim().to_string()
        } else {
            or_default(&sub.key, &format!("{} {}", fallback, idx + 1))
        };
        b.subheading(label);
        for block in sub.blocks.iter().filter(|blk| !blk.is_empty()) {
            b.content_item(block);
        }
    }
    b.finish()
}

fn other_institutional(state: &ReportState) -> Section {
    let sec = &state.sections.other_institutional_activities;
    let mut b = SectionBuilder::new(SectionKey::OtherInstitutionalActivities);

    for (heading, unit) in [("4.1 ITMU", &sec.itmu), ("4.2 ABI", &sec.abi)] {
        if unit.has_body() {
            b.subheading(heading);
            b.paragraph(&unit.text);
            b.attach(&unit.figures, &unit.tables);
        }
    }

    let meetings: Vec<&ContentItem> = sec.meetings.iter().filter(|m| m.has_body()).collect();
    if !meetings.is_empty() {
        b.subheading("4.3 Meetings");
        for (idx, m) in meetings.into_iter().enumerate() {
            b.subheading(or_default(&m.title, &format!("Meeting {}", idx + 1)));
            b.paragraph(&m.text);
            b.attach(&m.figures, &m.tables);
        }
    }
    b.finish()
}

fn training(state: &ReportState) -> Section {
    let sec = &state.sections.training_capacity_building;
    let mut b = SectionBuilder::new(SectionKey::TrainingCapacityBuilding);

    if has_text(&sec.note) {
        b.subheading("Overview");
        b.paragraph(&sec.note);
    }
    b.records(
        Some("Trainings Organized"),
        columns(&[
            ("program_title", "Title"),
            ("start_date", "Start Date"),
            ("end_date", "End Date"),
            ("duration", "Duration"),
            ("place", "Venue"),
            ("participants", "Participants"),
        ]),
        with_durations(&filled(&sec.trainings_organized)),
    );
    b.records(
        Some("Events Attended"),
        columns(&[
            ("title", "Title"),
            ("start_date", "Start Date"),
            ("end_date", "End Date"),
            ("duration", "Duration"),
            ("place", "Venue"),
        ]),
        with_durations(&filled(&sec.events_attended)),
    );
    b.finish()
}

fn conferences(state: &ReportState) -> Section {
    let mut b = SectionBuilder::new(SectionKey::ConferencesSymposia);
    b.records(
        Some("Events Attended"),
        columns(&[
            ("title", "Title"),
            ("type", "Type"),
            ("place", "Place"),
            ("start_date", "From"),
            ("end_date", "To"),
            ("role", "Role"),
        ]),
        filled(&state.sections.conferences_symposia.attended),
    );
    b.finish()
}

fn collaboration_title(c: &Collaboration, idx: usize) -> String {
    if has_text(&c.body.title) {
        c.body.title.trim().to_string()
    } else {
        or_default(&c.partner, &format!("Collaboration {}", idx + 1))
    }
}

fn linkages(state: &ReportState) -> Section {
    let mut b = SectionBuilder::labelled(SectionKey::Linkages, "Linkages");
    let items = state
        .sections
        .linkages
        .collaborations
        .iter()
        .filter(|c| c.has_content());

    for (idx, item) in items.enumerate() {
        b.subheading(collaboration_title(item, idx));
        match &item.blocks {
            Some(blocks) => {
                for block in blocks.iter().filter(|blk| !blk.is_empty()) {
                    b.content_item(block);
                }
            }
            None => {
                b.paragraph(&item.body.text);
                b.attach(&item.body.figures, &item.body.tables);
            }
        }
    }
    b.finish()
}

fn awards(state: &ReportState) -> Section {
    let sec = &state.sections.awards_recognition;
    let mut b = SectionBuilder::new(SectionKey::AwardsRecognition);

    let awards: Vec<_> = sec.awards.iter().filter(|a| a.has_content()).collect();
    if !awards.is_empty() {
        b.subheading("8.1 Awards");
        let mut grid = vec![
            ["Sl No", "Details", "Organiser", "Date", "Awardees", "Figure Ref"]
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>(),
        ];
        for (i, a) in awards.into_iter().enumerate() {
            let refs = a
                .figures
                .iter()
                .map(|f| format!("Figure {}", f.local_index))
                .collect::<Vec<_>>()
                .join(", ");
            grid.push(vec![
                (i + 1).to_string(),
                replace_placeholders(&a.details),
                replace_placeholders(&a.organiser),
                replace_placeholders(&a.date),
                replace_placeholders(&a.awardees),
                refs,
            ]);
            b.attach(&a.figures, &[]);
        }
        b.grid(grid);
    }

    let recognitions: Vec<_> = sec
        .recognitions
        .iter()
        .filter(|r| has_text(&r.text) || !r.figures.is_empty())
        .collect();
    if !recognitions.is_empty() {
        b.subheading("8.2 Recognitions");
        for (i, r) in recognitions.into_iter().enumerate() {
            b.paragraph(&format!("{}. {}", i + 1, r.text.trim()));
            b.attach(&r.figures, &[]);
        }
    }
    b.finish()
}

/// `citation`, `ref` or `apa` when present, otherwise every value joined.
fn citation(p: &Record) -> String {
    ["citation", "ref", "apa"]
        .iter()
        .map(|k| record_field(p, k))
        .find(|s| has_text(s))
        .unwrap_or_else(|| {
            p.values()
                .map(crate::state::value_text)
                .filter(|s| has_text(s))
                .collect::<Vec<_>>()
                .join("; ")
        })
}

fn publications(state: &ReportState) -> Section {
    let mut b = SectionBuilder::new(SectionKey::Publications);
    for (label, list) in state.sections.publications.categories.labelled() {
        let list = filled(list);
        if list.is_empty() {
            continue;
        }
        b.subheading(label);
        for (i, p) in list.iter().enumerate() {
            b.paragraph(&format!("{}. {}", i + 1, citation(p)));
        }
    }
    b.finish()
}

/// Numbered paragraphs for free-text entries; attachments are collected
/// even when the entry has no text.
fn numbered_notes(b: &mut SectionBuilder, heading: &str, entries: &[NoteEntry]) {
    let entries: Vec<_> = entries.iter().filter(|e| e.has_content()).collect();
    if entries.is_empty() {
        return;
    }
    b.subheading(heading);
    for (i, e) in entries.into_iter().enumerate() {
        if has_text(e.body()) {
            b.paragraph(&format!("{}. {}", i + 1, e.body().trim()));
        }
        b.attach(&e.figures, &e.tables);
    }
}

/// `"1. head"` with an optional note on the following line.
fn entry_paragraph(i: usize, head_parts: &[&str], note: &str, sep: &str) -> String {
    let head = head_parts
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(sep);
    let mut para = format!("{}. {}", i + 1, head);
    if has_text(note) {
        para.push('\n');
        para.push_str(note.trim());
    }
    para
}

fn annexures(state: &ReportState) -> Section {
    let sec = &state.sections.annexures;
    let mut b = SectionBuilder::new(SectionKey::Annexures);

    let project_cols = |external: bool| {
        let mut cols = vec![
            ("pi", "PI"),
            ("copi", "Co-PI(s)"),
            ("title", "Project Title"),
            ("code", "Project Code"),
        ];
        if external {
            cols.push(("agency", "Funding Agency"));
        }
        cols.extend([
            ("budget", "Budget (Lakhs)"),
            ("start_date", "Start Date"),
            ("end_date", "End Date"),
            ("duration", "Duration"),
        ]);
        columns(&cols)
    };

    for (heading, rows, external) in [
        (
            "10.1 Ongoing Research Projects (Institutional)",
            &sec.institutional_projects,
            false,
        ),
        (
            "10.2 Ongoing Research Projects (External)",
            &sec.external_projects,
            true,
        ),
    ] {
        let rows = filled(rows);
        if !rows.is_empty() {
            b.subheading(heading);
            b.records(None, project_cols(external), with_durations(&rows));
        }
    }

    // 10.3 budget and revenue
    let budget = &sec.budget_utilization;
    let budget_filled = budget.table.has_amounts();
    let custom = budget.custom_table.as_ref().filter(|t| !t.rows.is_empty());
    if budget_filled || custom.is_some() {
        b.subheading("10.3.1 Budget Utilization");
        if budget_filled {
            let mut table = budget.table.clone();
            table.recompute();
            b.grid(table.to_grid());
        }
        if let Some(custom) = custom {
            b.subheading(format!("Custom Budget Table – {}", custom.name.trim()));
            b.grid(custom.rows.clone());
        }
        b.paragraph(&budget.footer);
    }

    let revenue = filled(&sec.revenue_generation.rows);
    if !revenue.is_empty() {
        b.subheading("10.3.2 Revenue Generation");
        b.records(
            None,
            columns(&[("head", "Head"), ("prev", "FY (Previous)"), ("curr", "FY (Current)")]),
            revenue,
        );
    }

    let dev = &sec.developmental_works;
    numbered_notes(&mut b, "10.4.1 Laboratory Development", &dev.lab);
    numbered_notes(&mut b, "10.4.2 Farm Development", &dev.farm);
    numbered_notes(&mut b, "10.4.3 Infrastructure Development", &dev.infrastructure);
    numbered_notes(&mut b, "10.4.4 Other Developmental Works", &dev.other);

    let comm = &sec.committees;
    for (heading, committee) in [
        ("10.5.1 QRT", &comm.qrt),
        ("10.5.2 RAC", &comm.rac),
        ("10.5.3 IMC", &comm.imc),
        ("10.5.4 IRC", &comm.irc),
        ("10.5.5 Other Committees", &comm.other),
    ] {
        let members: Vec<Record> = committee
            .members
            .iter()
            .filter(|m| has_text(&record_field(m, "role")) || has_text(&record_field(m, "names")))
            .cloned()
            .collect();
        if !has_text(&committee.text) && members.is_empty() {
            continue;
        }
        b.subheading(heading);
        b.paragraph(&committee.text);
        b.records(
            Some("Committee Composition"),
            columns(&[("role", "Chairman / Members"), ("names", "Names & Designations")]),
            members,
        );
    }

    let nodal = filled(&sec.nodal_officers.rows);
    if !nodal.is_empty() {
        b.subheading("10.6 Nodal Officers & Responsibilities");
        b.records(
            None,
            columns(&[("responsibility", "Responsibilities"), ("officer", "Nodal Officer(s)")]),
            nodal,
        );
    }

    let visitors: Vec<_> = sec
        .distinguished_visitors
        .iter()
        .filter(|v| {
            has_text(&v.name) || has_text(&v.designation) || has_text(&v.date) || !v.figures.is_empty()
        })
        .collect();
    if !visitors.is_empty() {
        b.subheading("10.7 Distinguished Visitors");
        for (i, v) in visitors.into_iter().enumerate() {
            let head = [v.name.as_str(), v.designation.as_str(), v.date.as_str()];
            b.paragraph(&entry_paragraph(i, &head, "", ", "));
            b.attach(&v.figures, &[]);
        }
    }

    let facilities: Vec<_> = sec
        .new_facilities
        .iter()
        .filter(|f| {
            has_text(&f.facility)
                || has_text(&f.date)
                || has_text(&f.note)
                || !f.figures.is_empty()
                || !f.tables.is_empty()
        })
        .collect();
    if !facilities.is_empty() {
        b.subheading("10.8 Inauguration of New Facilities");
        for (i, f) in facilities.into_iter().enumerate() {
            let head = [f.facility.as_str(), f.date.as_str()];
            b.paragraph(&entry_paragraph(i, &head, &f.note, " — "));
            b.attach(&f.figures, &f.tables);
        }
    }

    let infra: Vec<_> = sec
        .infra_in_progress
        .iter()
        .filter(|w| has_text(&w.name) || has_text(&w.note) || !w.figures.is_empty())
        .collect();
    if !infra.is_empty() {
        b.subheading("10.9 Infrastructure Development in Progress");
        for (i, w) in infra.into_iter().enumerate() {
            b.paragraph(&entry_paragraph(i, &[w.name.as_str()], &w.note, ""));
            b.attach(&w.figures, &[]);
        }
    }

    let staff = &sec.staff_positions;
    numbered_notes(&mut b, "10.10.1 Appointments", &staff.appointments);
    numbered_notes(&mut b, "10.10.2 Promotions", &staff.promotions);
    numbered_notes(&mut b, "10.10.3 Transfers", &staff.transfers);
    numbered_notes(&mut b, "10.10.4 New Joining", &staff.new_joining);

    let media: Vec<_> = sec
        .institute_in_media
        .iter()
        .filter(|m| {
            has_text(&m.date) || has_text(&m.publisher) || has_text(&m.note) || !m.figures.is_empty()
        })
        .collect();
    if !media.is_empty() {
        b.subheading("10.11 Institute in Media");
        for (i, m) in media.into_iter().enumerate() {
            let head = [m.date.as_str(), m.publisher.as_str()];
            b.paragraph(&entry_paragraph(i, &head, &m.note, " — "));
            b.attach(&m.figures, &[]);
        }
    }

    numbered_notes(&mut b, "10.12 Other Activities", &sec.other_activities);

    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_become_labels() {
        assert_eq!(
            replace_placeholders("see [FIG-3] and [TAB-12], not [FIG-x]"),
            "see Figure 3 and Table 12, not [FIG-x]"
        );
    }

    #[test]
    fn blank_durations_are_filled_from_dates() {
        let mut r = Record::new();
        r.insert("start_date".into(), Value::from("2024-01-01"));
        r.insert("end_date".into(), Value::from("2024-01-01"));
        let rows = with_durations(&[r]);
        assert_eq!(record_field(&rows[0], "duration"), "1 day");
    }

    #[test]
    fn citation_prefers_explicit_fields() {
        let mut p = Record::new();
        p.insert("apa".into(), Value::from("Doe (2024)."));
        p.insert("naas".into(), Value::from(6.5));
        assert_eq!(citation(&p), "Doe (2024).");
        p.remove("apa");
        assert_eq!(citation(&p), "6.5");
    }

    #[test]
    fn default_meeting_titles_alone_are_not_content() {
        let doc = project(&ReportState::default());
        let other = &doc.sections[SectionKey::OtherInstitutionalActivities.ordinal()];
        assert!(other.is_empty());
    }
}
