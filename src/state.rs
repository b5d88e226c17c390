//! The state tree: everything the user has entered, keyed by report section.
//!
//! Field names follow the JSON written by the browser editor so drafts move
//! freely between the two. Every struct is `#[serde(default)]`, which is where
//! missing substructures get re-initialized; nothing downstream needs to
//! backfill.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::budget::BudgetTable;
use crate::error::{ReportError, Result};

/// Open-ended row from a structured editor (training, projects, citations…).
pub type Record = BTreeMap<String, Value>;

/// Division bucket used by research rows that predate division tagging.
pub const UNASSIGNED_DIVISION: &str = "UNASSIGNED";

pub fn has_text(s: &str) -> bool {
    !s.trim().is_empty()
}

/// Render a JSON scalar the way the editor displays it.
pub fn value_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

pub fn record_field(record: &Record, key: &str) -> String {
    record.get(key).map(value_text).unwrap_or_default()
}

/// A record counts as filled when any of its values has visible text.
pub fn record_has_content(record: &Record) -> bool {
    record.values().any(|v| has_text(&value_text(v)))
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(super::value_text(&Value::deserialize(d)?))
    }

    /// Spreadsheet uploads carry numbers and nulls alongside strings.
    pub fn grid<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<String>>, D::Error> {
        let rows = Option::<Vec<Option<Vec<Value>>>>::deserialize(d)?.unwrap_or_default();
        Ok(rows
            .into_iter()
            .map(|r| r.unwrap_or_default().iter().map(super::value_text).collect())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

/// An embedded image attached to a block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FigureRef {
    pub id: String,
    /// Document-wide figure number assigned at insertion.
    pub local_index: u32,
    pub caption: String,
    pub cite_placeholder: String,
    /// Base64 payload, optionally as a `data:` URI.
    pub base64: String,
    pub file_name: String,
    pub mime_type: String,
}

/// An uploaded grid attached to a block. The first row is the header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableRef {
    pub id: String,
    /// Document-wide table number, counted independently of figures.
    pub local_index: u32,
    pub caption: String,
    pub cite_placeholder: String,
    #[serde(deserialize_with = "lenient::grid")]
    pub rows: Vec<Vec<String>>,
}

/// The sequence generator behind `[FIG-n]` and `[TAB-n]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalCounters {
    pub figure: u32,
    pub table: u32,
}

impl LocalCounters {
    pub fn seeded(figure: u32, table: u32) -> Self {
        Self { figure, table }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn next_figure(&mut self) -> u32 {
        self.figure += 1;
        self.figure
    }

    pub fn next_table(&mut self) -> u32 {
        self.table += 1;
        self.table
    }

    /// Number a new figure and build its reference.
    pub fn new_figure(
        &mut self,
        caption: &str,
        base64: &str,
        mime_type: &str,
        file_name: &str,
    ) -> FigureRef {
        let n = self.next_figure();
        FigureRef {
            id: format!("fig_{}", n),
            local_index: n,
            caption: caption.trim().to_string(),
            cite_placeholder: format!("[FIG-{}]", n),
            base64: base64.to_string(),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
        }
    }

    pub fn new_table(&mut self, caption: &str, rows: Vec<Vec<String>>) -> TableRef {
        let n = self.next_table();
        TableRef {
            id: format!("tbl_{}", n),
            local_index: n,
            caption: caption.trim().to_string(),
            cite_placeholder: format!("[TAB-{}]", n),
            rows,
        }
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// A user-authored block: optional sub-title, text, figures and tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub text: String,
    pub figures: Vec<FigureRef>,
    pub tables: Vec<TableRef>,
}

impl ContentItem {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Empty blocks are dropped from the export.
    pub fn is_empty(&self) -> bool {
        !has_text(&self.text)
            && !has_text(&self.title)
            && self.figures.is_empty()
            && self.tables.is_empty()
    }

    /// Text, figures or tables; a bare title does not count.
    pub fn has_body(&self) -> bool {
        has_text(&self.text) || !self.figures.is_empty() || !self.tables.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subheading {
    pub title: String,
    pub blocks: Vec<ContentItem>,
}

impl Subheading {
    pub fn is_empty(&self) -> bool {
        !has_text(&self.title) && self.blocks.iter().all(ContentItem::is_empty)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub project_title: String,
    pub subheadings: Vec<Subheading>,
}

impl Project {
    pub fn is_empty(&self) -> bool {
        !has_text(&self.project_title) && self.subheadings.iter().all(Subheading::is_empty)
    }
}

/// Subsection of the academic and outreach editors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subsection {
    pub key: String,
    pub title: String,
    pub blocks: Vec<ContentItem>,
}

impl Subsection {
    pub fn is_empty(&self) -> bool {
        !has_text(&self.title)
            && !has_text(&self.key)
            && self.blocks.iter().all(ContentItem::is_empty)
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Meta {
    pub submission_id: Option<String>,
    pub last_saved_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Division {
    /// `predefined` or `other`.
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub other_text: String,
}

impl Default for Division {
    fn default() -> Self {
        Self {
            kind: "predefined".to_string(),
            value: String::new(),
            other_text: String::new(),
        }
    }
}

impl Division {
    pub fn label(&self) -> String {
        if self.kind == "other" {
            self.other_text.trim().to_string()
        } else {
            self.value.trim().to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInfo {
    pub institute_name_short: String,
    pub faculty_name: String,
    pub roles: Vec<String>,
    pub division: Division,
    #[serde(deserialize_with = "lenient::text")]
    pub year: String,
    pub summary: String,
    pub executive_summary: String,
}

impl Default for BasicInfo {
    fn default() -> Self {
        Self {
            institute_name_short: String::new(),
            faculty_name: String::new(),
            roles: Vec::new(),
            division: Division::default(),
            year: chrono::Local::now().year().to_string(),
            summary: String::new(),
            executive_summary: String::new(),
        }
    }
}

impl BasicInfo {
    pub fn has_content(&self) -> bool {
        has_text(&self.institute_name_short)
            || has_text(&self.faculty_name)
            || has_text(&self.summary)
            || has_text(&self.executive_summary)
    }
}

/// Research projects grouped by division.
///
/// Older drafts stored a bare list of projects; those load into the
/// [`UNASSIGNED_DIVISION`] bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResearchAccomplishments {
    pub divisions: BTreeMap<String, Vec<Project>>,
}

impl<'de> Deserialize<'de> for ResearchAccomplishments {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            Legacy(Vec<Project>),
            ByDivision(BTreeMap<String, Vec<Project>>),
            Other(Value),
        }

        let divisions = match Shape::deserialize(d)? {
            Shape::Legacy(projects) => {
                let mut map = BTreeMap::new();
                if !projects.is_empty() {
                    map.insert(UNASSIGNED_DIVISION.to_string(), projects);
                }
                map
            }
            Shape::ByDivision(map) => map,
            Shape::Other(_) => BTreeMap::new(),
        };
        Ok(Self { divisions })
    }
}

impl ResearchAccomplishments {
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.divisions.values().flatten()
    }

    pub fn division_mut(&mut self, division: &str) -> &mut Vec<Project> {
        let key = if has_text(division) {
            division.trim()
        } else {
            UNASSIGNED_DIVISION
        };
        self.divisions.entry(key.to_string()).or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherInstitutionalActivities {
    pub itmu: ContentItem,
    pub abi: ContentItem,
    pub meetings: Vec<ContentItem>,
}

impl Default for OtherInstitutionalActivities {
    fn default() -> Self {
        let meeting = |id: &str, title: &str| ContentItem {
            id: id.to_string(),
            title: title.to_string(),
            ..ContentItem::default()
        };
        Self {
            itmu: ContentItem::default(),
            abi: ContentItem::default(),
            meetings: vec![
                meeting("qrt", "Quinquennial Review Team (QRT) Meeting"),
                meeting("rac", "Research Advisory Committee (RAC) Meeting"),
                meeting("irc", "Institute Research Council (IRC) Meeting"),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingCapacityBuilding {
    pub note: String,
    pub trainings_organized: Vec<Record>,
    #[serde(alias = "trainings_attended")]
    pub events_attended: Vec<Record>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConferencesSymposia {
    pub attended: Vec<Record>,
}

/// A collaboration is either a list of blocks or a single inline block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Collaboration {
    pub partner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<ContentItem>>,
    #[serde(flatten)]
    pub body: ContentItem,
}

impl Collaboration {
    pub fn has_content(&self) -> bool {
        match &self.blocks {
            Some(blocks) => blocks.iter().any(|b| !b.is_empty()),
            None => !self.body.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Linkages {
    pub collaborations: Vec<Collaboration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Award {
    pub details: String,
    pub organiser: String,
    pub date: String,
    pub awardees: String,
    pub figures: Vec<FigureRef>,
}

impl Award {
    pub fn has_content(&self) -> bool {
        has_text(&self.details)
            || has_text(&self.organiser)
            || has_text(&self.date)
            || has_text(&self.awardees)
            || !self.figures.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recognition {
    pub text: String,
    pub figures: Vec<FigureRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwardsRecognition {
    pub awards: Vec<Award>,
    pub recognitions: Vec<Recognition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationCategories {
    pub research_papers: Vec<Record>,
    pub review_papers: Vec<Record>,
    pub books: Vec<Record>,
    pub book_chapters: Vec<Record>,
    pub newsletters: Vec<Record>,
    pub popular_articles: Vec<Record>,
    pub conference_abstracts: Vec<Record>,
    pub extension_folders: Vec<Record>,
    pub other: Vec<Record>,
}

impl PublicationCategories {
    /// Categories in report order with their printed labels.
    pub fn labelled(&self) -> [(&'static str, &[Record]); 9] {
        [
            ("Research Papers", self.research_papers.as_slice()),
            ("Review Papers", self.review_papers.as_slice()),
            ("Books", self.books.as_slice()),
            ("Book Chapters", self.book_chapters.as_slice()),
            ("Newsletters", self.newsletters.as_slice()),
            ("Popular Articles", self.popular_articles.as_slice()),
            ("Conference Abstracts", self.conference_abstracts.as_slice()),
            ("Extension Folders / Leaflets", self.extension_folders.as_slice()),
            ("Other Publications", self.other.as_slice()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Publications {
    pub categories: PublicationCategories,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomTable {
    pub name: String,
    #[serde(deserialize_with = "lenient::grid")]
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetUtilization {
    #[serde(flatten)]
    pub table: BudgetTable,
    pub custom_table: Option<CustomTable>,
    pub footer: String,
    pub other_details: ContentItem,
}

impl BudgetUtilization {
    pub fn has_content(&self) -> bool {
        self.table.has_amounts()
            || self
                .custom_table
                .as_ref()
                .is_some_and(|t| !t.rows.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordRows {
    pub rows: Vec<Record>,
}

/// Free-text entry with attachments (developmental works, staff changes,
/// other activities). Older editors wrote `text`, newer ones `note`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteEntry {
    pub text: String,
    pub note: String,
    pub figures: Vec<FigureRef>,
    pub tables: Vec<TableRef>,
}

impl NoteEntry {
    pub fn body(&self) -> &str {
        if has_text(&self.note) { &self.note } else { &self.text }
    }

    pub fn has_content(&self) -> bool {
        has_text(self.body()) || !self.figures.is_empty() || !self.tables.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevelopmentalWorks {
    pub lab: Vec<NoteEntry>,
    pub farm: Vec<NoteEntry>,
    pub infrastructure: Vec<NoteEntry>,
    pub other: Vec<NoteEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Committee {
    pub text: String,
    pub members: Vec<Record>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Committees {
    pub qrt: Committee,
    pub rac: Committee,
    pub imc: Committee,
    pub irc: Committee,
    pub other: Committee,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Visitor {
    pub name: String,
    pub designation: String,
    pub date: String,
    pub figures: Vec<FigureRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facility {
    pub facility: String,
    pub date: String,
    pub note: String,
    pub figures: Vec<FigureRef>,
    pub tables: Vec<TableRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfraWork {
    pub name: String,
    pub note: String,
    pub figures: Vec<FigureRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaMention {
    pub date: String,
    pub publisher: String,
    pub note: String,
    pub figures: Vec<FigureRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffPositions {
    pub appointments: Vec<NoteEntry>,
    pub promotions: Vec<NoteEntry>,
    pub transfers: Vec<NoteEntry>,
    pub new_joining: Vec<NoteEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annexures {
    pub institutional_projects: Vec<Record>,
    pub external_projects: Vec<Record>,
    pub budget_utilization: BudgetUtilization,
    pub revenue_generation: RecordRows,
    pub developmental_works: DevelopmentalWorks,
    pub committees: Committees,
    pub nodal_officers: RecordRows,
    pub distinguished_visitors: Vec<Visitor>,
    pub new_facilities: Vec<Facility>,
    pub infra_in_progress: Vec<InfraWork>,
    pub staff_positions: StaffPositions,
    pub institute_in_media: Vec<MediaMention>,
    pub other_activities: Vec<NoteEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sections {
    pub research_accomplishments: ResearchAccomplishments,
    pub academic_activities: Vec<Subsection>,
    pub outreach_activities: Vec<Subsection>,
    pub other_institutional_activities: OtherInstitutionalActivities,
    pub training_capacity_building: TrainingCapacityBuilding,
    pub conferences_symposia: ConferencesSymposia,
    pub linkages: Linkages,
    pub awards_recognition: AwardsRecognition,
    pub publications: Publications,
    pub annexures: Annexures,
}

/// Root of the state tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportState {
    pub meta: Meta,
    pub basic_info: BasicInfo,
    pub sections: Sections,
    pub local_counters: LocalCounters,
}

// ---------------------------------------------------------------------------
// Section keys
// ---------------------------------------------------------------------------

/// The eleven report sections, in print order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKey {
    BasicInfo,
    ResearchAccomplishments,
    AcademicActivities,
    OutreachActivities,
    OtherInstitutionalActivities,
    TrainingCapacityBuilding,
    ConferencesSymposia,
    Linkages,
    AwardsRecognition,
    Publications,
    Annexures,
}

impl SectionKey {
    pub const ALL: [SectionKey; 11] = [
        SectionKey::BasicInfo,
        SectionKey::ResearchAccomplishments,
        SectionKey::AcademicActivities,
        SectionKey::OutreachActivities,
        SectionKey::OtherInstitutionalActivities,
        SectionKey::TrainingCapacityBuilding,
        SectionKey::ConferencesSymposia,
        SectionKey::Linkages,
        SectionKey::AwardsRecognition,
        SectionKey::Publications,
        SectionKey::Annexures,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionKey::BasicInfo => "basic_info",
            SectionKey::ResearchAccomplishments => "research_accomplishments",
            SectionKey::AcademicActivities => "academic_activities",
            SectionKey::OutreachActivities => "outreach_activities",
            SectionKey::OtherInstitutionalActivities => "other_institutional_activities",
            SectionKey::TrainingCapacityBuilding => "training_capacity_building",
            SectionKey::ConferencesSymposia => "conferences_symposia",
            SectionKey::Linkages => "linkages",
            SectionKey::AwardsRecognition => "awards_recognition",
            SectionKey::Publications => "publications",
            SectionKey::Annexures => "annexures",
        }
    }

    /// Position in the printed report, starting at 0.
    pub fn ordinal(self) -> usize {
        SectionKey::ALL.iter().position(|k| *k == self).unwrap_or(0)
    }

    pub fn title(self) -> &'static str {
        match self {
            SectionKey::BasicInfo => "Basic Information",
            SectionKey::ResearchAccomplishments => "Research Accomplishments",
            SectionKey::AcademicActivities => "Academic Activities",
            SectionKey::OutreachActivities => "Outreach Activities",
            SectionKey::OtherInstitutionalActivities => "Other Institutional Activities",
            SectionKey::TrainingCapacityBuilding => "Training & Capacity Building",
            SectionKey::ConferencesSymposia => "Conferences / Symposia Attended",
            SectionKey::Linkages => "Linkages & Collaborations",
            SectionKey::AwardsRecognition => "Awards & Recognition",
            SectionKey::Publications => "Publications",
            SectionKey::Annexures => "Annexures",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = ReportError;

    /// Accepts both `snake_case` keys and the editor's `kebab-case` routes.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().replace('-', "_");
        SectionKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
            .or(match normalized.as_str() {
                "training_capacity" => Some(SectionKey::TrainingCapacityBuilding),
                "basic" => Some(SectionKey::BasicInfo),
                _ => None,
            })
            .ok_or_else(|| ReportError::UnknownSection(s.to_string()))
    }
}

impl ReportState {
    /// Serialized form of one section subtree.
    pub fn section_value(&self, key: SectionKey) -> Result<Value> {
        let s = &self.sections;
        let value = match key {
            SectionKey::BasicInfo => serde_json::to_value(&self.basic_info)?,
            SectionKey::ResearchAccomplishments => {
                serde_json::to_value(&s.research_accomplishments)?
            }
            SectionKey::AcademicActivities => serde_json::to_value(&s.academic_activities)?,
            SectionKey::OutreachActivities => serde_json::to_value(&s.outreach_activities)?,
            SectionKey::OtherInstitutionalActivities => {
                serde_json::to_value(&s.other_institutional_activities)?
            }
            SectionKey::TrainingCapacityBuilding => {
                serde_json::to_value(&s.training_capacity_building)?
            }
            SectionKey::ConferencesSymposia => serde_json::to_value(&s.conferences_symposia)?,
            SectionKey::Linkages => serde_json::to_value(&s.linkages)?,
            SectionKey::AwardsRecognition => serde_json::to_value(&s.awards_recognition)?,
            SectionKey::Publications => serde_json::to_value(&s.publications)?,
            SectionKey::Annexures => serde_json::to_value(&s.annexures)?,
        };
        Ok(value)
    }

    /// Replace one section subtree wholesale.
    ///
    /// The value is fully deserialized before anything is assigned, so a bad
    /// payload leaves the state untouched.
    pub fn replace_section(&mut self, key: SectionKey, value: Value) -> Result<()> {
        let s = &mut self.sections;
        match key {
            SectionKey::BasicInfo => self.basic_info = serde_json::from_value(value)?,
            SectionKey::ResearchAccomplishments => {
                s.research_accomplishments = serde_json::from_value(value)?
            }
            SectionKey::AcademicActivities => s.academic_activities = serde_json::from_value(value)?,
            SectionKey::OutreachActivities => s.outreach_activities = serde_json::from_value(value)?,
            SectionKey::OtherInstitutionalActivities => {
                s.other_institutional_activities = serde_json::from_value(value)?
            }
            SectionKey::TrainingCapacityBuilding => {
                s.training_capacity_building = serde_json::from_value(value)?
            }
            SectionKey::ConferencesSymposia => s.conferences_symposia = serde_json::from_value(value)?,
            SectionKey::Linkages => s.linkages = serde_json::from_value(value)?,
            SectionKey::AwardsRecognition => s.awards_recognition = serde_json::from_value(value)?,
            SectionKey::Publications => s.publications = serde_json::from_value(value)?,
            SectionKey::Annexures => s.annexures = serde_json::from_value(value)?,
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_loads_with_defaults() {
        let state = ReportState::from_json("{}").unwrap();
        assert_eq!(state.sections.other_institutional_activities.meetings.len(), 3);
        assert!(state.sections.academic_activities.is_empty());
        assert_eq!(state.local_counters, LocalCounters::default());
    }

    #[test]
    fn legacy_research_array_lands_in_unassigned() {
        let json = r#"{"sections":{"research_accomplishments":[{"project_title":"P1"}]}}"#;
        let state = ReportState::from_json(json).unwrap();
        let ra = &state.sections.research_accomplishments;
        assert_eq!(ra.divisions[UNASSIGNED_DIVISION][0].project_title, "P1");
    }

    #[test]
    fn numeric_year_and_null_cells_are_tolerated() {
        let json = r#"{
            "basic_info": {"year": 2024},
            "sections": {"annexures": {"budget_utilization": {
                "custom_table": {"name": "x", "rows": [["a", 1, null]]}
            }}}
        }"#;
        let state = ReportState::from_json(json).unwrap();
        assert_eq!(state.basic_info.year, "2024");
        let custom = state.sections.annexures.budget_utilization.custom_table.unwrap();
        assert_eq!(custom.rows, vec![vec!["a".to_string(), "1".to_string(), String::new()]]);
    }

    #[test]
    fn section_keys_round_trip_through_strings() {
        for key in SectionKey::ALL {
            assert_eq!(key.as_str().parse::<SectionKey>().unwrap(), key);
        }
        assert_eq!(
            "other-institutional-activities".parse::<SectionKey>().unwrap(),
            SectionKey::OtherInstitutionalActivities
        );
        assert!("nope".parse::<SectionKey>().is_err());
    }

    #[test]
    fn counters_number_figures_and_tables_independently() {
        let mut c = LocalCounters::default();
        let f1 = c.new_figure("a", "", "image/png", "a.png");
        let t1 = c.new_table("t", vec![]);
        let f2 = c.new_figure("b", "", "image/png", "b.png");
        assert_eq!((f1.local_index, f2.local_index, t1.local_index), (1, 2, 1));
        assert_eq!(f2.cite_placeholder, "[FIG-2]");
        assert_eq!(t1.cite_placeholder, "[TAB-1]");
    }
}
