//! Pre-submission checks: word limits and citation placeholders.

use lazy_static::lazy_static;
use regex::Regex;

use crate::state::{value_text, ContentItem, Record, ReportState, SectionKey};

lazy_static! {
    static ref BRACKETED: Regex = Regex::new(r"\[.*?\]").unwrap();
    static ref PLACEHOLDER: Regex = Regex::new(r"\[(FIG|TAB)-\d+\]").unwrap();
}

pub const EXECUTIVE_SUMMARY_MAX: usize = 350;
pub const RESEARCH_MAX: usize = 300;
pub const ACTIVITY_MAX: usize = 250;
pub const INSTITUTIONAL_MAX: usize = 250;
pub const ENTRY_MAX: usize = 150;
pub const LINKAGE_MAX: usize = 200;
pub const RECOGNITION_MAX: usize = 150;
pub const CITATION_MAX: usize = 1000;

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Bracketed text present, but not a single `[FIG-n]` / `[TAB-n]` among it.
pub fn has_invalid_citation(text: &str) -> bool {
    BRACKETED.is_match(text) && !PLACEHOLDER.is_match(text)
}

fn check_text(errors: &mut Vec<String>, label: &str, text: &str, max: usize) {
    if count_words(text) > max {
        errors.push(format!("{} exceeds {} words.", label, max));
    }
    if has_invalid_citation(text) {
        errors.push(format!("{} contains invalid citation format.", label));
    }
}

fn check_blocks(errors: &mut Vec<String>, label: &str, blocks: &[ContentItem], max: usize) {
    for (i, block) in blocks.iter().enumerate() {
        check_text(errors, &format!("{} (block {})", label, i + 1), &block.text, max);
    }
}

fn record_text(r: &Record) -> String {
    r.values().map(value_text).collect::<Vec<_>>().join(" ")
}

/// Problems in one section, as user-facing messages.
pub fn validate_section(state: &ReportState, key: SectionKey) -> Vec<String> {
    let mut errors = Vec::new();
    let s = &state.sections;

    match key {
        SectionKey::BasicInfo => check_text(
            &mut errors,
            "Executive Summary",
            &state.basic_info.executive_summary,
            EXECUTIVE_SUMMARY_MAX,
        ),
        SectionKey::ResearchAccomplishments => {
            for (p, project) in s.research_accomplishments.projects().enumerate() {
                for sub in &project.subheadings {
                    check_blocks(
                        &mut errors,
                        &format!("Research Accomplishments, project {}", p + 1),
                        &sub.blocks,
                        RESEARCH_MAX,
                    );
                }
            }
        }
        SectionKey::AcademicActivities | SectionKey::OutreachActivities => {
            let subs = if key == SectionKey::AcademicActivities {
                &s.academic_activities
            } else {
                &s.outreach_activities
            };
            for sub in subs {
                let label = if sub.title.trim().is_empty() { key.title() } else { sub.title.trim() };
                check_blocks(&mut errors, label, &sub.blocks, ACTIVITY_MAX);
            }
        }
        SectionKey::OtherInstitutionalActivities => {
            let sec = &s.other_institutional_activities;
            if count_words(&sec.itmu.text) > INSTITUTIONAL_MAX {
                errors.push(format!("ITMU description exceeds {} words.", INSTITUTIONAL_MAX));
            }
            if count_words(&sec.abi.text) > INSTITUTIONAL_MAX {
                errors.push(format!("ABI description exceeds {} words.", INSTITUTIONAL_MAX));
            }
            for m in &sec.meetings {
                if count_words(&m.text) > INSTITUTIONAL_MAX {
                    errors.push(format!(
                        "Meeting \"{}\" exceeds {} words.",
                        m.title, INSTITUTIONAL_MAX
                    ));
                }
            }
        }
        SectionKey::TrainingCapacityBuilding => {
            let sec = &s.training_capacity_building;
            for (i, r) in sec.trainings_organized.iter().chain(&sec.events_attended).enumerate() {
                if count_words(&record_text(r)) > ENTRY_MAX {
                    errors.push(format!("Training entry {} exceeds {} words.", i + 1, ENTRY_MAX));
                }
            }
        }
        SectionKey::ConferencesSymposia => {
            for (i, r) in s.conferences_symposia.attended.iter().enumerate() {
                if count_words(&record_text(r)) > ENTRY_MAX {
                    errors.push(format!("Conference entry {} exceeds {} words.", i + 1, ENTRY_MAX));
                }
            }
        }
        SectionKey::Linkages => {
            for (i, c) in s.linkages.collaborations.iter().enumerate() {
                let text = match &c.blocks {
                    Some(blocks) => blocks.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join(" "),
                    None => c.body.text.clone(),
                };
                if count_words(&text) > LINKAGE_MAX {
                    errors.push(format!("Linkage entry {} exceeds {} words.", i + 1, LINKAGE_MAX));
                }
            }
        }
        SectionKey::AwardsRecognition => {
            for (i, r) in s.awards_recognition.recognitions.iter().enumerate() {
                if count_words(&r.text) > RECOGNITION_MAX {
                    errors.push(format!("Recognition {} exceeds {} words.", i + 1, RECOGNITION_MAX));
                }
            }
        }
        SectionKey::Publications => {
            for (label, list) in s.publications.categories.labelled() {
                for (i, p) in list.iter().enumerate() {
                    let apa = p.get("apa").map(value_text).unwrap_or_default();
                    if count_words(&apa) > CITATION_MAX {
                        errors.push(format!("{}: APA citation {} exceeds allowed size.", label, i + 1));
                    }
                    if has_invalid_citation(&apa) {
                        errors.push(format!(
                            "{}: APA citation {} contains invalid citation placeholders.",
                            label,
                            i + 1
                        ));
                    }
                }
            }
        }
        SectionKey::Annexures => {}
    }
    errors
}

/// Every problem in the report, in section order.
pub fn validate(state: &ReportState) -> Vec<String> {
    SectionKey::ALL
        .iter()
        .flat_map(|key| validate_section(state, *key))
        .collect()
}
