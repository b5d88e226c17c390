use annual_report::saving::{
    deserialize_from_memory, load_state, save_state, serialize_to_memory, DraftStore, FileStore,
    DRAFT_KEY,
};
use annual_report::session::{NoticeKind, Session};
use annual_report::state::{ReportState, SectionKey};
use serde_json::json;
use tempfile::tempdir;

fn sample_state() -> ReportState {
    let mut state = ReportState::default();
    state.basic_info.institute_name_short = "IIHR".to_string();
    state.basic_info.faculty_name = "Dr. Rao".to_string();
    state.basic_info.year = "2024".to_string();
    state
}

#[test]
fn test_draft_round_trip_through_files() {
    let dir = tempdir().unwrap();

    let mut session = Session::with_state(FileStore::new(dir.path()), sample_state());
    let notice = session.save_draft();
    assert_eq!(notice.kind, NoticeKind::Success, "{}", notice.message);
    assert!(dir.path().join(format!("{}.json", DRAFT_KEY)).exists());
    assert!(session.state().meta.last_saved_at.is_some(), "save stamps lastSavedAt");

    let mut restored = Session::new(FileStore::new(dir.path()));
    let notice = restored.load_draft();
    assert!(notice.is_success(), "{}", notice.message);
    assert_eq!(restored.state(), session.state());
}

#[test]
fn test_clear_removes_the_draft_and_resets_state() {
    let dir = tempdir().unwrap();
    let mut session = Session::with_state(FileStore::new(dir.path()), sample_state());
    session.save_draft();

    let notice = session.clear_draft();
    assert_eq!(notice.message, "Draft cleared.");
    assert_eq!(session.state().basic_info.institute_name_short, "");
    assert!(!dir.path().join(format!("{}.json", DRAFT_KEY)).exists());

    let notice = session.load_draft();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert_eq!(notice.message, "No saved draft found.");
}

#[test]
fn test_corrupt_draft_is_a_notice() {
    let dir = tempdir().unwrap();
    let mut store = FileStore::new(dir.path());
    store.set(DRAFT_KEY, "{ not json").unwrap();

    let mut session = Session::with_state(store, sample_state());
    let notice = session.load_draft();
    assert_eq!(notice.message, "Error restoring draft.");
    assert_eq!(
        session.state().basic_info.institute_name_short,
        "IIHR",
        "a failed load keeps the current state"
    );
}

#[test]
fn test_partial_draft_fills_defaults() {
    let dir = tempdir().unwrap();
    let mut store = FileStore::new(dir.path());
    let partial = json!({ "basic_info": { "institute_name_short": "CPCRI", "year": 2023 } });
    store.set(DRAFT_KEY, &partial.to_string()).unwrap();

    let mut session = Session::new(store);
    assert!(session.load_draft().is_success());
    let state = session.state();
    assert_eq!(state.basic_info.institute_name_short, "CPCRI");
    assert_eq!(state.basic_info.year, "2023", "numeric year is accepted");
    assert!(state.sections.academic_activities.is_empty());
    assert_eq!(state.sections.other_institutional_activities.meetings.len(), 3);
}

#[test]
fn test_gzip_snapshot_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.json.gz");
    let state = sample_state();

    save_state(&state, &path).unwrap();
    assert_eq!(load_state(&path).unwrap(), state);

    let bytes = serialize_to_memory(&state).unwrap();
    assert_eq!(&bytes[..2], &[0x1f, 0x8b], "gzip magic");
    assert_eq!(deserialize_from_memory(&bytes).unwrap(), state);

    let plain = state.to_json_pretty().unwrap();
    assert_eq!(deserialize_from_memory(plain.as_bytes()).unwrap(), state);
}

#[test]
fn test_section_replacement_recomputes_budget() {
    let mut session = Session::new(annual_report::saving::MemoryStore::new());
    let annexures = json!({
        "budget_utilization": {
            "rows": [
                { "head": "GIA General", "re": "100", "exp": "40" },
                { "head": "Total" },
                { "head": "GIA Capital", "re": "50", "exp": "50" }
            ]
        }
    });
    session
        .replace_section(SectionKey::Annexures, annexures)
        .unwrap();

    let table = &session.state().sections.annexures.budget_utilization.table;
    let heads: Vec<&str> = table.rows.iter().map(|r| r.head.as_str()).collect();
    assert_eq!(heads, vec!["GIA General", "GIA Capital", "Total"]);
    assert_eq!(table.rows[0].exp_pct, "40.00");
    assert_eq!(table.total().unwrap().re, "150.00");
    assert_eq!(table.total().unwrap().exp_pct, "70.00");
}

#[test]
fn test_restored_drafts_have_their_budget_recomputed() {
    let stale = json!({ "sections": { "annexures": { "budget_utilization": { "rows": [
        { "head": "GIA General", "re": "100", "exp": "50", "exp_pct": "200.00" },
        { "head": "Total", "re": "100.00", "exp": "50.00" },
        { "head": "GIA Capital", "re": "200", "exp": "50" }
    ] } } } });

    let dir = tempdir().unwrap();
    let mut store = FileStore::new(dir.path());
    store.set(DRAFT_KEY, &stale.to_string()).unwrap();
    let mut loaded = Session::new(store);
    assert!(loaded.load_draft().is_success());

    let mut uploaded = Session::new(annual_report::saving::MemoryStore::new());
    uploaded.replace_state(deserialize_from_memory(stale.to_string().as_bytes()).unwrap());

    for state in [loaded.state(), uploaded.state()] {
        let table = &state.sections.annexures.budget_utilization.table;
        let heads: Vec<&str> = table.rows.iter().map(|r| r.head.as_str()).collect();
        assert_eq!(heads, vec!["GIA General", "GIA Capital", "Total"]);
        assert_eq!(table.rows[0].exp_pct, "50.00");
        assert_eq!(table.total().unwrap().re, "300.00");
    }
}

#[test]
fn test_unknown_section_key_is_rejected() {
    assert!("no_such_section".parse::<SectionKey>().is_err());
    assert_eq!(
        "training-capacity-building".parse::<SectionKey>().unwrap(),
        SectionKey::TrainingCapacityBuilding
    );
}
