//! The editing session: the state tree, its draft store and the figure/table
//! counters, behind one owner.
//!
//! Section editors read and replace whole section subtrees through
//! [`Session::section`] and [`Session::replace_section`]. Draft operations
//! never fail outright; they report a [`Notice`] instead.

use serde::Serialize;
use serde_json::Value;

use crate::config::PageSetup;
use crate::downloader::{export_bundle, export_pdf, Export};
use crate::error::{ReportError, Result};
use crate::saving::{clear_draft, load_draft, save_draft, DraftStore};
use crate::state::{FigureRef, ReportState, SectionKey, TableRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// A message for the status bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == NoticeKind::Success
    }
}

/// An image the user picked, before it is numbered.
#[derive(Debug, Clone, Default)]
pub struct FigureUpload {
    pub caption: String,
    pub base64: String,
    pub mime_type: String,
    pub file_name: String,
}

pub struct Session<S: DraftStore> {
    state: ReportState,
    store: S,
}

impl<S: DraftStore> Session<S> {
    pub fn new(store: S) -> Self {
        Self::with_state(store, ReportState::default())
    }

    pub fn with_state(store: S, state: ReportState) -> Self {
        Self { state, store }
    }

    pub fn state(&self) -> &ReportState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ReportState {
        &mut self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replace the whole tree, as an upload does. Stored budget figures are
    /// re-derived, never trusted.
    pub fn replace_state(&mut self, state: ReportState) {
        self.state = state;
        self.recompute_budget();
    }

    pub fn section(&self, key: SectionKey) -> Result<Value> {
        self.state.section_value(key)
    }

    pub fn replace_section(&mut self, key: SectionKey, value: Value) -> Result<()> {
        self.state.replace_section(key, value)?;
        if key == SectionKey::Annexures {
            self.recompute_budget();
        }
        Ok(())
    }

    pub fn recompute_budget(&mut self) {
        self.state
            .sections
            .annexures
            .budget_utilization
            .table
            .recompute();
    }

    pub fn save_draft(&mut self) -> Notice {
        match save_draft(&mut self.store, &mut self.state) {
            Ok(()) => Notice::success("Draft saved successfully."),
            Err(e) => {
                log::warn!("saving draft failed: {}", e);
                Notice::error("Failed to save draft.")
            }
        }
    }

    /// Replaces the in-memory state wholesale with the stored draft.
    pub fn load_draft(&mut self) -> Notice {
        match load_draft(&self.store) {
            Ok(Some(state)) => {
                self.replace_state(state);
                Notice::success("Draft restored successfully.")
            }
            Ok(None) => Notice::error("No saved draft found."),
            Err(e) => {
                log::warn!("loading draft failed: {}", e);
                Notice::error("Error restoring draft.")
            }
        }
    }

    /// Deletes the stored draft and resets the state, counters included.
    pub fn clear_draft(&mut self) -> Notice {
        self.state = ReportState::default();
        match clear_draft(&mut self.store) {
            Ok(()) => Notice::success("Draft cleared."),
            Err(e) => {
                log::warn!("clearing draft failed: {}", e);
                Notice::error("Failed to clear draft.")
            }
        }
    }

    /// Number a figure and push it onto the list chosen by `select`.
    /// Returns the stored reference; its `cite_placeholder` goes into text.
    pub fn add_figure<F>(&mut self, select: F, upload: FigureUpload) -> FigureRef
    where
        F: FnOnce(&mut ReportState) -> &mut Vec<FigureRef>,
    {
        let fig = self.state.local_counters.new_figure(
            &upload.caption,
            &upload.base64,
            &upload.mime_type,
            &upload.file_name,
        );
        select(&mut self.state).push(fig.clone());
        fig
    }

    pub fn add_table<F>(&mut self, select: F, caption: &str, rows: Vec<Vec<String>>) -> TableRef
    where
        F: FnOnce(&mut ReportState) -> &mut Vec<TableRef>,
    {
        let table = self.state.local_counters.new_table(caption, rows);
        select(&mut self.state).push(table.clone());
        table
    }

    /// Like [`add_figure`](Self::add_figure), with the list named by a JSON
    /// pointer such as `/sections/linkages/collaborations/0/figures`.
    /// The counter only advances when the pointer resolves.
    pub fn add_figure_at(&mut self, pointer: &str, upload: FigureUpload) -> Result<FigureRef> {
        let mut counters = self.state.local_counters;
        let fig = counters.new_figure(
            &upload.caption,
            &upload.base64,
            &upload.mime_type,
            &upload.file_name,
        );
        self.push_at(pointer, serde_json::to_value(&fig)?)?;
        self.state.local_counters = counters;
        Ok(fig)
    }

    pub fn add_table_at(
        &mut self,
        pointer: &str,
        caption: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<TableRef> {
        let mut counters = self.state.local_counters;
        let table = counters.new_table(caption, rows);
        self.push_at(pointer, serde_json::to_value(&table)?)?;
        self.state.local_counters = counters;
        Ok(table)
    }

    fn push_at(&mut self, pointer: &str, item: Value) -> Result<()> {
        let mut tree = serde_json::to_value(&self.state)?;
        match tree.pointer_mut(pointer) {
            Some(Value::Array(list)) => list.push(item),
            _ => return Err(ReportError::BadTarget(pointer.to_string())),
        }
        let counters = self.state.local_counters;
        self.state = serde_json::from_value(tree)?;
        self.state.local_counters = counters;
        Ok(())
    }

    pub fn validate(&self) -> Vec<String> {
        crate::validate::validate(&self.state)
    }

    pub fn export_pdf(&self, setup: &PageSetup) -> Result<Export> {
        export_pdf(&self.state, setup)
    }

    pub fn export_bundle(&self, setup: &PageSetup) -> Result<Export> {
        export_bundle(&self.state, setup)
    }
}
