/*!
# Annual Report Builder

Collects an institute's annual report section by section and renders it as a
paginated A4 PDF, built in Rust.

## Overview

A report is one JSON state tree: basic information about the institute plus
ten content sections (research, academic and outreach activities, training,
conferences, linkages, awards, publications and annexures). Every section
can carry figures and tables, numbered from shared counters and cited in
text with `[FIG-n]` / `[TAB-n]` placeholders.

## Pipeline

1. **state**: the serde data model, lenient about the shapes older drafts used
2. **projection**: state tree → [`ReportDocument`], an ordered list of
   numbered sections made of subheadings, paragraphs and tables; empty
   sections are dropped and placeholders become "Figure N" / "Table N"
3. **layout**: a flow engine that places text, tables and images on pages,
   breaking pages on overflow and repeating table headers
4. **pdf**: serializes the laid-out pages with the 14 standard fonts

## Modules

- **duration**: calendar spans between two dates ("1 year 2 months 3 days")
- **budget**: the budget utilization table with derived percentages and totals
- **saving**: drafts in a key-value store, gzip snapshots on disk
- **loader**: CSV / XLSX uploads → table rows
- **downloader**: PDF export and the PDF + JSON ZIP bundle
- **validate**: word limits and citation checks before submission
- **session**: one editing session tying state, drafts and counters together
- **app**: the HTTP API (feature `web`)

## REST API Endpoints

- `/api/state`, `/api/sections/{key}` - Read and replace section subtrees
- `/api/figures`, `/api/tables` - Attach numbered figures and tables
- `/api/draft/{save,load,clear}` - Draft persistence
- `/api/export/{pdf,zip}` - Generated downloads
- `/api/submit` - Validate and store a submission
*/

pub mod budget;
pub mod config;
pub mod downloader;
pub mod duration;
pub mod error;
pub mod layout;
pub mod loader;
pub mod model;
pub mod pdf;
pub mod projection;
pub mod saving;
pub mod session;
pub mod state;
pub mod validate;

#[cfg(feature = "web")]
pub mod app;

pub use budget::BudgetTable;
pub use config::{PageSetup, ServerConfig};
pub use downloader::{export_bundle, export_pdf, Export};
pub use duration::{describe_duration, duration_between, CalendarSpan, DurationError};
pub use error::{ReportError, Result};
pub use layout::{layout_document, LayoutDocument};
pub use model::ReportDocument;
pub use pdf::render_pdf;
pub use projection::project;
pub use saving::{DraftStore, FileStore, MemoryStore};
pub use session::{Notice, Session};
pub use state::{ReportState, SectionKey};
