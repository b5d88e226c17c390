#![cfg(not(tarpaulin_include))]

use std::io::{Cursor, Write};

use lazy_static::lazy_static;
use regex::Regex;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::PageSetup;
use crate::error::Result;
use crate::layout::layout_document;
use crate::model::ReportDocument;
use crate::pdf::render_pdf;
use crate::projection::project;
use crate::state::ReportState;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// A generated file ready to be written or sent.
#[derive(Debug, Clone)]
pub struct Export {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// `<Institute>_AnnualReport_<year>_<Faculty>` with whitespace as underscores.
pub fn base_file_name(doc: &ReportDocument) -> String {
    format!(
        "{}_AnnualReport_{}_{}",
        WHITESPACE.replace_all(&doc.institute, "_"),
        doc.year,
        WHITESPACE.replace_all(&doc.faculty, "_")
    )
}

fn build_pdf(doc: &ReportDocument, setup: &PageSetup) -> Result<Vec<u8>> {
    render_pdf(&layout_document(doc, setup))
}

/// Convert the report to a PDF document
///
/// Projects the state tree, lays it out and serializes the pages.
/// Figures that fail to decode are skipped, so this only fails on I/O-level
/// problems while compressing streams.
///
/// # Examples
/// ```
/// use annual_report::config::PageSetup;
/// use annual_report::downloader::export_pdf;
/// use annual_report::state::ReportState;
///
/// let export = export_pdf(&ReportState::default(), &PageSetup::default()).unwrap();
/// assert!(export.bytes.starts_with(b"%PDF"));
/// assert!(export.file_name.ends_with(".pdf"));
/// ```
pub fn export_pdf(state: &ReportState, setup: &PageSetup) -> Result<Export> {
    let doc = project(state);
    let bytes = build_pdf(&doc, setup)?;
    let file_name = format!("{}.pdf", base_file_name(&doc));
    log::info!("exported {} ({} bytes)", file_name, bytes.len());
    Ok(Export {
        file_name,
        mime_type: "application/pdf",
        bytes,
    })
}

/// Convert the report to a ZIP holding the PDF and a JSON snapshot
///
/// Both entries share the base name of the archive.
pub fn export_bundle(state: &ReportState, setup: &PageSetup) -> Result<Export> {
    let doc = project(state);
    let base = base_file_name(&doc);
    let pdf = build_pdf(&doc, setup)?;
    let json = state.to_json_pretty()?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(format!("{}.pdf", base), options)?;
    zip.write_all(&pdf)?;
    zip.start_file(format!("{}.json", base), options)?;
    zip.write_all(json.as_bytes())?;

    let bytes = zip.finish()?.into_inner();
    log::info!("exported {}.zip ({} bytes)", base, bytes.len());
    Ok(Export {
        file_name: format!("{}.zip", base),
        mime_type: "application/zip",
        bytes,
    })
}
