use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::state::ReportState;

/// Key under which the single working draft is stored.
pub const DRAFT_KEY: &str = "annual_report_draft_v1";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A string key-value store holding serialized drafts.
pub trait DraftStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Overwrites any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl DraftStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        // Write beside the target and rename so readers never see half a draft.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Stamp `meta.lastSavedAt` and overwrite the stored draft.
pub fn save_draft<S: DraftStore + ?Sized>(store: &mut S, state: &mut ReportState) -> Result<()> {
    state.meta.last_saved_at = Some(chrono::Utc::now().to_rfc3339());
    let json = serde_json::to_string(state)?;
    store.set(DRAFT_KEY, &json)?;
    log::info!("draft saved ({} bytes)", json.len());
    Ok(())
}

/// The stored draft, if any. Missing substructures come back as defaults.
pub fn load_draft<S: DraftStore + ?Sized>(store: &S) -> Result<Option<ReportState>> {
    match store.get(DRAFT_KEY)? {
        Some(json) => {
            let state = ReportState::from_json(&json)?;
            log::info!("draft loaded");
            Ok(Some(state))
        }
        None => Ok(None),
    }
}

pub fn clear_draft<S: DraftStore + ?Sized>(store: &mut S) -> Result<()> {
    store.remove(DRAFT_KEY)?;
    log::info!("draft cleared");
    Ok(())
}

/// Gzip-compressed JSON snapshot of the whole state.
pub fn serialize_to_memory(state: &ReportState) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut encoder, state)?;
    Ok(encoder.finish()?)
}

/// Accepts either a gzip snapshot or plain JSON.
pub fn deserialize_from_memory(bytes: &[u8]) -> Result<ReportState> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut json = String::new();
        GzDecoder::new(bytes).read_to_string(&mut json)?;
        ReportState::from_json(&json)
    } else {
        Ok(serde_json::from_slice(bytes)?)
    }
}

pub fn save_state(state: &ReportState, filename: impl AsRef<Path>) -> Result<()> {
    let file = File::create(filename)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = BufWriter::new(encoder);
    serde_json::to_writer(&mut writer, state)?;
    writer.into_inner().map_err(|e| e.into_error())?.finish()?;
    Ok(())
}

/// Read a snapshot file written by [`save_state`], or a plain JSON draft.
pub fn load_state(filename: impl AsRef<Path>) -> Result<ReportState> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(filename)?).read_to_end(&mut bytes)?;
    deserialize_from_memory(&bytes)
}
