//! Conversion history persisted to a flat comma-separated file.
//!
//! Records are append-only and kept in insertion order. Every append rewrites the
//! whole file: the new content is written to a temp file next to the history file
//! and renamed over it, while an exclusive lock on `<file>.lock` serializes
//! concurrent writers. Readers take no lock.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::shared::error::{AppError, AppResult};
use crate::shared::types::{ConversionRecord, HISTORY_HEADER};

/// Storage backend for conversion history
pub trait Storage: Send + Sync {
    /// Every stored record, oldest first. A store that was never written is empty.
    fn load_all(&self) -> AppResult<Vec<ConversionRecord>>;

    /// Add one record after all existing ones.
    fn append(&self, record: &ConversionRecord) -> AppResult<()>;
}

/// Read records from CSV with a `Category,Value,From,To,Result` header.
pub fn read_records<R: Read>(reader: R) -> AppResult<Vec<ConversionRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in rdr.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// Write the header and then one row per record. An empty slice still gets the header.
pub fn write_records<W: Write>(writer: W, records: &[ConversionRecord]) -> AppResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(HISTORY_HEADER)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// File-backed storage
pub struct CsvStorage {
    path: PathBuf,
}

impl CsvStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn lock_exclusive(&self) -> AppResult<File> {
        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| AppError::Io(format!("failed to open history lock {}: {}", lock_path.display(), e)))?;
        FileExt::lock_exclusive(&lock_file)
            .map_err(|e| AppError::Io(format!("failed to lock history {}: {}", lock_path.display(), e)))?;
        Ok(lock_file)
    }

    /// Replace the file contents in one rename.
    fn replace_all(&self, records: &[ConversionRecord]) -> AppResult<()> {
        let mut tmp = NamedTempFile::new_in(self.parent_dir())?;
        write_records(&mut tmp, records)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

impl Storage for CsvStorage {
    fn load_all(&self) -> AppResult<Vec<ConversionRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no history file yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        read_records(file)
    }

    fn append(&self, record: &ConversionRecord) -> AppResult<()> {
        fs::create_dir_all(self.parent_dir())?;
        let lock_file = self.lock_exclusive()?;

        let mut records = self.load_all()?;
        records.push(record.clone());
        let result = self.replace_all(&records);

        FileExt::unlock(&lock_file)?;
        result?;

        debug!(path = %self.path.display(), total = records.len(), "history rewritten");
        Ok(())
    }
}

/// In-memory storage for tests
#[derive(Default)]
pub struct InMemoryStorage {
    items: Mutex<Vec<ConversionRecord>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for InMemoryStorage {
    fn load_all(&self) -> AppResult<Vec<ConversionRecord>> {
        let items = self.items.lock()
            .map_err(|e| AppError::Storage(format!("Mutex poisoned: {}", e)))?;
        Ok(items.clone())
    }

    fn append(&self, record: &ConversionRecord) -> AppResult<()> {
        let mut items = self.items.lock()
            .map_err(|e| AppError::Storage(format!("Mutex poisoned: {}", e)))?;
        items.push(record.clone());
        Ok(())
    }
}

/// Conversion history over a pluggable [`Storage`].
#[derive(Clone)]
pub struct ConversionHistory {
    storage: Arc<dyn Storage>,
}

impl ConversionHistory {
    /// History persisted at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_storage(Arc::new(CsvStorage::new(path)))
    }

    pub fn in_memory() -> Self {
        Self::with_storage(Arc::new(InMemoryStorage::new()))
    }

    pub fn with_storage(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn append(&self, record: ConversionRecord) -> AppResult<()> {
        self.storage.append(&record)?;
        info!(category = %record.category, from = %record.from_unit, to = %record.to_unit, "recorded conversion");
        Ok(())
    }

    pub fn load_all(&self) -> AppResult<Vec<ConversionRecord>> {
        self.storage.load_all()
    }

    /// The last `min(n, len)` records, oldest first.
    pub fn tail(&self, n: usize) -> AppResult<Vec<ConversionRecord>> {
        let mut records = self.load_all()?;
        let start = records.len().saturating_sub(n);
        Ok(records.split_off(start))
    }

    pub fn count(&self) -> AppResult<usize> {
        Ok(self.load_all()?.len())
    }

    /// Write the full history, header included, to `writer`. Returns the record count.
    pub fn write_to<W: Write>(&self, writer: W) -> AppResult<usize> {
        let records = self.load_all()?;
        write_records(writer, &records)?;
        Ok(records.len())
    }

    /// Copy the full history to `dest`.
    pub fn export_to(&self, dest: &Path) -> AppResult<usize> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(dest)?;
        let count = self.write_to(BufWriter::new(file))?;
        info!(dest = %dest.display(), records = count, "exported history");
        Ok(count)
    }
}
