// crates/l10n-sync-store-csv/src/store.rs
// ============================================================================
// Module: CSV Report Store
// Description: ReportStore backed by one CSV file per report.
// Purpose: Exchange translation reports with reviewers through spreadsheets.
// Dependencies: csv, l10n-sync-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`CsvReportStore`] maps a report name to `<root>/<name>.csv`. Files are
//! written with a fixed header ([`COLUMNS`]) and a comma delimiter. Reading
//! tolerates the edits spreadsheet tools make on save: a UTF-8 byte-order
//! mark, a different delimiter (`;`, tab, or `|`), reordered columns, and a
//! dropped `status` column.
//!
//! Claims are lock files created with `create_new`, so a second process
//! cannot claim a report the first one still owns.
//! Security posture: report contents are reviewer-edited input and are
//! validated row by row before they reach the pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use csv::ReaderBuilder;
use csv::StringRecord;
use csv::WriterBuilder;
use l10n_sync_core::BackendId;
use l10n_sync_core::LocaleCode;
use l10n_sync_core::LocalizationKey;
use l10n_sync_core::Platform;
use l10n_sync_core::ReportError;
use l10n_sync_core::ReportStore;
use l10n_sync_core::TranslationEntry;
use l10n_sync_core::TranslationOrigin;
use l10n_sync_core::TranslationStatus;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Report columns in write order.
pub const COLUMNS: [&str; 8] = ["key", "platform", "locale", "backend_id", "base_value", "value", "status", "origin"];
/// Columns a report must carry to be readable.
const REQUIRED_COLUMNS: [&str; 4] = ["key", "platform", "locale", "value"];
/// Report file extension.
const REPORT_EXTENSION: &str = "csv";
/// Maximum report name length.
const MAX_REPORT_NAME_LENGTH: usize = 128;
/// Delimiters recognised on read, in tie-break order.
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];
/// Byte-order mark some spreadsheet tools prepend on save.
const UTF8_BOM: char = '\u{feff}';

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CSV report store errors.
///
/// # Invariants
/// - Messages name the report file and, for row errors, the 1-based line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CsvStoreError {
    /// Filesystem failure.
    #[error("csv store io error: {0}")]
    Io(String),
    /// Report name or contents rejected.
    #[error("csv store invalid report: {0}")]
    Invalid(String),
    /// Report is claimed by another owner.
    #[error("csv store report locked: {0}")]
    Locked(String),
}

impl From<CsvStoreError> for ReportError {
    fn from(error: CsvStoreError) -> Self {
        match error {
            CsvStoreError::Io(message) => Self::Io(message),
            CsvStoreError::Invalid(message) => Self::Invalid(message),
            CsvStoreError::Locked(message) => Self::Locked(message),
        }
    }
}

// ============================================================================
// SECTION: Delimiter Detection
// ============================================================================

/// Detects the delimiter of a CSV header line.
///
/// Counts each candidate outside double-quoted sections and returns the most
/// frequent one; ties resolve in `, ; \t |` order and a line without any
/// candidate yields `,`.
#[must_use]
pub fn detect_delimiter(header: &str) -> u8 {
    let mut counts = [0usize; DELIMITER_CANDIDATES.len()];
    let mut quoted = false;
    for byte in header.bytes() {
        if byte == b'"' {
            quoted = !quoted;
            continue;
        }
        if quoted {
            continue;
        }
        if let Some(index) = DELIMITER_CANDIDATES.iter().position(|candidate| *candidate == byte) {
            counts[index] += 1;
        }
    }
    let mut best = 0;
    for index in 1 .. counts.len() {
        if counts[index] > counts[best] {
            best = index;
        }
    }
    DELIMITER_CANDIDATES[best]
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Report store writing one CSV file per report under a root directory.
///
/// # Invariants
/// - Report names are single path components; separators are rejected.
/// - A claim exists exactly while `<name>.csv.lock` exists.
#[derive(Debug, Clone)]
pub struct CsvReportStore {
    /// Reports directory.
    root: PathBuf,
}

impl CsvReportStore {
    /// Opens a store rooted at `root`, creating the directory when needed.
    ///
    /// # Errors
    ///
    /// Returns [`CsvStoreError::Io`] when the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CsvStoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|err| CsvStoreError::Io(format!("create {}: {err}", root.display())))?;
        Ok(Self {
            root,
        })
    }

    /// Returns the reports directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file backing `report`.
    ///
    /// # Errors
    ///
    /// Returns [`CsvStoreError::Invalid`] when the name is not a plain file stem.
    pub fn report_path(&self, report: &str) -> Result<PathBuf, CsvStoreError> {
        validate_report_name(report)?;
        Ok(self.root.join(format!("{report}.{REPORT_EXTENSION}")))
    }

    /// Returns the lock file guarding `report`.
    fn lock_path(&self, report: &str) -> Result<PathBuf, CsvStoreError> {
        validate_report_name(report)?;
        Ok(self.root.join(format!("{report}.{REPORT_EXTENSION}.lock")))
    }

    /// Returns true while `report` is claimed.
    #[must_use]
    pub fn is_claimed(&self, report: &str) -> bool {
        self.lock_path(report).is_ok_and(|path| path.is_file())
    }

    /// Writes `entries` to `report`, replacing any previous contents.
    ///
    /// # Errors
    ///
    /// Returns [`CsvStoreError`] when the name is invalid or the file cannot
    /// be written.
    pub fn write_entries(&self, report: &str, entries: &[TranslationEntry]) -> Result<(), CsvStoreError> {
        let path = self.report_path(report)?;
        let staging = path.with_extension(format!("{REPORT_EXTENSION}.tmp"));

        let mut writer = WriterBuilder::new().from_path(&staging).map_err(|err| write_error(&path, err))?;
        writer.write_record(COLUMNS).map_err(|err| write_error(&path, err))?;
        for entry in entries {
            writer.write_record(entry_record(entry)).map_err(|err| write_error(&path, err))?;
        }
        writer.flush().map_err(|err| write_error(&path, err))?;
        drop(writer);
        fs::rename(&staging, &path).map_err(|err| write_error(&path, err))?;
        debug!(report, rows = entries.len(), path = %path.display(), "report written");
        Ok(())
    }

    /// Reads the entries of `report`.
    ///
    /// # Errors
    ///
    /// Returns [`CsvStoreError::Io`] when the file is missing or unreadable and
    /// [`CsvStoreError::Invalid`] when a header or row cannot be interpreted.
    pub fn read_entries(&self, report: &str) -> Result<Vec<TranslationEntry>, CsvStoreError> {
        let path = self.report_path(report)?;
        let text = fs::read_to_string(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => CsvStoreError::Io(format!("report not found: {}", path.display())),
            _ => CsvStoreError::Io(format!("read {}: {err}", path.display())),
        })?;
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(&text);
        let header_line = text.lines().next().unwrap_or_default();
        let delimiter = detect_delimiter(header_line);

        let mut reader = ReaderBuilder::new().delimiter(delimiter).flexible(true).from_reader(text.as_bytes());
        let headers = reader
            .headers()
            .map_err(|err| CsvStoreError::Invalid(format!("{}: {err}", path.display())))?
            .clone();
        let columns = ColumnIndex::from_headers(&headers)
            .map_err(|message| CsvStoreError::Invalid(format!("{}: {message}", path.display())))?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| CsvStoreError::Invalid(format!("{}: {err}", path.display())))?;
            let line = record.position().map_or(0, csv::Position::line);
            let entry = columns
                .entry(&record)
                .map_err(|message| CsvStoreError::Invalid(format!("{} line {line}: {message}", path.display())))?;
            if let Some(entry) = entry {
                entries.push(entry);
            }
        }
        debug!(report, rows = entries.len(), delimiter = %char::from(delimiter).escape_default(), "report read");
        Ok(entries)
    }

    /// Creates the lock file for `report`.
    ///
    /// # Errors
    ///
    /// Returns [`CsvStoreError::Locked`] when the lock file already exists.
    pub fn claim_report(&self, report: &str) -> Result<(), CsvStoreError> {
        let path = self.lock_path(report)?;
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path).map_err(|err| {
            if err.kind() == ErrorKind::AlreadyExists {
                CsvStoreError::Locked(format!("{report} (remove {} if no run owns it)", path.display()))
            } else {
                CsvStoreError::Io(format!("claim {}: {err}", path.display()))
            }
        })?;
        writeln!(file, "pid={}", std::process::id())
            .map_err(|err| CsvStoreError::Io(format!("claim {}: {err}", path.display())))?;
        Ok(())
    }

    /// Removes the lock file for `report`; releasing an unclaimed report is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CsvStoreError::Io`] when the lock file cannot be removed.
    pub fn release_report(&self, report: &str) -> Result<(), CsvStoreError> {
        let path = self.lock_path(report)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CsvStoreError::Io(format!("release {}: {err}", path.display()))),
        }
    }
}

impl ReportStore for CsvReportStore {
    fn write(&self, report: &str, entries: &[TranslationEntry]) -> Result<(), ReportError> {
        Ok(self.write_entries(report, entries)?)
    }

    fn read(&self, report: &str) -> Result<Vec<TranslationEntry>, ReportError> {
        Ok(self.read_entries(report)?)
    }

    fn exists(&self, report: &str) -> bool {
        self.report_path(report).is_ok_and(|path| path.is_file())
    }

    fn claim(&self, report: &str) -> Result<(), ReportError> {
        Ok(self.claim_report(report)?)
    }

    fn release(&self, report: &str) -> Result<(), ReportError> {
        Ok(self.release_report(report)?)
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Header positions resolved from a report's first line.
struct ColumnIndex {
    /// Column name to field position.
    positions: BTreeMap<&'static str, usize>,
}

impl ColumnIndex {
    /// Resolves known columns by case-insensitive name.
    fn from_headers(headers: &StringRecord) -> Result<Self, String> {
        let mut positions = BTreeMap::new();
        for (position, header) in headers.iter().enumerate() {
            let header = header.trim().to_ascii_lowercase();
            if let Some(column) = COLUMNS.iter().find(|column| **column == header) {
                positions.entry(*column).or_insert(position);
            }
        }
        for required in REQUIRED_COLUMNS {
            if !positions.contains_key(required) {
                return Err(format!("missing column `{required}`"));
            }
        }
        Ok(Self {
            positions,
        })
    }

    /// Returns the raw field for `column`, or `""` when absent.
    fn field<'r>(&self, record: &'r StringRecord, column: &str) -> &'r str {
        self.positions.get(column).and_then(|position| record.get(*position)).unwrap_or_default()
    }

    /// Parses one row; blank rows yield `None`.
    fn entry(&self, record: &StringRecord) -> Result<Option<TranslationEntry>, String> {
        if record.iter().all(|field| field.trim().is_empty()) {
            return Ok(None);
        }
        let identifier = self.field(record, "key").trim();
        if identifier.is_empty() {
            return Err("empty key".to_string());
        }
        let platform_label = self.field(record, "platform");
        let platform =
            Platform::parse(platform_label).ok_or_else(|| format!("unknown platform `{platform_label}`"))?;
        let locale = self.field(record, "locale").trim();
        if locale.is_empty() {
            return Err("empty locale".to_string());
        }
        let backend_id = non_empty(self.field(record, "backend_id").trim()).map(BackendId::new);
        let value = non_empty(self.field(record, "value")).map(str::to_string);

        let status_label = self.field(record, "status");
        let status = if status_label.trim().is_empty() {
            if value.is_some() { TranslationStatus::Translated } else { TranslationStatus::Missing }
        } else {
            TranslationStatus::parse(status_label).ok_or_else(|| format!("unknown status `{status_label}`"))?
        };
        let origin_label = self.field(record, "origin");
        let origin = match non_empty(origin_label.trim()) {
            None => None,
            Some(label) => Some(TranslationOrigin::parse(label).ok_or_else(|| format!("unknown origin `{label}`"))?),
        };

        let key = LocalizationKey::new(identifier, platform, self.field(record, "base_value"));
        let mut entry = TranslationEntry::missing(key, LocaleCode::new(locale), backend_id);
        entry.value = value;
        entry.status = status;
        entry.origin = origin;
        Ok(Some(entry))
    }
}

/// Renders one entry in [`COLUMNS`] order.
fn entry_record(entry: &TranslationEntry) -> [String; 8] {
    [
        entry.key.identifier.clone(),
        entry.key.platform.to_string(),
        entry.locale.to_string(),
        entry.backend_id.as_ref().map(ToString::to_string).unwrap_or_default(),
        entry.key.base_value.clone(),
        entry.value.clone().unwrap_or_default(),
        entry.status.to_string(),
        entry.origin.as_ref().map(TranslationOrigin::label).unwrap_or_default(),
    ]
}

/// Builds the error for a failed report write.
fn write_error(path: &Path, err: impl fmt::Display) -> CsvStoreError {
    CsvStoreError::Io(format!("write {}: {err}", path.display()))
}

/// Returns `None` for an empty field.
fn non_empty(field: &str) -> Option<&str> {
    if field.is_empty() { None } else { Some(field) }
}

/// Rejects report names that would escape the reports directory.
fn validate_report_name(report: &str) -> Result<(), CsvStoreError> {
    let valid = !report.is_empty()
        && report.len() <= MAX_REPORT_NAME_LENGTH
        && report != "."
        && report != ".."
        && report.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'));
    if valid { Ok(()) } else { Err(CsvStoreError::Invalid(format!("invalid report name `{report}`"))) }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
