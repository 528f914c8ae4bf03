use std::fmt::{Display, Formatter};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{FieldBindings, GridOptions};
use crate::domain::{Project, generate_id};
use crate::host::{EntrySource, HostError, ProjectAction, ProjectSource, RecordHost, SourceStatus};

const ENTRIES_MARKER: &str = "\n=== ENTRIES ===\n";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    TomlDecode(toml::de::Error),
    TomlEncode(toml::ser::Error),
    JsonDecode(serde_json::Error),
    JsonEncode(serde_json::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::TomlDecode(err) => write!(f, "failed to parse TOML header: {err}"),
            StorageError::TomlEncode(err) => write!(f, "failed to encode TOML header: {err}"),
            StorageError::JsonDecode(err) => write!(f, "failed to parse JSONL entry: {err}"),
            StorageError::JsonEncode(err) => write!(f, "failed to encode JSONL entry: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
}

/// TOML half of a sheet file: schema metadata, grid options, bindings and the
/// project list. The entry log lives after the marker as JSONL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetHeader {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub grid: GridOptions,
    #[serde(default)]
    pub bindings: FieldBindings,
    #[serde(default)]
    pub projects: Vec<ProjectRow>,
}

impl SheetHeader {
    pub fn new() -> Self {
        Self {
            schema_version: 1,
            created_at: Utc::now(),
            grid: GridOptions::default(),
            bindings: FieldBindings::default(),
            projects: Vec::new(),
        }
    }
}

/// File-backed host: implements the full host contract against one sheet
/// file. Committed helper records sit in `pending` until the project action
/// absorbs them into the entry log; only `execute` and `save` touch disk.
#[derive(Debug)]
pub struct SheetFile {
    path: PathBuf,
    pub header: SheetHeader,
    entries: Vec<Value>,
    pending: Vec<StagedRecord>,
    state: SourceStatus,
}

#[derive(Debug, Clone)]
pub struct StagedRecord {
    id: String,
    entity: String,
    pub fields: Map<String, Value>,
}

impl SheetFile {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let raw = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::fresh(path)),
            Err(err) => return Err(StorageError::Io(err)),
        };

        if raw.trim().is_empty() {
            return Ok(Self::fresh(path));
        }

        let (header_blob, entries_blob) = if let Some((header, entries)) = raw.split_once(ENTRIES_MARKER)
        {
            (header, entries)
        } else {
            (raw.as_str(), "")
        };

        let header: SheetHeader = toml::from_str(header_blob).map_err(StorageError::TomlDecode)?;
        let mut entries = Vec::new();
        for line in entries_blob.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(line).map_err(StorageError::JsonDecode)?);
        }

        Ok(Self {
            path: path.to_path_buf(),
            header,
            entries,
            pending: Vec::new(),
            state: SourceStatus::Available,
        })
    }

    fn fresh(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            header: SheetHeader::new(),
            entries: Vec::new(),
            pending: Vec::new(),
            state: SourceStatus::Available,
        }
    }

    pub fn save(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(StorageError::Io)?;
            }
        }

        let header = toml::to_string_pretty(&self.header).map_err(StorageError::TomlEncode)?;
        let mut file = fs::File::create(&self.path).map_err(StorageError::Io)?;
        file.write_all(header.as_bytes()).map_err(StorageError::Io)?;
        file.write_all(ENTRIES_MARKER.as_bytes())
            .map_err(StorageError::Io)?;

        for entry in &self.entries {
            let line = serde_json::to_string(entry).map_err(StorageError::JsonEncode)?;
            file.write_all(line.as_bytes()).map_err(StorageError::Io)?;
            file.write_all(b"\n").map_err(StorageError::Io)?;
        }

        Ok(())
    }

    pub fn add_project(&mut self, name: String) -> String {
        let id = generate_id();
        self.header.projects.push(ProjectRow {
            id: id.clone(),
            name,
        });
        id
    }
}

impl ProjectSource for SheetFile {
    fn project_status(&self) -> SourceStatus {
        self.state
    }

    fn project_items(&self) -> Vec<Value> {
        self.header
            .projects
            .iter()
            .map(|row| serde_json::to_value(row).unwrap_or(Value::Null))
            .collect()
    }
}

impl EntrySource for SheetFile {
    fn entry_status(&self) -> SourceStatus {
        self.state
    }

    fn entry_items(&self) -> Vec<Value> {
        self.entries.clone()
    }

    /// Re-reads the file. A failed re-read leaves the sources reporting
    /// not-ready until a later reload succeeds.
    fn reload(&mut self) -> Result<(), HostError> {
        match SheetFile::open(&self.path) {
            Ok(fresh) => {
                self.header = fresh.header;
                self.entries = fresh.entries;
                self.state = SourceStatus::Available;
                Ok(())
            }
            Err(err) => {
                self.state = SourceStatus::Loading;
                Err(HostError::Reload(err.to_string()))
            }
        }
    }
}

impl RecordHost for SheetFile {
    type Staged = StagedRecord;

    fn create(&mut self, entity: &str) -> Result<StagedRecord, HostError> {
        if entity.trim().is_empty() {
            return Err(HostError::Create("entity name is empty".to_string()));
        }
        Ok(StagedRecord {
            id: generate_id(),
            entity: entity.to_string(),
            fields: Map::new(),
        })
    }

    fn set_field(&mut self, staged: &mut StagedRecord, field: &str, value: Value) {
        staged.fields.insert(field.to_string(), value);
    }

    fn commit(&mut self, staged: StagedRecord) -> Result<(), HostError> {
        if staged.fields.is_empty() {
            return Err(HostError::Commit("record has no fields set".to_string()));
        }
        self.pending.push(staged);
        Ok(())
    }
}

impl ProjectAction for SheetFile {
    fn can_execute(&self, project: &Project) -> bool {
        self.header.projects.iter().any(|row| row.id == project.id)
    }

    /// Absorbs the project's pending helper records into the entry log and
    /// saves the file. Records for other projects or entities stay pending.
    fn execute(&mut self, project: &Project) -> Result<(), HostError> {
        let helper_entity = self.header.bindings.helper_entity.clone();
        let project_field = self.header.bindings.helper_project_id.clone();
        let mut absorbed = Vec::new();
        let mut kept = Vec::new();
        for staged in self.pending.drain(..) {
            let matches_entity = helper_entity
                .as_deref()
                .is_none_or(|entity| staged.entity == entity);
            let matches_project = match &project_field {
                Some(field) => {
                    staged.fields.get(field).and_then(Value::as_str) == Some(project.id.as_str())
                }
                None => true,
            };
            if matches_entity && matches_project {
                absorbed.push(staged);
            } else {
                kept.push(staged);
            }
        }
        self.pending = kept;

        if absorbed.is_empty() {
            return Ok(());
        }
        for staged in absorbed {
            let StagedRecord { id, mut fields, .. } = staged;
            fields.entry("id".to_string()).or_insert(Value::String(id));
            self.entries.push(Value::Object(fields));
        }
        self.save().map_err(|err| HostError::Action(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use chrono::NaiveDate;
    use serde_json::json;

    use crate::domain::{EntryIndex, Project};
    use crate::host::{EntrySource, ProjectAction, ProjectSource, RecordHost, SourceStatus};

    use super::SheetFile;

    fn temp_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", name, std::process::id()));
        path
    }

    fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("test date should be valid")
    }

    #[test]
    fn missing_file_opens_as_a_fresh_sheet() {
        let path = temp_file("hourgrid_fresh.sheet");
        let sheet = SheetFile::open(&path).expect("open should succeed");
        assert!(sheet.header.projects.is_empty());
        assert!(sheet.entry_items().is_empty());
    }

    #[test]
    fn round_trips_header_and_entry_log() {
        let path = temp_file("hourgrid_roundtrip.sheet");
        let mut sheet = SheetFile::open(&path).expect("open should succeed");
        let project_id = sheet.add_project("Apollo".to_string());
        sheet.header.grid.days = 5;
        sheet
            .entries
            .push(json!({"project_id": project_id, "date": "2024-01-01", "hours": 8.0}));
        sheet.save().expect("save should succeed");

        let loaded = SheetFile::open(&path).expect("reopen should succeed");
        assert_eq!(loaded.header.projects.len(), 1);
        assert_eq!(loaded.header.grid.days, 5);
        assert_eq!(loaded.entry_items().len(), 1);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn commit_chain_makes_logged_hours_visible_after_action_and_reload() {
        let path = temp_file("hourgrid_chain.sheet");
        let mut sheet = SheetFile::open(&path).expect("open should succeed");
        let project_id = sheet.add_project("Apollo".to_string());
        sheet.save().expect("save should succeed");
        let project = Project {
            id: project_id.clone(),
            name: "Apollo".to_string(),
        };

        let mut staged = sheet.create("TimesheetEntry").expect("create should succeed");
        sheet.set_field(&mut staged, "date", json!("2024-01-02"));
        sheet.set_field(&mut staged, "hours", json!(7.5));
        sheet.set_field(&mut staged, "project_id", json!(project_id.clone()));
        sheet.commit(staged).expect("commit should succeed");

        // Pending records are invisible to the source until the action runs.
        assert!(sheet.entry_items().is_empty());
        assert_eq!(sheet.pending.len(), 1);

        assert!(sheet.can_execute(&project));
        sheet.execute(&project).expect("action should succeed");
        sheet.reload().expect("reload should succeed");
        assert!(sheet.pending.is_empty());

        let index = EntryIndex::from_items(&sheet.entry_items(), &sheet.header.bindings);
        assert_eq!(index.hours_at(&project_id, day(2024, 1, 2)), Some(7.5));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn action_leaves_other_projects_records_pending() {
        let path = temp_file("hourgrid_pending.sheet");
        let mut sheet = SheetFile::open(&path).expect("open should succeed");
        let first = sheet.add_project("Apollo".to_string());
        let second = sheet.add_project("Hermes".to_string());
        sheet.save().expect("save should succeed");

        for id in [&first, &second] {
            let mut staged = sheet.create("TimesheetEntry").expect("create should succeed");
            sheet.set_field(&mut staged, "date", json!("2024-01-03"));
            sheet.set_field(&mut staged, "hours", json!(1.0));
            sheet.set_field(&mut staged, "project_id", json!(id));
            sheet.commit(staged).expect("commit should succeed");
        }

        let apollo = Project {
            id: first.clone(),
            name: "Apollo".to_string(),
        };
        sheet.execute(&apollo).expect("action should succeed");
        assert_eq!(sheet.entry_items().len(), 1);
        assert_eq!(sheet.pending.len(), 1);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn committing_an_empty_record_is_rejected() {
        let path = temp_file("hourgrid_empty_record.sheet");
        let mut sheet = SheetFile::open(&path).expect("open should succeed");
        let staged = sheet.create("TimesheetEntry").expect("create should succeed");
        assert!(sheet.commit(staged).is_err());
    }

    #[test]
    fn failed_reload_marks_the_sources_not_ready() {
        let path = temp_file("hourgrid_bad_reload.sheet");
        let mut sheet = SheetFile::open(&path).expect("open should succeed");
        assert_eq!(sheet.entry_status(), SourceStatus::Available);

        fs::write(&path, "this is not a sheet header").expect("write should succeed");
        assert!(sheet.reload().is_err());
        assert_eq!(sheet.entry_status(), SourceStatus::Loading);
        assert_eq!(sheet.project_status(), SourceStatus::Loading);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn project_items_expose_rows_under_the_default_bindings() {
        let path = temp_file("hourgrid_projects.sheet");
        let mut sheet = SheetFile::open(&path).expect("open should succeed");
        sheet.add_project("Apollo".to_string());

        let projects = Project::from_items(&sheet.project_items(), &sheet.header.bindings);
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Apollo");
    }
}
