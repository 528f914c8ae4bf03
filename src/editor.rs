use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::{Value, json};

use crate::config::{CommitMode, FieldBindings, GridOptions};
use crate::domain::{EntryIndex, Project};
use crate::host::{EntrySource, HostError, ProjectAction, RecordHost};

/// Identity of one grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub project_id: String,
    pub date: NaiveDate,
}

impl CellKey {
    pub fn new(project_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            project_id: project_id.into(),
            date,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// The chain ran to completion (the action may have been unavailable).
    Saved,
    /// Nothing was attempted: zero/unparsable input, no draft, read-only
    /// grid, unknown project, or missing helper bindings.
    Skipped,
    /// A chain step failed; the draft is gone and nothing is retried.
    Failed(String),
}

/// Transient per-cell edit state. Drafts exist only between the first
/// keystroke and the commit (or cancel) and always win over the committed
/// value for display; aggregates never read them.
#[derive(Debug, Default)]
pub struct CellEditor {
    drafts: HashMap<CellKey, String>,
}

impl CellEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self, key: &CellKey) -> Option<&str> {
        self.drafts.get(key).map(String::as_str)
    }

    pub fn has_draft(&self, key: &CellKey) -> bool {
        self.drafts.contains_key(key)
    }

    /// Replaces the whole draft text, as a host text field would on change.
    pub fn update(&mut self, key: CellKey, text: String) {
        self.drafts.insert(key, text);
    }

    pub fn push_char(&mut self, key: &CellKey, value: char) {
        self.drafts.entry(key.clone()).or_default().push(value);
    }

    pub fn pop_char(&mut self, key: &CellKey) {
        if let Some(draft) = self.drafts.get_mut(key) {
            draft.pop();
        }
    }

    pub fn cancel(&mut self, key: &CellKey) {
        self.drafts.remove(key);
    }

    /// Draft text when present, else the committed cell value, else blank.
    pub fn display_value(&self, key: &CellKey, index: &EntryIndex) -> String {
        if let Some(draft) = self.draft(key) {
            return draft.to_string();
        }
        index
            .hours_at(&key.project_id, key.date)
            .map(|hours| hours.to_string())
            .unwrap_or_default()
    }

    /// Reconciles the cell's draft into the host. Unparsable input counts as
    /// zero, and a zero is never written. Every path removes the draft and
    /// leaves the cell idle; failures are reported in the outcome only.
    pub fn commit<H>(
        &mut self,
        key: &CellKey,
        host: &mut H,
        options: &GridOptions,
        bindings: &FieldBindings,
        projects: &[Project],
    ) -> CommitOutcome
    where
        H: RecordHost + ProjectAction + EntrySource,
    {
        if !options.editable {
            self.drafts.remove(key);
            return CommitOutcome::Skipped;
        }
        let Some(raw) = self.drafts.remove(key) else {
            return CommitOutcome::Skipped;
        };
        let hours = raw.trim().parse::<f64>().unwrap_or(0.0);
        if hours == 0.0 {
            return CommitOutcome::Skipped;
        }
        let Some(project) = projects.iter().find(|project| project.id == key.project_id) else {
            return CommitOutcome::Skipped;
        };
        if options.commit_mode == CommitMode::HelperRecord && bindings.helper().is_none() {
            return CommitOutcome::Skipped;
        }

        match run_chain(host, options.commit_mode, bindings, project, key.date, hours) {
            Ok(()) => CommitOutcome::Saved,
            Err(err) => CommitOutcome::Failed(err.to_string()),
        }
    }
}

/// The ordered persistence chain: stage a helper record (helper-record mode),
/// then invoke the project's bound action and ask the entry source to reload.
/// The reload only happens after a successful action execution; an
/// unavailable action ends the chain silently.
fn run_chain<H>(
    host: &mut H,
    mode: CommitMode,
    bindings: &FieldBindings,
    project: &Project,
    date: NaiveDate,
    hours: f64,
) -> Result<(), HostError>
where
    H: RecordHost + ProjectAction + EntrySource,
{
    if mode == CommitMode::HelperRecord {
        // Checked by the caller before the chain starts.
        let Some(helper) = bindings.helper() else {
            return Ok(());
        };
        let mut staged = host.create(helper.entity)?;
        host.set_field(
            &mut staged,
            helper.date,
            json!(date.format("%Y-%m-%d").to_string()),
        );
        host.set_field(&mut staged, helper.hours, json!(hours));
        host.set_field(
            &mut staged,
            helper.project_id,
            Value::String(project.id.clone()),
        );
        host.commit(staged)?;
    }

    if !host.can_execute(project) {
        return Ok(());
    }
    host.execute(project)?;
    host.reload()
}
