use chrono::{DateTime, NaiveDate};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde_json::Value;

use crate::config::FieldBindings;

const ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
}

impl Project {
    /// Projects opaque host items through the configured bindings. Items
    /// without an id get a synthetic positional one so every row stays
    /// addressable; a missing name falls back to a placeholder.
    pub fn from_items(items: &[Value], bindings: &FieldBindings) -> Vec<Project> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| Project {
                id: string_field(item, &bindings.project_id)
                    .unwrap_or_else(|| format!("project-{index}")),
                name: string_field(item, &bindings.project_name)
                    .unwrap_or_else(|| "Unnamed Project".to_string()),
            })
            .collect()
    }
}

/// One normalized timesheet record: hours logged by one project on one day.
/// Unresolvable fields stay `None` instead of the record being dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetEntry {
    pub project_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub hours: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct EntryIndex {
    entries: Vec<SheetEntry>,
}

impl EntryIndex {
    pub fn from_items(items: &[Value], bindings: &FieldBindings) -> Self {
        let entries = items
            .iter()
            .map(|item| SheetEntry {
                project_id: string_field(item, &bindings.entry_project_id),
                date: item.get(&bindings.entry_date).and_then(parse_day),
                hours: item.get(&bindings.entry_hours).and_then(parse_hours),
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[SheetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hours for one cell at day granularity. Only the first matching entry
    /// counts when duplicates exist; no entry (or an entry without numeric
    /// hours) renders blank.
    pub fn hours_at(&self, project_id: &str, date: NaiveDate) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| {
                entry.project_id.as_deref() == Some(project_id) && entry.date == Some(date)
            })
            .and_then(|entry| entry.hours)
    }

    /// Sum over every entry of the project, independent of the visible range.
    pub fn row_total(&self, project_id: &str) -> f64 {
        self.entries
            .iter()
            .filter(|entry| entry.project_id.as_deref() == Some(project_id))
            .map(numeric_hours)
            .sum()
    }

    /// Sum over every entry on the day, independent of project.
    pub fn column_total(&self, date: NaiveDate) -> f64 {
        self.entries
            .iter()
            .filter(|entry| entry.date == Some(date))
            .map(numeric_hours)
            .sum()
    }

    pub fn grand_total(&self) -> f64 {
        self.entries.iter().map(numeric_hours).sum()
    }
}

fn numeric_hours(entry: &SheetEntry) -> f64 {
    entry.hours.unwrap_or(0.0)
}

fn string_field(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Accepts RFC 3339 timestamps (time of day dropped), plain `YYYY-MM-DD`
/// strings, and epoch-millisecond numbers.
fn parse_day(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(text) => {
            if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
                return Some(timestamp.date_naive());
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
        }
        Value::Number(number) => {
            let millis = number.as_i64()?;
            DateTime::from_timestamp_millis(millis).map(|timestamp| timestamp.date_naive())
        }
        _ => None,
    }
}

fn parse_hours(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}
