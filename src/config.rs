use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which persistence flow a committed cell runs. The helper-record flow
/// stages an intermediate record before invoking the project action; the
/// action-only flow invokes the bound action directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    #[default]
    HelperRecord,
    ActionOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    pub start_date: Option<NaiveDate>,
    pub days: u32,
    pub show_weekends: bool,
    pub show_totals: bool,
    pub show_daily_totals: bool,
    pub editable: bool,
    pub commit_mode: CommitMode,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            start_date: None,
            days: 7,
            show_weekends: true,
            show_totals: true,
            show_daily_totals: true,
            editable: true,
            commit_mode: CommitMode::HelperRecord,
        }
    }
}

/// Key names used to read opaque host items and to write helper records.
/// The helper_* names are optional; a commit is silently skipped when any of
/// them is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldBindings {
    pub project_id: String,
    pub project_name: String,
    pub entry_project_id: String,
    pub entry_date: String,
    pub entry_hours: String,
    pub helper_entity: Option<String>,
    pub helper_date: Option<String>,
    pub helper_hours: Option<String>,
    pub helper_project_id: Option<String>,
}

impl Default for FieldBindings {
    fn default() -> Self {
        Self {
            project_id: "id".to_string(),
            project_name: "name".to_string(),
            entry_project_id: "project_id".to_string(),
            entry_date: "date".to_string(),
            entry_hours: "hours".to_string(),
            helper_entity: Some("TimesheetEntry".to_string()),
            helper_date: Some("date".to_string()),
            helper_hours: Some("hours".to_string()),
            helper_project_id: Some("project_id".to_string()),
        }
    }
}

impl FieldBindings {
    /// All four helper bindings, or None when any of them is unset.
    pub fn helper(&self) -> Option<HelperBindings<'_>> {
        Some(HelperBindings {
            entity: self.helper_entity.as_deref()?,
            date: self.helper_date.as_deref()?,
            hours: self.helper_hours.as_deref()?,
            project_id: self.helper_project_id.as_deref()?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HelperBindings<'a> {
    pub entity: &'a str,
    pub date: &'a str,
    pub hours: &'a str,
    pub project_id: &'a str,
}

#[cfg(test)]
mod tests {
    use super::{FieldBindings, GridOptions};

    #[test]
    fn options_default_to_an_editable_seven_day_grid() {
        let options = GridOptions::default();
        assert_eq!(options.days, 7);
        assert!(options.show_weekends);
        assert!(options.editable);
        assert!(options.start_date.is_none());
    }

    #[test]
    fn helper_bindings_require_all_four_names() {
        let mut bindings = FieldBindings::default();
        assert!(bindings.helper().is_some());

        bindings.helper_hours = None;
        assert!(bindings.helper().is_none());
    }

    #[test]
    fn bindings_deserialize_from_a_partial_table() {
        let bindings: FieldBindings =
            toml::from_str("entry_hours = \"spent\"").expect("bindings should parse");
        assert_eq!(bindings.entry_hours, "spent");
        assert_eq!(bindings.entry_date, "date");
    }
}
