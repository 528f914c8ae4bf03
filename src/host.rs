use std::fmt::{Display, Formatter};

use serde_json::Value;

use crate::domain::Project;

/// Availability of a host collection. A loading source renders as a
/// placeholder, never as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Loading,
    Available,
}

#[derive(Debug)]
pub enum HostError {
    Create(String),
    Commit(String),
    Action(String),
    Reload(String),
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HostError::Create(message) => write!(f, "failed to create record: {message}"),
            HostError::Commit(message) => write!(f, "failed to commit record: {message}"),
            HostError::Action(message) => write!(f, "cell action failed: {message}"),
            HostError::Reload(message) => write!(f, "failed to reload entries: {message}"),
        }
    }
}

impl std::error::Error for HostError {}

pub trait ProjectSource {
    fn project_status(&self) -> SourceStatus;
    fn project_items(&self) -> Vec<Value>;
}

pub trait EntrySource {
    fn entry_status(&self) -> SourceStatus;
    fn entry_items(&self) -> Vec<Value>;
    /// Re-fetches the backing collection and republishes `entry_items`.
    fn reload(&mut self) -> Result<(), HostError>;
}

/// Staged-record persistence. `Staged` is an opaque handle; fields set on it
/// are not visible to the sources until the record is committed and the
/// host's own flow materializes it.
pub trait RecordHost {
    type Staged;

    fn create(&mut self, entity: &str) -> Result<Self::Staged, HostError>;
    fn set_field(&mut self, staged: &mut Self::Staged, field: &str, value: Value);
    fn commit(&mut self, staged: Self::Staged) -> Result<(), HostError>;
}

/// An action bound to a project's backing object. `execute` is only invoked
/// when `can_execute` reports true; otherwise the caller no-ops silently.
pub trait ProjectAction {
    fn can_execute(&self, project: &Project) -> bool;
    fn execute(&mut self, project: &Project) -> Result<(), HostError>;
}
