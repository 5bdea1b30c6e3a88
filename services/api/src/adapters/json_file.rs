//! services/api/src/adapters/json_file.rs
//!
//! This module contains the flat-file adapter, the concrete implementation of the
//! `StateRepository` port from the `core` crate. The whole document lives in one
//! pretty-printed JSON file with a `projects` and a `tasks` collection.

use async_trait::async_trait;
use pomodoro_core::domain::{Project, StoreState, Task, MIN_ESTIMATE};
use pomodoro_core::ports::{PortError, PortResult, StateRepository};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A repository adapter that implements the `StateRepository` port over a JSON file.
#[derive(Clone, Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    /// Creates a new `JsonFileRepository`. Nothing is touched on disk until `init`/`save`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes an empty document if the file does not exist yet.
    pub async fn init(&self) -> PortResult<()> {
        match fs::metadata(&self.path).await {
            Ok(_) => {
                debug!(path = %self.path.display(), "Using existing document.");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "Creating empty document.");
                self.save(&StoreState::default()).await
            }
            Err(e) => Err(io_error(&self.path, e)),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "db.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn io_error(path: &Path, e: std::io::Error) -> PortError {
    PortError::Io(format!("{}: {}", path.display(), e))
}

//=========================================================================================
// "Impure" Document Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize, Default)]
struct DocumentRecord {
    #[serde(default)]
    projects: Vec<ProjectRecord>,
    #[serde(default)]
    tasks: Vec<TaskRecord>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRecord {
    id: String,
    name: String,
    #[serde(default)]
    created_at: i64,
}
impl ProjectRecord {
    fn to_domain(self) -> Project {
        Project {
            id: self.id,
            name: self.name,
            created_at: self.created_at,
        }
    }

    fn from_domain(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            created_at: project.created_at,
        }
    }
}

fn default_estimate() -> u32 {
    MIN_ESTIMATE
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: String,
    project_id: String,
    title: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    pomodoros: u32,
    #[serde(default = "default_estimate")]
    estimate: u32,
    #[serde(default)]
    created_at: i64,
}
impl TaskRecord {
    fn to_domain(self) -> Task {
        Task {
            id: self.id,
            project_id: self.project_id,
            title: self.title,
            done: self.done,
            pomodoros: self.pomodoros,
            estimate: self.estimate,
            created_at: self.created_at,
        }
    }

    fn from_domain(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            project_id: task.project_id.clone(),
            title: task.title.clone(),
            done: task.done,
            pomodoros: task.pomodoros,
            estimate: task.estimate,
            created_at: task.created_at,
        }
    }
}

//=========================================================================================
// `StateRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl StateRepository for JsonFileRepository {
    async fn load(&self) -> PortResult<StoreState> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoreState::default()),
            Err(e) => return Err(io_error(&self.path, e)),
        };

        let document: DocumentRecord = serde_json::from_slice(&raw).map_err(|e| {
            PortError::Io(format!("{} is not a valid document: {}", self.path.display(), e))
        })?;
        Ok(StoreState {
            projects: document
                .projects
                .into_iter()
                .map(ProjectRecord::to_domain)
                .collect(),
            tasks: document.tasks.into_iter().map(TaskRecord::to_domain).collect(),
        })
    }

    /// Writes a sibling temp file and renames it over the document, so a failed write
    /// never leaves a truncated document behind.
    async fn save(&self, state: &StoreState) -> PortResult<()> {
        let document = DocumentRecord {
            projects: state.projects.iter().map(ProjectRecord::from_domain).collect(),
            tasks: state.tasks.iter().map(TaskRecord::from_domain).collect(),
        };
        let json = serde_json::to_vec_pretty(&document)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode document: {}", e)))?;

        let temp_path = self.temp_path();
        fs::write(&temp_path, json)
            .await
            .map_err(|e| io_error(&temp_path, e))?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;
        Ok(())
    }
}
