//! crates/pomodoro_core/src/store.rs
//!
//! The Task/Project store. Owns project and task lifecycles on top of an injected
//! `StateRepository`.
//!
//! Every mutation runs as one load-mutate-save unit behind a single async lock, so the
//! repository only ever sees whole documents and a failed save leaves nothing half applied.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::{clamp_estimate, NewTask, Project, StoreState, Task, TaskPatch};
use crate::ports::{PortError, PortResult, StateRepository};

pub struct TaskStore {
    repo: Arc<dyn StateRepository>,
    // Serializes load-mutate-save cycles.
    lock: Mutex<()>,
}

impl TaskStore {
    /// Creates a store over the given repository.
    pub fn new(repo: Arc<dyn StateRepository>) -> Self {
        Self {
            repo,
            lock: Mutex::new(()),
        }
    }

    async fn persist(&self, state: &StoreState) -> PortResult<()> {
        self.repo.save(state).await.map_err(|e| {
            error!("Failed to save store state: {}", e);
            e
        })
    }

    //=====================================================================================
    // Projects
    //=====================================================================================

    /// All projects in insertion order.
    pub async fn list_projects(&self) -> PortResult<Vec<Project>> {
        let _guard = self.lock.lock().await;
        Ok(self.repo.load().await?.projects)
    }

    /// Creates a project with the trimmed `name`.
    pub async fn create_project(&self, name: &str) -> PortResult<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PortError::Validation("name is required".to_string()));
        }

        let _guard = self.lock.lock().await;
        let mut state = self.repo.load().await?;
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now().timestamp_millis(),
        };
        state.projects.push(project.clone());
        self.persist(&state).await?;

        info!(project_id = %project.id, "Project created.");
        Ok(project)
    }

    /// Deletes a project together with every task that references it.
    ///
    /// Returns the ids of the tasks removed by the cascade. Unknown ids are a no-op.
    pub async fn delete_project(&self, id: &str) -> PortResult<Vec<String>> {
        let _guard = self.lock.lock().await;
        let mut state = self.repo.load().await?;

        let projects_before = state.projects.len();
        state.projects.retain(|p| p.id != id);
        let (removed, kept): (Vec<Task>, Vec<Task>) =
            state.tasks.into_iter().partition(|t| t.project_id == id);
        state.tasks = kept;

        if projects_before == state.projects.len() && removed.is_empty() {
            debug!(project_id = %id, "Delete of unknown project ignored.");
            return Ok(Vec::new());
        }
        self.persist(&state).await?;

        info!(
            project_id = %id,
            cascaded_tasks = removed.len(),
            "Project deleted."
        );
        Ok(removed.into_iter().map(|t| t.id).collect())
    }

    //=====================================================================================
    // Tasks
    //=====================================================================================

    /// Tasks in insertion order, optionally restricted to one project.
    pub async fn list_tasks(&self, project_id: Option<&str>) -> PortResult<Vec<Task>> {
        let _guard = self.lock.lock().await;
        let tasks = self.repo.load().await?.tasks;
        Ok(match project_id {
            Some(pid) => tasks.into_iter().filter(|t| t.project_id == pid).collect(),
            None => tasks,
        })
    }

    /// Looks up a single task.
    pub async fn get_task(&self, id: &str) -> PortResult<Task> {
        let _guard = self.lock.lock().await;
        self.repo
            .load()
            .await?
            .tasks
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| PortError::NotFound(format!("task {}", id)))
    }

    /// Creates a task. The project id is not checked against existing projects.
    pub async fn create_task(&self, new_task: NewTask) -> PortResult<Task> {
        let project_id = new_task.project_id.trim();
        let title = new_task.title.trim();
        if project_id.is_empty() {
            return Err(PortError::Validation("projectId required".to_string()));
        }
        if title.is_empty() {
            return Err(PortError::Validation("title required".to_string()));
        }

        let _guard = self.lock.lock().await;
        let mut state = self.repo.load().await?;
        if !state.projects.iter().any(|p| p.id == project_id) {
            warn!(project_id = %project_id, "Creating task for a project that does not exist.");
        }

        let task = Task {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            title: title.to_string(),
            done: false,
            pomodoros: 0,
            estimate: clamp_estimate(new_task.estimate),
            created_at: Utc::now().timestamp_millis(),
        };
        state.tasks.push(task.clone());
        self.persist(&state).await?;

        info!(task_id = %task.id, project_id = %task.project_id, "Task created.");
        Ok(task)
    }

    /// Applies the fields present in `patch`. A title that trims to empty is ignored.
    pub async fn update_task(&self, id: &str, patch: TaskPatch) -> PortResult<Task> {
        let _guard = self.lock.lock().await;
        let mut state = self.repo.load().await?;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| PortError::NotFound(format!("task {}", id)))?;

        if let Some(done) = patch.done {
            task.done = done;
        }
        if let Some(title) = patch.title.as_deref().map(str::trim) {
            if !title.is_empty() {
                task.title = title.to_string();
            }
        }
        if let Some(pomodoros) = patch.pomodoros {
            task.pomodoros = pomodoros;
        }
        let updated = task.clone();
        self.persist(&state).await?;

        debug!(task_id = %id, "Task updated.");
        Ok(updated)
    }

    /// Credits one completed focus session to a task.
    ///
    /// The current count is read and incremented inside the same locked cycle.
    pub async fn record_pomodoro(&self, id: &str) -> PortResult<Task> {
        let _guard = self.lock.lock().await;
        let mut state = self.repo.load().await?;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| PortError::NotFound(format!("task {}", id)))?;
        task.pomodoros = task.pomodoros.saturating_add(1);
        let updated = task.clone();
        self.persist(&state).await?;

        info!(task_id = %id, pomodoros = updated.pomodoros, "Pomodoro recorded.");
        Ok(updated)
    }

    /// Deletes a task. Unknown ids are a no-op.
    pub async fn delete_task(&self, id: &str) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        let mut state = self.repo.load().await?;
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        if state.tasks.len() == before {
            debug!(task_id = %id, "Delete of unknown task ignored.");
            return Ok(());
        }
        self.persist(&state).await?;

        info!(task_id = %id, "Task deleted.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;

    fn store() -> (Arc<InMemoryRepository>, TaskStore) {
        let repo = Arc::new(InMemoryRepository::new());
        let store = TaskStore::new(repo.clone());
        (repo, store)
    }

    fn new_task(project_id: &str, title: &str, estimate: Option<i64>) -> NewTask {
        NewTask {
            project_id: project_id.to_string(),
            title: title.to_string(),
            estimate,
        }
    }

    #[tokio::test]
    async fn blank_project_names_are_rejected() {
        let (repo, store) = store();
        for name in ["", "   ", "\t\n"] {
            let err = store.create_project(name).await.unwrap_err();
            assert!(matches!(err, PortError::Validation(_)));
        }
        assert!(store.list_projects().await.unwrap().is_empty());
        assert_eq!(repo.save_count(), 0);
    }

    #[tokio::test]
    async fn created_project_is_trimmed_and_listed_once() {
        let (_, store) = store();
        let first = store.create_project("  Thesis  ").await.unwrap();
        let second = store.create_project("Garden").await.unwrap();

        assert_eq!(first.name, "Thesis");
        assert_ne!(first.id, second.id);

        let projects = store.list_projects().await.unwrap();
        assert_eq!(projects, vec![first, second]);
    }

    #[tokio::test]
    async fn deleting_a_project_cascades_to_its_tasks_only() {
        let (_, store) = store();
        let p = store.create_project("P").await.unwrap();
        let q = store.create_project("Q").await.unwrap();
        let t1 = store.create_task(new_task(&p.id, "one", None)).await.unwrap();
        let t2 = store.create_task(new_task(&p.id, "two", None)).await.unwrap();
        let t3 = store.create_task(new_task(&q.id, "three", None)).await.unwrap();

        let removed = store.delete_project(&p.id).await.unwrap();
        assert_eq!(removed, vec![t1.id, t2.id]);

        assert_eq!(store.list_tasks(None).await.unwrap(), vec![t3]);
        assert_eq!(store.list_projects().await.unwrap(), vec![q]);
    }

    #[tokio::test]
    async fn deleting_unknown_ids_is_a_no_op() {
        let (repo, store) = store();
        let p = store.create_project("P").await.unwrap();
        let t = store.create_task(new_task(&p.id, "t", None)).await.unwrap();
        let saves = repo.save_count();

        store.delete_task(&t.id).await.unwrap();
        store.delete_task(&t.id).await.unwrap();
        store.delete_project(&p.id).await.unwrap();
        assert!(store.delete_project(&p.id).await.unwrap().is_empty());
        assert!(store.delete_project("never-existed").await.unwrap().is_empty());

        assert_eq!(repo.save_count(), saves + 2);
    }

    #[tokio::test]
    async fn task_creation_validates_and_applies_defaults() {
        let (_, store) = store();
        let err = store.create_task(new_task("  ", "x", None)).await.unwrap_err();
        assert!(matches!(err, PortError::Validation(ref m) if m == "projectId required"));
        let err = store.create_task(new_task("p", "  ", None)).await.unwrap_err();
        assert!(matches!(err, PortError::Validation(ref m) if m == "title required"));

        let task = store.create_task(new_task(" p ", " write ", None)).await.unwrap();
        assert_eq!(task.project_id, "p");
        assert_eq!(task.title, "write");
        assert!(!task.done);
        assert_eq!(task.pomodoros, 0);
        assert_eq!(task.estimate, 1);
    }

    #[tokio::test]
    async fn task_estimate_is_clamped() {
        let (_, store) = store();
        for (raw, expected) in [(Some(0), 1), (Some(15), 12), (None, 1), (Some(5), 5)] {
            let task = store.create_task(new_task("p", "x", raw)).await.unwrap();
            assert_eq!(task.estimate, expected, "estimate for {:?}", raw);
        }
    }

    #[tokio::test]
    async fn task_for_unknown_project_is_still_created() {
        let (_, store) = store();
        let task = store.create_task(new_task("ghost", "orphan", None)).await.unwrap();
        assert_eq!(store.list_tasks(Some("ghost")).await.unwrap(), vec![task]);
    }

    #[tokio::test]
    async fn list_tasks_filters_by_project() {
        let (_, store) = store();
        let a = store.create_task(new_task("a", "1", None)).await.unwrap();
        let b = store.create_task(new_task("b", "2", None)).await.unwrap();
        assert_eq!(store.list_tasks(Some("a")).await.unwrap(), vec![a.clone()]);
        assert_eq!(store.list_tasks(Some("b")).await.unwrap(), vec![b.clone()]);
        assert_eq!(store.list_tasks(None).await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let (_, store) = store();
        let task = store.create_task(new_task("p", "draft", Some(3))).await.unwrap();

        let updated = store
            .update_task(
                &task.id,
                TaskPatch {
                    pomodoros: Some(3),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.pomodoros, 3);
        assert_eq!(updated.title, "draft");
        assert!(!updated.done);

        let updated = store
            .update_task(
                &task.id,
                TaskPatch {
                    done: Some(true),
                    title: Some("   ".to_string()),
                    pomodoros: None,
                },
            )
            .await
            .unwrap();
        assert!(updated.done);
        assert_eq!(updated.title, "draft");
        assert_eq!(updated.pomodoros, 3);

        let updated = store
            .update_task(
                &task.id,
                TaskPatch {
                    title: Some("  final ".to_string()),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "final");
        assert_eq!(store.get_task(&task.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn update_of_unknown_task_is_not_found() {
        let (_, store) = store();
        let err = store
            .update_task("missing", TaskPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn record_pomodoro_increments_by_one() {
        let (_, store) = store();
        let task = store.create_task(new_task("p", "t", None)).await.unwrap();
        store
            .update_task(
                &task.id,
                TaskPatch {
                    pomodoros: Some(2),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(store.record_pomodoro(&task.id).await.unwrap().pomodoros, 3);
        assert_eq!(store.record_pomodoro(&task.id).await.unwrap().pomodoros, 4);
        assert!(matches!(
            store.record_pomodoro("missing").await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_save_surfaces_io_error_and_changes_nothing() {
        let (repo, store) = store();
        let p = store.create_project("P").await.unwrap();
        let t = store.create_task(new_task(&p.id, "t", None)).await.unwrap();

        repo.set_fail_saves(true);
        assert!(matches!(
            store.create_project("Q").await,
            Err(PortError::Io(_))
        ));
        assert!(matches!(
            store.delete_project(&p.id).await,
            Err(PortError::Io(_))
        ));
        assert!(matches!(
            store.record_pomodoro(&t.id).await,
            Err(PortError::Io(_))
        ));
        repo.set_fail_saves(false);

        assert_eq!(store.list_projects().await.unwrap(), vec![p]);
        assert_eq!(store.list_tasks(None).await.unwrap(), vec![t]);
    }
}
