//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use pomodoro_core::domain::{parse_leading_int, NewTask, Project, Task, TaskPatch, TimerSnapshot};
use pomodoro_core::ports::PortError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        list_projects_handler,
        create_project_handler,
        delete_project_handler,
        list_tasks_handler,
        create_task_handler,
        update_task_handler,
        delete_task_handler,
        timer_snapshot_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            ProjectResponse,
            TaskResponse,
            TimerSnapshotResponse,
            CreateProjectRequest,
            CreateTaskRequest,
            UpdateTaskRequest,
        )
    ),
    tags(
        (name = "Pomodoro API", description = "Projects, tasks and the focus timer.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    ok: bool,
}

/// Body of every 4xx/5xx response.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            name: project.name,
            created_at: project.created_at,
        }
    }
}

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub done: bool,
    pub pomodoros: u32,
    pub estimate: u32,
    pub created_at: i64,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            project_id: task.project_id,
            title: task.title,
            done: task.done,
            pomodoros: task.pomodoros,
            estimate: task.estimate,
            created_at: task.created_at,
        }
    }
}

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshotResponse {
    /// `focus`, `short` or `long`.
    pub mode: String,
    pub remaining_seconds: u32,
    pub running: bool,
    pub active_task_id: Option<String>,
    /// The countdown as `MM:SS`.
    pub display: String,
}

impl From<TimerSnapshot> for TimerSnapshotResponse {
    fn from(snapshot: TimerSnapshot) -> Self {
        Self {
            display: snapshot.display(),
            mode: snapshot.mode.to_string(),
            remaining_seconds: snapshot.remaining_seconds,
            running: snapshot.running,
            active_task_id: snapshot.active_task_id,
        }
    }
}

#[derive(Deserialize, Default, ToSchema)]
pub struct CreateProjectRequest {
    #[serde(default)]
    #[schema(value_type = String)]
    pub name: Value,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    #[schema(value_type = String)]
    pub project_id: Value,
    #[serde(default)]
    #[schema(value_type = String)]
    pub title: Value,
    /// Planned sessions; parsed like `parseInt` and clamped to 1..=12.
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub estimate: Option<Value>,
}

/// Fields of the wrong JSON type are ignored.
#[derive(Deserialize, Default, ToSchema)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    #[schema(value_type = Option<bool>)]
    pub done: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub title: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<u32>)]
    pub pomodoros: Option<Value>,
}

#[derive(Deserialize)]
pub struct ListTasksQuery {
    #[serde(rename = "projectId")]
    pub project_id: Option<String>,
}

//=========================================================================================
// Payload Helpers
//=========================================================================================

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn port_error(context: &str, e: PortError) -> HandlerError {
    let (status, message) = match e {
        PortError::Validation(message) => (StatusCode::BAD_REQUEST, message),
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        other => {
            error!("{}: {:?}", context, other);
            (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    };
    (status, Json(ErrorResponse { error: message }))
}

/// Parses a request body. A missing, malformed or non-object body reads as `{}`, so the
/// handler's own validation produces the `{"error": ...}` response.
fn json_body<T: DeserializeOwned + Default>(body: &Bytes) -> T {
    serde_json::from_slice::<Value>(body)
        .ok()
        .filter(Value::is_object)
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

/// Strings pass through; any other JSON type counts as empty.
fn text(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

fn estimate(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

fn task_patch(req: &UpdateTaskRequest) -> TaskPatch {
    TaskPatch {
        done: req.done.as_ref().and_then(Value::as_bool),
        title: req
            .title
            .as_ref()
            .and_then(Value::as_str)
            .map(str::to_string),
        pomodoros: req.pomodoros.as_ref().and_then(whole_count),
    }
}

/// A non-negative whole number that fits a `u32`; `3.0` counts, `3.5` does not.
fn whole_count(value: &Value) -> Option<u32> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(n) = n.as_u64() {
        return u32::try_from(n).ok();
    }
    n.as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
        .map(|f| f as u32)
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// List all projects in creation order.
#[utoipa::path(
    get,
    path = "/api/projects",
    responses(
        (status = 200, description = "All projects", body = [ProjectResponse]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_projects_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let projects = app_state
        .store
        .list_projects()
        .await
        .map_err(|e| port_error("Failed to list projects", e))?;
    Ok(Json(
        projects
            .into_iter()
            .map(ProjectResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Create a project.
#[utoipa::path(
    post,
    path = "/api/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Name is empty", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_project_handler(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, HandlerError> {
    let req: CreateProjectRequest = json_body(&body);
    let project = app_state
        .store
        .create_project(&text(&req.name))
        .await
        .map_err(|e| port_error("Failed to create project", e))?;
    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}

/// Delete a project and all of its tasks.
#[utoipa::path(
    delete,
    path = "/api/projects/{id}",
    params(("id" = String, Path, description = "Project id")),
    responses(
        (status = 204, description = "Deleted, or never existed"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn delete_project_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, HandlerError> {
    let removed = app_state
        .store
        .delete_project(&id)
        .await
        .map_err(|e| port_error("Failed to delete project", e))?;
    app_state.timer.release_tasks(&removed).await;
    Ok(StatusCode::NO_CONTENT)
}

/// List tasks, optionally only those of one project.
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(("projectId" = Option<String>, Query, description = "Restrict to this project")),
    responses(
        (status = 200, description = "Matching tasks", body = [TaskResponse]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_tasks_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListTasksQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let project_id = query.project_id.as_deref().filter(|id| !id.is_empty());
    let tasks = app_state
        .store
        .list_tasks(project_id)
        .await
        .map_err(|e| port_error("Failed to list tasks", e))?;
    Ok(Json(
        tasks.into_iter().map(TaskResponse::from).collect::<Vec<_>>(),
    ))
}

/// Create a task.
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "projectId or title is empty", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_task_handler(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, HandlerError> {
    let req: CreateTaskRequest = json_body(&body);
    let new_task = NewTask {
        project_id: text(&req.project_id),
        title: text(&req.title),
        estimate: estimate(req.estimate.as_ref()),
    };
    let task = app_state
        .store
        .create_task(new_task)
        .await
        .map_err(|e| port_error("Failed to create task", e))?;
    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

/// Partially update a task.
#[utoipa::path(
    patch,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task id")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Updated task", body = TaskResponse),
        (status = 404, description = "Unknown task", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn update_task_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, HandlerError> {
    let req: UpdateTaskRequest = json_body(&body);
    let task = app_state
        .store
        .update_task(&id, task_patch(&req))
        .await
        .map_err(|e| port_error("Failed to update task", e))?;
    Ok(Json(TaskResponse::from(task)))
}

/// Delete a task.
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 204, description = "Deleted, or never existed"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn delete_task_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, HandlerError> {
    app_state
        .store
        .delete_task(&id)
        .await
        .map_err(|e| port_error("Failed to delete task", e))?;
    app_state.timer.release_tasks(&[id]).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Current timer state.
#[utoipa::path(
    get,
    path = "/api/timer",
    responses((status = 200, description = "Timer snapshot", body = TimerSnapshotResponse))
)]
pub async fn timer_snapshot_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<TimerSnapshotResponse> {
    Json(app_state.timer.snapshot().await.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn estimate_follows_parse_int() {
        assert_eq!(estimate(None), None);
        assert_eq!(estimate(Some(&json!(5))), Some(5));
        assert_eq!(estimate(Some(&json!(4.8))), Some(4));
        assert_eq!(estimate(Some(&json!("7"))), Some(7));
        assert_eq!(estimate(Some(&json!("abc"))), None);
        assert_eq!(estimate(Some(&json!(true))), None);
        assert_eq!(estimate(Some(&json!(null))), None);
    }

    #[test]
    fn patch_ignores_fields_of_the_wrong_type() {
        let req: UpdateTaskRequest =
            serde_json::from_value(json!({ "done": "yes", "title": 3, "pomodoros": "4" }))
                .unwrap();
        assert_eq!(task_patch(&req), TaskPatch::default());

        let req: UpdateTaskRequest =
            serde_json::from_value(json!({ "done": true, "title": " x ", "pomodoros": 4 }))
                .unwrap();
        assert_eq!(
            task_patch(&req),
            TaskPatch {
                done: Some(true),
                title: Some(" x ".to_string()),
                pomodoros: Some(4),
            }
        );

        let req: UpdateTaskRequest =
            serde_json::from_value(json!({ "pomodoros": -1 })).unwrap();
        assert_eq!(task_patch(&req).pomodoros, None);
    }

    #[test]
    fn pomodoros_accept_whole_floats_only() {
        assert_eq!(whole_count(&json!(3)), Some(3));
        assert_eq!(whole_count(&json!(3.0)), Some(3));
        assert_eq!(whole_count(&json!(0.0)), Some(0));
        assert_eq!(whole_count(&json!(3.5)), None);
        assert_eq!(whole_count(&json!(-2.0)), None);
        assert_eq!(whole_count(&json!(1e12)), None);
        assert_eq!(whole_count(&json!("3")), None);
    }

    #[test]
    fn unusable_bodies_read_as_empty_objects() {
        for raw in ["", "not json", "[1, 2]", "\"name\"", "null"] {
            let req: CreateProjectRequest = json_body(&Bytes::from(raw));
            assert_eq!(req.name, Value::Null, "body {:?}", raw);
        }
        let req: CreateProjectRequest = json_body(&Bytes::from(r#"{"name":"P"}"#));
        assert_eq!(req.name, json!("P"));
    }

    #[test]
    fn non_string_text_counts_as_empty() {
        assert_eq!(text(&json!("  a ")), "  a ");
        assert_eq!(text(&json!(42)), "");
        assert_eq!(text(&Value::Null), "");
    }
}
