//! services/api/src/web/router.rs
//!
//! Builds the complete application router. Shared by the `api` binary and the
//! integration tests so both exercise the same middleware stack.

use crate::web::{
    rest::{
        create_project_handler, create_task_handler, delete_project_handler,
        delete_task_handler, health_handler, list_projects_handler, list_tasks_handler,
        timer_snapshot_handler, update_task_handler, ApiDoc,
    },
    state::AppState,
    ws_handler,
};
use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{delete, get, patch},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub fn build_router(app_state: Arc<AppState>) -> Router {
    let cors = match &app_state.config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.clone())
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([CONTENT_TYPE]),
        None => CorsLayer::permissive(),
    };

    let api_routes = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/projects",
            get(list_projects_handler).post(create_project_handler),
        )
        .route("/projects/{id}", delete(delete_project_handler))
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route(
            "/tasks/{id}",
            patch(update_task_handler).delete(delete_task_handler),
        )
        .route("/timer", get(timer_snapshot_handler))
        .route("/timer/ws", get(ws_handler));

    let api_router = Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
