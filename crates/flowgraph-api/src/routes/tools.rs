use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use flowgraph_contracts::ToolDefinition;

use crate::app_state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new().route("/v1/tools", get(list_tools)).with_state(state)
}

#[utoipa::path(
    get,
    path = "/v1/tools",
    responses((status = 200, description = "Registered tools", body = Vec<ToolDefinition>)),
    tag = "tools"
)]
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolDefinition>> {
    Json(state.engine.services.tools.list())
}
