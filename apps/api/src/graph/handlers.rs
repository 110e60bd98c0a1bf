use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::graph::{project, GraphEdge, GraphNode};
use crate::preferences::handlers::required;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GraphQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct GraphResponse {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Number of preference records (the user node is not counted).
    pub count: usize,
}

/// GET /graph?userId=
pub async fn handle_get_graph(
    State(state): State<AppState>,
    Query(params): Query<GraphQuery>,
) -> Result<Json<GraphResponse>, AppError> {
    let user_id = required(params.user_id, "userId")?;
    let preferences = state.preferences.list(&user_id).await?;
    let graph = project(&user_id, &preferences);

    Ok(Json(GraphResponse {
        count: graph.edges.len(),
        nodes: graph.nodes,
        edges: graph.edges,
    }))
}
