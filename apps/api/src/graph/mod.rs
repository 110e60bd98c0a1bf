//! Graph Projector: reshapes a user's preference rows into nodes and edges
//! for the preference graph UI. Nothing here is stored; the graph is rebuilt
//! on every request.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::preference::{Cluster, Preference, UserType};

pub mod handlers;

pub const USER_NODE_LABEL: &str = "You";
pub const EDGE_TYPE: &str = "has";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeData {
    pub validated: bool,
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<Cluster>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<NodeData>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreferenceGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Node id for a preference: `{type}:{value}`.
pub fn node_id(preference: &Preference) -> String {
    format!(
        "{}:{}",
        preference.preference_type, preference.preference_value
    )
}

pub fn user_node(user_id: &str) -> GraphNode {
    GraphNode {
        id: user_id.to_string(),
        node_type: "user".to_string(),
        label: USER_NODE_LABEL.to_string(),
        cluster: None,
        data: None,
    }
}

pub fn preference_node(preference: &Preference, user_type: UserType) -> GraphNode {
    GraphNode {
        id: node_id(preference),
        node_type: preference.preference_type.as_str().to_string(),
        label: preference.preference_value.clone(),
        cluster: Some(preference.preference_type.cluster_for(user_type)),
        data: Some(NodeData {
            validated: preference.validated,
            confidence: preference.confidence,
            created_at: preference.created_at,
        }),
    }
}

/// One user node plus one node and one edge per preference record.
pub fn project(user_id: &str, preferences: &[Preference]) -> PreferenceGraph {
    let mut nodes = Vec::with_capacity(preferences.len() + 1);
    let mut edges = Vec::with_capacity(preferences.len());
    nodes.push(user_node(user_id));

    for preference in preferences {
        let node = preference_node(preference, UserType::Candidate);
        edges.push(GraphEdge {
            source: user_id.to_string(),
            target: node.id.clone(),
            edge_type: EDGE_TYPE.to_string(),
            label: preference.preference_type.as_str().to_string(),
        });
        nodes.push(node);
    }

    PreferenceGraph { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::preference::PreferenceType;

    fn preference(id: i64, t: PreferenceType, value: &str, validated: bool) -> Preference {
        let now = Utc::now();
        Preference {
            id,
            user_id: "u1".to_string(),
            preference_type: t,
            preference_value: value.to_string(),
            validated,
            confidence: Some(0.9),
            raw_text: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_user_has_only_user_node() {
        let graph = project("u1", &[]);
        assert_eq!(graph.nodes, vec![user_node("u1")]);
        assert!(graph.edges.is_empty());
        assert_eq!(graph.nodes[0].label, "You");
    }

    #[test]
    fn test_counts_follow_record_count() {
        let preferences = vec![
            preference(1, PreferenceType::Role, "CFO", true),
            preference(2, PreferenceType::Location, "London", false),
            preference(3, PreferenceType::Skill, "M&A", true),
        ];
        let graph = project("u1", &preferences);

        assert_eq!(graph.nodes.len(), 1 + preferences.len());
        assert_eq!(graph.edges.len(), preferences.len());
        assert!(graph.edges.iter().all(|e| e.source == "u1" && e.edge_type == "has"));
    }

    #[test]
    fn test_preference_node_shape() {
        let p = preference(7, PreferenceType::DayRate, "£1200", false);
        let node = preference_node(&p, UserType::Candidate);

        assert_eq!(node.id, "day_rate:£1200");
        assert_eq!(node.node_type, "day_rate");
        assert_eq!(node.cluster, Some(Cluster::Preferences));
        assert_eq!(node.data.as_ref().map(|d| d.validated), Some(false));
    }

    #[test]
    fn test_edges_target_their_nodes() {
        let preferences = vec![preference(1, PreferenceType::Company, "Stripe", true)];
        let graph = project("u1", &preferences);

        assert_eq!(graph.edges[0].target, graph.nodes[1].id);
        assert_eq!(graph.edges[0].label, "company");
    }

    #[test]
    fn test_serialized_field_names() {
        let graph = project("u1", &[preference(1, PreferenceType::Role, "CTO", true)]);
        let json = serde_json::to_value(&graph).unwrap();

        assert_eq!(json["nodes"][0]["type"], "user");
        assert!(json["nodes"][0].get("cluster").is_none());
        assert_eq!(json["nodes"][1]["cluster"], "career_interests");
        assert_eq!(json["edges"][0]["type"], "has");
    }
}
