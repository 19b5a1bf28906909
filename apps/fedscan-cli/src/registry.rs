//! Node registry lookups shared by the subcommands.

use crate::error::{CliError, CliResult};
use fedscan_client::{NodeClient, NodeKind, NodeRecord};

/// Fetch the registry from the coordinator, sorted by node id.
pub async fn fetch(coordinator: &NodeClient) -> CliResult<Vec<NodeRecord>> {
    let mut nodes = coordinator.list_nodes().await?;
    nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
    Ok(nodes)
}

/// Member nodes only, registry order.
pub fn members(nodes: &[NodeRecord]) -> Vec<&NodeRecord> {
    nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Member)
        .collect()
}

/// The coordinator's own registry entry, when it registers itself.
pub fn coordinator_id(nodes: &[NodeRecord], fallback: &str) -> String {
    nodes
        .iter()
        .find(|n| n.kind == NodeKind::Coordinator)
        .map_or_else(|| fallback.to_string(), |n| n.node_id.clone())
}

/// Resolve one member node by case-insensitive substring of its id.
///
/// Exactly one node may match, and it must be a member node; anything else
/// is a usage error naming what went wrong.
pub fn find_member<'a>(nodes: &'a [NodeRecord], pattern: &str) -> CliResult<&'a NodeRecord> {
    let needle = pattern.to_lowercase();
    let matches: Vec<&NodeRecord> = nodes
        .iter()
        .filter(|n| n.node_id.to_lowercase().contains(&needle))
        .collect();

    match matches.as_slice() {
        [] => Err(CliError::NodeNotFound(pattern.to_string())),
        [node] if node.kind == NodeKind::Member => Ok(node),
        [node] => Err(CliError::NotAMemberNode(node.node_id.clone())),
        many => Err(CliError::AmbiguousNode {
            pattern: pattern.to_string(),
            matches: many
                .iter()
                .map(|n| n.node_id.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, kind: NodeKind) -> NodeRecord {
        NodeRecord {
            node_id: id.to_string(),
            base_url: format!("https://{}.example.org", id.to_lowercase()),
            kind,
        }
    }

    fn fixture() -> Vec<NodeRecord> {
        vec![
            node("urn:node:CN", NodeKind::Coordinator),
            node("urn:node:GULFWATCH", NodeKind::Member),
            node("urn:node:KNB", NodeKind::Member),
            node("urn:node:KNBTEST", NodeKind::Member),
        ]
    }

    #[test]
    fn substring_match_is_case_insensitive() {
        let nodes = fixture();
        let found = find_member(&nodes, "gulf").unwrap();
        assert_eq!(found.node_id, "urn:node:GULFWATCH");
    }

    #[test]
    fn ambiguous_pattern_lists_all_matches() {
        let nodes = fixture();
        let err = find_member(&nodes, "knb").unwrap_err();
        match err {
            CliError::AmbiguousNode { matches, .. } => {
                assert!(matches.contains("urn:node:KNB"));
                assert!(matches.contains("urn:node:KNBTEST"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn coordinator_match_is_rejected() {
        let nodes = fixture();
        let err = find_member(&nodes, "cn").unwrap_err();
        assert!(matches!(err, CliError::NotAMemberNode(_)));
    }

    #[test]
    fn unknown_pattern_is_not_found() {
        let nodes = fixture();
        assert!(matches!(
            find_member(&nodes, "atlantis"),
            Err(CliError::NodeNotFound(_))
        ));
    }
}
