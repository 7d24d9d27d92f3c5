use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use super::graph::{Link, Node, NodeKind, ROOT_ID};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadKind {
    Root,
    Project,
    Document,
    Category,
}

impl From<PayloadKind> for NodeKind {
    fn from(kind: PayloadKind) -> Self {
        match kind {
            PayloadKind::Root => NodeKind::Root,
            PayloadKind::Project => NodeKind::Project,
            PayloadKind::Document => NodeKind::Document,
            PayloadKind::Category => NodeKind::Category,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayloadNode {
    pub id: String,
    pub name: String,
    #[serde(alias = "type")]
    pub kind: PayloadKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "documentId")]
    pub document_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayloadLink {
    pub source: String,
    pub target: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPayload {
    pub nodes: Vec<PayloadNode>,
    #[serde(default)]
    pub links: Vec<PayloadLink>,
}

pub fn parse_query_payload(raw: &str) -> Result<QueryPayload> {
    let payload: QueryPayload =
        serde_json::from_str(raw).context("invalid JSON from query service")?;
    validate_payload(&payload)?;
    Ok(payload)
}

pub fn load_batch(path: &Path) -> Result<QueryPayload> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read batch {}", path.display()))?;
    parse_query_payload(&raw).with_context(|| format!("invalid batch {}", path.display()))
}

/// Rejects payloads the graph could not attach without breaking its
/// invariants: empty results, blank ids or names, duplicate ids, and links
/// pointing outside the payload.
pub fn validate_payload(payload: &QueryPayload) -> Result<()> {
    if payload.nodes.is_empty() {
        bail!("query service returned no nodes");
    }

    let mut ids = HashSet::new();
    for node in &payload.nodes {
        if node.id.trim().is_empty() || node.name.trim().is_empty() {
            bail!("query service returned a node without id or name");
        }
        if !ids.insert(node.id.as_str()) {
            return Err(anyhow!("query service returned duplicate node id {}", node.id));
        }
    }

    for link in &payload.links {
        let source_known = link.source == ROOT_ID || ids.contains(link.source.as_str());
        if !source_known || !ids.contains(link.target.as_str()) {
            return Err(anyhow!(
                "query service returned link {} -> {} with unknown endpoint",
                link.source,
                link.target
            ));
        }
    }

    Ok(())
}

/// Converts a validated payload into a subtree hanging off `root`. Payload
/// nodes without an incoming payload link are attached directly to `root`;
/// a second incoming link for the same target is dropped to keep the tree.
pub fn payload_into_subtree(payload: QueryPayload) -> (Vec<Node>, Vec<Link>) {
    let mut parent_by_target: HashMap<String, String> = HashMap::new();
    for link in &payload.links {
        if link.source == link.target || link.target == ROOT_ID {
            continue;
        }
        parent_by_target
            .entry(link.target.clone())
            .or_insert_with(|| link.source.clone());
    }

    let mut links = Vec::new();
    for node in &payload.nodes {
        if node.id == ROOT_ID {
            continue;
        }
        let parent = parent_by_target
            .get(&node.id)
            .cloned()
            .unwrap_or_else(|| ROOT_ID.to_owned());
        links.push(Link::new(parent, node.id.clone()));
    }

    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for link in &links {
        children
            .entry(link.source.as_str())
            .or_default()
            .push(link.target.as_str());
    }

    let mut levels: HashMap<String, u32> = HashMap::new();
    let mut queue = VecDeque::from([(ROOT_ID, 0u32)]);
    while let Some((current, level)) = queue.pop_front() {
        for &child in children.get(current).map(Vec::as_slice).unwrap_or_default() {
            if !levels.contains_key(child) {
                levels.insert(child.to_owned(), level + 1);
                queue.push_back((child, level + 1));
            }
        }
    }

    // payload cycles never reach root; drop them
    let links = links
        .into_iter()
        .filter(|link| levels.contains_key(&link.target))
        .collect::<Vec<_>>();

    let nodes = payload
        .nodes
        .into_iter()
        .filter_map(|raw| {
            let level = *levels.get(&raw.id)?;
            let mut node = Node::new(raw.id, raw.name, raw.kind.into(), level);
            node.description = raw.description;
            node.document_id = raw.document_id;
            Some(node)
        })
        .collect();

    (nodes, links)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_attaches_nested_payload() {
        let raw = r#"{
            "nodes": [
                {"id": "p", "name": "Project", "type": "PROJECT"},
                {"id": "d", "name": "Doc", "kind": "DOCUMENT", "description": "notes"}
            ],
            "links": [{"source": "root", "target": "p"}, {"source": "p", "target": "d"}]
        }"#;

        let payload = parse_query_payload(raw).expect("payload should parse");
        let (nodes, links) = payload_into_subtree(payload);

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].level, 2);
        assert_eq!(nodes[1].description.as_deref(), Some("notes"));
        assert_eq!(links, vec![Link::new("root", "p"), Link::new("p", "d")]);
    }

    #[test]
    fn orphan_nodes_hang_off_root() {
        let payload = QueryPayload {
            nodes: vec![PayloadNode {
                id: "x".into(),
                name: "X".into(),
                kind: PayloadKind::Category,
                description: None,
                document_id: None,
            }],
            links: Vec::new(),
        };

        let (nodes, links) = payload_into_subtree(payload);
        assert_eq!(nodes[0].level, 1);
        assert_eq!(links, vec![Link::new("root", "x")]);
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert!(parse_query_payload("not json").is_err());
        assert!(parse_query_payload(r#"{"nodes": []}"#).is_err());
        assert!(parse_query_payload(r#"{"nodes": [{"id": "a", "type": "PROJECT"}]}"#).is_err());
        assert!(
            parse_query_payload(
                r#"{"nodes": [{"id": "a", "name": "A", "type": "PROJECT"}],
                    "links": [{"source": "a", "target": "ghost"}]}"#
            )
            .is_err()
        );
        assert!(
            parse_query_payload(
                r#"{"nodes": [{"id": "a", "name": " ", "type": "PROJECT"}]}"#
            )
            .is_err()
        );
    }
}
