//! Tree-mode geometry shared by the layout forces and the trunk renderer.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::mindmap::{Link, Node, ROOT_ID};

pub(in crate::app) const GROUND_Y: f32 = 240.0;
pub(in crate::app) const SEED_LIFT: f32 = 14.0;

const TRUNK_BASE_HEIGHT: f32 = 90.0;
const TRUNK_HEIGHT_PER_NODE: f32 = 9.0;
const TRUNK_MAX_HEIGHT: f32 = 330.0;
const TIER_MIN: f32 = 0.2;
const TIER_MAX: f32 = 0.75;

pub(in crate::app) fn trunk_height(visible_count: usize) -> f32 {
    (TRUNK_BASE_HEIGHT + TRUNK_HEIGHT_PER_NODE * visible_count as f32).min(TRUNK_MAX_HEIGHT)
}

pub(in crate::app) fn tree_root_y(visible_count: usize) -> f32 {
    GROUND_Y - trunk_height(visible_count)
}

pub(in crate::app) fn seed_root_y() -> f32 {
    GROUND_Y - SEED_LIFT
}

fn sorted_root_children<'a>(nodes: &[Node], links: &'a [Link]) -> Vec<&'a str> {
    let known = nodes.iter().map(|node| node.id.as_str()).collect::<HashSet<_>>();
    let mut children = links
        .iter()
        .filter(|link| link.source == ROOT_ID && known.contains(link.target.as_str()))
        .map(|link| link.target.as_str())
        .collect::<Vec<_>>();
    children.sort_unstable();
    children.dedup();
    children
}

pub(in crate::app) fn trunk_tiers(nodes: &[Node], links: &[Link]) -> HashMap<String, f32> {
    let children = sorted_root_children(nodes, links);
    let count = children.len();
    children
        .into_iter()
        .enumerate()
        .map(|(index, id)| {
            let tier = if count <= 1 {
                (TIER_MIN + TIER_MAX) * 0.5
            } else {
                TIER_MIN + (TIER_MAX - TIER_MIN) * index as f32 / (count - 1) as f32
            };
            (id.to_owned(), tier)
        })
        .collect()
}

/// Left (-1) / right (+1) growth direction. Root's children alternate by
/// sorted id and every descendant inherits its level-1 ancestor's side, so
/// the result depends only on topology, never on input order.
pub(in crate::app) fn assign_sides(nodes: &[Node], links: &[Link]) -> HashMap<String, f32> {
    let known = nodes.iter().map(|node| node.id.as_str()).collect::<HashSet<_>>();
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for link in links {
        if known.contains(link.source.as_str()) && known.contains(link.target.as_str()) {
            children
                .entry(link.source.as_str())
                .or_default()
                .push(link.target.as_str());
        }
    }

    let mut sides = HashMap::new();
    for (index, branch) in sorted_root_children(nodes, links).into_iter().enumerate() {
        let side = if index % 2 == 0 { -1.0 } else { 1.0 };
        let mut queue = VecDeque::from([branch]);
        while let Some(current) = queue.pop_front() {
            if current == ROOT_ID || sides.contains_key(current) {
                continue;
            }
            sides.insert(current.to_owned(), side);
            if let Some(next) = children.get(current) {
                queue.extend(next.iter().copied());
            }
        }
    }
    sides
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mindmap::{Link, Node, NodeKind};
    use proptest::prelude::*;

    fn fan(ids: &[&str]) -> (Vec<Node>, Vec<Link>) {
        let mut nodes = vec![Node::new(ROOT_ID, "root", NodeKind::Root, 0)];
        let mut links = Vec::new();
        for id in ids {
            nodes.push(Node::new(*id, *id, NodeKind::Category, 1));
            links.push(Link::new(ROOT_ID, *id));
        }
        (nodes, links)
    }

    #[test]
    fn sides_alternate_by_sorted_id_and_inherit() {
        let (mut nodes, mut links) = fan(&["c", "a", "b"]);
        nodes.push(Node::new("c1", "c1", NodeKind::Document, 2));
        links.push(Link::new("c", "c1"));

        let sides = assign_sides(&nodes, &links);
        assert_eq!(sides["a"], -1.0);
        assert_eq!(sides["b"], 1.0);
        assert_eq!(sides["c"], -1.0);
        assert_eq!(sides["c1"], -1.0);
        assert!(!sides.contains_key(ROOT_ID));
    }

    #[test]
    fn tiers_span_the_trunk_evenly() {
        let (nodes, links) = fan(&["b", "a", "c"]);
        let tiers = trunk_tiers(&nodes, &links);
        assert!((tiers["a"] - 0.2).abs() < 1e-6);
        assert!((tiers["b"] - 0.475).abs() < 1e-6);
        assert!((tiers["c"] - 0.75).abs() < 1e-6);

        let (nodes, links) = fan(&["only"]);
        assert!((trunk_tiers(&nodes, &links)["only"] - 0.475).abs() < 1e-6);
    }

    #[test]
    fn trunk_grows_with_node_count_up_to_cap() {
        assert!(trunk_height(10) > trunk_height(2));
        assert_eq!(trunk_height(10_000), TRUNK_MAX_HEIGHT);
        assert!(tree_root_y(5) < seed_root_y());
    }

    fn random_tree() -> impl Strategy<Value = (Vec<Node>, Vec<Link>)> {
        proptest::collection::vec(any::<proptest::sample::Index>(), 1..30).prop_map(|parents| {
            let mut nodes = vec![Node::new(ROOT_ID, "root", NodeKind::Root, 0)];
            let mut links = Vec::new();
            for (offset, pick) in parents.iter().enumerate() {
                let parent = nodes[pick.index(offset + 1)].id.clone();
                let id = format!("n{:02}", offset + 1);
                nodes.push(Node::new(id.clone(), id.clone(), NodeKind::Category, 1));
                links.push(Link::new(parent, id));
            }
            (nodes, links)
        })
    }

    proptest! {
        #[test]
        fn sides_ignore_input_order(
            (nodes, links) in random_tree(),
            node_shuffle in any::<u64>(),
            link_shuffle in any::<u64>(),
        ) {
            let expected = assign_sides(&nodes, &links);

            let mut shuffled_nodes = nodes.clone();
            let mut shuffled_links = links.clone();
            let rotate_nodes = (node_shuffle as usize) % shuffled_nodes.len();
            shuffled_nodes.rotate_left(rotate_nodes);
            shuffled_nodes.reverse();
            let rotate_links = (link_shuffle as usize) % shuffled_links.len().max(1);
            shuffled_links.rotate_left(rotate_links);
            shuffled_links.reverse();

            prop_assert_eq!(assign_sides(&shuffled_nodes, &shuffled_links), expected);
        }

        #[test]
        fn every_non_root_node_gets_a_side((nodes, links) in random_tree()) {
            let sides = assign_sides(&nodes, &links);
            prop_assert_eq!(sides.len(), nodes.len() - 1);
            prop_assert!(sides.values().all(|side| *side == -1.0 || *side == 1.0));
        }
    }
}
