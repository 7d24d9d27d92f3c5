use std::collections::{HashMap, VecDeque};

use crate::mindmap::{ROOT_ID, VisibleGraph};

const MIN_THICKNESS: f32 = 1.2;
const THICKNESS_PER_SQRT_WEIGHT: f32 = 1.4;
const MAX_THICKNESS: f32 = 14.0;

fn children_by_source(visible: &VisibleGraph) -> HashMap<&str, Vec<&str>> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for link in &visible.links {
        children
            .entry(link.source.as_str())
            .or_default()
            .push(link.target.as_str());
    }
    children
}

pub(in crate::app) fn subtree_weights(visible: &VisibleGraph) -> HashMap<String, u32> {
    let children = children_by_source(visible);
    let mut weights: HashMap<String, u32> = HashMap::with_capacity(visible.nodes.len());
    if !visible.contains(ROOT_ID) {
        return weights;
    }

    let mut stack = vec![(ROOT_ID, false)];
    while let Some((id, expanded)) = stack.pop() {
        if weights.contains_key(id) {
            continue;
        }
        let kids = children.get(id).map(Vec::as_slice).unwrap_or_default();
        if expanded {
            let total = 1 + kids
                .iter()
                .map(|child| weights.get(*child).copied().unwrap_or(0))
                .sum::<u32>();
            weights.insert(id.to_owned(), total);
        } else {
            stack.push((id, true));
            stack.extend(
                kids.iter()
                    .filter(|child| !weights.contains_key(**child))
                    .map(|child| (*child, false)),
            );
        }
    }
    weights
}

pub(in crate::app) fn depths(visible: &VisibleGraph) -> HashMap<String, u32> {
    let children = children_by_source(visible);
    let mut depth = HashMap::with_capacity(visible.nodes.len());
    if !visible.contains(ROOT_ID) {
        return depth;
    }

    let mut queue = VecDeque::from([(ROOT_ID, 0u32)]);
    while let Some((id, level)) = queue.pop_front() {
        if depth.contains_key(id) {
            continue;
        }
        depth.insert(id.to_owned(), level);
        if let Some(next) = children.get(id) {
            queue.extend(next.iter().map(|child| (*child, level + 1)));
        }
    }
    depth
}

pub(in crate::app) fn branch_thickness(weight: u32) -> f32 {
    (MIN_THICKNESS + (weight as f32).sqrt() * THICKNESS_PER_SQRT_WEIGHT).min(MAX_THICKNESS)
}
