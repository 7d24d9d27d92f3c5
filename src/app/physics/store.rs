use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};

use crate::mindmap::VisibleGraph;
use crate::util::SeededRng;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(in crate::app) struct Body {
    pub(in crate::app) pos: Vec2,
    pub(in crate::app) vel: Vec2,
    pub(in crate::app) pin: Option<Vec2>,
}

#[derive(Clone, Debug, Default)]
pub(in crate::app) struct PositionStore {
    bodies: HashMap<String, Body>,
}

impl PositionStore {
    pub(in crate::app) fn get(&self, id: &str) -> Option<&Body> {
        self.bodies.get(id)
    }

    pub(in crate::app) fn get_mut(&mut self, id: &str) -> Option<&mut Body> {
        self.bodies.get_mut(id)
    }

    pub(in crate::app) fn position(&self, id: &str) -> Option<Vec2> {
        self.bodies.get(id).map(|body| body.pos)
    }

    #[cfg(test)]
    pub(in crate::app) fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Rebuilds the store for `visible`: surviving ids keep position,
    /// velocity and pin; new ids start at their parent (the other end of the
    /// first link touching them) or at `center`, nudged by a per-id offset so
    /// siblings do not stack exactly.
    pub(in crate::app) fn carry_forward(&mut self, visible: &VisibleGraph, center: Vec2) {
        let mut previous = std::mem::take(&mut self.bodies);
        let mut fresh = Vec::new();

        for node in &visible.nodes {
            match previous.remove(&node.id) {
                Some(body) => {
                    self.bodies.insert(node.id.clone(), body);
                }
                None => fresh.push(node.id.as_str()),
            }
        }

        for id in fresh {
            let anchor = visible
                .links
                .iter()
                .filter(|link| link.touches(id))
                .find_map(|link| {
                    let other = if link.source == id { &link.target } else { &link.source };
                    self.bodies.get(other.as_str()).map(|body| body.pos)
                })
                .unwrap_or(center);

            let mut rng = SeededRng::for_id(id);
            let nudge = vec2(rng.range(-2.0, 2.0), rng.range(-2.0, 2.0));
            self.bodies.insert(
                id.to_owned(),
                Body {
                    pos: anchor + nudge,
                    vel: Vec2::ZERO,
                    pin: None,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mindmap::{Link, Node, NodeKind, ROOT_ID, VisibleGraph};

    fn graph(ids: &[&str], links: &[(&str, &str)]) -> VisibleGraph {
        VisibleGraph {
            nodes: ids
                .iter()
                .map(|id| Node::new(*id, *id, NodeKind::Category, 1))
                .collect(),
            links: links.iter().map(|(s, t)| Link::new(*s, *t)).collect(),
        }
    }

    #[test]
    fn survivors_keep_state_and_newcomers_start_at_parent() {
        let mut store = PositionStore::default();
        store.carry_forward(&graph(&[ROOT_ID], &[]), Vec2::ZERO);
        if let Some(root) = store.get_mut(ROOT_ID) {
            root.pos = vec2(100.0, -50.0);
            root.vel = vec2(1.0, 2.0);
            root.pin = Some(vec2(100.0, -50.0));
        }

        store.carry_forward(&graph(&[ROOT_ID, "a"], &[(ROOT_ID, "a")]), Vec2::ZERO);

        let root = store.get(ROOT_ID).copied().unwrap_or_default();
        assert_eq!(root.vel, vec2(1.0, 2.0));
        assert_eq!(root.pin, Some(vec2(100.0, -50.0)));
        let child = store.position("a").unwrap_or_default();
        assert!((child - vec2(100.0, -50.0)).length() <= 3.0);
    }

    #[test]
    fn vanished_ids_are_dropped_and_orphans_use_center() {
        let mut store = PositionStore::default();
        store.carry_forward(&graph(&[ROOT_ID, "a"], &[(ROOT_ID, "a")]), Vec2::ZERO);
        store.carry_forward(&graph(&[ROOT_ID, "loose"], &[]), vec2(10.0, 10.0));

        assert!(store.get("a").is_none());
        assert_eq!(store.len(), 2);
        let loose = store.position("loose").unwrap_or_default();
        assert!((loose - vec2(10.0, 10.0)).length() <= 3.0);
    }

    #[test]
    fn newcomer_placement_is_deterministic() {
        let visible = graph(&[ROOT_ID, "a", "b"], &[(ROOT_ID, "a"), ("a", "b")]);
        let mut first = PositionStore::default();
        let mut second = PositionStore::default();
        first.carry_forward(&visible, Vec2::ZERO);
        second.carry_forward(&visible, Vec2::ZERO);
        assert_eq!(first.position("b"), second.position("b"));
    }
}
