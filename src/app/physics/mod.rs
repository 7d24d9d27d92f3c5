mod forces;
mod quadtree;
pub(in crate::app) mod seed;
mod store;

use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};

use crate::mindmap::{ROOT_ID, VisibleGraph};

use super::render_utils::node_radius;
use forces::{
    AxisTarget, ManyBody, SpringLink, apply_axis_targets, apply_collisions, apply_links,
    apply_many_body,
};
use quadtree::QuadTree;
use store::PositionStore;

const ALPHA_MIN: f32 = 0.001;
const ALPHA_DECAY: f32 = 0.0228;
const VELOCITY_DECAY: f32 = 0.4;
const DRAG_ALPHA_TARGET: f32 = 0.3;
const COLLISION_STRENGTH: f32 = 0.7;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LayoutMode {
    Spider,
    #[default]
    Seed,
}

impl LayoutMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Spider => "Spider",
            Self::Seed => "Seed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct LayoutTuning {
    pub(in crate::app) intensity: f32,
    pub(in crate::app) repulsion: f32,
    pub(in crate::app) link_distance: f32,
}

impl Default for LayoutTuning {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            repulsion: 1.0,
            link_distance: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ModeParams {
    link_distance: f32,
    charge: f32,
    charge_max_distance: f32,
    collision_padding: f32,
    center_strength: f32,
    bias_strength: f32,
}

impl ModeParams {
    fn for_mode(mode: LayoutMode, tuning: LayoutTuning) -> Self {
        let base = match mode {
            LayoutMode::Spider => Self {
                link_distance: 120.0,
                charge: -380.0,
                charge_max_distance: 520.0,
                collision_padding: 10.0,
                center_strength: 0.04,
                bias_strength: 0.12,
            },
            LayoutMode::Seed => Self {
                link_distance: 78.0,
                charge: -160.0,
                charge_max_distance: 320.0,
                collision_padding: 6.0,
                center_strength: 0.0,
                bias_strength: 0.05,
            },
        };

        Self {
            link_distance: base.link_distance * tuning.link_distance.clamp(0.4, 2.5),
            charge: base.charge * tuning.repulsion.clamp(0.1, 3.0) * tuning.intensity.clamp(0.2, 2.5),
            ..base
        }
    }
}

fn seed_target_y(root_y: f32, trunk_tier: Option<f32>, depth: u32) -> AxisTarget {
    match trunk_tier {
        Some(tier) => AxisTarget {
            value: root_y + (seed::GROUND_Y - root_y) * tier,
            strength: 0.35,
        },
        None => AxisTarget {
            value: root_y - 38.0 * depth as f32,
            strength: 0.04,
        },
    }
}

#[derive(Clone, Debug)]
struct LayoutNode {
    id: String,
    radius: f32,
    depth: u32,
    trunk_tier: Option<f32>,
    target_x: Option<AxisTarget>,
    target_y: Option<AxisTarget>,
}

#[derive(Default)]
struct Scratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    predicted: Vec<Vec2>,
    radii: Vec<f32>,
    targets_x: Vec<Option<AxisTarget>>,
    targets_y: Vec<Option<AxisTarget>>,
}

/// Force-directed solver over the visible subgraph. Re-parametrized, never
/// reset, when the subgraph or mode changes.
pub(in crate::app) struct LayoutEngine {
    store: PositionStore,
    nodes: Vec<LayoutNode>,
    links: Vec<SpringLink>,
    index_by_id: HashMap<String, usize>,
    mode: LayoutMode,
    tuning: LayoutTuning,
    alpha: f32,
    alpha_target: f32,
    root_anchor: Option<Vec2>,
    dragging: Option<String>,
    scratch: Scratch,
}

impl LayoutEngine {
    pub(in crate::app) fn new(mode: LayoutMode) -> Self {
        Self {
            store: PositionStore::default(),
            nodes: Vec::new(),
            links: Vec::new(),
            index_by_id: HashMap::new(),
            mode,
            tuning: LayoutTuning::default(),
            alpha: 1.0,
            alpha_target: 0.0,
            root_anchor: None,
            dragging: None,
            scratch: Scratch::default(),
        }
    }

    pub(in crate::app) fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub(in crate::app) fn alpha(&self) -> f32 {
        self.alpha
    }

    pub(in crate::app) fn tuning(&self) -> LayoutTuning {
        self.tuning
    }

    pub(in crate::app) fn position(&self, id: &str) -> Option<Vec2> {
        self.store.position(id)
    }

    pub(in crate::app) fn is_running(&self) -> bool {
        self.alpha >= ALPHA_MIN || self.alpha_target > 0.0
    }

    pub(in crate::app) fn reheat(&mut self, alpha: f32) {
        self.alpha = self.alpha.max(alpha.clamp(0.0, 1.0));
    }

    pub(in crate::app) fn set_tuning(&mut self, tuning: LayoutTuning, visible: &VisibleGraph) {
        if self.tuning != tuning {
            self.tuning = tuning;
            self.rebuild(visible, self.mode);
        }
    }

    /// Overrides root's pinned position in Seed mode; `None` restores the
    /// height derived from the visible node count. Trunk and branch height
    /// targets follow the anchor.
    pub(in crate::app) fn set_root_anchor(&mut self, anchor: Option<Vec2>) {
        self.root_anchor = anchor;
        if self.mode != LayoutMode::Seed {
            return;
        }

        let target = self.root_anchor_or_default();
        for node in self.nodes.iter_mut().filter(|node| node.id != ROOT_ID) {
            node.target_y = Some(seed_target_y(target.y, node.trunk_tier, node.depth));
        }
        if self.dragging.as_deref() != Some(ROOT_ID)
            && let Some(root) = self.store.get_mut(ROOT_ID)
        {
            root.pin = Some(target);
        }
    }

    fn root_anchor_or_default(&self) -> Vec2 {
        self.root_anchor
            .unwrap_or_else(|| vec2(0.0, seed::tree_root_y(self.nodes.len())))
    }

    pub(in crate::app) fn rebuild(&mut self, visible: &VisibleGraph, mode: LayoutMode) {
        let mode_changed = mode != self.mode;
        self.mode = mode;
        self.store.carry_forward(visible, Vec2::ZERO);

        let params = ModeParams::for_mode(mode, self.tuning);
        let sides = seed::assign_sides(&visible.nodes, &visible.links);
        let tiers = seed::trunk_tiers(&visible.nodes, &visible.links);
        let node_count = visible.nodes.len();
        let root_y = self
            .root_anchor
            .map(|anchor| anchor.y)
            .unwrap_or_else(|| seed::tree_root_y(node_count));

        self.index_by_id = visible
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();

        self.nodes = visible
            .nodes
            .iter()
            .map(|node| {
                let side = sides.get(&node.id).copied().unwrap_or(0.0);
                let trunk_tier = tiers.get(&node.id).copied();
                let depth = node.level;
                let bias_target = |axis: f32| AxisTarget {
                    value: axis,
                    strength: params.bias_strength,
                };

                let (target_x, target_y) = match mode {
                    LayoutMode::Spider => match node.bias {
                        Some(bias) => (Some(bias_target(bias.x)), Some(bias_target(bias.y))),
                        None => (
                            Some(AxisTarget { value: 0.0, strength: params.center_strength }),
                            Some(AxisTarget { value: 0.0, strength: params.center_strength }),
                        ),
                    },
                    LayoutMode::Seed if node.is_root() => (None, None),
                    LayoutMode::Seed => {
                        let spread = 70.0 + 65.0 * depth as f32;
                        let x = match node.bias {
                            Some(bias) => bias_target(bias.x),
                            None => AxisTarget { value: side * spread, strength: 0.08 },
                        };
                        (Some(x), Some(seed_target_y(root_y, trunk_tier, depth)))
                    }
                };

                LayoutNode {
                    id: node.id.clone(),
                    radius: node_radius(node.val) + params.collision_padding,
                    depth,
                    trunk_tier,
                    target_x,
                    target_y,
                }
            })
            .collect();

        let mut degree = vec![0usize; node_count];
        let resolved = visible
            .links
            .iter()
            .filter_map(|link| {
                let source = *self.index_by_id.get(&link.source)?;
                let target = *self.index_by_id.get(&link.target)?;
                Some((source, target, link.weight))
            })
            .collect::<Vec<_>>();
        for &(source, target, _) in &resolved {
            degree[source] += 1;
            degree[target] += 1;
        }

        let root_index = self.index_by_id.get(ROOT_ID).copied();
        self.links = resolved
            .into_iter()
            .map(|(source, target, weight)| {
                let distance = match (mode, self.nodes[target].trunk_tier) {
                    (LayoutMode::Seed, Some(tier)) if Some(source) == root_index => {
                        params.link_distance * (1.15 - 0.45 * tier)
                    }
                    _ => params.link_distance,
                };
                let (source_degree, target_degree) = (degree[source] as f32, degree[target] as f32);
                SpringLink {
                    source,
                    target,
                    distance,
                    strength: weight.max(0.05) / source_degree.min(target_degree).max(1.0),
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect();

        match mode {
            LayoutMode::Seed => {
                let anchor = vec2(0.0, root_y);
                if self.dragging.as_deref() != Some(ROOT_ID)
                    && let Some(root) = self.store.get_mut(ROOT_ID)
                {
                    root.pin = Some(anchor);
                }
            }
            LayoutMode::Spider if mode_changed => {
                if self.dragging.as_deref() != Some(ROOT_ID)
                    && let Some(root) = self.store.get_mut(ROOT_ID)
                {
                    root.pin = None;
                }
            }
            LayoutMode::Spider => {}
        }

        self.reheat(if mode_changed { 1.0 } else { 0.7 });
    }

    pub(in crate::app) fn tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * ALPHA_DECAY;
        let alpha = self.alpha;
        let params = ModeParams::for_mode(self.mode, self.tuning);

        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.velocities.clear();
        scratch.radii.clear();
        scratch.targets_x.clear();
        scratch.targets_y.clear();
        for node in &self.nodes {
            let body = self.store.get(&node.id).copied().unwrap_or_default();
            scratch.positions.push(body.pos);
            scratch.velocities.push(body.vel);
            scratch.radii.push(node.radius);
            scratch.targets_x.push(node.target_x);
            scratch.targets_y.push(node.target_y);
        }

        apply_links(&self.links, &scratch.positions, &mut scratch.velocities, alpha);

        if let Some(tree) = QuadTree::build(&scratch.positions, &scratch.radii) {
            apply_many_body(
                &tree,
                &scratch.positions,
                &mut scratch.velocities,
                ManyBody {
                    strength: params.charge,
                    max_distance: params.charge_max_distance,
                },
                alpha,
            );
        }

        scratch.predicted.clear();
        scratch.predicted.extend(
            scratch
                .positions
                .iter()
                .zip(&scratch.velocities)
                .map(|(position, velocity)| *position + *velocity),
        );
        if let Some(tree) = QuadTree::build(&scratch.predicted, &scratch.radii) {
            apply_collisions(
                &tree,
                &scratch.predicted,
                &scratch.radii,
                COLLISION_STRENGTH,
                &mut scratch.velocities,
            );
        }

        apply_axis_targets(
            &scratch.positions,
            &mut scratch.velocities,
            &scratch.targets_x,
            &scratch.targets_y,
            alpha,
        );

        for (index, node) in self.nodes.iter().enumerate() {
            let Some(body) = self.store.get_mut(&node.id) else {
                continue;
            };
            match body.pin {
                Some(pin) => {
                    body.pos = pin;
                    body.vel = Vec2::ZERO;
                }
                None => {
                    body.vel = scratch.velocities[index] * (1.0 - VELOCITY_DECAY);
                    body.pos = scratch.positions[index] + body.vel;
                }
            }
        }

        self.is_running()
    }

    pub(in crate::app) fn begin_drag(&mut self, id: &str, world: Vec2) {
        let Some(body) = self.store.get_mut(id) else {
            return;
        };
        body.pin = Some(world);
        self.dragging = Some(id.to_owned());
        self.alpha_target = DRAG_ALPHA_TARGET;
        self.reheat(DRAG_ALPHA_TARGET);
    }

    pub(in crate::app) fn drag_to(&mut self, world: Vec2) {
        let Some(id) = self.dragging.clone() else {
            return;
        };
        if let Some(body) = self.store.get_mut(&id) {
            body.pin = Some(world);
        }
    }

    pub(in crate::app) fn end_drag(&mut self) {
        let Some(id) = self.dragging.take() else {
            return;
        };
        self.alpha_target = 0.0;

        let keep_pinned = id == ROOT_ID && self.mode == LayoutMode::Seed;
        let anchor = self.root_anchor_or_default();
        if let Some(body) = self.store.get_mut(&id) {
            body.pin = keep_pinned.then_some(anchor);
        }
    }

    pub(in crate::app) fn dragging(&self) -> Option<&str> {
        self.dragging.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mindmap::sample_map;

    fn settled(engine: &mut LayoutEngine, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while engine.tick() && ticks < max_ticks {
            ticks += 1;
        }
        ticks
    }

    #[test]
    fn simulation_cools_down_and_stops() {
        let visible = sample_map().visible();
        let mut engine = LayoutEngine::new(LayoutMode::Spider);
        engine.rebuild(&visible, LayoutMode::Spider);

        let ticks = settled(&mut engine, 2000);
        assert!(ticks < 2000, "alpha never decayed below threshold");
        assert!(!engine.tick());
    }

    #[test]
    fn seed_mode_pins_root_at_trunk_top() {
        let visible = sample_map().visible();
        let mut engine = LayoutEngine::new(LayoutMode::Seed);
        engine.rebuild(&visible, LayoutMode::Seed);
        settled(&mut engine, 400);

        let expected = vec2(0.0, seed::tree_root_y(visible.nodes.len()));
        assert_eq!(engine.position(ROOT_ID), Some(expected));
    }

    #[test]
    fn seed_mode_sends_branches_to_their_side() {
        let visible = sample_map().visible();
        let mut engine = LayoutEngine::new(LayoutMode::Seed);
        engine.rebuild(&visible, LayoutMode::Seed);
        settled(&mut engine, 1000);

        let a = engine.position("A").unwrap_or_default();
        let c = engine.position("C").unwrap_or_default();
        assert!(a.x < 0.0, "A should lean left, got {a:?}");
        assert!(c.x > 0.0, "C should lean right, got {c:?}");
    }

    #[test]
    fn drag_pins_and_release_frees_except_seed_root() {
        let visible = sample_map().visible();
        let mut engine = LayoutEngine::new(LayoutMode::Seed);
        engine.rebuild(&visible, LayoutMode::Seed);

        engine.begin_drag("A", vec2(300.0, 0.0));
        engine.drag_to(vec2(320.0, 10.0));
        engine.tick();
        assert_eq!(engine.position("A"), Some(vec2(320.0, 10.0)));
        engine.end_drag();
        assert_eq!(engine.store.get("A").and_then(|body| body.pin), None);

        engine.begin_drag(ROOT_ID, vec2(50.0, 50.0));
        engine.end_drag();
        assert!(engine.store.get(ROOT_ID).and_then(|body| body.pin).is_some());
    }

    #[test]
    fn positions_survive_rebuilds() {
        let mut map = sample_map();
        let mut engine = LayoutEngine::new(LayoutMode::Spider);
        engine.rebuild(&map.visible(), LayoutMode::Spider);
        settled(&mut engine, 300);
        let before = engine.position("C");

        map.delete_subtree("A");
        engine.rebuild(&map.visible(), LayoutMode::Spider);
        assert_eq!(engine.position("C"), before);
        assert_eq!(engine.position("A"), None);
    }

    fn target_y(engine: &LayoutEngine, id: &str) -> Option<f32> {
        let index = *engine.index_by_id.get(id)?;
        engine.nodes[index].target_y.map(|target| target.value)
    }

    #[test]
    fn moving_the_anchor_moves_height_targets() {
        let visible = sample_map().visible();
        let mut engine = LayoutEngine::new(LayoutMode::Seed);
        engine.set_root_anchor(Some(vec2(0.0, seed::seed_root_y())));
        engine.rebuild(&visible, LayoutMode::Seed);
        let before = target_y(&engine, "A");

        let tree_y = seed::tree_root_y(visible.nodes.len());
        engine.set_root_anchor(Some(vec2(0.0, tree_y)));
        let after = target_y(&engine, "A");
        assert_ne!(before, after);

        let mut fresh = LayoutEngine::new(LayoutMode::Seed);
        fresh.set_root_anchor(Some(vec2(0.0, tree_y)));
        fresh.rebuild(&visible, LayoutMode::Seed);
        for node in &visible.nodes {
            assert_eq!(target_y(&engine, &node.id), target_y(&fresh, &node.id), "{}", node.id);
        }
        assert_eq!(engine.store.get(ROOT_ID).and_then(|body| body.pin), Some(vec2(0.0, tree_y)));
    }

    #[test]
    fn switching_to_spider_frees_root() {
        let visible = sample_map().visible();
        let mut engine = LayoutEngine::new(LayoutMode::Seed);
        engine.rebuild(&visible, LayoutMode::Seed);
        engine.rebuild(&visible, LayoutMode::Spider);
        assert_eq!(engine.store.get(ROOT_ID).and_then(|body| body.pin), None);
    }
}
