use eframe::egui::{Vec2, vec2};

use crate::util::SeededRng;

use super::curve::NaturalPath;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum DecorKind {
    Twig,
    Leaf,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Decoration {
    pub(in crate::app) kind: DecorKind,
    pub(in crate::app) anchor: Vec2,
    pub(in crate::app) angle: f32,
    pub(in crate::app) length: f32,
}

fn decoration_count(depth: u32, is_leaf_edge: bool) -> usize {
    match (depth, is_leaf_edge) {
        (_, true) => 2,
        (0 | 1, false) => 5,
        _ => 3,
    }
}

pub(in crate::app) fn decorate_edge(path: &NaturalPath, depth: u32, is_leaf_edge: bool, seed: u32) -> Vec<Decoration> {
    let count = decoration_count(depth, is_leaf_edge);
    let falloff = 1.0 / (1.0 + 0.25 * depth.saturating_sub(1) as f32);
    let mut rng = SeededRng::new(seed.rotate_left(7) ^ 0x5bd1_e995);

    (0..count)
        .map(|slot| {
            let t = (0.25 + 0.65 * (slot as f32 + 0.5) / count as f32 + rng.range(-0.05, 0.05)).clamp(0.05, 0.95);
            let point = path.point_at(t);
            let tangent = path.tangent_at(t);
            let normal = vec2(-tangent.y, tangent.x);
            let side = rng.sign();
            let offset = rng.range(1.5, 5.0);
            let kind = if is_leaf_edge || rng.next_f32() >= 0.45 {
                DecorKind::Leaf
            } else {
                DecorKind::Twig
            };
            let (base_length, splay) = match kind {
                DecorKind::Leaf => (rng.range(7.0, 11.0), rng.range(0.5, 0.9)),
                DecorKind::Twig => (rng.range(9.0, 16.0), rng.range(0.6, 1.1)),
            };
            let angle = tangent.y.atan2(tangent.x) + side * splay + rng.range(-0.15, 0.15);

            Decoration {
                kind,
                anchor: point + normal * side * offset,
                angle,
                length: base_length * falloff,
            }
        })
        .collect()
}

impl Decoration {
    pub(in crate::app) fn direction(&self) -> Vec2 {
        vec2(self.angle.cos(), self.angle.sin())
    }

    pub(in crate::app) fn twig_segment(&self, sway: Vec2) -> [Vec2; 2] {
        [self.anchor, self.anchor + self.direction() * self.length + sway]
    }

    pub(in crate::app) fn leaf_outline(&self, sway: Vec2) -> Vec<Vec2> {
        let direction = self.direction();
        let normal = vec2(-direction.y, direction.x);
        let width = self.length * 0.38;
        let tip = self.anchor + direction * self.length + sway;
        let along = |share: f32| self.anchor + (tip - self.anchor) * share;

        vec![
            self.anchor,
            along(0.3) + normal * width * 0.8,
            along(0.65) + normal * width,
            tip,
            along(0.65) - normal * width,
            along(0.3) - normal * width * 0.8,
        ]
    }
}
