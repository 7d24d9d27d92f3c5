use eframe::egui::{Vec2, vec2};

use crate::util::SeededRng;

use super::curve::{CurveShape, NaturalPath};
use super::super::animation::ease_in_cubic;

const TRUNK_STEPS: usize = 18;
const TOP_WIDTH: f32 = 5.0;
const MIN_BASE_WIDTH: f32 = 14.0;
const MAX_BASE_WIDTH: f32 = 46.0;
const SURFACE_NOISE: f32 = 1.4;
const GROWTH_SCALE: f32 = 12.0;

pub(in crate::app) fn growth_progress(visible_count: usize) -> f32 {
    1.0 - (-(visible_count as f32) / GROWTH_SCALE).exp()
}

pub(in crate::app) fn trunk_outline(top: Vec2, ground_y: f32, progress: f32, seed: u32) -> Vec<Vec2> {
    let base_width = MIN_BASE_WIDTH + (MAX_BASE_WIDTH - MIN_BASE_WIDTH) * progress.clamp(0.0, 1.0);
    let height = (ground_y - top.y).max(1.0);
    let mut rng = SeededRng::new(seed);

    let mut left = Vec::with_capacity(TRUNK_STEPS + 1);
    let mut right = Vec::with_capacity(TRUNK_STEPS + 1);
    for step in 0..=TRUNK_STEPS {
        let t = step as f32 / TRUNK_STEPS as f32;
        let half_width = (TOP_WIDTH + (base_width - TOP_WIDTH) * ease_in_cubic(t)) * 0.5;
        let lean = (t * std::f32::consts::PI).sin() * rng.range(-2.0, 2.0);
        let y = top.y + height * t;
        left.push(vec2(top.x + lean - half_width + rng.range(-SURFACE_NOISE, SURFACE_NOISE), y));
        right.push(vec2(top.x + lean + half_width + rng.range(-SURFACE_NOISE, SURFACE_NOISE), y));
    }

    left.extend(right.into_iter().rev());
    left
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct CrownBranch {
    pub(in crate::app) index: usize,
    pub(in crate::app) path: NaturalPath,
    pub(in crate::app) width: f32,
}

pub(in crate::app) fn crown_branches(top: Vec2, progress: f32, seed: u32) -> Vec<CrownBranch> {
    let progress = progress.clamp(0.0, 1.0);
    let count = 2 + (progress * 5.0).round() as usize;
    let length = 28.0 + 72.0 * progress;
    let mut rng = SeededRng::new(seed ^ 0x9e37_79b9);

    (0..count)
        .map(|index| {
            let spread = index as f32 / (count - 1) as f32;
            let angle = (-150.0 + 120.0 * spread + rng.range(-9.0, 9.0)).to_radians();
            let reach = length * rng.range(0.75, 1.1);
            let end = top + vec2(angle.cos(), angle.sin()) * reach;
            let bend = rng.range(-0.2, 0.2) * reach;
            let normal = vec2(-angle.sin(), angle.cos());
            NaturalPath {
                start: top,
                end,
                shape: CurveShape::Quadratic {
                    control: top + (end - top) * 0.5 + normal * bend,
                },
            }
        })
        .enumerate()
        .map(|(index, path)| CrownBranch {
            index,
            path,
            width: (4.5 - index as f32 * 0.2).max(1.6) * (0.6 + 0.4 * progress),
        })
        .collect()
}
