use std::fmt::Write as _;

use eframe::egui::{Vec2, vec2};

use crate::util::SeededRng;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) enum CurveShape {
    Quadratic { control: Vec2 },
    Cubic { first: Vec2, second: Vec2 },
}

/// A branch curve between two node centers. Control points come from a
/// generator seeded by the edge identity, so the same edge at the same
/// endpoints always bends the same way.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct NaturalPath {
    pub(in crate::app) start: Vec2,
    pub(in crate::app) end: Vec2,
    pub(in crate::app) shape: CurveShape,
}

pub(in crate::app) fn natural_path(x1: f32, y1: f32, x2: f32, y2: f32, depth: u32, seed: u32) -> NaturalPath {
    let start = vec2(x1, y1);
    let end = vec2(x2, y2);
    let delta = end - start;
    let mut rng = SeededRng::new(seed);

    let shape = if depth <= 1 {
        let wave = rng.range(-18.0, 18.0);
        let drift = rng.range(-8.0, 8.0);
        let bow = rng.range(12.0, 32.0);
        let lean = rng.range(-10.0, 10.0);
        CurveShape::Cubic {
            first: vec2(x1 + delta.x * 0.25 + drift, y1 + delta.y * 0.1 + wave),
            second: vec2(x1 + delta.x * 0.75 + lean, y2 + bow),
        }
    } else {
        let length = delta.length().max(1.0);
        let normal = vec2(-delta.y, delta.x) / length;
        let bend = rng.range(-0.18, 0.18) * length;
        let slide = rng.range(-0.08, 0.08);
        CurveShape::Quadratic {
            control: start + delta * (0.5 + slide) + normal * bend,
        }
    };

    NaturalPath { start, end, shape }
}

impl NaturalPath {
    pub(in crate::app) fn control_points(&self) -> Vec<Vec2> {
        match self.shape {
            CurveShape::Quadratic { control } => vec![self.start, control, self.end],
            CurveShape::Cubic { first, second } => vec![self.start, first, second, self.end],
        }
    }

    pub(in crate::app) fn path_data(&self) -> String {
        let mut data = format!("M{:.2} {:.2}", self.start.x, self.start.y);
        let _ = match self.shape {
            CurveShape::Quadratic { control } => write!(
                data,
                " Q{:.2} {:.2} {:.2} {:.2}",
                control.x, control.y, self.end.x, self.end.y
            ),
            CurveShape::Cubic { first, second } => write!(
                data,
                " C{:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
                first.x, first.y, second.x, second.y, self.end.x, self.end.y
            ),
        };
        data
    }

    pub(in crate::app) fn point_at(&self, t: f32) -> Vec2 {
        de_casteljau(&self.control_points(), t).0
    }

    pub(in crate::app) fn tangent_at(&self, t: f32) -> Vec2 {
        let tangent = de_casteljau(&self.control_points(), t).1;
        if tangent.length_sq() > 1e-8 {
            return tangent.normalized();
        }
        let chord = self.end - self.start;
        if chord.length_sq() > 1e-8 { chord.normalized() } else { Vec2::X }
    }

    pub(in crate::app) fn sample(&self, segments: usize) -> Vec<Vec2> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|step| self.point_at(step as f32 / segments as f32))
            .collect()
    }

    pub(in crate::app) fn displaced(&self, offset: Vec2) -> Self {
        let shape = match self.shape {
            CurveShape::Quadratic { control } => CurveShape::Quadratic {
                control: control + offset,
            },
            CurveShape::Cubic { first, second } => CurveShape::Cubic {
                first: first + offset * 0.5,
                second: second + offset,
            },
        };
        Self { shape, ..*self }
    }
}

fn de_casteljau(points: &[Vec2], t: f32) -> (Vec2, Vec2) {
    let t = t.clamp(0.0, 1.0);
    let mut level = points.to_vec();
    while level.len() > 2 {
        level = level
            .windows(2)
            .map(|pair| pair[0] + (pair[1] - pair[0]) * t)
            .collect();
    }
    match level.as_slice() {
        [a, b] => (*a + (*b - *a) * t, *b - *a),
        [a] => (*a, Vec2::ZERO),
        _ => (Vec2::ZERO, Vec2::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn trunk_edges_are_cubic_and_deeper_edges_quadratic() {
        let trunk = natural_path(0.0, 0.0, 100.0, -50.0, 1, 7);
        assert!(matches!(trunk.shape, CurveShape::Cubic { .. }));
        assert!(trunk.path_data().contains(" C"));

        let twig = natural_path(0.0, 0.0, 100.0, -50.0, 3, 7);
        assert!(matches!(twig.shape, CurveShape::Quadratic { .. }));
        assert!(twig.path_data().starts_with("M0.00 0.00 Q"));
    }

    #[test]
    fn root_edges_bow_downward_near_the_end() {
        for seed in 0..50 {
            let path = natural_path(0.0, 0.0, 200.0, 0.0, 1, seed);
            let CurveShape::Cubic { second, .. } = path.shape else {
                panic!("depth 1 should be cubic");
            };
            assert!(second.y > 0.0, "seed {seed} did not sag");
        }
    }

    #[test]
    fn sampling_hits_both_endpoints() {
        let path = natural_path(-20.0, 10.0, 80.0, -40.0, 2, 99);
        let points = path.sample(8);
        assert_eq!(points.len(), 9);
        assert!((points[0] - path.start).length() < 1e-4);
        assert!((points[8] - path.end).length() < 1e-4);
        assert!((path.tangent_at(0.5).length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn different_seeds_bend_differently() {
        let first = natural_path(0.0, 0.0, 100.0, 0.0, 2, 1);
        let second = natural_path(0.0, 0.0, 100.0, 0.0, 2, 2);
        assert_ne!(first.control_points(), second.control_points());
    }

    proptest! {
        #[test]
        fn same_arguments_give_bit_identical_paths(
            x1 in -500.0f32..500.0,
            y1 in -500.0f32..500.0,
            x2 in -500.0f32..500.0,
            y2 in -500.0f32..500.0,
            depth in 1u32..6,
            seed in any::<u32>(),
        ) {
            let first = natural_path(x1, y1, x2, y2, depth, seed);
            let second = natural_path(x1, y1, x2, y2, depth, seed);
            let first_bits = first.control_points().iter().map(|p| (p.x.to_bits(), p.y.to_bits())).collect::<Vec<_>>();
            let second_bits = second.control_points().iter().map(|p| (p.x.to_bits(), p.y.to_bits())).collect::<Vec<_>>();
            prop_assert_eq!(first_bits, second_bits);
            prop_assert_eq!(first.path_data(), second.path_data());
        }
    }
}
