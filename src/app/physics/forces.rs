use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadTree;

const BARNES_HUT_THETA: f32 = 0.9;
const MIN_DISTANCE_SQ: f32 = 1.0;

#[derive(Clone, Copy, Debug)]
pub(super) struct ManyBody {
    pub(super) strength: f32,
    pub(super) max_distance: f32,
}

#[derive(Clone, Copy, Debug)]
pub(super) struct SpringLink {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) distance: f32,
    pub(super) strength: f32,
    pub(super) bias: f32,
}

#[derive(Clone, Copy, Debug)]
pub(super) struct AxisTarget {
    pub(super) value: f32,
    pub(super) strength: f32,
}

fn jiggle(first: usize, second: usize) -> Vec2 {
    let angle = ((first as f32) * 0.618_034 + (second as f32) * 0.414_214 + 0.11)
        * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

pub(super) fn apply_links(
    links: &[SpringLink],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    alpha: f32,
) {
    for link in links {
        let (source, target) = (link.source, link.target);
        if source == target || source >= positions.len() || target >= positions.len() {
            continue;
        }

        let mut delta =
            (positions[target] + velocities[target]) - (positions[source] + velocities[source]);
        if delta.length_sq() < 1e-6 {
            delta = jiggle(source, target) * 1e-3;
        }
        let length = delta.length();
        let correction = delta * ((length - link.distance) / length * alpha * link.strength);

        velocities[target] -= correction * link.bias;
        velocities[source] += correction * (1.0 - link.bias);
    }
}

pub(super) fn apply_many_body(
    tree: &QuadTree,
    positions: &[Vec2],
    velocities: &mut [Vec2],
    params: ManyBody,
    alpha: f32,
) {
    let max_distance_sq = params.max_distance * params.max_distance;
    let scale = params.strength * alpha;
    for (index, velocity) in velocities.iter_mut().enumerate() {
        *velocity += charge_on(tree, index, positions, scale, max_distance_sq);
    }
}

fn charge_on(
    tree: &QuadTree,
    index: usize,
    positions: &[Vec2],
    scale: f32,
    max_distance_sq: f32,
) -> Vec2 {
    if tree.count <= 0.0 {
        return Vec2::ZERO;
    }

    let point = positions[index];
    if tree.is_leaf() {
        let mut total = Vec2::ZERO;
        for &other in &tree.members {
            if other == index {
                continue;
            }
            let mut delta = positions[other] - point;
            let mut distance_sq = delta.length_sq();
            if distance_sq >= max_distance_sq {
                continue;
            }
            if distance_sq < 1e-6 {
                delta = jiggle(index, other);
                distance_sq = 1.0;
            }
            total += delta * (scale / distance_sq.max(MIN_DISTANCE_SQ));
        }
        return total;
    }

    let delta = tree.centroid - point;
    let distance_sq = delta.length_sq();
    let width = tree.cell.width();
    let far_enough = !tree.cell.contains(point)
        && width * width < BARNES_HUT_THETA * BARNES_HUT_THETA * distance_sq;
    if far_enough {
        if distance_sq >= max_distance_sq {
            return Vec2::ZERO;
        }
        return delta * (scale * tree.count / distance_sq.max(MIN_DISTANCE_SQ));
    }

    tree.children()
        .map(|child| charge_on(child, index, positions, scale, max_distance_sq))
        .fold(Vec2::ZERO, |sum, force| sum + force)
}

pub(super) fn apply_collisions(
    tree: &QuadTree,
    predicted: &[Vec2],
    radii: &[f32],
    strength: f32,
    velocities: &mut [Vec2],
) {
    collide_cells(tree, tree, true, predicted, radii, strength, velocities);
}

fn collide_pair(
    first: usize,
    second: usize,
    predicted: &[Vec2],
    radii: &[f32],
    strength: f32,
    velocities: &mut [Vec2],
) {
    let reach = radii[first] + radii[second];
    let mut delta = predicted[first] - predicted[second];
    let mut distance_sq = delta.length_sq();
    if distance_sq >= reach * reach {
        return;
    }
    if distance_sq < 1e-6 {
        delta = jiggle(first, second) * 1e-3;
        distance_sq = delta.length_sq();
    }

    let distance = distance_sq.sqrt();
    let push = delta * ((reach - distance) / distance * strength);
    let first_sq = radii[first] * radii[first];
    let second_sq = radii[second] * radii[second];
    let share = second_sq / (first_sq + second_sq).max(1e-6);

    velocities[first] += push * share;
    velocities[second] -= push * (1.0 - share);
}

fn collide_cells(
    first: &QuadTree,
    second: &QuadTree,
    same_cell: bool,
    predicted: &[Vec2],
    radii: &[f32],
    strength: f32,
    velocities: &mut [Vec2],
) {
    let padding = first.max_radius + second.max_radius;
    if !same_cell && first.cell.gap_sq(second.cell, padding) > 0.0 {
        return;
    }

    if first.is_leaf() && second.is_leaf() {
        if same_cell {
            for (offset, &a) in first.members.iter().enumerate() {
                for &b in &first.members[offset + 1..] {
                    collide_pair(a, b, predicted, radii, strength, velocities);
                }
            }
        } else {
            for &a in &first.members {
                for &b in &second.members {
                    collide_pair(a, b, predicted, radii, strength, velocities);
                }
            }
        }
        return;
    }

    if same_cell {
        let children = first.children().collect::<Vec<_>>();
        for (offset, child) in children.iter().enumerate() {
            collide_cells(child, child, true, predicted, radii, strength, velocities);
            for other in &children[offset + 1..] {
                collide_cells(child, other, false, predicted, radii, strength, velocities);
            }
        }
        return;
    }

    let split_first = !first.is_leaf() && (second.is_leaf() || first.cell.half_extent >= second.cell.half_extent);
    if split_first {
        for child in first.children() {
            collide_cells(child, second, false, predicted, radii, strength, velocities);
        }
    } else {
        for child in second.children() {
            collide_cells(first, child, false, predicted, radii, strength, velocities);
        }
    }
}

pub(super) fn apply_axis_targets(
    positions: &[Vec2],
    velocities: &mut [Vec2],
    targets_x: &[Option<AxisTarget>],
    targets_y: &[Option<AxisTarget>],
    alpha: f32,
) {
    for (index, velocity) in velocities.iter_mut().enumerate() {
        if let Some(Some(target)) = targets_x.get(index) {
            velocity.x += (target.value - positions[index].x) * target.strength * alpha;
        }
        if let Some(Some(target)) = targets_y.get(index) {
            velocity.y += (target.value - positions[index].y) * target.strength * alpha;
        }
    }
}
