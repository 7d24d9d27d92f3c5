//! Turns one settled frame of the session into keyed scene elements.

use std::collections::HashSet;

use eframe::egui::{Color32, Stroke, Vec2, vec2};

use crate::mindmap::{IconKind, Node, ROOT_ID};
use crate::util::{SeededRng, edge_seed, short_label, stable_hash};

use super::super::animation::{DayNightCycle, Wind};
use super::super::physics::{LayoutMode, seed};
use super::super::procedural::{
    DecorKind, Decoration, NaturalPath, branch_thickness, crown_branches, decorate_edge,
    growth_progress, natural_path, trunk_outline,
};
use super::super::render_utils::{blend_color, node_radius, shade, with_alpha};
use super::super::scene::{ElementKey, Layer, SceneElement};
use super::super::session::Session;

const CURVE_SEGMENTS: usize = 14;
const LABEL_CHARS: usize = 24;
const HILL_COUNT: usize = 3;
const GROVE_COUNT: usize = 9;
const WORLD_HALF_WIDTH: f32 = 2400.0;

const SPIDER_SKY_TOP: Color32 = Color32::from_rgb(19, 23, 29);
const SPIDER_SKY_BOTTOM: Color32 = Color32::from_rgb(27, 33, 42);
const SPIDER_LINK: Color32 = Color32::from_rgb(118, 136, 156);
const BARK: Color32 = Color32::from_rgb(96, 68, 44);
const SOIL: Color32 = Color32::from_rgb(82, 62, 42);
const HILL: Color32 = Color32::from_rgb(86, 128, 82);
const GROVE: Color32 = Color32::from_rgb(58, 96, 64);
const LEAF_GREENS: [Color32; 3] = [
    Color32::from_rgb(84, 150, 76),
    Color32::from_rgb(112, 172, 84),
    Color32::from_rgb(66, 128, 70),
];
const SELECTED_RING: Color32 = Color32::from_rgb(255, 244, 214);
const MATCH_RING: Color32 = Color32::from_rgb(245, 196, 70);
const SUN: Color32 = Color32::from_rgb(255, 222, 128);
const MOON: Color32 = Color32::from_rgb(226, 232, 246);

#[derive(Clone, Copy, Default)]
pub(in crate::app) struct FrameStyle<'a> {
    pub(in crate::app) selected: Option<&'a str>,
    pub(in crate::app) hovered: Option<&'a str>,
    pub(in crate::app) matches: Option<&'a HashSet<String>>,
}

pub(in crate::app) fn satellite_offset(radius: f32) -> Vec2 {
    vec2(radius * 0.78, -radius * 0.78)
}

pub(in crate::app) const SATELLITE_RADIUS: f32 = 5.0;

type Frame = Vec<(ElementKey, SceneElement)>;

pub(in crate::app) fn compose_frame(session: &Session, style: FrameStyle<'_>) -> Frame {
    let mut frame = Vec::new();
    let seed_mode = session.mode() == LayoutMode::Seed;
    let ambient = if seed_mode { session.day.sky().ambient } else { 1.0 };

    push_background(&mut frame, seed_mode, &session.day);
    if seed_mode {
        push_trunk(&mut frame, session, ambient);
    }
    push_links(&mut frame, session, seed_mode, ambient);
    push_nodes(&mut frame, session, style, seed_mode, ambient);
    frame
}

fn push(frame: &mut Frame, layer: Layer, id: String, element: SceneElement) {
    frame.push((ElementKey::new(layer, id), element));
}

fn push_background(frame: &mut Frame, seed_mode: bool, day: &DayNightCycle) {
    if !seed_mode {
        push(
            frame,
            Layer::Background,
            "sky".into(),
            SceneElement::Sky {
                top: SPIDER_SKY_TOP,
                bottom: SPIDER_SKY_BOTTOM,
            },
        );
        return;
    }

    let sky = day.sky();
    push(
        frame,
        Layer::Background,
        "sky".into(),
        SceneElement::Sky {
            top: sky.top,
            bottom: sky.bottom,
        },
    );

    let celestial = day.celestial();
    push(
        frame,
        Layer::Background,
        "celestial".into(),
        SceneElement::Disc {
            at: celestial.position,
            radius: if celestial.is_sun { 24.0 } else { 16.0 },
            color: if celestial.is_sun { SUN } else { MOON },
        },
    );

    for hill in 0..HILL_COUNT {
        let mut rng = SeededRng::for_id(&format!("hill-{hill}"));
        let center = rng.range(-900.0, 900.0);
        let half_width = rng.range(500.0, 900.0);
        let height = rng.range(50.0, 120.0);
        let base = seed::GROUND_Y + 2.0;
        let columns = 24;
        let (top, bottom): (Vec<_>, Vec<_>) = (0..=columns)
            .map(|column| {
                let t = column as f32 / columns as f32;
                let x = center - half_width + 2.0 * half_width * t;
                let rise = (t * std::f32::consts::PI).sin().max(0.0).powf(1.6) * height;
                (vec2(x, base - rise), vec2(x, base))
            })
            .unzip();
        let tint = 0.75 + 0.1 * hill as f32;
        push(
            frame,
            Layer::Background,
            format!("hill-{hill}"),
            SceneElement::Ribbon {
                left: top,
                right: bottom,
                fill: shade(HILL, day.sky().ambient * tint),
            },
        );
    }

    for tree in 0..GROVE_COUNT {
        let mut rng = SeededRng::for_id(&format!("grove-{tree}"));
        let x = rng.range(-WORLD_HALF_WIDTH * 0.5, WORLD_HALF_WIDTH * 0.5);
        let height = rng.range(30.0, 70.0);
        let width = height * rng.range(0.35, 0.5);
        let base = vec2(x, seed::GROUND_Y - rng.range(4.0, 30.0));
        push(
            frame,
            Layer::Background,
            format!("grove-{tree}"),
            SceneElement::Polygon {
                points: vec![
                    base + vec2(-width * 0.5, 0.0),
                    base + vec2(0.0, -height),
                    base + vec2(width * 0.5, 0.0),
                ],
                fill: shade(GROVE, day.sky().ambient * 0.85),
                stroke: Stroke::NONE,
            },
        );
    }

    push(
        frame,
        Layer::Background,
        "soil".into(),
        SceneElement::Polygon {
            points: vec![
                vec2(-WORLD_HALF_WIDTH, seed::GROUND_Y),
                vec2(WORLD_HALF_WIDTH, seed::GROUND_Y),
                vec2(WORLD_HALF_WIDTH, seed::GROUND_Y + WORLD_HALF_WIDTH),
                vec2(-WORLD_HALF_WIDTH, seed::GROUND_Y + WORLD_HALF_WIDTH),
            ],
            fill: shade(SOIL, day.sky().ambient),
            stroke: Stroke::NONE,
        },
    );
}

fn push_trunk(frame: &mut Frame, session: &Session, ambient: f32) {
    if session.map.is_seed() && !session.is_sprouting() {
        return;
    }
    let Some(top) = session.layout.position(ROOT_ID) else {
        return;
    };

    let progress = growth_progress(session.visible().nodes.len());
    let trunk_seed = stable_hash("trunk");
    let outline = trunk_outline(top, seed::GROUND_Y, progress, trunk_seed);
    let half = outline.len() / 2;
    let left = outline[..half].to_vec();
    let right = outline[half..].iter().rev().copied().collect::<Vec<_>>();
    let bark = shade(BARK, ambient);
    push(
        frame,
        Layer::Trunk,
        "trunk".into(),
        SceneElement::Ribbon { left, right, fill: bark },
    );

    for branch in crown_branches(top, progress, trunk_seed) {
        let sway = session.wind.sway(branch.path.end, 1);
        let swayed = branch.path.displaced(sway * 0.6);
        push(
            frame,
            Layer::Trunk,
            format!("crown:{}", branch.index),
            SceneElement::Polyline {
                points: swayed.sample(CURVE_SEGMENTS),
                width: branch.width,
                color: bark,
            },
        );

        let decorations = decorate_edge(&branch.path, 2, true, trunk_seed.wrapping_add(branch.index as u32));
        push_decorations(
            frame,
            Layer::Trunk,
            &format!("crown-{}", branch.index),
            &decorations,
            &session.wind,
            2,
            ambient,
        );
    }
}

fn push_decorations(
    frame: &mut Frame,
    layer: Layer,
    owner: &str,
    decorations: &[Decoration],
    wind: &Wind,
    depth: u32,
    ambient: f32,
) {
    for (index, decoration) in decorations.iter().enumerate() {
        let sway = wind.sway(decoration.anchor, depth) * 0.5;
        match decoration.kind {
            DecorKind::Twig => push(
                frame,
                layer,
                format!("twig:{owner}:{index}"),
                SceneElement::Polyline {
                    points: decoration.twig_segment(sway).to_vec(),
                    width: 1.1,
                    color: shade(BARK, ambient),
                },
            ),
            DecorKind::Leaf => push(
                frame,
                layer,
                format!("leaf:{owner}:{index}"),
                SceneElement::Polygon {
                    points: decoration.leaf_outline(sway),
                    fill: shade(LEAF_GREENS[index % LEAF_GREENS.len()], ambient),
                    stroke: Stroke::NONE,
                },
            ),
        }
    }
}

fn push_links(frame: &mut Frame, session: &Session, seed_mode: bool, ambient: f32) {
    let visible = session.visible();
    let depth_by_id = session.depths();
    let weights = session.weights();
    let parents = visible
        .links
        .iter()
        .map(|link| link.source.as_str())
        .collect::<HashSet<_>>();

    for link in &visible.links {
        let (Some(start), Some(end)) = (
            session.layout.position(&link.source),
            session.layout.position(&link.target),
        ) else {
            continue;
        };

        let depth = depth_by_id.get(&link.target).copied().unwrap_or(1).max(1);
        let seed = edge_seed(&link.source, &link.target);
        let path = natural_path(start.x, start.y, end.x, end.y, depth, seed);
        let owner = format!("{}>{}", link.source, link.target);

        if !seed_mode {
            push(
                frame,
                Layer::Links,
                format!("branch:{owner}"),
                SceneElement::Polyline {
                    points: path.sample(CURVE_SEGMENTS),
                    width: 1.4,
                    color: with_alpha(SPIDER_LINK, 0.7),
                },
            );
            continue;
        }

        let weight = weights.get(&link.target).copied().unwrap_or(1);
        let swayed: NaturalPath = path.displaced(session.wind.sway(end, depth) * 0.4);
        push(
            frame,
            Layer::Links,
            format!("branch:{owner}"),
            SceneElement::Polyline {
                points: swayed.sample(CURVE_SEGMENTS),
                width: branch_thickness(weight),
                color: shade(BARK, ambient),
            },
        );

        let is_leaf_edge = !parents.contains(link.target.as_str());
        let decorations = decorate_edge(&path, depth, is_leaf_edge, seed);
        push_decorations(frame, Layer::Links, &owner, &decorations, &session.wind, depth, ambient);
    }
}

fn node_fill(node: &Node, style: FrameStyle<'_>, ambient: f32) -> Color32 {
    let base = shade(node.color, 0.55 + 0.45 * ambient);
    let dimmed = style
        .matches
        .is_some_and(|matches| !matches.is_empty() && !matches.contains(&node.id));
    if dimmed {
        return blend_color(base, Color32::from_rgb(40, 44, 52), 0.55);
    }
    if style.hovered == Some(node.id.as_str()) {
        return blend_color(base, Color32::WHITE, 0.18);
    }
    base
}

fn push_nodes(frame: &mut Frame, session: &Session, style: FrameStyle<'_>, seed_mode: bool, ambient: f32) {
    let visible = session.visible();
    let label_color = if seed_mode && ambient > 0.6 {
        Color32::from_rgb(34, 30, 26)
    } else {
        Color32::from_rgb(232, 236, 240)
    };

    for node in &visible.nodes {
        let Some(center) = session.layout.position(&node.id) else {
            continue;
        };
        let radius = node_radius(node.val);
        let id = &node.id;

        let stroke = if style.selected == Some(id.as_str()) {
            Stroke::new(2.5, SELECTED_RING)
        } else if style.matches.is_some_and(|matches| matches.contains(id)) {
            Stroke::new(2.0, MATCH_RING)
        } else {
            Stroke::new(1.0, shade(node.color, 0.55))
        };

        if node.icon == IconKind::Seed {
            push(
                frame,
                Layer::Nodes,
                format!("node:{id}"),
                SceneElement::Polygon {
                    points: seed_outline(center, radius),
                    fill: node_fill(node, style, ambient),
                    stroke,
                },
            );
        } else {
            push(
                frame,
                Layer::Nodes,
                format!("node:{id}"),
                SceneElement::Circle {
                    center,
                    radius,
                    fill: node_fill(node, style, ambient),
                    stroke,
                },
            );
        }

        let has_children = session.map.has_children(id);
        let satellite_fill = match (has_children, node.collapsed) {
            (true, true) => Color32::from_rgb(236, 150, 64),
            (true, false) => Color32::from_rgb(110, 190, 120),
            (false, _) => Color32::from_rgb(150, 156, 166),
        };
        let satellite = center + satellite_offset(radius);
        push(
            frame,
            Layer::Nodes,
            format!("sat:{id}"),
            SceneElement::Circle {
                center: satellite,
                radius: SATELLITE_RADIUS,
                fill: satellite_fill,
                stroke: Stroke::new(1.0, Color32::from_rgb(30, 32, 36)),
            },
        );
        push(
            frame,
            Layer::Nodes,
            format!("sat-glyph:{id}"),
            SceneElement::Label {
                anchor: satellite - vec2(0.0, SATELLITE_RADIUS + 1.0),
                text: (if has_children && !node.collapsed { "−" } else { "+" }).to_owned(),
                size: 10.0,
                color: Color32::from_rgb(20, 22, 26),
            },
        );

        push(
            frame,
            Layer::Nodes,
            format!("label:{id}"),
            SceneElement::Label {
                anchor: center + vec2(0.0, radius + 3.0),
                text: short_label(&node.name, LABEL_CHARS),
                size: if node.id == ROOT_ID { 14.0 } else { 12.0 },
                color: label_color,
            },
        );
    }
}

fn seed_outline(center: Vec2, radius: f32) -> Vec<Vec2> {
    (0..16)
        .map(|step| {
            let angle = step as f32 / 16.0 * std::f32::consts::TAU;
            let stretch = if angle.sin() < 0.0 { 1.35 } else { 1.0 };
            center + vec2(angle.cos() * radius * 0.8, angle.sin() * radius * stretch)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;

    use crate::app::session::SessionConfig;
    use crate::mindmap::{Unconfigured, demo_corpus};

    fn session(mode: LayoutMode) -> Session {
        let mut session = Session::new(SessionConfig {
            corpus: demo_corpus(Utc::now()),
            mode,
            query_service: Arc::new(Unconfigured),
            summary_service: Arc::new(Unconfigured),
            batches: Vec::new(),
        });
        let a = session.add_child(ROOT_ID).unwrap_or_default();
        session.add_child(&a);
        session.add_child(ROOT_ID);
        for _ in 0..150 {
            session.step(1.0 / 60.0);
        }
        session
    }

    fn ids(frame: &Frame, layer: Layer) -> HashSet<String> {
        frame
            .iter()
            .filter(|(key, _)| key.layer == layer)
            .map(|(key, _)| key.id.clone())
            .collect()
    }

    #[test]
    fn seed_frame_has_every_layer() {
        let session = session(LayoutMode::Seed);
        let frame = compose_frame(&session, FrameStyle::default());

        assert!(ids(&frame, Layer::Background).contains("sky"));
        assert!(ids(&frame, Layer::Trunk).contains("trunk"));
        assert!(ids(&frame, Layer::Links).iter().any(|id| id.starts_with("leaf:")));
        let nodes = ids(&frame, Layer::Nodes);
        for node in &session.visible().nodes {
            assert!(nodes.contains(&format!("node:{}", node.id)));
            assert!(nodes.contains(&format!("sat:{}", node.id)));
        }
    }

    #[test]
    fn spider_frame_skips_tree_decor() {
        let session = session(LayoutMode::Spider);
        let frame = compose_frame(&session, FrameStyle::default());
        assert!(ids(&frame, Layer::Trunk).is_empty());
        assert!(!ids(&frame, Layer::Links).iter().any(|id| id.starts_with("leaf:")));
        assert_eq!(
            ids(&frame, Layer::Links).len(),
            session.visible().links.len()
        );
    }

    #[test]
    fn keys_are_unique_per_frame() {
        let session = session(LayoutMode::Seed);
        let frame = compose_frame(&session, FrameStyle::default());
        let unique = frame.iter().map(|(key, _)| key.clone()).collect::<HashSet<_>>();
        assert_eq!(unique.len(), frame.len());
    }

    fn coordinates(element: &SceneElement) -> Vec<Vec2> {
        match element {
            SceneElement::Sky { .. } => Vec::new(),
            SceneElement::Disc { at, .. } => vec![*at],
            SceneElement::Polygon { points, .. } | SceneElement::Polyline { points, .. } => points.clone(),
            SceneElement::Ribbon { left, right, .. } => left.iter().chain(right).copied().collect(),
            SceneElement::Circle { center, .. } => vec![*center],
            SceneElement::Label { anchor, .. } => vec![*anchor],
        }
    }

    #[test]
    fn every_composed_point_is_finite() {
        for mode in [LayoutMode::Seed, LayoutMode::Spider] {
            let session = session(mode);
            for (key, element) in compose_frame(&session, FrameStyle::default()) {
                for point in coordinates(&element) {
                    assert!(point.x.is_finite() && point.y.is_finite(), "{key:?} has {point:?}");
                }
            }
        }
    }

    #[test]
    fn hill_ridges_end_on_the_ground() {
        let session = session(LayoutMode::Seed);
        let frame = compose_frame(&session, FrameStyle::default());
        for hill in 0..HILL_COUNT {
            let id = format!("hill-{hill}");
            let Some((_, SceneElement::Ribbon { left, .. })) = frame.iter().find(|(key, _)| key.id == id)
            else {
                panic!("{id} missing");
            };
            let last = left.last().copied().unwrap_or_default();
            assert!((last.y - (seed::GROUND_Y + 2.0)).abs() < 1e-3, "{id} ends at {last:?}");
        }
    }

    #[test]
    fn same_state_composes_identically() {
        let session = session(LayoutMode::Seed);
        let first = compose_frame(&session, FrameStyle::default());
        let second = compose_frame(&session, FrameStyle::default());
        assert_eq!(first, second);
    }
}
