//! Retained scene: elements keyed by stable ids, reconciled frame to frame.

use std::collections::HashMap;
use std::fmt::Write as _;

use eframe::egui::{Align2, Color32, FontId, Mesh, Painter, Pos2, Rect, Shape, Stroke, Vec2, pos2};

use super::animation::Viewport;
use super::render_utils::world_to_screen;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(in crate::app) enum Layer {
    Background,
    Links,
    Trunk,
    Nodes,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(in crate::app) struct ElementKey {
    pub(in crate::app) layer: Layer,
    pub(in crate::app) id: String,
}

impl ElementKey {
    pub(in crate::app) fn new(layer: Layer, id: impl Into<String>) -> Self {
        Self { layer, id: id.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) enum SceneElement {
    Sky { top: Color32, bottom: Color32 },
    Disc { at: Vec2, radius: f32, color: Color32 },
    Polygon { points: Vec<Vec2>, fill: Color32, stroke: Stroke },
    Ribbon { left: Vec<Vec2>, right: Vec<Vec2>, fill: Color32 },
    Polyline { points: Vec<Vec2>, width: f32, color: Color32 },
    Circle { center: Vec2, radius: f32, fill: Color32, stroke: Stroke },
    Label { anchor: Vec2, text: String, size: f32, color: Color32 },
}

impl SceneElement {
    fn is_label(&self) -> bool {
        matches!(self, Self::Label { .. })
    }
}

pub(in crate::app) trait RenderSurface {
    fn create(&mut self, key: &ElementKey, element: &SceneElement);
    fn update(&mut self, key: &ElementKey, element: &SceneElement);
    fn remove(&mut self, key: &ElementKey);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct ReconcileStats {
    pub(in crate::app) created: usize,
    pub(in crate::app) updated: usize,
    pub(in crate::app) removed: usize,
    pub(in crate::app) unchanged: usize,
}

/// Diffs each frame against the previous one and forwards only the
/// differences to a surface.
#[derive(Default)]
pub(in crate::app) struct Reconciler {
    previous: HashMap<ElementKey, SceneElement>,
}

impl Reconciler {
    pub(in crate::app) fn apply(
        &mut self,
        frame: Vec<(ElementKey, SceneElement)>,
        surface: &mut impl RenderSurface,
    ) -> ReconcileStats {
        let mut stats = ReconcileStats::default();
        let mut current = HashMap::with_capacity(frame.len());
        let mut order = Vec::with_capacity(frame.len());
        for (key, element) in frame {
            if current.insert(key.clone(), element).is_none() {
                order.push(key);
            }
        }

        for key in &order {
            let Some(element) = current.get(key) else {
                continue;
            };
            match self.previous.remove(key) {
                None => {
                    surface.create(key, element);
                    stats.created += 1;
                }
                Some(previous) if previous != *element => {
                    surface.update(key, element);
                    stats.updated += 1;
                }
                Some(_) => stats.unchanged += 1,
            }
        }

        let mut stale = self.previous.drain().map(|(key, _)| key).collect::<Vec<_>>();
        stale.sort_unstable();
        for key in &stale {
            surface.remove(key);
        }
        stats.removed = stale.len();

        self.previous = current;
        stats
    }
}

/// The surface used on screen and for export. Within a layer, elements keep
/// creation order and labels draw last.
#[derive(Default)]
pub(in crate::app) struct RetainedScene {
    elements: HashMap<ElementKey, (u64, SceneElement)>,
    next_order: u64,
}

impl RenderSurface for RetainedScene {
    fn create(&mut self, key: &ElementKey, element: &SceneElement) {
        self.elements.insert(key.clone(), (self.next_order, element.clone()));
        self.next_order += 1;
    }

    fn update(&mut self, key: &ElementKey, element: &SceneElement) {
        match self.elements.get_mut(key) {
            Some((_, slot)) => *slot = element.clone(),
            None => self.create(key, element),
        }
    }

    fn remove(&mut self, key: &ElementKey) {
        self.elements.remove(key);
    }
}

impl RetainedScene {
    pub(in crate::app) fn len(&self) -> usize {
        self.elements.len()
    }

    #[cfg(test)]
    pub(in crate::app) fn get(&self, key: &ElementKey) -> Option<&SceneElement> {
        self.elements.get(key).map(|(_, element)| element)
    }

    fn draw_order(&self) -> Vec<(&ElementKey, &SceneElement)> {
        let mut ordered = self
            .elements
            .iter()
            .map(|(key, (order, element))| (key.layer, element.is_label(), *order, key, element))
            .collect::<Vec<_>>();
        ordered.sort_by_key(|(layer, is_label, order, _, _)| (*layer, *is_label, *order));
        ordered
            .into_iter()
            .map(|(_, _, _, key, element)| (key, element))
            .collect()
    }

    pub(in crate::app) fn paint(&self, painter: &Painter, rect: Rect, viewport: Viewport) {
        let to_screen = |world: Vec2| world_to_screen(rect, viewport, world);
        let zoom = viewport.zoom;

        for (_, element) in self.draw_order() {
            match element {
                SceneElement::Sky { top, bottom } => {
                    let mut mesh = Mesh::default();
                    mesh.colored_vertex(rect.left_top(), *top);
                    mesh.colored_vertex(rect.right_top(), *top);
                    mesh.colored_vertex(rect.right_bottom(), *bottom);
                    mesh.colored_vertex(rect.left_bottom(), *bottom);
                    mesh.add_triangle(0, 1, 2);
                    mesh.add_triangle(0, 2, 3);
                    painter.add(Shape::mesh(mesh));
                }
                SceneElement::Disc { at, radius, color } => {
                    let center = pos2(
                        rect.left() + rect.width() * at.x,
                        rect.top() + rect.height() * at.y,
                    );
                    painter.circle_filled(center, *radius, *color);
                }
                SceneElement::Polygon { points, fill, stroke } => {
                    let points = points.iter().map(|point| to_screen(*point)).collect::<Vec<_>>();
                    painter.add(Shape::convex_polygon(points, *fill, scaled_stroke(*stroke, zoom)));
                }
                SceneElement::Ribbon { left, right, fill } => {
                    painter.add(Shape::mesh(ribbon_mesh(left, right, *fill, &to_screen)));
                }
                SceneElement::Polyline { points, width, color } => {
                    let points = points.iter().map(|point| to_screen(*point)).collect::<Vec<_>>();
                    painter.add(Shape::line(points, Stroke::new((width * zoom).max(0.6), *color)));
                }
                SceneElement::Circle { center, radius, fill, stroke } => {
                    painter.circle(to_screen(*center), radius * zoom, *fill, scaled_stroke(*stroke, zoom));
                }
                SceneElement::Label { anchor, text, size, color } => {
                    painter.text(
                        to_screen(*anchor),
                        Align2::CENTER_TOP,
                        text,
                        FontId::proportional(*size),
                        *color,
                    );
                }
            }
        }
    }

    pub(in crate::app) fn to_svg(&self, size: Vec2, viewport: Viewport) -> String {
        let rect = Rect::from_min_size(Pos2::ZERO, size);
        let to_screen = |world: Vec2| world_to_screen(rect, viewport, world);
        let zoom = viewport.zoom;
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">"#,
            w = size.x,
            h = size.y
        );
        let mut gradients = 0usize;

        for (key, element) in self.draw_order() {
            let _ = match element {
                SceneElement::Sky { top, bottom } => {
                    gradients += 1;
                    writeln!(
                        svg,
                        r#"<defs><linearGradient id="sky{gradients}" x1="0" y1="0" x2="0" y2="1"><stop offset="0" {}/><stop offset="1" {}/></linearGradient></defs><rect width="100%" height="100%" fill="url(#sky{gradients})" data-id="{}"/>"#,
                        stop_color(*top),
                        stop_color(*bottom),
                        escape(&key.id)
                    )
                }
                SceneElement::Disc { at, radius, color } => writeln!(
                    svg,
                    r#"<circle cx="{:.2}" cy="{:.2}" r="{radius:.2}" {}/>"#,
                    size.x * at.x,
                    size.y * at.y,
                    paint_attr("fill", *color)
                ),
                SceneElement::Polygon { points, fill, stroke } => writeln!(
                    svg,
                    r#"<polygon points="{}" {} {}/>"#,
                    svg_points(points.iter().map(|point| to_screen(*point))),
                    paint_attr("fill", *fill),
                    stroke_attr(scaled_stroke(*stroke, zoom))
                ),
                SceneElement::Ribbon { left, right, fill } => writeln!(
                    svg,
                    r#"<polygon points="{}" {}/>"#,
                    svg_points(left.iter().chain(right.iter().rev()).map(|point| to_screen(*point))),
                    paint_attr("fill", *fill)
                ),
                SceneElement::Polyline { points, width, color } => writeln!(
                    svg,
                    r#"<polyline points="{}" fill="none" {} stroke-width="{:.2}" stroke-linecap="round"/>"#,
                    svg_points(points.iter().map(|point| to_screen(*point))),
                    paint_attr("stroke", *color),
                    (width * zoom).max(0.6)
                ),
                SceneElement::Circle { center, radius, fill, stroke } => {
                    let center = to_screen(*center);
                    writeln!(
                        svg,
                        r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" {} {}/>"#,
                        center.x,
                        center.y,
                        radius * zoom,
                        paint_attr("fill", *fill),
                        stroke_attr(scaled_stroke(*stroke, zoom))
                    )
                }
                SceneElement::Label { anchor, text, size, color } => {
                    let anchor = to_screen(*anchor);
                    writeln!(
                        svg,
                        r#"<text x="{:.2}" y="{:.2}" font-size="{size:.1}" font-family="sans-serif" text-anchor="middle" dominant-baseline="hanging" {}>{}</text>"#,
                        anchor.x,
                        anchor.y,
                        paint_attr("fill", *color),
                        escape(text)
                    )
                }
            };
        }

        svg.push_str("</svg>\n");
        svg
    }
}

fn scaled_stroke(stroke: Stroke, zoom: f32) -> Stroke {
    Stroke::new(stroke.width * zoom.sqrt(), stroke.color)
}

fn ribbon_mesh(left: &[Vec2], right: &[Vec2], fill: Color32, to_screen: &dyn Fn(Vec2) -> Pos2) -> Mesh {
    let mut mesh = Mesh::default();
    let rows = left.len().min(right.len());
    for row in 0..rows {
        mesh.colored_vertex(to_screen(left[row]), fill);
        mesh.colored_vertex(to_screen(right[row]), fill);
    }
    for row in 1..rows {
        let base = ((row - 1) * 2) as u32;
        mesh.add_triangle(base, base + 1, base + 2);
        mesh.add_triangle(base + 1, base + 3, base + 2);
    }
    mesh
}

fn svg_points(points: impl Iterator<Item = Pos2>) -> String {
    let mut out = String::new();
    for point in points {
        if !out.is_empty() {
            out.push(' ');
        }
        let _ = write!(out, "{:.2},{:.2}", point.x, point.y);
    }
    out
}

fn paint_attr(attribute: &str, color: Color32) -> String {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    format!(
        r#"{attribute}="rgb({r},{g},{b})" {attribute}-opacity="{:.3}""#,
        f32::from(a) / 255.0
    )
}

fn stop_color(color: Color32) -> String {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    format!(r#"stop-color="rgb({r},{g},{b})" stop-opacity="{:.3}""#, f32::from(a) / 255.0)
}

fn stroke_attr(stroke: Stroke) -> String {
    if stroke.width <= 0.0 || stroke.color.a() == 0 {
        return r#"stroke="none""#.to_owned();
    }
    format!(r#"{} stroke-width="{:.2}""#, paint_attr("stroke", stroke.color), stroke.width)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
