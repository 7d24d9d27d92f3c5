use eframe::egui::{self, PointerButton, Pos2, Rect, Ui, Vec2};

use super::super::animation::{FocusTween, MAX_ZOOM, MIN_ZOOM};
use super::super::render_utils::{node_radius, screen_to_world};
use super::super::{ContextMenu, DragTarget, ViewModel};
use super::compose::{SATELLITE_RADIUS, satellite_offset};

const SATELLITE_SLOP: f32 = 3.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) enum Hit {
    Satellite(String),
    Body(String),
    Empty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) enum ClickAction {
    ToggleExpand(String),
    Select(String),
    OpenMenu(String),
    Dismiss,
}

/// Topmost hit under `pointer`. Candidates are in paint order, so later
/// entries win. A satellite always beats the body it is attached to.
pub(in crate::app) fn hit_test<'a>(
    candidates: impl IntoIterator<Item = (&'a str, Vec2, f32)>,
    pointer: Vec2,
    zoom: f32,
) -> Hit {
    let slop = SATELLITE_SLOP / zoom.max(f32::EPSILON);
    let mut hit = Hit::Empty;
    for (id, center, radius) in candidates {
        let satellite = center + satellite_offset(radius);
        if (satellite - pointer).length() <= SATELLITE_RADIUS + slop {
            hit = Hit::Satellite(id.to_owned());
        } else if (center - pointer).length() <= radius {
            hit = Hit::Body(id.to_owned());
        }
    }
    hit
}

pub(in crate::app) fn route_click(button: PointerButton, hit: Hit) -> ClickAction {
    match (button, hit) {
        (PointerButton::Primary, Hit::Satellite(id)) => ClickAction::ToggleExpand(id),
        (PointerButton::Primary, Hit::Body(id)) => ClickAction::Select(id),
        (PointerButton::Secondary, Hit::Satellite(id) | Hit::Body(id)) => ClickAction::OpenMenu(id),
        _ => ClickAction::Dismiss,
    }
}

impl ViewModel {
    pub(in crate::app) fn pointer_hit(&self, rect: Rect, pointer: Pos2) -> Hit {
        let world = screen_to_world(rect, self.viewport, pointer);
        let candidates = self.session.visible().nodes.iter().filter_map(|node| {
            let center = self.session.layout.position(&node.id)?;
            Some((node.id.as_str(), center, node_radius(node.val)))
        });
        hit_test(candidates, world, self.viewport.zoom)
    }

    pub(in crate::app) fn handle_graph_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) -> bool {
        if !response.hovered() {
            return false;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return false;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.viewport, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.viewport.zoom = (self.viewport.zoom * zoom_factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.viewport.pan = pointer - rect.center() - (world_before * self.viewport.zoom);
        self.focus = None;
        self.pending_focus = None;
        true
    }

    pub(in crate::app) fn handle_graph_drag(&mut self, rect: Rect, response: &egui::Response) -> bool {
        if response.dragged_by(PointerButton::Secondary) || response.dragged_by(PointerButton::Middle) {
            self.pan_by(response.drag_delta());
            return true;
        }

        if response.drag_started_by(PointerButton::Primary)
            && let Some(pointer) = response.interact_pointer_pos()
        {
            self.drag = match self.pointer_hit(rect, pointer) {
                Hit::Body(id) => {
                    let world = screen_to_world(rect, self.viewport, pointer);
                    self.session.layout.begin_drag(&id, world);
                    Some(DragTarget::Node)
                }
                _ => Some(DragTarget::Canvas),
            };
        }

        let mut panned = false;
        if response.dragged_by(PointerButton::Primary) {
            match self.drag {
                Some(DragTarget::Node) => {
                    if let Some(pointer) = response.interact_pointer_pos() {
                        let world = screen_to_world(rect, self.viewport, pointer);
                        self.session.layout.drag_to(world);
                    }
                }
                Some(DragTarget::Canvas) => {
                    self.pan_by(response.drag_delta());
                    panned = true;
                }
                None => {}
            }
        }

        if response.drag_stopped() {
            if self.drag == Some(DragTarget::Node) {
                self.session.layout.end_drag();
            }
            self.drag = None;
        }
        panned
    }

    pub(in crate::app) fn handle_graph_clicks(&mut self, rect: Rect, response: &egui::Response) {
        let button = if response.clicked() {
            PointerButton::Primary
        } else if response.secondary_clicked() {
            PointerButton::Secondary
        } else {
            return;
        };
        let Some(pointer) = response.interact_pointer_pos() else {
            return;
        };

        match route_click(button, self.pointer_hit(rect, pointer)) {
            ClickAction::ToggleExpand(id) => {
                self.session.toggle_expand(&id);
            }
            ClickAction::Select(id) => {
                self.context_menu = None;
                self.set_selected(Some(id));
            }
            ClickAction::OpenMenu(id) => {
                let rename = self
                    .session
                    .map
                    .node(&id)
                    .map(|node| node.name.clone())
                    .unwrap_or_default();
                self.context_menu = Some(ContextMenu {
                    node_id: id,
                    screen_pos: pointer,
                    rename,
                });
            }
            ClickAction::Dismiss => {
                self.context_menu = None;
                self.set_selected(None);
            }
        }
    }

    /// Eases the viewport so `node_id` ends up centered. A node the layout
    /// has not placed yet is focused after the next step.
    pub(in crate::app) fn focus_on(&mut self, node_id: &str) {
        match self.session.layout.position(node_id) {
            Some(world) => {
                self.focus = Some(FocusTween::toward(self.viewport, world));
                self.pending_focus = None;
            }
            None => self.pending_focus = Some(node_id.to_owned()),
        }
    }

    pub(in crate::app) fn resume_pending_focus(&mut self) {
        let Some(node_id) = self.pending_focus.take() else {
            return;
        };
        if self.session.layout.position(&node_id).is_some() {
            self.focus_on(&node_id);
        } else if self.session.map.contains(&node_id) {
            self.pending_focus = Some(node_id);
        }
    }

    fn pan_by(&mut self, delta: Vec2) {
        self.viewport.pan += delta;
        self.focus = None;
        self.pending_focus = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use eframe::egui::vec2;

    use crate::app::physics::LayoutMode;
    use crate::app::session::{Session, SessionConfig};
    use crate::mindmap::{ROOT_ID, Unconfigured, demo_corpus};

    fn candidates() -> Vec<(&'static str, Vec2, f32)> {
        vec![("a", vec2(0.0, 0.0), 10.0), ("b", vec2(100.0, 0.0), 10.0)]
    }

    #[test]
    fn satellite_and_body_are_distinct_targets() {
        let satellite = satellite_offset(10.0);
        assert_eq!(hit_test(candidates(), satellite, 1.0), Hit::Satellite("a".to_owned()));
        assert_eq!(hit_test(candidates(), vec2(-3.0, 2.0), 1.0), Hit::Body("a".to_owned()));
        assert_eq!(hit_test(candidates(), vec2(50.0, 40.0), 1.0), Hit::Empty);
    }

    #[test]
    fn later_candidates_are_on_top() {
        let overlapping = vec![("under", vec2(0.0, 0.0), 10.0), ("over", vec2(4.0, 0.0), 10.0)];
        assert_eq!(hit_test(overlapping, vec2(2.0, 0.0), 1.0), Hit::Body("over".to_owned()));
    }

    #[test]
    fn focus_on_an_unplaced_child_waits_for_the_layout() {
        let session = Session::new(SessionConfig {
            corpus: demo_corpus(Utc::now()),
            mode: LayoutMode::Seed,
            query_service: Arc::new(Unconfigured),
            summary_service: Arc::new(Unconfigured),
            batches: Vec::new(),
        });
        let mut model = ViewModel::new(session, String::new());
        let child = model.session.add_child(ROOT_ID).expect("child");

        model.focus_on(&child);
        assert!(model.focus.is_none());
        assert_eq!(model.pending_focus.as_deref(), Some(child.as_str()));

        model.session.step(1.0 / 60.0);
        model.resume_pending_focus();
        assert!(model.focus.is_some());
        assert!(model.pending_focus.is_none());
    }

    #[test]
    fn deleted_nodes_drop_their_pending_focus() {
        let session = Session::new(SessionConfig {
            corpus: demo_corpus(Utc::now()),
            mode: LayoutMode::Spider,
            query_service: Arc::new(Unconfigured),
            summary_service: Arc::new(Unconfigured),
            batches: Vec::new(),
        });
        let mut model = ViewModel::new(session, String::new());
        let child = model.session.add_child(ROOT_ID).expect("child");
        model.focus_on(&child);
        model.session.delete(&child);

        model.session.step(1.0 / 60.0);
        model.resume_pending_focus();
        assert!(model.focus.is_none());
        assert!(model.pending_focus.is_none());
    }

    #[test]
    fn satellite_click_never_selects() {
        assert_eq!(
            route_click(PointerButton::Primary, Hit::Satellite("a".to_owned())),
            ClickAction::ToggleExpand("a".to_owned())
        );
        assert_eq!(
            route_click(PointerButton::Primary, Hit::Body("a".to_owned())),
            ClickAction::Select("a".to_owned())
        );
        assert_eq!(
            route_click(PointerButton::Secondary, Hit::Satellite("a".to_owned())),
            ClickAction::OpenMenu("a".to_owned())
        );
        assert_eq!(route_click(PointerButton::Primary, Hit::Empty), ClickAction::Dismiss);
        assert_eq!(route_click(PointerButton::Middle, Hit::Body("a".to_owned())), ClickAction::Dismiss);
    }
}
