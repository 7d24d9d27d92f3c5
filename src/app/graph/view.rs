use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{Sense, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::super::physics::LayoutMode;
use super::super::{SearchMatchCache, ViewModel};
use super::compose::{FrameStyle, compose_frame};
use super::interaction::Hit;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

pub(in crate::app) fn fuzzy_matches(names: &[(String, String)], query: &str) -> HashSet<String> {
    let matcher = SkimMatcherV2::default();
    names
        .iter()
        .filter(|(_, name)| fuzzy_match_score(&matcher, name, query).is_some())
        .map(|(id, _)| id.clone())
        .collect()
}

impl ViewModel {
    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<String>>> {
        let search_query = self.search.trim();
        if search_query.is_empty() {
            return None;
        }

        let names = self
            .session
            .visible()
            .nodes
            .iter()
            .map(|node| (node.id.clone(), node.name.clone()))
            .collect::<Vec<_>>();

        if let Some(cached) = &self.search_match_cache
            && cached.query == search_query
            && cached.names == names
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matches = Arc::new(fuzzy_matches(&names, search_query));
        self.search_match_cache = Some(SearchMatchCache {
            query: search_query.to_owned(),
            names,
            matches: Arc::clone(&matches),
        });
        Some(matches)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        let frame_delta_seconds = ui
            .ctx()
            .input(|input| input.stable_dt)
            .clamp(1.0 / 240.0, 1.0 / 20.0);

        let zoomed = self.handle_graph_zoom(ui, rect, &response);
        let panned = self.handle_graph_drag(rect, &response);
        if zoomed || panned {
            self.context_menu = None;
        }
        self.handle_graph_clicks(rect, &response);

        if let Some(focus) = self.focus.as_mut() {
            self.viewport = focus.step(frame_delta_seconds);
            if focus.is_finished() {
                self.focus = None;
            }
        }

        let animating = self.session.step(frame_delta_seconds);
        self.resume_pending_focus();

        self.hovered = response
            .hover_pos()
            .and_then(|pointer| match self.pointer_hit(rect, pointer) {
                Hit::Body(id) | Hit::Satellite(id) => Some(id),
                Hit::Empty => None,
            });

        let matches = self.cached_search_matches();
        let frame = compose_frame(
            &self.session,
            FrameStyle {
                selected: self.selected.as_deref(),
                hovered: self.hovered.as_deref(),
                matches: matches.as_deref(),
            },
        );
        self.last_stats = self.reconciler.apply(frame, &mut self.scene);
        self.scene.paint(&painter, rect, self.viewport);

        let scenery_moving = self.session.mode() == LayoutMode::Seed
            && (!self.session.day.is_paused() || self.session.wind.strength > 0.0);
        if animating || scenery_moving || self.focus.is_some() || response.dragged() {
            ui.ctx().request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_search_matches_by_name() {
        let names = vec![
            ("a".to_owned(), "Garden planning".to_owned()),
            ("b".to_owned(), "Quarterly budget".to_owned()),
            ("c".to_owned(), "Gardening notes".to_owned()),
        ];
        let matches = fuzzy_matches(&names, "garden");
        assert!(matches.contains("a"));
        assert!(matches.contains("c"));
        assert!(!matches.contains("b"));
    }
}
