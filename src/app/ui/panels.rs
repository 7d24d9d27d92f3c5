use eframe::egui::{self, Align, Context, Key, Layout};

use super::super::animation::Viewport;
use super::super::scene::{ReconcileStats, Reconciler, RetainedScene};
use super::super::session::Session;
use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn new(session: Session, query_text: String) -> Self {
        let tuning = session.layout.tuning();
        Self {
            session,
            viewport: Viewport::default(),
            focus: None,
            pending_focus: None,
            reconciler: Reconciler::default(),
            scene: RetainedScene::default(),
            last_stats: ReconcileStats::default(),
            selected: None,
            hovered: None,
            query_text,
            search: String::new(),
            search_match_cache: None,
            context_menu: None,
            drag: None,
            tuning,
        }
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        if ctx.input(|input| input.key_pressed(Key::Escape)) {
            self.context_menu = None;
            self.set_selected(None);
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("mindgrove");
                    ui.separator();
                    ui.label(format!("layout: {}", self.session.mode().label()));
                    ui.label(format!("nodes: {}", self.session.map.node_count()));
                    ui.label(format!("visible: {}", self.session.visible().nodes.len()));
                    ui.label(format!("documents: {}", self.session.corpus().len()));
                    ui.label(format!("energy: {:.3}", self.session.layout.alpha()));
                    if self.session.is_query_pending() {
                        ui.spinner();
                        ui.label("growing…");
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.scene_stats_text());
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        let mut graph_rect = None;
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                graph_rect = Some(ui.max_rect());
                self.draw_graph(ui);
            });

        if let Some(rect) = graph_rect {
            self.draw_context_menu(ctx, rect);
        }
    }

    pub(in crate::app) fn set_selected(&mut self, selected: Option<String>) {
        if self.selected == selected {
            return;
        }

        if let Some(node_id) = selected.as_deref() {
            self.session.request_summary(node_id);
            self.focus_on(node_id);
        }
        self.selected = selected;
    }

    fn scene_stats_text(&self) -> String {
        let stats = self.last_stats;
        format!(
            "elements: {}  (+{} ~{} -{})",
            self.scene.len(),
            stats.created,
            stats.updated,
            stats.removed
        )
    }
}
