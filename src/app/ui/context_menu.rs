use eframe::egui::{self, Color32, Context, Key, Rect, RichText, Vec2};

use crate::mindmap::ROOT_ID;

use super::super::ViewModel;

const PALETTE: [Color32; 8] = [
    Color32::from_rgb(96, 165, 120),
    Color32::from_rgb(104, 160, 222),
    Color32::from_rgb(226, 178, 92),
    Color32::from_rgb(214, 110, 96),
    Color32::from_rgb(170, 126, 214),
    Color32::from_rgb(92, 190, 190),
    Color32::from_rgb(232, 140, 186),
    Color32::from_rgb(150, 156, 166),
];

enum MenuAction {
    AddChild,
    Rename(String),
    Recolor(Color32),
    Delete,
}

impl ViewModel {
    pub(in crate::app) fn draw_context_menu(&mut self, ctx: &Context, graph_rect: Rect) {
        let Some(menu) = self.context_menu.as_mut() else {
            return;
        };
        let Some(node) = self.session.map.node(&menu.node_id) else {
            self.context_menu = None;
            return;
        };
        let title = node.name.clone();
        let is_root = menu.node_id == ROOT_ID;
        let position = menu.screen_pos.clamp(graph_rect.min, graph_rect.max);

        let mut action = None;
        egui::Area::new(egui::Id::new("node_context_menu"))
            .order(egui::Order::Foreground)
            .fixed_pos(position)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(220.0);
                    ui.label(RichText::new(&title).strong());
                    ui.separator();

                    if ui.button("Add child").clicked() {
                        action = Some(MenuAction::AddChild);
                    }

                    ui.horizontal(|ui| {
                        let response = ui.text_edit_singleline(&mut menu.rename);
                        let submitted = response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
                        if ui.button("Rename").clicked() || submitted {
                            action = Some(MenuAction::Rename(menu.rename.clone()));
                        }
                    });

                    ui.horizontal_wrapped(|ui| {
                        for color in PALETTE {
                            let swatch = egui::Button::new("").fill(color).min_size(Vec2::splat(18.0));
                            if ui.add(swatch).clicked() {
                                action = Some(MenuAction::Recolor(color));
                            }
                        }
                    });

                    ui.separator();
                    let delete = ui
                        .add_enabled(!is_root, egui::Button::new("Delete subtree"))
                        .on_disabled_hover_text("The root cannot be deleted.");
                    if delete.clicked() {
                        action = Some(MenuAction::Delete);
                    }
                });
            });

        let Some(action) = action else {
            return;
        };
        let Some(menu) = self.context_menu.take() else {
            return;
        };
        let node_id = menu.node_id;
        match action {
            MenuAction::AddChild => {
                if let Some(child_id) = self.session.add_child(&node_id) {
                    self.set_selected(Some(child_id));
                }
            }
            MenuAction::Rename(name) => {
                self.session.rename(&node_id, &name);
            }
            MenuAction::Recolor(color) => {
                self.session.recolor(&node_id, color);
            }
            MenuAction::Delete => {
                self.session.delete(&node_id);
                if self
                    .selected
                    .as_deref()
                    .is_some_and(|selected| !self.session.map.contains(selected))
                {
                    self.set_selected(None);
                }
            }
        }
    }
}
