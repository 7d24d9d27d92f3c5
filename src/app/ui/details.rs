use eframe::egui::{self, RichText, Ui};

use crate::util::short_label;

use super::super::ViewModel;
use super::super::session::SummaryState;

const CHILD_LABEL_CHARS: usize = 40;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let Some(selected_id) = self.selected.clone() else {
            ui.label("Select a node in the grove.");
            return;
        };

        let Some(node) = self.session.map.node(&selected_id) else {
            ui.label("Selected node no longer exists.");
            return;
        };

        let name = node.name.clone();
        let kind = node.kind;
        let level = node.level;
        let depth = self.session.map.depth_of(&selected_id);
        let collapsed = node.collapsed;
        let description = node.description.clone();
        let children = self
            .session
            .map
            .children_of(&selected_id)
            .into_iter()
            .filter_map(|id| self.session.map.node(id))
            .map(|child| (child.id.clone(), child.name.clone()))
            .collect::<Vec<_>>();

        ui.label(RichText::new(&name).strong());
        ui.small(selected_id.as_str());
        ui.add_space(6.0);

        ui.label(format!("Kind: {}", kind.label()));
        ui.label(format!("Level: {level}"));
        if let Some(depth) = depth {
            ui.label(format!("Depth from root: {depth}"));
        }
        ui.label(format!("Children: {}", children.len()));
        if !children.is_empty() {
            ui.label(if collapsed { "Branch is collapsed" } else { "Branch is expanded" });
        }

        if let Some(description) = description {
            ui.separator();
            ui.label(description);
        }

        if let Some(document) = self.session.document_for(&selected_id) {
            ui.separator();
            ui.label(RichText::new("Document").strong());
            ui.label(document.title.as_str());
            ui.label(format!("Modified: {}", document.modified.format("%Y-%m-%d")));
            if !document.tags.is_empty() {
                ui.label(format!("Tags: {}", document.tags.join(", ")));
            }

            ui.add_space(4.0);
            match self.session.summary(&selected_id) {
                Some(SummaryState::Pending) => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Summarizing…");
                    });
                }
                Some(SummaryState::Ready(summary)) => {
                    ui.label(summary.as_str());
                }
                None => {}
            }
        }

        ui.separator();
        ui.horizontal(|ui| {
            let toggle_text = if children.is_empty() {
                "Grow child"
            } else if collapsed {
                "Expand"
            } else {
                "Collapse"
            };
            if ui.button(toggle_text).clicked() {
                self.session.toggle_expand(&selected_id);
            }
            if ui.button("Focus").clicked() {
                self.focus_on(&selected_id);
            }
        });

        if !children.is_empty() {
            ui.separator();
            ui.label(RichText::new("Children").strong());
            egui::ScrollArea::vertical()
                .id_salt("children_scroll")
                .max_height(320.0)
                .auto_shrink([false, true])
                .show(ui, |ui| {
                    for (child_id, child_name) in &children {
                        if ui
                            .link(short_label(child_name, CHILD_LABEL_CHARS))
                            .on_hover_text(child_name.as_str())
                            .clicked()
                        {
                            self.set_selected(Some(child_id.clone()));
                        }
                    }
                });
        }
    }
}
