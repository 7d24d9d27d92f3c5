use std::ops::RangeInclusive;

use eframe::egui::{self, Key, Response, Ui};

use super::super::ViewModel;
use super::super::physics::LayoutMode;

const SLIDER_KEY_BASE_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;

#[derive(Clone, Copy, Default)]
struct SliderKeyHoldState {
    positive_secs: f32,
    negative_secs: f32,
}

fn slider_key_accel_multiplier(hold_secs: f32) -> f32 {
    let ramp = hold_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

fn default_slider_key_step(min: f32, max: f32) -> f32 {
    ((max - min) / 200.0).max(0.0005)
}

fn apply_slider_arrow_acceleration(ui: &Ui, response: &Response, value: &mut f32, min: f32, max: f32) -> bool {
    let state_id = response.id.with("arrow_key_hold_state");
    let mut hold_state = ui
        .ctx()
        .data(|data| data.get_temp::<SliderKeyHoldState>(state_id).unwrap_or_default());

    if !response.has_focus() {
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, SliderKeyHoldState::default()));
        return false;
    }

    let (delta_time, increase_down, decrease_down) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });

    hold_state.positive_secs = if increase_down { hold_state.positive_secs + delta_time } else { 0.0 };
    hold_state.negative_secs = if decrease_down { hold_state.negative_secs + delta_time } else { 0.0 };
    ui.ctx().data_mut(|data| data.insert_temp(state_id, hold_state));

    let direction = (increase_down as i8) - (decrease_down as i8);
    if direction == 0 {
        return false;
    }

    let hold_secs = if direction > 0 {
        hold_state.positive_secs
    } else {
        hold_state.negative_secs
    };
    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold_secs);
    let delta = direction as f32 * default_slider_key_step(min, max) * speed * delta_time;

    let old_value = *value;
    *value = (*value + delta).clamp(min, max);
    ui.ctx().request_repaint();
    (*value - old_value).abs() > f32::EPSILON
}

fn tuning_slider(ui: &mut Ui, value: &mut f32, range: RangeInclusive<f32>, text: &str, hover: &str) -> bool {
    let (min, max) = (*range.start(), *range.end());
    let slider = ui
        .add(
            egui::Slider::new(value, range)
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    if slider.hovered() {
        slider.request_focus();
    }
    let mut changed = slider.changed();
    changed |= apply_slider_arrow_acceleration(ui, &slider, value, min, max);
    changed
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Grove Controls");
        ui.separator();
        ui.add_space(4.0);

        self.draw_query_box(ui);
        ui.separator();

        ui.label("Highlight")
            .on_hover_text("Fuzzy-highlight nodes by name without changing the map.");
        ui.text_edit_singleline(&mut self.search);

        ui.separator();
        self.draw_layout_controls(ui);

        ui.separator();
        self.draw_scenery_controls(ui);
    }

    fn draw_query_box(&mut self, ui: &mut Ui) {
        ui.label("Ask the grove")
            .on_hover_text("Search the corpus and attach the answer below the root.");
        let mut submit = false;
        ui.horizontal(|ui| {
            let response = ui.text_edit_singleline(&mut self.query_text);
            submit |= response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
            let pending = self.session.is_query_pending();
            submit |= ui
                .add_enabled(!self.query_text.trim().is_empty(), egui::Button::new("Grow"))
                .clicked();
            if pending {
                ui.spinner();
            }
        });

        if submit {
            self.session.submit_query(&self.query_text);
        }
    }

    fn draw_layout_controls(&mut self, ui: &mut Ui) {
        let mut mode = self.session.mode();
        ui.horizontal(|ui| {
            ui.label("Layout");
            ui.selectable_value(&mut mode, LayoutMode::Spider, LayoutMode::Spider.label())
                .on_hover_text("Free radial layout around a floating root.");
            ui.selectable_value(&mut mode, LayoutMode::Seed, LayoutMode::Seed.label())
                .on_hover_text("Grow the map as a tree rooted in the ground.");
        });
        if mode != self.session.mode() {
            self.session.set_mode(mode);
        }

        ui.horizontal(|ui| {
            ui.checkbox(&mut self.session.live_layout, "Live layout")
                .on_hover_text("Keep simulating layout forces every frame.");
            if ui.button("Reheat").on_hover_text("Restart the cooled-down layout.").clicked() {
                self.session.layout.reheat(1.0);
            }
        });

        ui.collapsing("Layout tuning", |ui| {
            let mut changed = false;
            changed |= tuning_slider(
                ui,
                &mut self.tuning.intensity,
                0.2..=2.5,
                "Intensity",
                "Overall strength applied to all layout forces.",
            );
            changed |= tuning_slider(
                ui,
                &mut self.tuning.repulsion,
                0.25..=2.6,
                "Repulsion",
                "How strongly nodes push away from each other.",
            );
            changed |= tuning_slider(
                ui,
                &mut self.tuning.link_distance,
                0.4..=2.5,
                "Link distance",
                "Scale of the rest length between parent and child.",
            );
            if ui.button("Reset").clicked() {
                self.tuning = Default::default();
                changed = true;
            }
            if changed {
                self.session.set_tuning(self.tuning);
            }
        });
    }

    fn draw_scenery_controls(&mut self, ui: &mut Ui) {
        ui.collapsing("Scenery", |ui| {
            if self.session.mode() != LayoutMode::Seed {
                ui.small("Sky and wind only show in the seed layout.");
            }

            tuning_slider(
                ui,
                &mut self.session.wind.strength,
                0.0..=2.0,
                "Wind",
                "How far branches and leaves sway.",
            );
            tuning_slider(
                ui,
                &mut self.session.day.day_length_secs,
                20.0..=600.0,
                "Day length (s)",
                "Seconds for one full day and night.",
            );

            let mut phase = self.session.day.phase();
            let scrubbed = ui
                .add(egui::Slider::new(&mut phase, 0.0..=1.0).text("Time of day"))
                .on_hover_text("Drag to scrub; the clock pauses until resumed.")
                .changed();
            if scrubbed {
                self.session.day.scrub(phase);
            }

            let paused = self.session.day.is_paused();
            if ui.add_enabled(paused, egui::Button::new("Resume clock")).clicked() {
                self.session.day.resume();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_acceleration_ramps_and_caps() {
        assert_eq!(slider_key_accel_multiplier(0.0), 1.0);
        assert!(slider_key_accel_multiplier(0.5) > slider_key_accel_multiplier(0.1));
        assert_eq!(slider_key_accel_multiplier(30.0), SLIDER_KEY_ACCEL_MAX);
        assert!(default_slider_key_step(0.0, 0.01) >= 0.0005);
    }
}
