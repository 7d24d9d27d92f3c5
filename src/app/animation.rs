use eframe::egui::{Color32, Vec2, vec2};

use super::render_utils::lerp_color;

pub(in crate::app) fn ease_in_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * t
}

pub(in crate::app) fn ease_out_cubic(t: f32) -> f32 {
    let t = 1.0 - t.clamp(0.0, 1.0);
    1.0 - t * t * t
}

pub(in crate::app) fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) * 0.5
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct SkyKey {
    phase: f32,
    top: Color32,
    bottom: Color32,
    ambient: f32,
}

const NIGHT_TOP: Color32 = Color32::from_rgb(10, 14, 34);
const NIGHT_BOTTOM: Color32 = Color32::from_rgb(28, 34, 66);
const DAWN_TOP: Color32 = Color32::from_rgb(86, 96, 160);
const DAWN_BOTTOM: Color32 = Color32::from_rgb(246, 170, 120);
const DAY_TOP: Color32 = Color32::from_rgb(92, 160, 230);
const DAY_BOTTOM: Color32 = Color32::from_rgb(196, 228, 250);
const DUSK_TOP: Color32 = Color32::from_rgb(70, 56, 120);
const DUSK_BOTTOM: Color32 = Color32::from_rgb(240, 128, 90);

/// Phase 0 is midnight, 0.5 is noon.
const SKY_KEYS: [SkyKey; 7] = [
    SkyKey { phase: 0.0, top: NIGHT_TOP, bottom: NIGHT_BOTTOM, ambient: 0.35 },
    SkyKey { phase: 0.2, top: NIGHT_TOP, bottom: NIGHT_BOTTOM, ambient: 0.35 },
    SkyKey { phase: 0.27, top: DAWN_TOP, bottom: DAWN_BOTTOM, ambient: 0.7 },
    SkyKey { phase: 0.35, top: DAY_TOP, bottom: DAY_BOTTOM, ambient: 1.0 },
    SkyKey { phase: 0.68, top: DAY_TOP, bottom: DAY_BOTTOM, ambient: 1.0 },
    SkyKey { phase: 0.76, top: DUSK_TOP, bottom: DUSK_BOTTOM, ambient: 0.65 },
    SkyKey { phase: 0.84, top: NIGHT_TOP, bottom: NIGHT_BOTTOM, ambient: 0.35 },
];

const SUNRISE: f32 = 0.22;
const SUNSET: f32 = 0.78;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct SkyColors {
    pub(in crate::app) top: Color32,
    pub(in crate::app) bottom: Color32,
    pub(in crate::app) ambient: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Celestial {
    pub(in crate::app) position: Vec2,
    pub(in crate::app) is_sun: bool,
}

#[derive(Clone, Debug)]
pub(in crate::app) struct DayNightCycle {
    phase: f32,
    pub(in crate::app) day_length_secs: f32,
    paused: bool,
}

impl Default for DayNightCycle {
    fn default() -> Self {
        Self {
            phase: 0.42,
            day_length_secs: 90.0,
            paused: false,
        }
    }
}

impl DayNightCycle {
    pub(in crate::app) fn phase(&self) -> f32 {
        self.phase
    }

    pub(in crate::app) fn is_paused(&self) -> bool {
        self.paused
    }

    pub(in crate::app) fn advance(&mut self, dt: f32) {
        if self.paused || self.day_length_secs <= 0.0 {
            return;
        }
        self.phase = (self.phase + dt / self.day_length_secs).rem_euclid(1.0);
    }

    pub(in crate::app) fn scrub(&mut self, phase: f32) {
        self.phase = phase.rem_euclid(1.0);
        self.paused = true;
    }

    pub(in crate::app) fn resume(&mut self) {
        self.paused = false;
    }

    pub(in crate::app) fn sky(&self) -> SkyColors {
        let phase = self.phase;
        let next_index = SKY_KEYS
            .iter()
            .position(|key| key.phase > phase)
            .unwrap_or(SKY_KEYS.len());
        let from = SKY_KEYS[next_index.saturating_sub(1)];
        // past the last key the sky holds night until it wraps
        let Some(to) = SKY_KEYS.get(next_index).copied() else {
            return SkyColors { top: from.top, bottom: from.bottom, ambient: from.ambient };
        };

        let t = ease_in_out_cubic((phase - from.phase) / (to.phase - from.phase).max(1e-6));
        SkyColors {
            top: lerp_color(from.top, to.top, t),
            bottom: lerp_color(from.bottom, to.bottom, t),
            ambient: lerp(from.ambient, to.ambient, t),
        }
    }

    pub(in crate::app) fn celestial(&self) -> Celestial {
        let (progress, is_sun) = if (SUNRISE..SUNSET).contains(&self.phase) {
            ((self.phase - SUNRISE) / (SUNSET - SUNRISE), true)
        } else {
            let night_length = 1.0 - (SUNSET - SUNRISE);
            ((self.phase - SUNSET).rem_euclid(1.0) / night_length, false)
        };

        let height = (progress * std::f32::consts::PI).sin();
        Celestial {
            position: vec2(0.08 + 0.84 * progress, 0.72 - 0.58 * height),
            is_sun,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct SproutTween {
    elapsed: f32,
    from_y: f32,
    to_y: f32,
    from_val: f32,
    to_val: f32,
}

pub(in crate::app) const SPROUT_SECS: f32 = 1.6;

impl SproutTween {
    pub(in crate::app) fn new(from_y: f32, to_y: f32, from_val: f32, to_val: f32) -> Self {
        Self {
            elapsed: 0.0,
            from_y,
            to_y,
            from_val,
            to_val,
        }
    }

    pub(in crate::app) fn step(&mut self, dt: f32) {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(SPROUT_SECS);
    }

    pub(in crate::app) fn progress(&self) -> f32 {
        ease_in_out_cubic(self.elapsed / SPROUT_SECS)
    }

    pub(in crate::app) fn root_y(&self) -> f32 {
        lerp(self.from_y, self.to_y, self.progress())
    }

    pub(in crate::app) fn root_val(&self) -> f32 {
        lerp(self.from_val, self.to_val, self.progress())
    }

    pub(in crate::app) fn is_finished(&self) -> bool {
        self.elapsed >= SPROUT_SECS
    }
}

/// Viewport transform. `screen = center + pan + world * zoom`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Viewport {
    pub(in crate::app) pan: Vec2,
    pub(in crate::app) zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

pub(in crate::app) const MIN_ZOOM: f32 = 0.2;
pub(in crate::app) const MAX_ZOOM: f32 = 4.0;
const FOCUS_SECS: f32 = 0.65;
const FOCUS_ZOOM: f32 = 1.4;

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct FocusTween {
    elapsed: f32,
    from: Viewport,
    to: Viewport,
}

impl FocusTween {
    pub(in crate::app) fn toward(from: Viewport, world: Vec2) -> Self {
        let zoom = from.zoom.max(FOCUS_ZOOM).clamp(MIN_ZOOM, MAX_ZOOM);
        Self {
            elapsed: 0.0,
            from,
            to: Viewport {
                pan: -world * zoom,
                zoom,
            },
        }
    }

    pub(in crate::app) fn step(&mut self, dt: f32) -> Viewport {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(FOCUS_SECS);
        let t = ease_out_cubic(self.elapsed / FOCUS_SECS);
        Viewport {
            pan: self.from.pan + (self.to.pan - self.from.pan) * t,
            zoom: lerp(self.from.zoom, self.to.zoom, t),
        }
    }

    pub(in crate::app) fn is_finished(&self) -> bool {
        self.elapsed >= FOCUS_SECS
    }
}

#[derive(Clone, Debug)]
pub(in crate::app) struct Wind {
    time: f32,
    pub(in crate::app) strength: f32,
}

impl Default for Wind {
    fn default() -> Self {
        Self {
            time: 0.0,
            strength: 1.0,
        }
    }
}

impl Wind {
    pub(in crate::app) fn advance(&mut self, dt: f32) {
        self.time += dt.max(0.0);
    }

    pub(in crate::app) fn sway(&self, point: Vec2, depth: u32) -> Vec2 {
        if self.strength <= 0.0 {
            return Vec2::ZERO;
        }
        let gust = (self.time * 1.3 + point.y * 0.011).sin() + 0.4 * (self.time * 2.9 + point.x * 0.017).sin();
        vec2(gust * self.strength * (0.8 + 0.6 * depth as f32), 0.0)
    }
}
