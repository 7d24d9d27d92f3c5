use eframe::egui::{Color32, Pos2, Rect, Vec2};

use super::animation::Viewport;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)).round() as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)).round() as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)).round() as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)).round() as u8,
    )
}

pub(super) fn lerp_color(from: Color32, to: Color32, t: f32) -> Color32 {
    blend_color(from, to, t)
}

pub(super) fn shade(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.5);
    let channel = |value: u8| (value as f32 * factor).round().min(255.0) as u8;
    Color32::from_rgba_unmultiplied(channel(color.r()), channel(color.g()), channel(color.b()), color.a())
}

pub(super) fn with_alpha(color: Color32, alpha: f32) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), (alpha.clamp(0.0, 1.0) * 255.0) as u8)
}

pub(super) fn world_to_screen(rect: Rect, viewport: Viewport, world: Vec2) -> Pos2 {
    rect.center() + viewport.pan + world * viewport.zoom
}

pub(super) fn screen_to_world(rect: Rect, viewport: Viewport, screen: Pos2) -> Vec2 {
    (screen - rect.center() - viewport.pan) / viewport.zoom
}

pub(super) fn node_radius(val: f32) -> f32 {
    4.0 + 1.5 * val.max(0.0)
}
