use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke};

use crate::engine::color::Rgb;

use super::camera::Camera;

pub(super) fn rgb_to_color32(color: Rgb, opacity: f32) -> Color32 {
    let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgba_unmultiplied(
        channel(color.r),
        channel(color.g),
        channel(color.b),
        channel(opacity),
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        color.a(),
    )
}

/// Ground grid with one line per chunk edge.
pub(super) fn draw_background(painter: &Painter, rect: Rect, camera: &Camera, chunk_footprint: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));
    let origin = camera.project(rect, [0.0, 0.0, 0.0]);

    let step_x = (chunk_footprint * camera.zoom).max(8.0);
    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step_x);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step_x;
    }

    let step_y = (chunk_footprint * camera.zoom * super::camera::GROUND_TILT).max(8.0);
    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step_y);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step_y;
    }
}
