use eframe::egui::{Pos2, Rect, Vec2, vec2};

use crate::engine::Visualization;
use crate::engine::chunks::FocalPoint;

const INERTIA_DECAY: f32 = 0.99;
const INERTIA_CUTOFF: f32 = 0.005;
const MIN_ZOOM: f32 = 2.0;
const MAX_ZOOM: f32 = 90.0;
/// Vertical squash of the ground plane; the view looks down at an angle.
pub(in crate::app) const GROUND_TILT: f32 = 0.72;
pub(in crate::app) const HEIGHT_LIFT: f32 = 0.68;

/// Oblique top-down camera over the x/z ground plane, in pixels per world unit.
pub(in crate::app) struct Camera {
    pub(in crate::app) focal: FocalPoint,
    pub(in crate::app) zoom: f32,
    velocity: Vec2,
}

impl Camera {
    pub(in crate::app) fn new() -> Self {
        Self {
            focal: FocalPoint::default(),
            zoom: 18.0,
            velocity: Vec2::ZERO,
        }
    }

    pub(in crate::app) fn project(&self, rect: Rect, world: [f32; 3]) -> Pos2 {
        let [x, y, z] = world;
        rect.center()
            + vec2(
                (x - self.focal.x) * self.zoom,
                ((z - self.focal.z) * GROUND_TILT - y * HEIGHT_LIFT) * self.zoom,
            )
    }

    fn screen_to_ground(&self, delta: Vec2) -> Vec2 {
        vec2(delta.x / self.zoom, delta.y / (self.zoom * GROUND_TILT))
    }

    /// Drag moves the ground with the pointer; the last delta becomes the
    /// throw velocity.
    pub(in crate::app) fn drag(&mut self, screen_delta: Vec2) {
        let ground = self.screen_to_ground(screen_delta);
        self.focal.x -= ground.x;
        self.focal.z -= ground.y;
        self.velocity = ground;
    }

    /// Returns `true` while the camera is still gliding.
    pub(in crate::app) fn step_inertia(&mut self) -> bool {
        if self.velocity == Vec2::ZERO {
            return false;
        }

        self.focal.x -= self.velocity.x;
        self.focal.z -= self.velocity.y;
        self.velocity *= INERTIA_DECAY;
        if self.velocity.length() < INERTIA_CUTOFF {
            self.velocity = Vec2::ZERO;
        }
        true
    }

    pub(in crate::app) fn zoom_by(&mut self, factor: f32) {
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub(in crate::app) fn jump_to(&mut self, focal: FocalPoint) {
        self.focal = focal;
        self.velocity = Vec2::ZERO;
    }

    pub(in crate::app) fn clamp_to(&mut self, viz: &Visualization) {
        let clamped = viz.clamp_focal(self.focal);
        if clamped != self.focal {
            self.jump_to(clamped);
        }
    }
}
