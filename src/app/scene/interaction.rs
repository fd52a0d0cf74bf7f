use eframe::egui::{self, Pos2, Rect, Ui};

use crate::engine::blocks::BlockKey;
use crate::engine::chunks::LayoutMode;
use crate::engine::color::Rgb;

use super::super::ViewModel;

/// Screen-space footprint of one drawn block, far to near.
pub(super) struct BlockFaces {
    pub(super) key: BlockKey,
    pub(super) depth: f32,
    pub(super) top: Rect,
    pub(super) front: Rect,
    pub(super) color: Rgb,
    pub(super) opacity: f32,
}

impl BlockFaces {
    pub(super) fn bounds(&self) -> Rect {
        self.top.union(self.front)
    }
}

impl ViewModel {
    pub(in crate::app) fn handle_scene_zoom(&mut self, ui: &Ui, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.camera.zoom_by(zoom_factor);
    }

    /// Returns `true` while the camera moves, either dragged or gliding.
    pub(in crate::app) fn handle_scene_drag(&mut self, response: &egui::Response) -> bool {
        if response.dragged_by(egui::PointerButton::Primary)
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.camera.drag(response.drag_delta());
            return true;
        }

        self.camera.step_inertia()
    }

    pub(super) fn hovered_block(faces: &[BlockFaces], pointer: Option<Pos2>) -> Option<BlockKey> {
        let pointer = pointer?;
        faces
            .iter()
            .rev()
            .find(|faces| faces.bounds().contains(pointer))
            .map(|faces| faces.key)
    }

    /// Centres the camera on `rank` and selects its diagonal block (or bar).
    pub(in crate::app) fn jump_to_rank(&mut self, rank: usize) {
        let Some(focal) = self.viz.focal_for_rank(rank) else {
            return;
        };
        self.camera.jump_to(focal);

        let key = match self.viz.settings().layout {
            LayoutMode::Grid => BlockKey::new(rank, rank),
            LayoutMode::Bar => BlockKey::new(rank, 0),
        };
        self.set_selected(Some(key));
    }
}
