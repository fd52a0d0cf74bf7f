use eframe::egui::{self, Align2, Color32, FontId, Sense, Ui, vec2};

use crate::engine::BlockDescriptor;
use crate::engine::blocks::LifecycleState;
use crate::engine::color::{SELECT_COLOR, SELECT_HOVER_COLOR, hover_color};
use crate::util::{format_amount, short_id};

use super::super::ViewModel;
use super::super::camera::Camera;
use super::super::render_utils::{dim_color, draw_background, rgb_to_color32};
use super::interaction::BlockFaces;

fn project_block(camera: &Camera, rect: egui::Rect, descriptor: &BlockDescriptor) -> BlockFaces {
    let [x, _, z] = descriptor.position;
    let [width, height, depth] = descriptor.scale;
    let (half_w, half_d) = (width / 2.0, depth / 2.0);

    let top = egui::Rect::from_two_pos(
        camera.project(rect, [x - half_w, height, z - half_d]),
        camera.project(rect, [x + half_w, height, z + half_d]),
    );
    let front = egui::Rect::from_two_pos(
        camera.project(rect, [x - half_w, height, z + half_d]),
        camera.project(rect, [x + half_w, 0.0, z + half_d]),
    );

    BlockFaces {
        key: descriptor.key,
        depth: z,
        top,
        front,
        color: descriptor.color,
        opacity: descriptor.opacity,
    }
}

impl ViewModel {
    /// Per-frame order: camera input, chunk streaming, block animation, drawing.
    pub(in crate::app) fn draw_scene(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.handle_scene_zoom(ui, &response);
        let camera_moving = self.handle_scene_drag(&response);
        self.camera.clamp_to(&self.viz);

        self.advance_frame();

        draw_background(
            &painter,
            rect,
            &self.camera,
            self.viz.config().chunk_footprint(),
        );

        let mut animating = false;
        let mut drawn = self
            .viz
            .descriptors()
            .filter_map(|descriptor| {
                animating |= descriptor.state != LifecycleState::Steady;
                let faces = project_block(&self.camera, rect, &descriptor);
                rect.intersects(faces.bounds()).then_some(faces)
            })
            .collect::<Vec<_>>();
        drawn.sort_by(|a, b| a.depth.total_cmp(&b.depth).then_with(|| a.key.cmp(&b.key)));

        let hovered = Self::hovered_block(&drawn, response.hover_pos());

        for faces in &drawn {
            let is_selected = self.selected == Some(faces.key);
            let is_hovered = hovered == Some(faces.key);
            let color = match (is_selected, is_hovered) {
                (true, true) => SELECT_HOVER_COLOR,
                (true, false) => SELECT_COLOR,
                (false, true) => hover_color(faces.color),
                (false, false) => faces.color,
            };

            let fill = rgb_to_color32(color, faces.opacity);
            painter.rect_filled(faces.top, 0.0, fill);
            painter.rect_filled(faces.front, 0.0, dim_color(fill, 0.72));
        }

        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        if let Some(key) = hovered
            && let Some(block) = self.viz.blocks().get(key)
        {
            let label = match &block.to {
                Some(to) => format!(
                    "{} -> {}  |  {}",
                    short_id(block.from.as_str()),
                    short_id(to.as_str()),
                    format_amount(block.raw_value)
                ),
                None => format!(
                    "{}  |  received {}",
                    short_id(block.from.as_str()),
                    format_amount(block.raw_value)
                ),
            };
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                label,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if self.viz.blocks().is_empty() && !self.viz.is_reloading() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "Nothing in view",
                FontId::proportional(15.0),
                Color32::from_gray(150),
            );
        }

        if response.clicked_by(egui::PointerButton::Primary) {
            self.set_selected(hovered);
        }

        if animating || camera_moving || self.viz.is_reloading() {
            ui.ctx().request_repaint();
        }
    }

    fn advance_frame(&mut self) {
        if self.fault.is_some() {
            return;
        }

        match self.viz.tick(self.camera.focal) {
            Ok(report) => {
                self.released_total += report.released.len() as u64;
                if report.rebuilt {
                    self.set_selected(None);
                    self.search_match_cache = None;
                }
                self.last_report = report;
            }
            Err(error) => {
                tracing::error!(%error, "visualization halted");
                self.fault = Some(error.to_string());
            }
        }
    }
}
