use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eframe::egui::{self, Align, Context, Layout, RichText};

use crate::dataset::Dataset;
use crate::engine::blocks::BlockKey;
use crate::engine::{FrameReport, ViewSettings, Visualization};

use super::super::ViewModel;
use super::super::camera::Camera;

impl ViewModel {
    pub(in crate::app) const INITIAL_TRANSACTION_ROWS: usize = 40;
    pub(in crate::app) const TRANSACTION_PAGE_ROWS: usize = 40;
    pub(in crate::app) const TRANSACTION_PREFETCH_MARGIN: usize = 4;

    pub(in crate::app) fn new(
        mut viz: Visualization,
        settings: ViewSettings,
        dataset_path: &Path,
    ) -> Self {
        viz.apply_settings(settings);

        Self {
            viz,
            camera: Camera::new(),
            dataset_path: dataset_path.display().to_string(),
            selected: None,
            search: String::new(),
            search_match_cache: None,
            window_start: String::new(),
            window_end: String::new(),
            window_error: None,
            load_error: None,
            fault: None,
            last_report: FrameReport::default(),
            released_total: 0,
            transaction_rows_visible: Self::INITIAL_TRANSACTION_ROWS,
            show_fps_bar: true,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        reload_request: &mut Option<PathBuf>,
        is_fetching: bool,
    ) {
        self.update_fps_counter(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("tx-lattice");
                    ui.separator();
                    if let Some(dataset) = self.viz.dataset() {
                        ui.label(format!("source: {}", dataset.source));
                    }
                    ui.label(format!("nodes: {}", self.viz.store().node_count()));
                    ui.label(format!(
                        "transactions: {}",
                        self.viz.store().report().accepted_transactions
                    ));
                    if self.viz.is_reloading() {
                        ui.label(RichText::new("draining...").italics());
                    }
                    if is_fetching {
                        ui.spinner();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.scene_stats_text());
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui, reload_request, is_fetching));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(360.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(fault) = &self.fault {
                ui.heading("Visualization stopped");
                ui.add_space(6.0);
                ui.label(fault.as_str());
            } else {
                self.draw_scene(ui);
            }
        });
    }

    pub(in crate::app) fn set_selected(&mut self, selected: Option<BlockKey>) {
        if self.selected == selected {
            return;
        }

        self.selected = selected;
        self.transaction_rows_visible = Self::INITIAL_TRANSACTION_ROWS;
    }

    /// A fresh dataset rides the drain-then-rebuild swap; the view stays up.
    pub(in crate::app) fn accept_dataset(&mut self, dataset: Dataset) {
        tracing::info!(
            source = %dataset.source,
            nodes = dataset.nodes.len(),
            transactions = dataset.transactions.len(),
            "dataset fetched"
        );
        self.load_error = None;
        self.set_selected(None);
        self.viz.begin_reload(Arc::new(dataset));
    }
}
