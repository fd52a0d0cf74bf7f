use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};

use crate::dataset::{Dataset, load_dataset};
use crate::engine::blocks::BlockKey;
use crate::engine::config::EngineConfig;
use crate::engine::{FrameReport, ViewSettings, Visualization};

mod camera;
mod render_utils;
mod scene;
mod ui;

use camera::Camera;

type LoadResult = Result<Dataset, String>;

pub struct TxLatticeApp {
    config: EngineConfig,
    settings: ViewSettings,
    dataset_path: PathBuf,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    viz: Visualization,
    camera: Camera,
    dataset_path: String,
    selected: Option<BlockKey>,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    window_start: String,
    window_end: String,
    window_error: Option<String>,
    load_error: Option<String>,
    fault: Option<String>,
    last_report: FrameReport,
    released_total: u64,
    transaction_rows_visible: usize,
    show_fps_bar: bool,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
}

struct SearchMatchCache {
    query: String,
    generation: u64,
    hits: Vec<SearchHit>,
}

#[derive(Clone)]
struct SearchHit {
    id: String,
    rank: usize,
}

impl TxLatticeApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        dataset_path: PathBuf,
        config: EngineConfig,
        settings: ViewSettings,
    ) -> Self {
        let state = Self::start_load(dataset_path.clone());
        Self {
            config,
            settings,
            dataset_path,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(path: PathBuf) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_dataset(&path).map_err(|error| format!("{error:#}"));
            if let Err(error) = &result {
                tracing::warn!(path = %path.display(), %error, "dataset load failed");
            }
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(path: PathBuf) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(path),
        }
    }

    fn first_view(&self, dataset: Dataset) -> AppState {
        match Visualization::new(self.config.clone()) {
            Ok(viz) => {
                let mut model = ViewModel::new(viz, self.settings, &self.dataset_path);
                model.viz.begin_reload(Arc::new(dataset));
                AppState::Ready(Box::new(model))
            }
            Err(error) => AppState::Error(error.to_string()),
        }
    }
}

impl eframe::App for TxLatticeApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let mut retry = false;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(dataset)) => transition = Some(Ok(dataset)),
                    Ok(Err(error)) => transition = Some(Err(error)),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Err("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading transaction dataset...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load transaction dataset");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
            }
            AppState::Ready(model) => {
                let mut reload_request = None;
                let is_fetching = self.reload_rx.is_some();
                model.show(ctx, &mut reload_request, is_fetching);

                if let Some(path) = reload_request
                    && self.reload_rx.is_none()
                {
                    self.dataset_path = path;
                    self.reload_rx = Some(Self::spawn_load(self.dataset_path.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(dataset)) => model.accept_dataset(dataset),
                        Ok(Err(error)) => model.load_error = Some(error),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                        }
                        Err(TryRecvError::Disconnected) => {
                            model.load_error =
                                Some("Background load worker disconnected".to_owned());
                        }
                    }
                }
            }
        }

        if retry {
            self.state = Self::start_load(self.dataset_path.clone());
        }

        if let Some(loaded) = transition {
            self.state = match loaded {
                Ok(dataset) => self.first_view(dataset),
                Err(error) => AppState::Error(error),
            };
        }
    }
}
