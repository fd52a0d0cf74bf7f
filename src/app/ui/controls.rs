use std::path::PathBuf;

use eframe::egui::{self, Color32, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::dataset::{TimeWindow, parse_timestamp};
use crate::engine::PairDirection;
use crate::engine::chunks::LayoutMode;
use crate::engine::color::ScaleMode;
use crate::engine::ranking::RankingMode;
use crate::util::short_id;

use super::super::{SearchHit, SearchMatchCache, ViewModel};

const SEARCH_HIT_LIMIT: usize = 12;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

fn parse_bound(raw: &str, name: &str) -> Result<Option<chrono::DateTime<chrono::Utc>>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    parse_timestamp(raw)
        .map(Some)
        .ok_or_else(|| format!("{name} is not a date or ISO-8601 timestamp: {raw}"))
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(
        &mut self,
        ui: &mut Ui,
        reload_request: &mut Option<PathBuf>,
        is_fetching: bool,
    ) {
        ui.heading("Dataset");
        ui.separator();

        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.dataset_path)
                .on_hover_text("Path to a JSON file with `nodes` and `transactions`.");
            let load = ui.add_enabled(!is_fetching, egui::Button::new("Load"));
            if load.clicked() && !self.dataset_path.trim().is_empty() {
                *reload_request = Some(PathBuf::from(self.dataset_path.trim()));
            }
        });
        if let Some(error) = &self.load_error {
            ui.colored_label(Color32::from_rgb(235, 110, 100), error.as_str());
        }

        ui.add_space(8.0);
        ui.heading("View");
        ui.separator();

        let current = self.viz.target_settings();
        let mut next = current;

        ui.label("Sort nodes by");
        ui.horizontal_wrapped(|ui| {
            for mode in [RankingMode::ByTotalValue, RankingMode::ByTransactionCount] {
                ui.selectable_value(&mut next.ranking, mode, mode.label())
                    .on_hover_text("Rows and columns follow the received-activity ranking.");
            }
        });

        ui.label("Layout");
        ui.horizontal_wrapped(|ui| {
            ui.selectable_value(&mut next.layout, LayoutMode::Grid, LayoutMode::Grid.label())
                .on_hover_text("One block per sender/receiver pair.");
            ui.selectable_value(&mut next.layout, LayoutMode::Bar, LayoutMode::Bar.label())
                .on_hover_text("One bar per node with everything it received.");
        });

        ui.label("Height scale");
        ui.horizontal_wrapped(|ui| {
            ui.selectable_value(&mut next.scale, ScaleMode::Linear, ScaleMode::Linear.label());
            ui.selectable_value(&mut next.scale, ScaleMode::Log, ScaleMode::Log.label())
                .on_hover_text("Log scale keeps small totals visible next to very large ones.");
        });

        ui.label("Pairs");
        ui.add_enabled_ui(next.layout == LayoutMode::Grid, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.selectable_value(
                    &mut next.pairing,
                    PairDirection::Directed,
                    PairDirection::Directed.label(),
                );
                ui.selectable_value(
                    &mut next.pairing,
                    PairDirection::Symmetric,
                    PairDirection::Symmetric.label(),
                )
                .on_hover_text("Sum a -> b and b -> a into one block, mirrored across the diagonal.");
            });
        });

        ui.add_space(6.0);
        ui.label("Time window (exclusive)");
        egui::Grid::new("time_window").num_columns(2).show(ui, |ui| {
            ui.label("after");
            ui.text_edit_singleline(&mut self.window_start);
            ui.end_row();
            ui.label("before");
            ui.text_edit_singleline(&mut self.window_end);
            ui.end_row();
        });
        ui.horizontal(|ui| {
            if ui.button("Apply window").clicked() {
                match (
                    parse_bound(&self.window_start, "start"),
                    parse_bound(&self.window_end, "end"),
                ) {
                    (Ok(start), Ok(end)) => {
                        self.window_error = None;
                        next.window = TimeWindow { start, end };
                    }
                    (Err(error), _) | (_, Err(error)) => self.window_error = Some(error),
                }
            }
            if ui
                .add_enabled(!next.window.is_unbounded(), egui::Button::new("Clear"))
                .clicked()
            {
                self.window_start.clear();
                self.window_end.clear();
                self.window_error = None;
                next.window = TimeWindow::unbounded();
            }
        });
        if let Some(error) = &self.window_error {
            ui.colored_label(Color32::from_rgb(235, 110, 100), error.as_str());
        }

        if next != current && self.viz.apply_settings(next) {
            tracing::debug!(
                ranking = next.ranking.label(),
                layout = next.layout.label(),
                scale = next.scale.label(),
                pairing = next.pairing.label(),
                "view settings changed"
            );
            self.set_selected(None);
        }

        ui.add_space(8.0);
        ui.heading("Find node");
        ui.separator();
        ui.text_edit_singleline(&mut self.search)
            .on_hover_text("Fuzzy-match node ids, then click a hit to fly there.");

        let mut jump = None;
        for hit in self.search_hits() {
            let label = format!("#{}  {}", hit.rank + 1, short_id(&hit.id));
            if ui.link(label).on_hover_text(hit.id.as_str()).clicked() {
                jump = Some(hit.rank);
            }
        }
        if let Some(rank) = jump {
            self.jump_to_rank(rank);
        }

        ui.add_space(8.0);
        ui.checkbox(&mut self.show_fps_bar, "Show frame stats");
    }

    fn search_hits(&mut self) -> Vec<SearchHit> {
        let query = self.search.trim();
        if query.is_empty() || self.viz.ranking().is_empty() {
            return Vec::new();
        }

        if let Some(cached) = &self.search_match_cache
            && cached.generation == self.viz.generation()
            && cached.query == query
        {
            return cached.hits.clone();
        }

        let matcher = SkimMatcherV2::default();
        let mut scored = self
            .viz
            .ranking()
            .ids()
            .iter()
            .enumerate()
            .filter_map(|(rank, id)| {
                fuzzy_match_score(&matcher, id.as_str(), query).map(|score| (score, rank, id))
            })
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let hits = scored
            .into_iter()
            .take(SEARCH_HIT_LIMIT)
            .map(|(_, rank, id)| SearchHit {
                id: id.to_string(),
                rank,
            })
            .collect::<Vec<_>>();

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            generation: self.viz.generation(),
            hits: hits.clone(),
        });

        hits
    }
}
