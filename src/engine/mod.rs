//! Chunk-streaming and block-animation core.
//!
//! [`Visualization`] owns every component and is driven once per frame by
//! [`Visualization::tick`]. Nothing here is shared across threads; a freshly
//! loaded dataset is handed over through [`Visualization::begin_reload`] and
//! only swapped in once every block has finished despawning.

pub mod aggregate;
pub mod blocks;
pub mod chunks;
pub mod color;
pub mod config;
pub mod error;
pub mod ranking;
pub mod selection;

use std::sync::Arc;

use crate::dataset::{Dataset, NodeId, TimeWindow};

use aggregate::AggregationStore;
use blocks::{BlockKey, BlockLifecycleEngine, BlockSeed, BlockSource, LifecycleState};
use chunks::{ChunkManager, ChunkRequest, FocalPoint, LayoutMode};
use color::{Rgb, ScaleMode};
use config::EngineConfig;
use error::EngineError;
use ranking::{RankedIndex, RankingMode};
use selection::Selection;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PairDirection {
    #[default]
    Directed,
    /// `(a, b)` and `(b, a)` are summed into one block value.
    Symmetric,
}

impl PairDirection {
    pub fn label(self) -> &'static str {
        match self {
            Self::Directed => "Directed",
            Self::Symmetric => "Symmetric",
        }
    }
}

/// Everything that shapes a rebuild. Changing any field goes through the
/// drain-then-rebuild swap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewSettings {
    pub ranking: RankingMode,
    pub layout: LayoutMode,
    pub scale: ScaleMode,
    pub pairing: PairDirection,
    pub window: TimeWindow,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockDescriptor {
    pub key: BlockKey,
    pub position: [f32; 3],
    pub scale: [f32; 3],
    pub color: Rgb,
    pub opacity: f32,
    pub state: LifecycleState,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub generation: u64,
    pub loads: usize,
    pub unloads: usize,
    pub spawned: usize,
    pub settled: usize,
    /// Blocks whose render resources can be freed.
    pub released: Vec<BlockKey>,
    pub rebuilt: bool,
}

#[derive(Clone, Debug)]
struct PendingReload {
    dataset: Arc<Dataset>,
    settings: ViewSettings,
}

struct SceneSource<'a> {
    store: &'a AggregationStore,
    ranking: &'a RankedIndex,
    settings: ViewSettings,
}

impl BlockSource for SceneSource<'_> {
    fn layout(&self) -> LayoutMode {
        self.settings.layout
    }

    fn cell_count(&self) -> usize {
        self.ranking.len()
    }

    fn seed(&self, key: BlockKey) -> Option<BlockSeed> {
        let from = self.ranking.id_at(key.row)?;
        let maxima = self.store.maxima();

        let (to, raw_value, max) = match self.settings.layout {
            LayoutMode::Grid => {
                let to = self.ranking.id_at(key.col)?;
                let direct = self.store.pair_total(from, to);
                match self.settings.pairing {
                    PairDirection::Directed => (Some(to.clone()), direct, maxima.max_pair_total),
                    PairDirection::Symmetric => {
                        let reverse = if from == to {
                            0.0
                        } else {
                            self.store.pair_total(to, from)
                        };
                        (
                            Some(to.clone()),
                            direct + reverse,
                            maxima.max_undirected_pair_total,
                        )
                    }
                }
            }
            LayoutMode::Bar => {
                let node = self.store.node(from)?;
                (None, node.total_value, maxima.max_node_total)
            }
        };

        Some(BlockSeed {
            key,
            from: from.clone(),
            to,
            raw_value,
            normalized: self
                .settings
                .scale
                .normalize(raw_value, max, self.store.floor()),
        })
    }
}

pub struct Visualization {
    config: EngineConfig,
    settings: ViewSettings,
    store: AggregationStore,
    ranking: RankedIndex,
    chunks: ChunkManager,
    blocks: BlockLifecycleEngine,
    dataset: Option<Arc<Dataset>>,
    pending: Option<PendingReload>,
    generation: u64,
}

impl Visualization {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let settings = ViewSettings::default();
        Ok(Self {
            store: AggregationStore::new(config.maxima_floor),
            ranking: RankedIndex::default(),
            chunks: ChunkManager::new(&config, settings.layout),
            blocks: BlockLifecycleEngine::new(config.animation),
            config,
            settings,
            dataset: None,
            pending: None,
            generation: 0,
        })
    }

    /// Queues `dataset` for the next rebuild and starts draining every block.
    /// Calling this again before the drain finishes replaces the queued dataset.
    pub fn begin_reload(&mut self, dataset: Arc<Dataset>) {
        let settings = self.target_settings();
        self.queue(dataset, settings);
    }

    /// Returns `false` when nothing changed. Without a dataset the settings
    /// apply immediately since there is nothing to drain.
    pub fn apply_settings(&mut self, settings: ViewSettings) -> bool {
        if settings == self.target_settings() {
            return false;
        }

        let dataset = self
            .pending
            .as_ref()
            .map(|pending| Arc::clone(&pending.dataset))
            .or_else(|| self.dataset.clone());

        match dataset {
            Some(dataset) => self.queue(dataset, settings),
            None => {
                self.settings = settings;
                self.chunks.set_layout(settings.layout);
            }
        }
        true
    }

    fn queue(&mut self, dataset: Arc<Dataset>, settings: ViewSettings) {
        let forced = self.blocks.begin_drain();
        self.chunks.clear();

        let replaced = self
            .pending
            .replace(PendingReload { dataset, settings })
            .is_some();
        tracing::debug!(forced, replaced, "reload queued");
    }

    pub fn tick(&mut self, focal: FocalPoint) -> Result<FrameReport, EngineError> {
        let mut report = FrameReport {
            generation: self.generation,
            ..FrameReport::default()
        };

        if self.pending.is_none() && self.dataset.is_some() {
            let footprint = self.config.cell_footprint();
            let focal_cell = (focal.x / footprint, focal.z / footprint);
            let chunk_size = self.chunks.chunk_size();
            let source = SceneSource {
                store: &self.store,
                ranking: &self.ranking,
                settings: self.settings,
            };

            for request in self.chunks.tick(focal) {
                match request {
                    ChunkRequest::Load(coord) => {
                        report.loads += 1;
                        report.spawned +=
                            self.blocks
                                .instantiate_chunk(coord, chunk_size, &source, focal_cell);
                    }
                    ChunkRequest::Unload(coord) => {
                        report.unloads += 1;
                        report.released.extend(self.blocks.despawn_chunk(coord));
                    }
                }
            }
        }

        let lifecycle = self.blocks.tick()?;
        report.settled = lifecycle.settled;
        report.released.extend(lifecycle.released);

        if self.blocks.is_drained()
            && let Some(pending) = self.pending.take()
        {
            self.rebuild(pending);
            report.rebuilt = true;
            report.generation = self.generation;
        }

        Ok(report)
    }

    fn rebuild(&mut self, pending: PendingReload) {
        let PendingReload { dataset, settings } = pending;

        self.store = AggregationStore::ingest(&dataset, &settings.window, self.config.maxima_floor);
        self.ranking = RankedIndex::build(&self.store, settings.ranking);
        self.chunks.set_layout(settings.layout);
        self.blocks.clear();
        self.settings = settings;
        self.generation += 1;

        let maxima = self.store.maxima();
        tracing::info!(
            generation = self.generation,
            source = %dataset.source,
            nodes = self.store.node_count(),
            pairs = self.store.pair_key_count(),
            transactions = self.store.report().accepted_transactions,
            dropped = self.store.report().dropped() + dataset.rejected,
            max_pair_total = maxima.max_pair_total,
            max_node_total = maxima.max_node_total,
            ranking = self.ranking.mode().label(),
            layout = settings.layout.label(),
            "dataset rebuilt"
        );

        self.dataset = Some(dataset);
    }

    /// Descriptors for every live block, in no particular order.
    pub fn descriptors(&self) -> impl Iterator<Item = BlockDescriptor> + '_ {
        let footprint = self.config.cell_footprint();
        let width = self.config.block_width;

        self.blocks.blocks().map(move |block| BlockDescriptor {
            key: block.key,
            position: [
                block.key.row as f32 * footprint,
                block.current_scale / 2.0,
                block.key.col as f32 * footprint,
            ],
            scale: [width, block.current_scale, width],
            color: block.color,
            opacity: block.opacity,
            state: block.state,
        })
    }

    pub fn selection(&self, key: BlockKey) -> Option<Selection> {
        selection::select(
            &self.store,
            &self.ranking,
            self.settings.layout,
            self.settings.pairing,
            key,
        )
    }

    pub fn clamp_focal(&self, focal: FocalPoint) -> FocalPoint {
        let extent = self.config.cell_footprint() * self.ranking.len() as f32;
        let x = focal.x.clamp(0.0, extent);
        let z = match self.settings.layout {
            LayoutMode::Grid => focal.z.clamp(0.0, extent),
            LayoutMode::Bar => 0.0,
        };
        FocalPoint::new(x, z)
    }

    /// Focal point centred on the block at ranked index `rank`.
    pub fn focal_for_rank(&self, rank: usize) -> Option<FocalPoint> {
        if rank >= self.ranking.len() {
            return None;
        }
        let center = rank as f32 * self.config.cell_footprint();
        Some(match self.settings.layout {
            LayoutMode::Grid => FocalPoint::new(center, center),
            LayoutMode::Bar => FocalPoint::new(center, 0.0),
        })
    }

    pub fn rank_of(&self, id: &NodeId) -> Option<usize> {
        self.ranking.position_of(id)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn settings(&self) -> ViewSettings {
        self.settings
    }

    /// Settings the next rebuild will use.
    pub fn target_settings(&self) -> ViewSettings {
        self.pending
            .as_ref()
            .map_or(self.settings, |pending| pending.settings)
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    pub fn ranking(&self) -> &RankedIndex {
        &self.ranking
    }

    pub fn chunks(&self) -> &ChunkManager {
        &self.chunks
    }

    pub fn blocks(&self) -> &BlockLifecycleEngine {
        &self.blocks
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_deref()
    }

    pub fn is_reloading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
