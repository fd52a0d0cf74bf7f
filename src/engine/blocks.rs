//! Block lifecycle: every instantiated block moves through
//! `Spawning -> Steady -> Despawning -> Removed`, one transition step per tick.
//!
//! A block is only dropped from the active set once it reaches `Removed`, so
//! the presentation layer never sees a half-shrunk block vanish mid-animation.

use std::collections::HashMap;
use std::fmt;

use crate::dataset::NodeId;

use super::chunks::{ChunkCoord, LayoutMode};
use super::color::{Rgb, activity_color};
use super::config::AnimationConfig;
use super::error::EngineError;

const SCALE_TOLERANCE: f32 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey {
    pub row: usize,
    /// Always 0 in bar layout.
    pub col: usize,
}

impl BlockKey {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Spawning,
    Steady,
    Despawning,
    Removed,
}

/// What a data source hands over when a cell is materialized.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockSeed {
    pub key: BlockKey,
    pub from: NodeId,
    pub to: Option<NodeId>,
    pub raw_value: f64,
    pub normalized: f32,
}

pub trait BlockSource {
    fn layout(&self) -> LayoutMode;
    fn cell_count(&self) -> usize;
    fn seed(&self, key: BlockKey) -> Option<BlockSeed>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub key: BlockKey,
    pub chunk: ChunkCoord,
    pub from: NodeId,
    pub to: Option<NodeId>,
    pub raw_value: f64,
    pub normalized_value: f32,
    pub current_scale: f32,
    pub target_scale: f32,
    pub opacity: f32,
    pub color: Rgb,
    pub state: LifecycleState,
}

impl Block {
    fn new(seed: BlockSeed, chunk: ChunkCoord, opacity: f32, params: &AnimationConfig) -> Self {
        let normalized_value = seed.normalized.clamp(0.0, 1.0);
        let mut block = Self {
            key: seed.key,
            chunk,
            from: seed.from,
            to: seed.to,
            raw_value: seed.raw_value,
            normalized_value,
            current_scale: params.min_height,
            target_scale: normalized_value * params.max_height + params.min_height,
            opacity,
            color: Rgb::WHITE,
            state: LifecycleState::Spawning,
        };
        block.recolor();
        block
    }

    /// Colour follows height: the ratio is scaled by how far the block has grown.
    fn recolor(&mut self) {
        let grown = if self.target_scale > 0.0 {
            (self.current_scale / self.target_scale).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.color = activity_color(grown * self.normalized_value);
    }

    fn advance_spawning(&mut self, params: &AnimationConfig) {
        self.current_scale += (self.target_scale - self.current_scale) * params.growth_rate;
        self.opacity = (self.opacity + params.fade_in_rate).min(1.0);

        if self.target_scale - self.current_scale < params.settle_epsilon && self.opacity >= 1.0 {
            self.current_scale = self.target_scale;
            self.state = LifecycleState::Steady;
        }
        self.recolor();
    }

    fn advance_despawning(&mut self, params: &AnimationConfig) {
        let floor = params.min_height;
        self.current_scale = floor + (self.current_scale - floor) * (1.0 - params.decay_rate);
        self.opacity = (self.opacity - params.fade_out_rate).max(0.0);

        if self.current_scale - floor < params.settle_epsilon && self.opacity <= 0.0 {
            self.current_scale = floor;
            self.state = LifecycleState::Removed;
        }
        self.recolor();
    }

    fn advance(&mut self, params: &AnimationConfig) -> Result<(), EngineError> {
        match self.state {
            LifecycleState::Spawning => self.advance_spawning(params),
            LifecycleState::Despawning => self.advance_despawning(params),
            LifecycleState::Steady | LifecycleState::Removed => {}
        }
        self.check()
    }

    fn check(&self) -> Result<(), EngineError> {
        let detail = match self.state {
            LifecycleState::Removed if self.opacity > 0.0 => {
                format!("removed while opacity is {}", self.opacity)
            }
            LifecycleState::Spawning if self.current_scale > self.target_scale + SCALE_TOLERANCE => {
                format!(
                    "scale {} overshot target {}",
                    self.current_scale, self.target_scale
                )
            }
            _ => return Ok(()),
        };

        tracing::error!(key = %self.key, %detail, "block state violation");
        Err(EngineError::StateViolation {
            key: self.key,
            detail,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LifecycleReport {
    /// Blocks that reached `Removed` this tick; their render resources can go.
    pub released: Vec<BlockKey>,
    pub settled: usize,
}

#[derive(Clone, Debug)]
pub struct BlockLifecycleEngine {
    params: AnimationConfig,
    blocks: HashMap<BlockKey, Block>,
}

impl BlockLifecycleEngine {
    pub fn new(params: AnimationConfig) -> Self {
        Self {
            params,
            blocks: HashMap::new(),
        }
    }

    /// Spawns every missing block of `coord`. `focal_cell` is the focal point in
    /// ranked-index units and only affects the starting opacity.
    pub fn instantiate_chunk(
        &mut self,
        coord: ChunkCoord,
        chunk_size: usize,
        source: &impl BlockSource,
        focal_cell: (f32, f32),
    ) -> usize {
        let mut spawned = 0usize;
        for key in coord.cells(chunk_size, source.layout(), source.cell_count()) {
            if self.blocks.contains_key(&key) {
                continue;
            }
            let Some(seed) = source.seed(key) else {
                continue;
            };

            let distance = match source.layout() {
                LayoutMode::Grid => (key.row as f32 - focal_cell.0)
                    .abs()
                    .max((key.col as f32 - focal_cell.1).abs()),
                LayoutMode::Bar => (key.row as f32 - focal_cell.0).abs(),
            };
            let opacity = self.initial_opacity(distance);
            self.blocks
                .insert(key, Block::new(seed, coord, opacity, &self.params));
            spawned += 1;
        }
        spawned
    }

    fn initial_opacity(&self, distance: f32) -> f32 {
        ((distance / self.params.fade_distance) - 1.0).clamp(0.0, 0.9)
    }

    /// Viewport unload: the chunk lies beyond the unload radius, so its blocks
    /// are released at once instead of animating out.
    pub fn despawn_chunk(&mut self, coord: ChunkCoord) -> Vec<BlockKey> {
        let mut released = self
            .blocks
            .values()
            .filter(|block| block.chunk == coord)
            .map(|block| block.key)
            .collect::<Vec<_>>();
        released.sort_unstable();
        for key in &released {
            self.blocks.remove(key);
        }
        released
    }

    /// Forces every live block into `Despawning`. Idempotent.
    pub fn begin_drain(&mut self) -> usize {
        let mut forced = 0usize;
        for block in self.blocks.values_mut() {
            if matches!(
                block.state,
                LifecycleState::Spawning | LifecycleState::Steady
            ) {
                block.state = LifecycleState::Despawning;
                forced += 1;
            }
        }
        forced
    }

    pub fn tick(&mut self) -> Result<LifecycleReport, EngineError> {
        let mut report = LifecycleReport::default();

        for block in self.blocks.values_mut() {
            let before = block.state;
            block.advance(&self.params)?;
            if before == LifecycleState::Spawning && block.state == LifecycleState::Steady {
                report.settled += 1;
            }
            if block.state == LifecycleState::Removed {
                report.released.push(block.key);
            }
        }

        for key in &report.released {
            self.blocks.remove(key);
        }
        report.released.sort_unstable();

        Ok(report)
    }

    pub fn is_drained(&self) -> bool {
        self.blocks
            .values()
            .all(|block| block.state == LifecycleState::Removed)
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn get(&self, key: BlockKey) -> Option<&Block> {
        self.blocks.get(&key)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn count_in(&self, state: LifecycleState) -> usize {
        self.blocks
            .values()
            .filter(|block| block.state == state)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use pretty_assertions::assert_eq;

    struct FakeSource {
        layout: LayoutMode,
        cells: usize,
    }

    impl BlockSource for FakeSource {
        fn layout(&self) -> LayoutMode {
            self.layout
        }

        fn cell_count(&self) -> usize {
            self.cells
        }

        fn seed(&self, key: BlockKey) -> Option<BlockSeed> {
            let raw_value = ((key.row + key.col) % 4) as f64;
            Some(BlockSeed {
                key,
                from: NodeId::new(format!("n{}", key.row)),
                to: Some(NodeId::new(format!("n{}", key.col))),
                raw_value,
                normalized: (raw_value / 3.0) as f32,
            })
        }
    }

    fn grid(cells: usize) -> FakeSource {
        FakeSource {
            layout: LayoutMode::Grid,
            cells,
        }
    }

    fn engine() -> BlockLifecycleEngine {
        BlockLifecycleEngine::new(AnimationConfig::default())
    }

    fn keys(engine: &BlockLifecycleEngine) -> BTreeSet<BlockKey> {
        engine.blocks().map(|block| block.key).collect()
    }

    fn tick_until_settled(engine: &mut BlockLifecycleEngine, limit: usize) -> usize {
        for tick in 1..=limit {
            engine.tick().expect("no state violation");
            if engine.count_in(LifecycleState::Spawning) == 0 {
                return tick;
            }
        }
        panic!("blocks did not settle within {limit} ticks");
    }

    #[test]
    fn test_spawned_blocks_start_at_the_floor() {
        let mut engine = engine();
        let spawned = engine.instantiate_chunk(ChunkCoord::new(0, 0), 4, &grid(4), (0.0, 0.0));
        assert_eq!(spawned, 16);

        let block = engine.get(BlockKey::new(1, 2)).expect("block exists");
        assert_eq!(block.state, LifecycleState::Spawning);
        assert_eq!(block.current_scale, 0.2);
        assert_eq!(block.opacity, 0.0);
        assert!((block.target_scale - 2.2).abs() < 1e-6);
    }

    #[test]
    fn test_far_blocks_start_partly_visible() {
        let mut engine = engine();
        engine.instantiate_chunk(ChunkCoord::new(6, 0), 10, &grid(100), (0.0, 0.0));

        let block = engine.get(BlockKey::new(69, 0)).expect("block exists");
        assert!(block.opacity > 0.0 && block.opacity <= 0.9);
        let near = engine.get(BlockKey::new(60, 0)).expect("block exists");
        assert!(near.opacity <= block.opacity);
    }

    #[test]
    fn test_instantiating_twice_does_not_duplicate() {
        let mut engine = engine();
        let coord = ChunkCoord::new(0, 0);
        engine.instantiate_chunk(coord, 4, &grid(4), (0.0, 0.0));
        assert_eq!(engine.instantiate_chunk(coord, 4, &grid(4), (0.0, 0.0)), 0);
        assert_eq!(engine.len(), 16);
    }

    #[test]
    fn test_load_then_unload_restores_block_set() {
        let mut engine = engine();
        let source = grid(40);
        engine.instantiate_chunk(ChunkCoord::new(0, 0), 10, &source, (0.0, 0.0));
        engine.tick().expect("no state violation");
        let before = keys(&engine);

        let coord = ChunkCoord::new(1, 2);
        assert_eq!(engine.instantiate_chunk(coord, 10, &source, (0.0, 0.0)), 100);
        let released = engine.despawn_chunk(coord);

        assert_eq!(released.len(), 100);
        assert_eq!(keys(&engine), before);
    }

    #[test]
    fn test_spawning_settles_within_bound_without_overshoot() {
        let mut engine = engine();
        let params = engine.params;
        engine.instantiate_chunk(ChunkCoord::new(0, 0), 4, &grid(4), (0.0, 0.0));

        let target = params.max_height + params.min_height;
        let scale_bound = ((params.settle_epsilon / target).ln()
            / (1.0 - params.growth_rate).ln())
        .ceil() as usize;
        let fade_bound = (1.0 / params.fade_in_rate).ceil() as usize;
        let bound = scale_bound.max(fade_bound) + 1;

        for _ in 0..bound {
            engine.tick().expect("no state violation");
            for block in engine.blocks() {
                assert!(block.current_scale <= block.target_scale + SCALE_TOLERANCE);
                assert!(block.opacity <= 1.0);
            }
        }

        assert_eq!(engine.count_in(LifecycleState::Steady), 16);
        for block in engine.blocks() {
            assert_eq!(block.current_scale, block.target_scale);
            assert_eq!(block.color, activity_color(block.normalized_value));
        }
    }

    #[test]
    fn test_zero_value_block_is_grey_and_settles_after_fade_in() {
        let mut engine = engine();
        engine.instantiate_chunk(ChunkCoord::new(0, 0), 1, &grid(1), (0.0, 0.0));
        let block = engine.get(BlockKey::new(0, 0)).expect("block exists");
        assert_eq!(block.raw_value, 0.0);
        assert_eq!(block.target_scale, block.current_scale);
        assert_eq!(block.color, activity_color(0.0));

        let ticks = tick_until_settled(&mut engine, 100);
        assert!(ticks <= 21);
    }

    #[test]
    fn test_drain_despawns_every_block_before_reporting_drained() {
        let mut engine = engine();
        engine.instantiate_chunk(ChunkCoord::new(0, 0), 3, &grid(3), (0.0, 0.0));
        tick_until_settled(&mut engine, 200);
        assert!(!engine.is_drained());

        assert_eq!(engine.begin_drain(), 9);
        assert_eq!(engine.begin_drain(), 0);
        assert_eq!(engine.count_in(LifecycleState::Despawning), 9);

        let mut released = BTreeSet::new();
        for _ in 0..500 {
            let report = engine.tick().expect("no state violation");
            for block in engine.blocks() {
                assert_eq!(block.state, LifecycleState::Despawning);
                assert!(block.current_scale >= engine.params.min_height);
            }
            released.extend(report.released);
            if engine.is_drained() {
                break;
            }
        }

        assert!(engine.is_drained());
        assert!(engine.is_empty());
        assert_eq!(released.len(), 9);
    }

    #[test]
    fn test_bar_layout_measures_distance_along_rows_only() {
        let mut engine = engine();
        let bars = FakeSource {
            layout: LayoutMode::Bar,
            cells: 100,
        };
        assert_eq!(
            engine.instantiate_chunk(ChunkCoord::new(0, 0), 10, &bars, (0.0, 500.0)),
            10
        );
        assert!(engine.blocks().all(|block| block.opacity == 0.0));
        assert!(engine.blocks().all(|block| block.key.col == 0));
    }

    #[test]
    fn test_removed_with_opacity_is_a_state_violation() {
        let params = AnimationConfig::default();
        let seed = grid(1).seed(BlockKey::new(0, 0)).expect("seed");
        let mut block = Block::new(seed, ChunkCoord::new(0, 0), 0.5, &params);
        block.state = LifecycleState::Removed;

        assert!(matches!(
            block.advance(&params),
            Err(EngineError::StateViolation { .. })
        ));
    }
}
