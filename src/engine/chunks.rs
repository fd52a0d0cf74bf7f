use std::collections::HashMap;
use std::fmt;

use super::blocks::BlockKey;
use super::config::EngineConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutMode {
    /// Row x column pairwise blocks.
    #[default]
    Grid,
    /// One aggregate block per ranked node along a single row.
    Bar,
}

impl LayoutMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Grid => "Grid",
            Self::Bar => "Bar",
        }
    }
}

/// World-space point on the ground plane the viewport is centred on.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FocalPoint {
    pub x: f32,
    pub z: f32,
}

impl FocalPoint {
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i64,
    pub y: i64,
}

impl ChunkCoord {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn is_valid(self) -> bool {
        self.x >= 0 && self.y >= 0
    }

    pub fn chebyshev(self, other: Self) -> u64 {
        self.x
            .abs_diff(other.x)
            .max(self.y.abs_diff(other.y))
    }

    /// Block keys covered by this chunk, clipped to `cell_count` ranked indices.
    pub fn cells(self, chunk_size: usize, layout: LayoutMode, cell_count: usize) -> Vec<BlockKey> {
        if !self.is_valid() {
            return Vec::new();
        }

        let span = |origin: i64| {
            let start = (origin as usize).saturating_mul(chunk_size).min(cell_count);
            let end = start.saturating_add(chunk_size).min(cell_count);
            start..end
        };

        match layout {
            LayoutMode::Grid => {
                let rows = span(self.x);
                let cols = span(self.y);
                rows.flat_map(|row| cols.clone().map(move |col| BlockKey::new(row, col)))
                    .collect()
            }
            LayoutMode::Bar if self.y == 0 => span(self.x).map(|row| BlockKey::new(row, 0)).collect(),
            LayoutMode::Bar => Vec::new(),
        }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChunkPresence {
    #[default]
    Unloaded,
    Loaded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkRequest {
    Load(ChunkCoord),
    Unload(ChunkCoord),
}

#[derive(Clone, Debug)]
pub struct ChunkManager {
    chunk_size: usize,
    load_radius: i64,
    unload_radius: u64,
    chunk_footprint: f32,
    layout: LayoutMode,
    registry: HashMap<ChunkCoord, ChunkPresence>,
}

impl ChunkManager {
    pub fn new(config: &EngineConfig, layout: LayoutMode) -> Self {
        Self {
            chunk_size: config.chunk_size,
            load_radius: i64::from(config.load_radius),
            unload_radius: u64::from(config.unload_radius),
            chunk_footprint: config.chunk_footprint(),
            layout,
            registry: HashMap::new(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Switching layout drains every chunk; the next tick re-requests the visible ones.
    pub fn set_layout(&mut self, layout: LayoutMode) {
        self.layout = layout;
        self.clear();
    }

    pub fn clear(&mut self) {
        self.registry.clear();
    }

    pub fn focal_chunk(&self, focal: FocalPoint) -> ChunkCoord {
        let x = (focal.x / self.chunk_footprint).floor() as i64;
        let y = match self.layout {
            LayoutMode::Grid => (focal.z / self.chunk_footprint).floor() as i64,
            LayoutMode::Bar => 0,
        };
        ChunkCoord::new(x, y)
    }

    pub fn tick(&mut self, focal: FocalPoint) -> Vec<ChunkRequest> {
        let center = self.focal_chunk(focal);
        let radius = self.load_radius;
        let mut requests = Vec::new();

        let y_offsets = match self.layout {
            LayoutMode::Grid => -radius..=radius,
            LayoutMode::Bar => 0..=0,
        };
        for dx in -radius..=radius {
            for dy in y_offsets.clone() {
                // a saturated focal chunk has no neighbours past the i64 range
                let (Some(x), Some(y)) = (center.x.checked_add(dx), center.y.checked_add(dy)) else {
                    continue;
                };
                let coord = ChunkCoord::new(x, y);
                if coord.is_valid() && self.mark_loaded(coord) {
                    tracing::debug!(chunk = %coord, "chunk load requested");
                    requests.push(ChunkRequest::Load(coord));
                }
            }
        }

        let mut stale = self
            .registry
            .iter()
            .filter(|(coord, presence)| {
                **presence == ChunkPresence::Loaded && coord.chebyshev(center) > self.unload_radius
            })
            .map(|(coord, _)| *coord)
            .collect::<Vec<_>>();
        stale.sort_unstable();

        for coord in stale {
            self.mark_unloaded(coord);
            tracing::debug!(chunk = %coord, "chunk unload requested");
            requests.push(ChunkRequest::Unload(coord));
        }

        requests
    }

    /// Returns `true` only when the chunk was not already loaded.
    pub fn mark_loaded(&mut self, coord: ChunkCoord) -> bool {
        let presence = self.registry.entry(coord).or_default();
        if *presence == ChunkPresence::Loaded {
            return false;
        }
        *presence = ChunkPresence::Loaded;
        true
    }

    /// Returns `true` only when the chunk was loaded. Unloaded chunks leave the
    /// registry, so it stays bounded by the loaded neighbourhood.
    pub fn mark_unloaded(&mut self, coord: ChunkCoord) -> bool {
        if self.presence(coord) != ChunkPresence::Loaded {
            return false;
        }
        self.registry.remove(&coord);
        true
    }

    pub fn presence(&self, coord: ChunkCoord) -> ChunkPresence {
        self.registry.get(&coord).copied().unwrap_or(ChunkPresence::Unloaded)
    }

    pub fn loaded_chunks(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.registry
            .iter()
            .filter(|(_, presence)| **presence == ChunkPresence::Loaded)
            .map(|(coord, _)| *coord)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded_chunks().count()
    }
}
