use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ranked indices per chunk edge.
    pub chunk_size: usize,
    pub load_radius: u32,
    pub unload_radius: u32,
    pub block_width: f32,
    pub spacing: f32,
    /// Lower bound for every normalization denominator.
    pub maxima_floor: f64,
    pub animation: AnimationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            load_radius: 5,
            unload_radius: 10,
            block_width: 1.0,
            spacing: 0.3,
            maxima_floor: 0.01,
            animation: AnimationConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub min_height: f32,
    pub max_height: f32,
    pub growth_rate: f32,
    pub decay_rate: f32,
    pub fade_in_rate: f32,
    pub fade_out_rate: f32,
    pub settle_epsilon: f32,
    /// Cells from the focal point beyond which new blocks start partly visible.
    pub fade_distance: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            min_height: 0.2,
            max_height: 2.0,
            growth_rate: 0.1,
            decay_rate: 0.1,
            fade_in_rate: 0.05,
            fade_out_rate: 0.05,
            settle_epsilon: 0.01,
            fade_distance: 30.0,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn cell_footprint(&self) -> f32 {
        self.block_width + self.spacing
    }

    pub fn chunk_footprint(&self) -> f32 {
        self.cell_footprint() * self.chunk_size as f32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::NonPositiveChunkSize);
        }
        if self.load_radius == 0 {
            return Err(ConfigError::NonPositiveRadius { name: "load" });
        }
        if self.unload_radius == 0 {
            return Err(ConfigError::NonPositiveRadius { name: "unload" });
        }
        if self.unload_radius < self.load_radius {
            return Err(ConfigError::UnloadInsideLoad {
                load: self.load_radius,
                unload: self.unload_radius,
            });
        }

        positive("block width", self.block_width)?;
        if !(self.spacing >= 0.0 && self.spacing.is_finite()) {
            return Err(ConfigError::NonPositiveDimension {
                name: "spacing",
                value: self.spacing,
            });
        }
        positive("maxima floor", self.maxima_floor as f32)?;

        let animation = &self.animation;
        positive("minimum height", animation.min_height)?;
        positive("maximum height", animation.max_height)?;
        positive("settle epsilon", animation.settle_epsilon)?;
        positive("fade distance", animation.fade_distance)?;
        unit_rate("growth rate", animation.growth_rate)?;
        unit_rate("decay rate", animation.decay_rate)?;
        unit_rate("fade-in rate", animation.fade_in_rate)?;
        unit_rate("fade-out rate", animation.fade_out_rate)?;

        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveDimension { name, value })
    }
}

fn unit_rate(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::RateOutOfRange { name, value })
    }
}
