use thiserror::Error;

use crate::dataset::NodeId;

use super::blocks::BlockKey;

/// Per-record ingestion failure. The record is skipped and counted; never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestionError {
    #[error("transaction {from} -> {to} references an unknown node")]
    UnknownNode { from: NodeId, to: NodeId },

    #[error("node {0} was already added")]
    DuplicateNode(NodeId),

    #[error("transaction amount {amount} is negative or not finite")]
    InvalidAmount { amount: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("chunk size must be positive")]
    NonPositiveChunkSize,

    #[error("{name} radius must be positive")]
    NonPositiveRadius { name: &'static str },

    #[error("unload radius {unload} is smaller than load radius {load}")]
    UnloadInsideLoad { load: u32, unload: u32 },

    #[error("{name} must be positive (got {value})")]
    NonPositiveDimension { name: &'static str, value: f32 },

    #[error("{name} must be within (0, 1] (got {value})")]
    RateOutOfRange { name: &'static str, value: f32 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// An internal invariant was broken; this is a defect, not a runtime condition.
    #[error("state violation on block {key}: {detail}")]
    StateViolation { key: BlockKey, detail: String },
}
