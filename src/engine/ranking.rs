use std::cmp::Ordering;
use std::collections::HashMap;

use crate::dataset::NodeId;

use super::aggregate::{AggregationStore, Node};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RankingMode {
    #[default]
    ByTotalValue,
    ByTransactionCount,
}

impl RankingMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::ByTotalValue => "Transactions total",
            Self::ByTransactionCount => "Number of transactions",
        }
    }

    fn compare(self, a: &Node, b: &Node) -> Ordering {
        let by_key = match self {
            Self::ByTotalValue => b.total_value.total_cmp(&a.total_value),
            Self::ByTransactionCount => b.num_transactions.cmp(&a.num_transactions),
        };
        by_key.then_with(|| a.id.cmp(&b.id))
    }
}

/// Dense zero-based ordering of node ids; grid coordinates index into it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankedIndex {
    mode: RankingMode,
    order: Vec<NodeId>,
    positions: HashMap<NodeId, usize>,
}

impl RankedIndex {
    /// Descending by the mode's rollup, ties broken by ascending id.
    pub fn build(store: &AggregationStore, mode: RankingMode) -> Self {
        let mut nodes = store.nodes().collect::<Vec<_>>();
        nodes.sort_by(|a, b| mode.compare(a, b));

        let order = nodes
            .into_iter()
            .map(|node| node.id.clone())
            .collect::<Vec<_>>();
        let positions = order
            .iter()
            .enumerate()
            .map(|(index, id)| (id.clone(), index))
            .collect();

        Self {
            mode,
            order,
            positions,
        }
    }

    pub fn mode(&self) -> RankingMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn id_at(&self, index: usize) -> Option<&NodeId> {
        self.order.get(index)
    }

    pub fn position_of(&self, id: &NodeId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.order
    }
}
