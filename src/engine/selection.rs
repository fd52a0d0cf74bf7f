use chrono::{DateTime, Utc};

use crate::dataset::NodeId;

use super::PairDirection;
use super::aggregate::AggregationStore;
use super::blocks::BlockKey;
use super::chunks::LayoutMode;
use super::ranking::RankedIndex;

#[derive(Clone, Debug, PartialEq)]
pub struct SelectedTransaction {
    pub from: NodeId,
    pub to: NodeId,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// Side-panel data for a picked block.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub key: BlockKey,
    pub from: NodeId,
    /// `None` for a bar, which aggregates everything a node received.
    pub to: Option<NodeId>,
    /// Newest first.
    pub transactions: Vec<SelectedTransaction>,
}

impl Selection {
    pub fn total(&self) -> f64 {
        self.transactions.iter().map(|tx| tx.amount).sum()
    }

    /// Rows worth listing; zero-amount transfers are hidden.
    pub fn visible(&self) -> impl Iterator<Item = &SelectedTransaction> {
        self.transactions.iter().filter(|tx| tx.amount > 0.0)
    }

    pub fn has_visible(&self) -> bool {
        self.visible().next().is_some()
    }
}

pub fn select(
    store: &AggregationStore,
    ranking: &RankedIndex,
    layout: LayoutMode,
    pairing: PairDirection,
    key: BlockKey,
) -> Option<Selection> {
    let from = ranking.id_at(key.row)?;
    let mut transactions = Vec::new();

    let to = match layout {
        LayoutMode::Grid => {
            let to = ranking.id_at(key.col)?;
            collect_pair(store, from, to, &mut transactions);
            if pairing == PairDirection::Symmetric && from != to {
                collect_pair(store, to, from, &mut transactions);
            }
            Some(to.clone())
        }
        LayoutMode::Bar => {
            let node = store.node(from)?;
            for sender in node.senders() {
                collect_pair(store, sender, from, &mut transactions);
            }
            None
        }
    };

    transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    Some(Selection {
        key,
        from: from.clone(),
        to,
        transactions,
    })
}

fn collect_pair(
    store: &AggregationStore,
    from: &NodeId,
    to: &NodeId,
    out: &mut Vec<SelectedTransaction>,
) {
    out.extend(
        store
            .pair_transactions(from, to)
            .iter()
            .map(|tx| SelectedTransaction {
                from: from.clone(),
                to: to.clone(),
                amount: tx.amount,
                timestamp: tx.timestamp,
            }),
    );
}
