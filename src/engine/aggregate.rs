//! Per-pair transaction lists and per-node inbound rollups for one dataset snapshot.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::dataset::{Dataset, NodeId, TimeWindow};

use super::error::IngestionError;

#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// Ordered `(from, to)` key; `(a, b)` and `(b, a)` are different pairs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PairKey {
    pub from: NodeId,
    pub to: NodeId,
}

impl PairKey {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Inbound transactions received by this node.
    pub num_transactions: u64,
    pub total_value: f64,
    senders: Vec<NodeId>,
}

impl Node {
    fn new(id: NodeId) -> Self {
        Self {
            id,
            num_transactions: 0,
            total_value: 0.0,
            senders: Vec::new(),
        }
    }

    /// Distinct senders in first-seen order.
    pub fn senders(&self) -> &[NodeId] {
        &self.senders
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AggregateMaxima {
    pub max_pair_total: f64,
    pub max_pair_count: f64,
    pub max_node_total: f64,
    pub max_node_count: f64,
    /// Largest `pairTotal(a, b) + pairTotal(b, a)`, used by symmetric pairing.
    pub max_undirected_pair_total: f64,
}

impl AggregateMaxima {
    pub fn with_floor(floor: f64) -> Self {
        Self {
            max_pair_total: floor,
            max_pair_count: floor,
            max_node_total: floor,
            max_node_count: floor,
            max_undirected_pair_total: floor,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted_nodes: usize,
    pub accepted_transactions: usize,
    pub duplicate_nodes: usize,
    pub unknown_endpoints: usize,
    pub invalid_amounts: usize,
}

impl IngestReport {
    pub fn dropped(&self) -> usize {
        self.duplicate_nodes + self.unknown_endpoints + self.invalid_amounts
    }

    fn count(&mut self, error: &IngestionError) {
        match error {
            IngestionError::DuplicateNode(_) => self.duplicate_nodes += 1,
            IngestionError::UnknownNode { .. } => self.unknown_endpoints += 1,
            IngestionError::InvalidAmount { .. } => self.invalid_amounts += 1,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct PairEntry {
    transactions: Vec<Transaction>,
    total: f64,
}

#[derive(Clone, Debug)]
pub struct AggregationStore {
    nodes: HashMap<NodeId, Node>,
    pairs: HashMap<PairKey, PairEntry>,
    maxima: AggregateMaxima,
    floor: f64,
    report: IngestReport,
}

impl AggregationStore {
    pub fn new(floor: f64) -> Self {
        Self {
            nodes: HashMap::new(),
            pairs: HashMap::new(),
            maxima: AggregateMaxima::with_floor(floor),
            floor,
            report: IngestReport::default(),
        }
    }

    pub fn ingest(dataset: &Dataset, window: &TimeWindow, floor: f64) -> Self {
        let mut store = Self::new(floor);

        for id in &dataset.nodes {
            if let Err(error) = store.add_node(id.clone()) {
                tracing::debug!(%error, "dropped node");
            }
        }

        for record in dataset.transactions_in(window) {
            if let Err(error) = store.record_transaction(
                &record.from,
                &record.to,
                record.amount,
                record.timestamp,
            ) {
                tracing::debug!(%error, "dropped transaction");
            }
        }

        if store.report.dropped() > 0 {
            tracing::warn!(
                source = %dataset.source,
                duplicate_nodes = store.report.duplicate_nodes,
                unknown_endpoints = store.report.unknown_endpoints,
                invalid_amounts = store.report.invalid_amounts,
                "ingestion dropped records"
            );
        }

        store
    }

    pub fn add_node(&mut self, id: NodeId) -> Result<(), IngestionError> {
        if self.nodes.contains_key(&id) {
            let error = IngestionError::DuplicateNode(id);
            self.report.count(&error);
            return Err(error);
        }

        self.nodes.insert(id.clone(), Node::new(id));
        self.report.accepted_nodes += 1;
        Ok(())
    }

    /// Appends to the `(from, to)` pair and credits the receiving node.
    pub fn record_transaction(
        &mut self,
        from: &NodeId,
        to: &NodeId,
        amount: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), IngestionError> {
        if let Err(error) = self.validate(from, to, amount) {
            self.report.count(&error);
            return Err(error);
        }

        let key = PairKey::new(from.clone(), to.clone());

        // Compute every candidate value before touching any table.
        let (pair_total, pair_count) = self
            .pairs
            .get(&key)
            .map(|entry| (entry.total + amount, entry.transactions.len() + 1))
            .unwrap_or((amount, 1));
        let reverse_total = self.pair_total(to, from);
        let (node_total, node_count) = self
            .nodes
            .get(to)
            .map(|node| (node.total_value + amount, node.num_transactions + 1))
            .unwrap_or((amount, 1));

        let entry = self.pairs.entry(key).or_default();
        entry.transactions.push(Transaction { amount, timestamp });
        entry.total = pair_total;

        if let Some(node) = self.nodes.get_mut(to) {
            node.total_value = node_total;
            node.num_transactions = node_count;
            if !node.senders.contains(from) {
                node.senders.push(from.clone());
            }
        }

        let maxima = &mut self.maxima;
        maxima.max_pair_total = maxima.max_pair_total.max(pair_total);
        maxima.max_pair_count = maxima.max_pair_count.max(pair_count as f64);
        maxima.max_node_total = maxima.max_node_total.max(node_total);
        maxima.max_node_count = maxima.max_node_count.max(node_count as f64);
        let undirected = if from == to {
            pair_total
        } else {
            pair_total + reverse_total
        };
        maxima.max_undirected_pair_total = maxima.max_undirected_pair_total.max(undirected);

        self.report.accepted_transactions += 1;
        Ok(())
    }

    fn validate(&self, from: &NodeId, to: &NodeId, amount: f64) -> Result<(), IngestionError> {
        if !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
            return Err(IngestionError::UnknownNode {
                from: from.clone(),
                to: to.clone(),
            });
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(IngestionError::InvalidAmount { amount });
        }
        Ok(())
    }

    pub fn pair_transactions(&self, from: &NodeId, to: &NodeId) -> &[Transaction] {
        self.pair_entry(from, to)
            .map(|entry| entry.transactions.as_slice())
            .unwrap_or_default()
    }

    pub fn pair_total(&self, from: &NodeId, to: &NodeId) -> f64 {
        self.pair_entry(from, to)
            .map(|entry| entry.total)
            .unwrap_or(0.0)
    }

    pub fn pair_count(&self, from: &NodeId, to: &NodeId) -> usize {
        self.pair_entry(from, to)
            .map(|entry| entry.transactions.len())
            .unwrap_or(0)
    }

    fn pair_entry(&self, from: &NodeId, to: &NodeId) -> Option<&PairEntry> {
        if !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
            return None;
        }
        self.pairs.get(&PairKey::new(from.clone(), to.clone()))
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn pair_key_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn maxima(&self) -> AggregateMaxima {
        self.maxima
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn report(&self) -> &IngestReport {
        &self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{TransactionRecord, parse_timestamp};
    use proptest::prelude::*;

    const FLOOR: f64 = 0.01;

    fn ts(raw: &str) -> DateTime<Utc> {
        parse_timestamp(raw).expect("valid timestamp")
    }

    fn id(raw: &str) -> NodeId {
        NodeId::from(raw)
    }

    fn store_with(nodes: &[&str]) -> AggregationStore {
        let mut store = AggregationStore::new(FLOOR);
        for node in nodes {
            store.add_node(id(node)).expect("fresh node");
        }
        store
    }

    #[test]
    fn test_single_transaction_scenario() {
        let mut store = store_with(&["A", "B"]);
        store
            .record_transaction(&id("A"), &id("B"), 100.0, ts("2023-01-01T00:00:00Z"))
            .expect("known endpoints");

        assert_eq!(store.pair_total(&id("A"), &id("B")), 100.0);
        assert_eq!(store.pair_total(&id("B"), &id("A")), 0.0);
        assert_eq!(store.pair_count(&id("A"), &id("B")), 1);

        let receiver = store.node(&id("B")).expect("B exists");
        assert_eq!(receiver.total_value, 100.0);
        assert_eq!(receiver.num_transactions, 1);
        assert_eq!(receiver.senders(), &[id("A")]);

        let sender = store.node(&id("A")).expect("A exists");
        assert_eq!(sender.total_value, 0.0);
        assert_eq!(sender.num_transactions, 0);
    }

    #[test]
    fn test_duplicate_node_keeps_first_entry() {
        let mut store = store_with(&["A", "B"]);
        store
            .record_transaction(&id("A"), &id("B"), 5.0, ts("2023-01-01T00:00:00Z"))
            .expect("known endpoints");

        let error = store.add_node(id("B")).expect_err("duplicate");
        assert_eq!(error, IngestionError::DuplicateNode(id("B")));
        assert_eq!(store.node(&id("B")).map(|node| node.total_value), Some(5.0));
        assert_eq!(store.report().duplicate_nodes, 1);
        assert_eq!(store.node_count(), 2);
    }

    #[test]
    fn test_unknown_endpoint_is_dropped_without_touching_maxima() {
        let mut store = store_with(&["A"]);
        let error = store
            .record_transaction(&id("A"), &id("Z"), 1_000.0, ts("2023-01-01T00:00:00Z"))
            .expect_err("unknown receiver");

        assert!(matches!(error, IngestionError::UnknownNode { .. }));
        assert_eq!(store.maxima(), AggregateMaxima::with_floor(FLOOR));
        assert_eq!(store.pair_key_count(), 0);
        assert_eq!(store.report().unknown_endpoints, 1);
    }

    #[test]
    fn test_negative_amount_is_dropped() {
        let mut store = store_with(&["A", "B"]);
        let error = store
            .record_transaction(&id("A"), &id("B"), -3.0, ts("2023-01-01T00:00:00Z"))
            .expect_err("negative amount");

        assert_eq!(error, IngestionError::InvalidAmount { amount: -3.0 });
        assert_eq!(store.pair_total(&id("A"), &id("B")), 0.0);
        assert_eq!(store.report().dropped(), 1);
    }

    #[test]
    fn test_unknown_pairs_are_empty() {
        let store = store_with(&["A", "B"]);
        assert!(store.pair_transactions(&id("A"), &id("B")).is_empty());
        assert!(store.pair_transactions(&id("X"), &id("Y")).is_empty());
        assert_eq!(store.pair_count(&id("X"), &id("Y")), 0);
    }

    #[test]
    fn test_pair_list_keeps_ingestion_order() {
        let mut store = store_with(&["A", "B"]);
        store
            .record_transaction(&id("A"), &id("B"), 1.0, ts("2023-03-01T00:00:00Z"))
            .expect("ok");
        store
            .record_transaction(&id("A"), &id("B"), 2.0, ts("2023-01-01T00:00:00Z"))
            .expect("ok");

        let amounts = store
            .pair_transactions(&id("A"), &id("B"))
            .iter()
            .map(|transaction| transaction.amount)
            .collect::<Vec<_>>();
        assert_eq!(amounts, vec![1.0, 2.0]);
    }

    #[test]
    fn test_maxima_track_pairs_nodes_and_undirected_totals() {
        let mut store = store_with(&["A", "B", "C"]);
        let when = ts("2023-01-01T00:00:00Z");
        store.record_transaction(&id("A"), &id("B"), 10.0, when).expect("ok");
        store.record_transaction(&id("B"), &id("A"), 4.0, when).expect("ok");
        store.record_transaction(&id("C"), &id("B"), 7.0, when).expect("ok");
        store.record_transaction(&id("C"), &id("B"), 1.0, when).expect("ok");

        let maxima = store.maxima();
        assert_eq!(maxima.max_pair_total, 10.0);
        assert_eq!(maxima.max_pair_count, 2.0);
        assert_eq!(maxima.max_node_total, 18.0);
        assert_eq!(maxima.max_node_count, 3.0);
        assert_eq!(maxima.max_undirected_pair_total, 14.0);
    }

    #[test]
    fn test_ingest_applies_time_window() {
        let dataset = Dataset {
            source: "test".to_owned(),
            nodes: vec![id("A"), id("B")],
            transactions: vec![
                TransactionRecord {
                    from: id("A"),
                    to: id("B"),
                    amount: 3.0,
                    timestamp: ts("2023-01-01T00:00:00Z"),
                },
                TransactionRecord {
                    from: id("A"),
                    to: id("B"),
                    amount: 5.0,
                    timestamp: ts("2023-06-01T00:00:00Z"),
                },
            ],
            rejected: 0,
        };
        let window = TimeWindow {
            start: Some(ts("2023-02-01T00:00:00Z")),
            end: None,
        };

        let store = AggregationStore::ingest(&dataset, &window, FLOOR);
        assert_eq!(store.pair_total(&id("A"), &id("B")), 5.0);

        let store = AggregationStore::ingest(&dataset, &TimeWindow::unbounded(), FLOOR);
        assert_eq!(store.pair_total(&id("A"), &id("B")), 8.0);
    }

    fn arb_transactions() -> impl Strategy<Value = Vec<(usize, usize, u32)>> {
        prop::collection::vec((0usize..5, 0usize..5, 0u32..10_000), 0..64)
    }

    proptest! {
        #[test]
        fn pair_totals_equal_sums_and_maxima_are_monotonic(records in arb_transactions()) {
            let names = ["n0", "n1", "n2", "n3", "n4"];
            let mut store = store_with(&names);
            let when = ts("2023-01-01T00:00:00Z");
            let mut expected: HashMap<(usize, usize), f64> = HashMap::new();
            let mut previous = store.maxima();

            for (from, to, amount) in &records {
                let amount = f64::from(*amount) / 100.0;
                store
                    .record_transaction(&id(names[*from]), &id(names[*to]), amount, when)
                    .expect("known endpoints");
                *expected.entry((*from, *to)).or_default() += amount;

                let current = store.maxima();
                prop_assert!(current.max_pair_total >= previous.max_pair_total);
                prop_assert!(current.max_pair_count >= previous.max_pair_count);
                prop_assert!(current.max_node_total >= previous.max_node_total);
                prop_assert!(current.max_node_count >= previous.max_node_count);
                previous = current;
            }

            let mut largest = FLOOR;
            for from in 0..names.len() {
                for to in 0..names.len() {
                    let want = expected.get(&(from, to)).copied().unwrap_or(0.0);
                    let got = store.pair_total(&id(names[from]), &id(names[to]));
                    prop_assert!((want - got).abs() < 1e-6);
                    largest = largest.max(got);
                }
            }
            prop_assert!((store.maxima().max_pair_total - largest).abs() < 1e-6);
        }
    }
}
