mod load;
pub(crate) mod parse;

use std::fmt;

use chrono::{DateTime, Utc};

pub use load::load_dataset;
pub use parse::parse_timestamp;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransactionRecord {
    pub from: NodeId,
    pub to: NodeId,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub source: String,
    pub nodes: Vec<NodeId>,
    pub transactions: Vec<TransactionRecord>,
    /// Records that could not be parsed at all (bad id, amount or timestamp).
    pub rejected: usize,
}

impl Dataset {
    pub fn transactions_in<'a>(
        &'a self,
        window: &'a TimeWindow,
    ) -> impl Iterator<Item = &'a TransactionRecord> + 'a {
        self.transactions
            .iter()
            .filter(move |record| window.contains(record.timestamp))
    }
}

/// Exclusive time bounds applied to transactions at ingestion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| timestamp > start)
            && self.end.is_none_or(|end| timestamp < end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp: &str) -> TransactionRecord {
        TransactionRecord {
            from: NodeId::from("A"),
            to: NodeId::from("B"),
            amount: 1.0,
            timestamp: parse_timestamp(timestamp).expect("valid timestamp"),
        }
    }

    #[test]
    fn test_unbounded_window_keeps_everything() {
        let window = TimeWindow::unbounded();
        assert!(window.is_unbounded());
        assert!(window.contains(record("1999-01-01T00:00:00Z").timestamp));
    }

    #[test]
    fn test_window_bounds_are_exclusive() {
        let dataset = Dataset {
            source: "test".to_owned(),
            nodes: vec![NodeId::from("A"), NodeId::from("B")],
            transactions: vec![
                record("2023-01-01T00:00:00Z"),
                record("2023-01-02T00:00:00Z"),
                record("2023-01-03T00:00:00Z"),
            ],
            rejected: 0,
        };
        let window = TimeWindow {
            start: parse_timestamp("2023-01-01T00:00:00Z"),
            end: parse_timestamp("2023-01-03T00:00:00Z"),
        };

        let kept = dataset.transactions_in(&window).collect::<Vec<_>>();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].timestamp, record("2023-01-02T00:00:00Z").timestamp);
    }
}
