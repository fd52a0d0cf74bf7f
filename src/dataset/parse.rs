use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{Dataset, NodeId, TransactionRecord};

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl RawId {
    fn into_node_id(self) -> Option<NodeId> {
        match self {
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(NodeId::new(trimmed))
                }
            }
            Self::Signed(value) => Some(NodeId::new(value.to_string())),
            Self::Unsigned(value) => Some(NodeId::new(value.to_string())),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    fn value(&self) -> Option<f64> {
        let value = match self {
            Self::Number(value) => *value,
            Self::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Millis(i64),
}

#[derive(Clone, Debug, Deserialize)]
struct RawTransaction {
    from: RawId,
    to: RawId,
    amount: RawAmount,
    #[serde(alias = "time")]
    timestamp: RawTimestamp,
}

impl RawTransaction {
    fn into_record(self) -> Option<TransactionRecord> {
        let amount = self.amount.value()?;
        let timestamp = match self.timestamp {
            RawTimestamp::Text(text) => parse_timestamp(&text)?,
            RawTimestamp::Millis(millis) => Utc.timestamp_millis_opt(millis).single()?,
        };

        Some(TransactionRecord {
            from: self.from.into_node_id()?,
            to: self.to.into_node_id()?,
            amount,
            timestamp,
        })
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn parse_dataset(raw: &str, source: &str) -> Result<Dataset> {
    let parsed: Value = serde_json::from_str(raw).context("invalid dataset JSON")?;
    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("dataset must be a JSON object with nodes and transactions"))?;

    let raw_nodes = object
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("dataset is missing a `nodes` array"))?;
    let raw_transactions = object
        .get("transactions")
        .map(|value| {
            value
                .as_array()
                .ok_or_else(|| anyhow!("dataset `transactions` must be an array"))
        })
        .transpose()?
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut rejected = 0usize;

    let mut nodes = Vec::with_capacity(raw_nodes.len());
    for value in raw_nodes {
        match RawId::deserialize(value).ok().and_then(RawId::into_node_id) {
            Some(id) => nodes.push(id),
            None => rejected += 1,
        }
    }

    let mut transactions = Vec::with_capacity(raw_transactions.len());
    for value in raw_transactions {
        match RawTransaction::deserialize(value)
            .ok()
            .and_then(RawTransaction::into_record)
        {
            Some(record) => transactions.push(record),
            None => rejected += 1,
        }
    }

    Ok(Dataset {
        source: source.to_owned(),
        nodes,
        transactions,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parses_mixed_id_and_amount_shapes() {
        let raw = r#"{
            "nodes": ["A", 7, "  "],
            "transactions": [
                {"from": "A", "to": 7, "amount": "12.5", "timestamp": "2023-01-01T00:00:00Z"},
                {"from": "A", "to": "7", "amount": 3, "time": 1672531200000},
                {"from": "A", "to": "7", "amount": "lots", "timestamp": "2023-01-01T00:00:00Z"},
                {"from": "A", "to": "7", "amount": 1, "timestamp": "yesterday"},
                {"to": "7", "amount": 1, "timestamp": "2023-01-01"}
            ]
        }"#;

        let dataset = parse_dataset(raw, "inline").expect("dataset parses");

        assert_eq!(dataset.nodes, vec![NodeId::from("A"), NodeId::from("7")]);
        assert_eq!(dataset.transactions.len(), 2);
        assert_eq!(dataset.transactions[0].amount, 12.5);
        assert_eq!(dataset.transactions[0].to, NodeId::from("7"));
        assert_eq!(
            dataset.transactions[1].timestamp,
            dataset.transactions[0].timestamp
        );
        assert_eq!(dataset.rejected, 4);
    }

    #[test]
    fn test_missing_transactions_is_an_empty_dataset() {
        let dataset = parse_dataset(r#"{"nodes": []}"#, "inline").expect("dataset parses");
        assert!(dataset.nodes.is_empty());
        assert!(dataset.transactions.is_empty());
    }

    #[test]
    fn test_rejects_non_object_documents() {
        assert!(parse_dataset("[1, 2, 3]", "inline").is_err());
        assert!(parse_dataset("{\"transactions\": []}", "inline").is_err());
        assert!(parse_dataset("not json", "inline").is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = parse_timestamp("2023-01-01T00:00:00Z").expect("rfc3339");
        assert_eq!(parse_timestamp("2023-01-01T00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-01 00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-01"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-01T02:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("01/01/2023"), None);
    }
}
