//! Trade sinks: where completed days go.
//!
//! The core exposes its ledger as in-memory [`TradeRecord`]s; persistence,
//! if any, is a collaborator behind this trait.

use types::{Day, TradeRecord};

/// Receiver for each completed trading day's records.
pub trait TradeSink {
    fn on_day_complete(&mut self, day: Day, records: &[TradeRecord]);
}

/// A sink that keeps every day's records in memory, queryable by day or as
/// one flat sequence.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    days: Vec<Vec<TradeRecord>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of one day, if it completed.
    pub fn day(&self, day: Day) -> Option<&[TradeRecord]> {
        self.days.get(day as usize).map(Vec::as_slice)
    }

    /// Number of completed days.
    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    /// All records across days, in execution order.
    pub fn all(&self) -> Vec<TradeRecord> {
        self.days.iter().flatten().cloned().collect()
    }
}

impl TradeSink for MemorySink {
    fn on_day_complete(&mut self, _day: Day, records: &[TradeRecord]) {
        self.days.push(records.to_vec());
    }
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TradeSink for NullSink {
    fn on_day_complete(&mut self, _day: Day, _records: &[TradeRecord]) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{TradeId, TraderId};

    fn record(day: Day, price: f64) -> TradeRecord {
        TradeRecord {
            trade_id: TradeId(0),
            day,
            timestep: 0,
            price,
            seller: TraderId(1),
            buyer: TraderId(2),
            seller_limit: price - 1.0,
            buyer_limit: price + 1.0,
        }
    }

    #[test]
    fn test_memory_sink_collects_days() {
        let mut sink = MemorySink::new();
        sink.on_day_complete(0, &[record(0, 10.0), record(0, 11.0)]);
        sink.on_day_complete(1, &[record(1, 12.0)]);

        assert_eq!(sink.day_count(), 2);
        assert_eq!(sink.day(0).unwrap().len(), 2);
        assert_eq!(sink.all().len(), 3);
        assert!(sink.day(5).is_none());
    }
}
