//! Ticker state container: last-write-wins across delivery paths.

use super::{Source, TickerSnapshot};
use rust_decimal::Decimal;

/// Latest ticker plus the price delta against the previously observed price.
///
/// The previous price is shared by both delivery paths, so the delta stays
/// continuous when the writer switches between stream and poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerState {
    snapshot: Option<TickerSnapshot>,
    source: Option<Source>,
    previous_price: Option<Decimal>,
    price_change: Decimal,
    revision: u64,
}

impl TickerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot wholesale. Returns the price delta.
    ///
    /// Arrival order decides: a later write always wins, whatever its source.
    pub fn apply(&mut self, snapshot: TickerSnapshot, source: Source) -> Decimal {
        let change = match self.previous_price {
            Some(previous) => snapshot.last_price - previous,
            None => Decimal::ZERO,
        };

        self.previous_price = Some(snapshot.last_price);
        self.price_change = change;
        self.snapshot = Some(snapshot);
        self.source = Some(source);
        self.revision += 1;
        change
    }

    pub fn snapshot(&self) -> Option<&TickerSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn source(&self) -> Option<Source> {
        self.source
    }

    pub fn last_price(&self) -> Option<Decimal> {
        self.snapshot.as_ref().map(|s| s.last_price)
    }

    pub fn price_change(&self) -> Decimal {
        self.price_change
    }

    /// Number of writes applied since creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
