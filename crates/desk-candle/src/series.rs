//! Ordered candle series with live-tick folding.
//!
//! The series is mutable only at its last element when updated by a tick,
//! append-only otherwise. The baseline is replaced wholesale by each
//! successful historical fetch.

use desk_core::{Candle, CandleInterval, Price};

/// What a live tick did to the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick landed in the last candle's bucket; only that candle changed.
    MutatedLast,
    /// Tick opened a new bucket; a candle was appended.
    Appended,
    /// Tick's bucket predates the last candle; discarded, no mutation.
    DiscardedOutOfOrder,
    /// No baseline yet; ticks are ignored until a fetch populates one.
    IgnoredEmptyBaseline,
}

/// Candle series for one (instrument, interval).
#[derive(Debug, Clone)]
pub struct CandleSeries {
    interval: CandleInterval,
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(interval: CandleInterval) -> Self {
        Self {
            interval,
            candles: Vec::new(),
        }
    }

    pub fn interval(&self) -> CandleInterval {
        self.interval
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Replace the whole baseline with a freshly fetched snapshot.
    pub fn replace_baseline(&mut self, candles: Vec<Candle>) {
        self.candles = candles;
    }

    /// Drop the baseline (key change); ticks are ignored until the next
    /// successful fetch.
    pub fn clear(&mut self) {
        self.candles.clear();
    }

    /// Fold one streamed midpoint tick into the series.
    ///
    /// The bucket is the floor-aligned interval containing `time_secs`.
    /// Same bucket as the last candle: close = mid, high = max(high, mid),
    /// low = min(low, mid). Later bucket: append open=high=low=close=mid.
    /// Earlier bucket: discard.
    pub fn apply_tick(&mut self, time_secs: i64, mid: Price) -> TickOutcome {
        let Some(last) = self.candles.last_mut() else {
            return TickOutcome::IgnoredEmptyBaseline;
        };

        let bucket = self.interval.bucket_start(time_secs);

        if bucket == last.time {
            last.close = mid;
            last.high = last.high.max(mid);
            last.low = last.low.min(mid);
            TickOutcome::MutatedLast
        } else if bucket > last.time {
            self.candles.push(Candle::from_tick(bucket, mid));
            TickOutcome::Appended
        } else {
            TickOutcome::DiscardedOutOfOrder
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(t: i64, o: i64, h: i64, l: i64, c: i64) -> Candle {
        Candle {
            time: t,
            open: Price::new(o.into()),
            high: Price::new(h.into()),
            low: Price::new(l.into()),
            close: Price::new(c.into()),
        }
    }

    fn baseline_1h() -> CandleSeries {
        let mut series = CandleSeries::new(CandleInterval::H1);
        series.replace_baseline(vec![candle(3600, 10, 12, 9, 11)]);
        series
    }

    #[test]
    fn test_same_bucket_mutates_last_only() {
        let mut series = baseline_1h();

        // Tick at 3650s lands in the 3600 bucket
        let outcome = series.apply_tick(3650, Price::new(dec!(13)));
        assert_eq!(outcome, TickOutcome::MutatedLast);
        assert_eq!(series.len(), 1);

        let last = series.last().unwrap();
        assert_eq!(last.time, 3600);
        assert_eq!(last.open.inner(), dec!(10));
        assert_eq!(last.high.inner(), dec!(13));
        assert_eq!(last.low.inner(), dec!(9));
        assert_eq!(last.close.inner(), dec!(13));
    }

    #[test]
    fn test_low_folds_with_min() {
        let mut series = baseline_1h();

        // A tick below the current low must pull the low down
        let outcome = series.apply_tick(3700, Price::new(dec!(8)));
        assert_eq!(outcome, TickOutcome::MutatedLast);

        let last = series.last().unwrap();
        assert_eq!(last.low.inner(), dec!(8));
        assert_eq!(last.high.inner(), dec!(12));
        assert_eq!(last.close.inner(), dec!(8));
    }

    #[test]
    fn test_next_bucket_appends_single_tick_candle() {
        let mut series = baseline_1h();
        series.apply_tick(3650, Price::new(dec!(13)));

        let outcome = series.apply_tick(7300, Price::new(dec!(14)));
        assert_eq!(outcome, TickOutcome::Appended);
        assert_eq!(series.len(), 2);

        let last = series.last().unwrap();
        assert_eq!(last.time, 7200);
        assert_eq!(last.open.inner(), dec!(14));
        assert_eq!(last.high.inner(), dec!(14));
        assert_eq!(last.low.inner(), dec!(14));
        assert_eq!(last.close.inner(), dec!(14));
    }

    #[test]
    fn test_out_of_order_tick_discarded() {
        let mut series = baseline_1h();
        series.apply_tick(3650, Price::new(dec!(13)));
        series.apply_tick(7300, Price::new(dec!(14)));
        let before = series.candles().to_vec();

        // 3500s is an earlier bucket than the last candle's 7200
        let outcome = series.apply_tick(3500, Price::new(dec!(99)));
        assert_eq!(outcome, TickOutcome::DiscardedOutOfOrder);
        assert_eq!(series.candles(), &before[..]);
    }

    #[test]
    fn test_empty_baseline_ignores_ticks() {
        let mut series = CandleSeries::new(CandleInterval::H1);
        let outcome = series.apply_tick(3650, Price::new(dec!(13)));
        assert_eq!(outcome, TickOutcome::IgnoredEmptyBaseline);
        assert!(series.is_empty());
    }

    #[test]
    fn test_clear_blocks_ticks_until_new_baseline() {
        let mut series = baseline_1h();
        series.clear();

        assert_eq!(
            series.apply_tick(3650, Price::new(dec!(13))),
            TickOutcome::IgnoredEmptyBaseline
        );

        series.replace_baseline(vec![candle(7200, 14, 14, 14, 14)]);
        assert_eq!(
            series.apply_tick(7250, Price::new(dec!(15))),
            TickOutcome::MutatedLast
        );
    }

    #[test]
    fn test_daily_interval_bucketing() {
        let mut series = CandleSeries::new(CandleInterval::D1);
        series.replace_baseline(vec![candle(86400, 10, 12, 9, 11)]);

        // 90000s is still inside the 86400 day bucket
        assert_eq!(
            series.apply_tick(90_000, Price::new(dec!(11.5))),
            TickOutcome::MutatedLast
        );
        // Next day appends at 172800
        assert_eq!(
            series.apply_tick(172_900, Price::new(dec!(12))),
            TickOutcome::Appended
        );
        assert_eq!(series.last().unwrap().time, 172_800);
    }
}
