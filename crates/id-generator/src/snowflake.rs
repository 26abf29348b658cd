//! Snowflake generator.
//!
//! Bit layout, most significant first:
//!
//! ```text
//! | 1 bit unused | 41 bits ms since EPOCH_MS | 10 bits node | 12 bits sequence |
//! ```
//!
//! The unused sign bit keeps every id a positive `i64`, so ids fit a
//! `BIGINT` column unchanged.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::error::{IdError, Result};

/// Custom epoch: 2024-01-01 00:00:00 UTC.
pub const EPOCH_MS: i64 = 1_704_067_200_000;

const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const TIMESTAMP_BITS: u32 = 41;

pub const MAX_NODE_ID: u16 = (1 << NODE_BITS) - 1;
const MAX_SEQUENCE: u16 = (1 << SEQUENCE_BITS) - 1;
const MAX_TIMESTAMP: i64 = (1 << TIMESTAMP_BITS) - 1;

const DEFAULT_MAX_BACKWARD_DRIFT: Duration = Duration::from_millis(5);

/// Decoded components of a generated id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnowflakeParts {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub node_id: u16,
    pub sequence: u16,
}

/// Splits an id back into its components.
pub fn decompose(id: u64) -> SnowflakeParts {
    SnowflakeParts {
        timestamp_ms: (id >> (NODE_BITS + SEQUENCE_BITS)) as i64 + EPOCH_MS,
        node_id: ((id >> SEQUENCE_BITS) & u64::from(MAX_NODE_ID)) as u16,
        sequence: (id & u64::from(MAX_SEQUENCE)) as u16,
    }
}

#[derive(Debug)]
struct State {
    /// Last tick handed out, in ms since [`EPOCH_MS`]. `-1` before the first id.
    last_tick: i64,
    sequence: u16,
}

/// Generates strictly increasing 64-bit ids for one node.
///
/// Thread-safe: the `(last_tick, sequence)` pair sits behind a mutex, so
/// concurrent callers are serialized and every caller observes a value
/// greater than all values handed out before it.
///
/// Clock regressions: when the clock reads earlier than the last tick by at
/// most the configured drift (5 ms by default), the call waits for the clock
/// to catch up. Larger regressions fail with
/// [`IdError::ClockMovedBackwards`].
pub struct SnowflakeGenerator<C: Clock = SystemClock> {
    node_id: u16,
    max_backward_drift_ms: i64,
    clock: C,
    state: Mutex<State>,
}

impl SnowflakeGenerator<SystemClock> {
    /// Creates a generator for `node_id` backed by the system clock.
    pub fn new(node_id: u16) -> Result<Self> {
        Self::with_clock(node_id, SystemClock)
    }
}

impl<C: Clock> SnowflakeGenerator<C> {
    /// Creates a generator reading time from `clock`.
    pub fn with_clock(node_id: u16, clock: C) -> Result<Self> {
        if node_id > MAX_NODE_ID {
            return Err(IdError::InvalidNodeId {
                node_id,
                max: MAX_NODE_ID,
            });
        }

        Ok(Self {
            node_id,
            max_backward_drift_ms: DEFAULT_MAX_BACKWARD_DRIFT.as_millis() as i64,
            clock,
            state: Mutex::new(State {
                last_tick: -1,
                sequence: 0,
            }),
        })
    }

    /// Sets how far the clock may regress before `next` fails instead of waiting.
    pub fn with_max_backward_drift(mut self, drift: Duration) -> Self {
        self.max_backward_drift_ms = i64::try_from(drift.as_millis()).unwrap_or(i64::MAX);
        self
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    /// Returns the next id.
    ///
    /// Blocks the calling thread while it waits for the clock: after a small
    /// regression, and when the sequence is exhausted within one millisecond.
    /// Both waits are short and bounded by the drift tolerance. Async callers
    /// hold a runtime worker for that long.
    pub fn next(&self) -> Result<u64> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut tick = self.current_tick()?;

        if tick < state.last_tick {
            let drift = state.last_tick - tick;
            metrics::counter!("id_generator_clock_regressions_total").increment(1);
            if drift > self.max_backward_drift_ms {
                tracing::error!(drift_ms = drift, node_id = self.node_id, "clock moved backwards");
                return Err(IdError::ClockMovedBackwards {
                    drift_ms: drift as u64,
                });
            }
            tracing::warn!(
                drift_ms = drift,
                node_id = self.node_id,
                "clock moved backwards, waiting for it to catch up"
            );
            tick = self.wait_for_tick(state.last_tick, state.last_tick)?;
        }

        // State is only written once the tick is settled, so a failed wait
        // never leaves a sequence behind that could repeat an issued id.
        let sequence = if tick == state.last_tick {
            let sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if sequence == 0 {
                // Sequence exhausted within this millisecond.
                tick = self.wait_for_tick(state.last_tick, state.last_tick + 1)?;
            }
            sequence
        } else {
            0
        };

        if tick > MAX_TIMESTAMP {
            return Err(IdError::TimestampOverflow);
        }
        state.last_tick = tick;
        state.sequence = sequence;

        Ok(((tick as u64) << (NODE_BITS + SEQUENCE_BITS))
            | (u64::from(self.node_id) << SEQUENCE_BITS)
            | u64::from(sequence))
    }

    fn current_tick(&self) -> Result<i64> {
        let tick = self.clock.now_millis() - EPOCH_MS;
        if tick < 0 {
            return Err(IdError::ClockBeforeEpoch);
        }
        Ok(tick)
    }

    /// Spins until the clock reaches `target`, failing if it falls further
    /// behind `last_tick` than the drift tolerance allows.
    fn wait_for_tick(&self, last_tick: i64, target: i64) -> Result<i64> {
        loop {
            let tick = self.current_tick()?;
            if tick >= target {
                return Ok(tick);
            }
            let drift = last_tick - tick;
            if drift > self.max_backward_drift_ms {
                tracing::error!(drift_ms = drift, node_id = self.node_id, "clock moved backwards");
                return Err(IdError::ClockMovedBackwards {
                    drift_ms: drift as u64,
                });
            }
            std::thread::yield_now();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};
    use std::sync::Arc;

    use super::*;

    /// Clock replaying scripted readings, then advancing one ms per read.
    struct ScriptedClock {
        readings: Mutex<VecDeque<i64>>,
        last: Mutex<i64>,
    }

    impl ScriptedClock {
        fn new(offsets: &[i64]) -> Self {
            Self {
                readings: Mutex::new(offsets.iter().map(|o| EPOCH_MS + o).collect()),
                last: Mutex::new(EPOCH_MS),
            }
        }
    }

    impl Clock for ScriptedClock {
        fn now_millis(&self) -> i64 {
            let mut last = self.last.lock().unwrap();
            *last = match self.readings.lock().unwrap().pop_front() {
                Some(reading) => reading,
                None => *last + 1,
            };
            *last
        }
    }

    #[test]
    fn rejects_out_of_range_node_id() {
        let result = SnowflakeGenerator::new(MAX_NODE_ID + 1);
        assert!(matches!(result, Err(IdError::InvalidNodeId { .. })));
    }

    #[test]
    fn encodes_node_and_timestamp() {
        let generator = SnowflakeGenerator::with_clock(7, ScriptedClock::new(&[1_000])).unwrap();
        let id = generator.next().unwrap();

        let parts = decompose(id);
        assert_eq!(parts.node_id, 7);
        assert_eq!(parts.sequence, 0);
        assert_eq!(parts.timestamp_ms, EPOCH_MS + 1_000);
    }

    #[test]
    fn sequence_increments_within_one_millisecond() {
        let generator =
            SnowflakeGenerator::with_clock(1, ScriptedClock::new(&[5, 5, 5])).unwrap();
        let a = generator.next().unwrap();
        let b = generator.next().unwrap();
        let c = generator.next().unwrap();

        assert!(a < b && b < c);
        assert_eq!(decompose(c).sequence, 2);
    }

    #[test]
    fn sequence_exhaustion_rolls_into_next_millisecond() {
        let readings = vec![10; MAX_SEQUENCE as usize + 2];
        let generator = SnowflakeGenerator::with_clock(1, ScriptedClock::new(&readings)).unwrap();

        let mut last = 0;
        for _ in 0..=MAX_SEQUENCE {
            let id = generator.next().unwrap();
            assert!(id > last);
            last = id;
        }
        let rolled = generator.next().unwrap();
        assert!(rolled > last);

        let parts = decompose(rolled);
        assert_eq!(parts.timestamp_ms, EPOCH_MS + 11);
        assert_eq!(parts.sequence, 0);
    }

    #[test]
    fn failed_wait_after_exhaustion_does_not_reissue_ids() {
        let mut readings = vec![10; MAX_SEQUENCE as usize + 2];
        readings.extend([-20, 10]);
        let generator = SnowflakeGenerator::with_clock(1, ScriptedClock::new(&readings)).unwrap();

        let mut issued = HashSet::new();
        let mut last = 0;
        for _ in 0..=MAX_SEQUENCE {
            last = generator.next().unwrap();
            issued.insert(last);
        }
        assert_eq!(generator.next().unwrap_err(), IdError::ClockBeforeEpoch);

        let after = generator.next().unwrap();
        assert!(after > last);
        assert!(!issued.contains(&after));
        let parts = decompose(after);
        assert_eq!(parts.timestamp_ms, EPOCH_MS + 11);
        assert_eq!(parts.sequence, 0);
    }

    #[test]
    fn clock_falling_back_during_exhaustion_wait_fails_fast() {
        let mut readings = vec![100; MAX_SEQUENCE as usize + 2];
        readings.push(50);
        let generator = SnowflakeGenerator::with_clock(1, ScriptedClock::new(&readings)).unwrap();

        for _ in 0..=MAX_SEQUENCE {
            generator.next().unwrap();
        }
        assert_eq!(
            generator.next().unwrap_err(),
            IdError::ClockMovedBackwards { drift_ms: 50 }
        );
    }

    #[test]
    fn small_clock_regression_waits_and_stays_monotonic() {
        let generator =
            SnowflakeGenerator::with_clock(1, ScriptedClock::new(&[1_000, 998, 999, 1_000]))
                .unwrap();
        let first = generator.next().unwrap();
        let second = generator.next().unwrap();

        assert!(second > first);
        let parts = decompose(second);
        assert_eq!(parts.timestamp_ms, EPOCH_MS + 1_000);
        assert_eq!(parts.sequence, 1);
    }

    #[test]
    fn large_clock_regression_fails_fast() {
        let generator =
            SnowflakeGenerator::with_clock(1, ScriptedClock::new(&[1_000, 900])).unwrap();
        generator.next().unwrap();

        let err = generator.next().unwrap_err();
        assert_eq!(err, IdError::ClockMovedBackwards { drift_ms: 100 });
    }

    #[test]
    fn custom_drift_tolerance_is_respected() {
        let generator =
            SnowflakeGenerator::with_clock(1, ScriptedClock::new(&[1_000, 900, 950, 1_000]))
                .unwrap()
                .with_max_backward_drift(Duration::from_millis(200));
        let first = generator.next().unwrap();
        let second = generator.next().unwrap();
        assert!(second > first);
    }

    #[test]
    fn clock_before_epoch_is_an_error() {
        let generator = SnowflakeGenerator::with_clock(1, ScriptedClock::new(&[-5])).unwrap();
        assert_eq!(generator.next().unwrap_err(), IdError::ClockBeforeEpoch);
    }

    #[test]
    fn ten_thousand_concurrent_ids_are_distinct_and_increasing() {
        let generator = Arc::new(SnowflakeGenerator::new(3).unwrap());
        let threads = 8;
        let per_thread = 1_250;

        let batches: Vec<Vec<u64>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let generator = Arc::clone(&generator);
                    scope.spawn(move || {
                        (0..per_thread)
                            .map(|_| generator.next().unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for batch in &batches {
            assert!(batch.windows(2).all(|w| w[0] < w[1]));
        }

        let all: HashSet<u64> = batches.iter().flatten().copied().collect();
        assert_eq!(all.len(), threads * per_thread);
    }
}
