//! Per-node Kalman state in a bounded arena.
//!
//! Nodes are created on first observation and evicted least recently
//! touched first once the arena is full.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use pricer_core::market_data::surfaces::QuoteKey;

use crate::kalman::{KalmanNoise, KalmanState};

/// One (strike, expiry) node.
#[derive(Debug, Clone)]
pub struct SignalNode {
    key: QuoteKey,
    kalman: KalmanState,
    observations: u64,
    last_seen: DateTime<Utc>,
}

impl SignalNode {
    fn new(key: QuoteKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            kalman: KalmanState::default(),
            observations: 0,
            last_seen: now,
        }
    }

    /// The node's key.
    pub fn key(&self) -> QuoteKey {
        self.key
    }

    /// Current filter state.
    pub fn kalman(&self) -> KalmanState {
        self.kalman
    }

    /// Number of observations folded in.
    pub fn observations(&self) -> u64 {
        self.observations
    }

    /// Time of the last observation.
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    /// Record `|z|` at `now`, returning the smoothed estimate.
    pub fn observe(&mut self, now: DateTime<Utc>, abs_z: f64, noise: KalmanNoise) -> f64 {
        let smoothed = self.kalman.update(abs_z, noise);
        self.observations += 1;
        self.last_seen = now;
        smoothed
    }
}

/// Fixed-capacity node store with least-recently-touched eviction.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use pricer_core::market_data::surfaces::QuoteKey;
/// use pricer_core::types::Date;
/// use strategy_signals::NodeArena;
///
/// let now = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
/// let expiry = Date::from_ymd(2024, 2, 1).unwrap();
/// let (a, b, c) = (QuoteKey::new(95.0, expiry), QuoteKey::new(100.0, expiry), QuoteKey::new(105.0, expiry));
///
/// let mut arena = NodeArena::with_capacity(2);
/// arena.touch(a, now);
/// arena.touch(b, now);
/// arena.touch(a, now);
/// arena.touch(c, now); // evicts b
/// assert!(arena.get(&a).is_some());
/// assert!(arena.get(&b).is_none());
/// assert_eq!(arena.evicted(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct NodeArena {
    slots: Vec<SignalNode>,
    index: HashMap<QuoteKey, usize>,
    // tick of last touch -> slot
    recency: BTreeMap<u64, usize>,
    touched_at: Vec<u64>,
    clock: u64,
    capacity: usize,
    evicted: u64,
}

impl NodeArena {
    /// Arena holding at most `capacity` nodes (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            recency: BTreeMap::new(),
            touched_at: Vec::new(),
            clock: 0,
            capacity,
            evicted: 0,
        }
    }

    /// Live nodes.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True before the first observation.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maximum number of live nodes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Nodes evicted so far.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Look up a node without touching it.
    pub fn get(&self, key: &QuoteKey) -> Option<&SignalNode> {
        self.index.get(key).map(|&slot| &self.slots[slot])
    }

    /// All live nodes, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &SignalNode> {
        self.slots.iter()
    }

    /// Mark `key` as most recently used, creating it if absent.
    pub fn touch(&mut self, key: QuoteKey, now: DateTime<Utc>) -> &mut SignalNode {
        self.clock += 1;
        let tick = self.clock;

        let existing = self.index.get(&key).copied();
        let slot = match existing {
            Some(slot) => {
                self.recency.remove(&self.touched_at[slot]);
                slot
            }
            None if self.slots.len() < self.capacity => {
                self.slots.push(SignalNode::new(key, now));
                self.touched_at.push(tick);
                let slot = self.slots.len() - 1;
                self.index.insert(key, slot);
                slot
            }
            None => {
                let slot = self.evict_oldest();
                self.slots[slot] = SignalNode::new(key, now);
                self.index.insert(key, slot);
                slot
            }
        };

        self.touched_at[slot] = tick;
        self.recency.insert(tick, slot);
        &mut self.slots[slot]
    }

    fn evict_oldest(&mut self) -> usize {
        // Only called when full, so the recency map is non-empty.
        let (_, slot) = self.recency.pop_first().unwrap_or((0, 0));
        let old = self.slots[slot].key;
        self.index.remove(&old);
        self.evicted += 1;
        tracing::trace!(strike = old.strike(), expiry = %old.expiry, "evicted signal node");
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pricer_core::types::Date;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap()
    }

    fn key(strike: f64) -> QuoteKey {
        QuoteKey::new(strike, Date::from_ymd(2024, 2, 1).unwrap())
    }

    const NOISE: KalmanNoise = KalmanNoise {
        process: 0.02,
        observation: 1.0,
    };

    #[test]
    fn test_state_persists_across_touches() {
        let mut arena = NodeArena::with_capacity(4);
        let first = arena.touch(key(100.0), now()).observe(now(), 2.0, NOISE);
        let second = arena.touch(key(100.0), now()).observe(now(), 2.0, NOISE);
        assert!(second > first);
        let node = arena.get(&key(100.0)).unwrap();
        assert_eq!(node.observations(), 2);
        assert_eq!(node.kalman().estimate, second);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_eviction_order() {
        let mut arena = NodeArena::with_capacity(3);
        for k in [90.0, 95.0, 100.0] {
            arena.touch(key(k), now());
        }
        arena.touch(key(90.0), now());
        arena.touch(key(105.0), now());
        assert!(arena.get(&key(95.0)).is_none());
        arena.touch(key(110.0), now());
        assert!(arena.get(&key(100.0)).is_none());
        assert!(arena.get(&key(90.0)).is_some());
        assert_eq!(arena.len(), 3);
        assert_eq!(arena.evicted(), 2);
    }

    #[test]
    fn test_evicted_node_restarts_fresh() {
        let mut arena = NodeArena::with_capacity(1);
        arena.touch(key(100.0), now()).observe(now(), 5.0, NOISE);
        arena.touch(key(105.0), now());
        let node = arena.touch(key(100.0), now());
        assert_eq!(node.observations(), 0);
        assert_eq!(node.kalman(), KalmanState::default());
    }

    #[test]
    fn test_observe_records_time_and_count() {
        let mut arena = NodeArena::with_capacity(1);
        let node = arena.touch(key(100.0), now() - Duration::hours(1));
        node.observe(now() - Duration::hours(1), 1.0, NOISE);
        node.observe(now(), 3.0, NOISE);
        assert_eq!(node.observations(), 2);
        assert_eq!(node.last_seen(), now());
        assert!(node.kalman().estimate > 0.0 && node.kalman().estimate < 3.0);
    }
}
