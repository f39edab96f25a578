//! Dispatch — Where routed records go
//!
//! The router decides; a [`DispatchSink`] receives. The sink is called once per
//! lane a record is routed to, so a multicast record reaches it several times.

use std::collections::HashMap;

/// Receives routed records, one call per `(record, lane)` pair.
pub trait DispatchSink<R: ?Sized> {
    /// Add `record` to the output of `lane`.
    fn add_record(&mut self, record: &R, lane: &str);
}

impl<R: ?Sized, F: FnMut(&R, &str)> DispatchSink<R> for F {
    fn add_record(&mut self, record: &R, lane: &str) {
        self(record, lane);
    }
}

/// The lanes one record was dispatched to.
///
/// Never empty, no lane twice. Lanes appear in route table order; the default
/// lane appears only when no predicate matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch<'t> {
    lanes: Vec<&'t str>,
    used_default: bool,
}

impl<'t> Dispatch<'t> {
    pub(crate) fn matched(lanes: Vec<&'t str>) -> Self {
        debug_assert!(!lanes.is_empty());
        debug_assert!(lanes
            .iter()
            .enumerate()
            .all(|(i, lane)| !lanes[..i].contains(lane)));
        Self {
            lanes,
            used_default: false,
        }
    }

    pub(crate) fn fallback(lane: &'t str) -> Self {
        Self {
            lanes: vec![lane],
            used_default: true,
        }
    }

    /// Lanes in route table order.
    #[must_use]
    pub fn lanes(&self) -> &[&'t str] {
        &self.lanes
    }

    /// Returns `true` if no predicate matched and the default lane was used.
    #[must_use]
    pub fn used_default(&self) -> bool {
        self.used_default
    }

    /// Returns `true` if `lane` is among the dispatch lanes.
    #[must_use]
    pub fn contains(&self, lane: &str) -> bool {
        self.lanes.iter().any(|l| *l == lane)
    }

    /// Number of lanes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Always `false`; a dispatch holds at least one lane.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Hand the record to `sink` once per lane.
    pub fn deliver<R: ?Sized, S: DispatchSink<R> + ?Sized>(&self, record: &R, sink: &mut S) {
        for lane in &self.lanes {
            sink.add_record(record, lane);
        }
    }
}

/// In-memory per-lane buffers, the host's batch output.
///
/// Records are cloned into each lane they are routed to.
#[derive(Debug, Clone)]
pub struct LaneBatch<R> {
    lanes: HashMap<String, Vec<R>>,
}

impl<R> Default for LaneBatch<R> {
    fn default() -> Self {
        Self {
            lanes: HashMap::new(),
        }
    }
}

impl<R> LaneBatch<R> {
    /// Empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records routed to `lane`, in arrival order.
    #[must_use]
    pub fn lane(&self, lane: &str) -> &[R] {
        self.lanes.get(lane).map_or(&[], Vec::as_slice)
    }

    /// Names of lanes that received at least one record.
    pub fn lane_names(&self) -> impl Iterator<Item = &str> {
        self.lanes.keys().map(String::as_str)
    }

    /// Total `(record, lane)` deliveries.
    #[must_use]
    pub fn total(&self) -> usize {
        self.lanes.values().map(Vec::len).sum()
    }

    /// Take the buffered records, leaving the batch empty.
    pub fn drain(&mut self) -> HashMap<String, Vec<R>> {
        std::mem::take(&mut self.lanes)
    }
}

impl<R: Clone> DispatchSink<R> for LaneBatch<R> {
    fn add_record(&mut self, record: &R, lane: &str) {
        self.lanes
            .entry(lane.to_owned())
            .or_default()
            .push(record.clone());
    }
}
