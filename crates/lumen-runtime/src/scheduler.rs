use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use lumen_world::ChunkCoord;

use crate::config::StreamConfig;

/// Identifies one dispatched generation job. Tickets start at 1 and only grow.
pub type Ticket = u64;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerCounters {
    /// Requests turned away because the pending queue was full.
    pub dropped: u64,
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
    /// Completions that arrived without a matching in-flight ticket.
    pub discarded: u64,
}

/// Decides which chunks to generate, in what order, and which to unload.
///
/// The scheduler holds no chunk data. Residency is supplied by the caller on
/// each refresh so that the resident map has a single owner.
pub struct StreamingScheduler {
    cfg: StreamConfig,
    center: Option<ChunkCoord>,
    wanted: Vec<ChunkCoord>,
    pending: VecDeque<ChunkCoord>,
    queued: HashSet<ChunkCoord>,
    inflight: HashMap<ChunkCoord, Ticket>,
    failures: HashMap<ChunkCoord, u32>,
    next_ticket: Ticket,
    counters: SchedulerCounters,
}

impl StreamingScheduler {
    pub fn new(cfg: StreamConfig) -> Self {
        Self {
            cfg,
            center: None,
            wanted: Vec::new(),
            pending: VecDeque::new(),
            queued: HashSet::new(),
            inflight: HashMap::new(),
            failures: HashMap::new(),
            next_ticket: 1,
            counters: SchedulerCounters::default(),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.cfg
    }

    /// Moves the observer. Returns true if the wanted set was rebuilt.
    pub fn set_center(&mut self, center: ChunkCoord) -> bool {
        if self.center == Some(center) {
            return false;
        }
        self.center = Some(center);
        self.wanted = wanted_set(center, self.cfg.load_radius);
        log::debug!(target: "stream", "center ({}, {}) wants {} chunks", center.cx, center.cz, self.wanted.len());
        true
    }

    /// Coordinates within the load radius, closest first.
    pub fn wanted(&self) -> &[ChunkCoord] {
        &self.wanted
    }

    /// Rebuilds the pending queue from the wanted set: everything wanted that
    /// is neither resident nor in flight, closest first, truncated to
    /// `max_pending`. Returns how many requests were dropped by the cap.
    pub fn refresh_pending(&mut self, is_resident: impl Fn(ChunkCoord) -> bool) -> usize {
        let cap = self.cfg.max_pending;
        let mut next = VecDeque::with_capacity(cap.min(self.wanted.len()));
        let mut dropped = 0usize;
        for &coord in &self.wanted {
            if self.inflight.contains_key(&coord) || is_resident(coord) {
                continue;
            }
            if next.len() < cap {
                next.push_back(coord);
            } else {
                dropped += 1;
            }
        }
        self.queued = next.iter().copied().collect();
        self.pending = next;
        if dropped > 0 {
            self.counters.dropped += dropped as u64;
            log::trace!(target: "stream", "pending queue full ({cap}); dropped {dropped} requests");
        }
        dropped
    }

    pub fn pending(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.pending.iter().copied()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pops the closest pending chunks, bounded by the per-tick start budget
    /// and by free in-flight slots, and issues a ticket for each.
    pub fn dispatch(&mut self) -> Vec<(ChunkCoord, Ticket)> {
        let free = self.cfg.max_inflight.saturating_sub(self.inflight.len());
        let budget = self.cfg.max_starts_per_tick.min(free);
        let mut out = Vec::with_capacity(budget);
        while out.len() < budget {
            let Some(coord) = self.pending.pop_front() else {
                break;
            };
            self.queued.remove(&coord);
            let ticket = self.next_ticket;
            self.next_ticket += 1;
            self.inflight.insert(coord, ticket);
            out.push((coord, ticket));
        }
        self.counters.dispatched += out.len() as u64;
        out
    }

    pub fn is_inflight(&self, coord: ChunkCoord) -> bool {
        self.inflight.contains_key(&coord)
    }

    pub fn is_queued(&self, coord: ChunkCoord) -> bool {
        self.queued.contains(&coord)
    }

    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }

    /// True once `coord` is farther than `load_radius + unload_buffer` from
    /// the observer. Nothing unloads before the first `set_center`.
    pub fn should_unload(&self, coord: ChunkCoord) -> bool {
        match self.center {
            Some(center) => coord.distance_sq(center) > self.cfg.unload_distance_sq(),
            None => false,
        }
    }

    /// Forgets pending and in-flight bookkeeping for `coord`. A completion
    /// that arrives later is discarded. Returns true if a job was in flight.
    pub fn cancel(&mut self, coord: ChunkCoord) -> bool {
        if self.queued.remove(&coord) {
            self.pending.retain(|c| *c != coord);
        }
        self.inflight.remove(&coord).is_some()
    }

    /// Cancels in-flight jobs for chunks that drifted out of range.
    pub fn prune_inflight(&mut self) -> Vec<ChunkCoord> {
        let stale: Vec<ChunkCoord> = self
            .inflight
            .keys()
            .copied()
            .filter(|&c| self.should_unload(c))
            .collect();
        for &coord in &stale {
            self.inflight.remove(&coord);
        }
        stale
    }

    /// Accepts a finished job only if `ticket` is the one in flight for
    /// `coord`.
    pub fn complete(&mut self, coord: ChunkCoord, ticket: Ticket) -> bool {
        if self.inflight.get(&coord) != Some(&ticket) {
            self.counters.discarded += 1;
            return false;
        }
        self.inflight.remove(&coord);
        self.failures.remove(&coord);
        self.counters.completed += 1;
        true
    }

    /// Records a failed job. The chunk becomes eligible again on the next
    /// refresh. Returns the chunk's failure count, or `None` if the ticket is
    /// stale.
    pub fn fail(&mut self, coord: ChunkCoord, ticket: Ticket) -> Option<u32> {
        if self.inflight.get(&coord) != Some(&ticket) {
            self.counters.discarded += 1;
            return None;
        }
        self.inflight.remove(&coord);
        Some(self.record_failure(coord))
    }

    /// Counts a failure that happened outside the worker pool.
    pub fn record_failure(&mut self, coord: ChunkCoord) -> u32 {
        self.counters.failed += 1;
        let n = self.failures.entry(coord).or_insert(0);
        *n += 1;
        *n
    }

    pub fn failure_count(&self, coord: ChunkCoord) -> u32 {
        self.failures.get(&coord).copied().unwrap_or(0)
    }

    pub fn counters(&self) -> SchedulerCounters {
        self.counters
    }
}

/// Chunks with squared distance to `center` at most `radius²`, sorted by
/// distance and then by (cz, cx) so the order is stable.
fn wanted_set(center: ChunkCoord, radius: i32) -> Vec<ChunkCoord> {
    let r = radius.max(0);
    let r2 = i64::from(r) * i64::from(r);
    let mut out = Vec::new();
    for dz in -r..=r {
        for dx in -r..=r {
            let coord = center.offset(dx, dz);
            if coord.distance_sq(center) <= r2 {
                out.push(coord);
            }
        }
    }
    out.sort_by_key(|c| (c.distance_sq(center), c.cz, c.cx));
    out
}
