use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Per-phase latency accumulator (spec.md §2 "Timing stats (singleton)").
///
/// The original is a process-wide classmethod singleton
/// (`TimingStatistics.instance()`) consulted only by `SetDataExecutor`.
/// Per SPEC_FULL.md §3/§9 we generalize it to all four executors and make it
/// an owned value passed in by `Arc` rather than a bare global (§9 redesign
/// notes: "replace with an accumulator value owned by the request-handling
/// host and passed explicitly... under concurrent writers use lock-free
/// counters").
#[derive(Default)]
pub struct TimingStatistics {
    lock: PhaseAccumulator,
    commit: PhaseAccumulator,
    push: PhaseAccumulator,
    total: PhaseAccumulator,
    repetitions: AtomicU64,
}

#[derive(Default)]
struct PhaseAccumulator {
    nanos_sum: AtomicU64,
    count: AtomicU64,
}

impl PhaseAccumulator {
    fn record(&self, elapsed: std::time::Duration) {
        self.nanos_sum
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    fn mean_nanos(&self) -> Option<u64> {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        Some(self.nanos_sum.load(Ordering::Relaxed) / count)
    }
}

/// Which accumulator a `record` call updates.
#[derive(Clone, Copy, Debug)]
pub enum Phase {
    Lock,
    Commit,
    Push,
    Total,
}

impl TimingStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, phase: Phase, elapsed: std::time::Duration) {
        match phase {
            Phase::Lock => self.lock.record(elapsed),
            Phase::Commit => self.commit.record(elapsed),
            Phase::Push => self.push.record(elapsed),
            Phase::Total => self.total.record(elapsed),
        }
    }

    pub fn add_repetition(&self) {
        self.repetitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mean_nanos(&self, phase: Phase) -> Option<u64> {
        match phase {
            Phase::Lock => self.lock.mean_nanos(),
            Phase::Commit => self.commit.mean_nanos(),
            Phase::Push => self.push.mean_nanos(),
            Phase::Total => self.total.mean_nanos(),
        }
    }

    pub fn repetitions(&self) -> u64 {
        self.repetitions.load(Ordering::Relaxed)
    }
}

/// Scoped helper: records the elapsed time into `phase` when dropped (or
/// explicitly via `finish`).
pub struct PhaseTimer<'a> {
    stats: &'a TimingStatistics,
    phase: Phase,
    start: Instant,
}

impl<'a> PhaseTimer<'a> {
    pub fn start(stats: &'a TimingStatistics, phase: Phase) -> Self {
        Self {
            stats,
            phase,
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        self.stats.record(self.phase, self.start.elapsed());
    }
}
