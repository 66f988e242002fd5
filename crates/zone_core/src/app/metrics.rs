use std::time::{Duration, Instant};

/// Loop health over one metrics interval.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LoopMetricsSnapshot {
    pub(crate) tps: f32,
    pub(crate) tick_time_ms: f32,
    pub(crate) entity_count: usize,
    pub(crate) player_count: usize,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    ticks: u32,
    tick_time_sum: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval_start: Instant::now(),
            interval,
            ticks: 0,
            tick_time_sum: Duration::ZERO,
        }
    }

    /// `tick_cost` is the wall time spent inside one world update.
    pub(crate) fn record_tick(&mut self, tick_cost: Duration) {
        self.ticks = self.ticks.saturating_add(1);
        self.tick_time_sum = self.tick_time_sum.saturating_add(tick_cost);
    }

    pub(crate) fn maybe_snapshot(
        &mut self,
        now: Instant,
        entity_count: usize,
        player_count: usize,
    ) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let tick_time_ms = if self.ticks == 0 {
            0.0
        } else {
            (self.tick_time_sum.as_secs_f32() / self.ticks as f32) * 1000.0
        };

        let snapshot = LoopMetricsSnapshot {
            tps: self.ticks as f32 / elapsed_seconds,
            tick_time_ms,
            entity_count,
            player_count,
        };

        self.interval_start = now;
        self.ticks = 0;
        self.tick_time_sum = Duration::ZERO;

        Some(snapshot)
    }
}
