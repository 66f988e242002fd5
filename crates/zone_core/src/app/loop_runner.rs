use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{load_game_data, resolve_server_paths, DataError, StartupError, World, WorldConfig};

use super::metrics::MetricsAccumulator;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// Stop after this many ticks. `None` runs until the process is killed.
    pub max_ticks: Option<u64>,
    pub world: WorldConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            target_tps: 20,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(5),
            max_ticks: None,
            world: WorldConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load game data: {0}")]
    Data(#[from] DataError),
    #[error("no map could be loaded from {data_dir}")]
    NoMaps { data_dir: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerSummary {
    pub ticks_run: u64,
    pub elapsed_seconds: f64,
    pub entity_count: usize,
}

pub fn run_server(config: ServerConfig) -> Result<ServerSummary, ServerError> {
    let server_paths = resolve_server_paths()?;
    info!(
        root = %server_paths.root.display(),
        data_dir = %server_paths.data_dir.display(),
        "startup"
    );
    let data = load_game_data(&server_paths)?;
    let mut world = World::new(data, config.world.clone());
    if world.maps().is_empty() {
        return Err(ServerError::NoMaps {
            data_dir: server_paths.data_dir,
        });
    }

    let summary = run_world(&mut world, &config);
    info!(
        ticks_run = summary.ticks_run,
        elapsed_seconds = summary.elapsed_seconds,
        entity_count = summary.entity_count,
        "shutdown"
    );
    Ok(summary)
}

/// Drives `world` at a fixed tick rate until `config.max_ticks` is reached.
pub fn run_world(world: &mut World, config: &ServerConfig) -> ServerSummary {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(5));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        max_ticks = ?config.max_ticks,
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut ticks_run = 0u64;
    let mut player_count = 0usize;

    while !tick_budget_spent(ticks_run, config.max_ticks) {
        let now = Instant::now();
        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
        last_frame_instant = now;
        accumulator = accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            if tick_budget_spent(ticks_run, config.max_ticks) {
                break;
            }
            let tick_start = Instant::now();
            let report = world.update(fixed_dt_seconds);
            metrics_accumulator.record_tick(tick_start.elapsed());
            ticks_run += 1;
            player_count = report.player_count();

            let flushed = world.take_outbox();
            if !flushed.is_empty() {
                debug!(packet_count = flushed.len(), "outbound_flushed");
            }
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        if let Some(snapshot) =
            metrics_accumulator.maybe_snapshot(now, world.entity_count(), player_count)
        {
            info!(
                tps = snapshot.tps,
                tick_time_ms = snapshot.tick_time_ms,
                entity_count = snapshot.entity_count,
                player_count = snapshot.player_count,
                "loop_metrics"
            );
        }

        let sleep = compute_tick_sleep(accumulator, fixed_dt);
        if sleep > Duration::ZERO && !tick_budget_spent(ticks_run, config.max_ticks) {
            thread::sleep(sleep);
        }
    }

    ServerSummary {
        ticks_run,
        elapsed_seconds: world.elapsed_seconds(),
        entity_count: world.entity_count(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        let dropped_backlog = accumulator;
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn tick_budget_spent(ticks_run: u64, max_ticks: Option<u64>) -> bool {
    max_ticks.is_some_and(|max| ticks_run >= max)
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_tick_sleep(accumulator: Duration, fixed_dt: Duration) -> Duration {
    fixed_dt.saturating_sub(accumulator)
}
