//! Fleet observer trait for progress reporting and data collection.

use agv_agent::AgentSnapshot;
use agv_core::Tick;

/// Callbacks invoked by [`Fleet::run`][crate::Fleet::run] at key points in
/// the tick loop.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example — stall reporter
///
/// ```rust,ignore
/// struct StallReporter;
///
/// impl FleetObserver for StallReporter {
///     fn on_snapshot(&mut self, tick: Tick, agents: &[AgentSnapshot]) {
///         for a in agents.iter().filter(|a| a.stalled) {
///             eprintln!("{tick}: agent {} stalled at {}", a.id, a.pos);
///         }
///     }
/// }
/// ```
pub trait FleetObserver {
    /// Called at the very start of each tick, before any processing.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called at the end of each tick.
    ///
    /// `planned` is the number of plan requests served this tick.
    fn on_tick_end(&mut self, _tick: Tick, _planned: usize) {}

    /// Called at snapshot intervals (every `config.snapshot_interval_ticks`).
    ///
    /// `agents` is the full per-agent snapshot in `AgentId` order — the
    /// interface a rendering layer draws from.
    fn on_snapshot(&mut self, _tick: Tick, _agents: &[AgentSnapshot]) {}

    /// Called once after the final tick completes.
    fn on_sim_end(&mut self, _final_tick: Tick) {}
}

/// A [`FleetObserver`] that does nothing.  Use when you need to call `run`
/// but don't want progress callbacks.
pub struct NoopObserver;

impl FleetObserver for NoopObserver {}
