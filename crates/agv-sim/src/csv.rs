//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `agent_snapshots.csv` — one row per agent per snapshot tick
//! - `tick_summaries.csv`  — one row per tick
//!
//! Observer callbacks cannot return errors, so write failures are parked in
//! the writer and surfaced via [`CsvSnapshotWriter::take_error`] after the
//! run — the same pattern the rest of the loop uses for non-fatal faults.

use std::fs::File;
use std::path::Path;

use csv::Writer;

use agv_agent::{AgentSnapshot, AgentState};
use agv_core::Tick;

use crate::error::SimResult;
use crate::observer::FleetObserver;

/// Writes fleet output to two CSV files.
pub struct CsvSnapshotWriter {
    snapshots: Writer<File>,
    summaries: Writer<File>,
    error: Option<csv::Error>,
}

impl CsvSnapshotWriter {
    /// Open (or create) the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> SimResult<Self> {
        let mut snapshots = Writer::from_path(dir.join("agent_snapshots.csv"))?;
        snapshots.write_record([
            "agent_id", "tick", "x", "y", "state", "waypoint_cursor", "stalled",
        ])?;

        let mut summaries = Writer::from_path(dir.join("tick_summaries.csv"))?;
        summaries.write_record(["tick", "plans_served"])?;

        Ok(Self { snapshots, summaries, error: None })
    }

    /// The first write error hit during the run, if any.
    pub fn take_error(&mut self) -> Option<csv::Error> {
        self.error.take()
    }

    fn record(&mut self, result: Result<(), csv::Error>) {
        if let Err(e) = result {
            if self.error.is_none() {
                self.error = Some(e);
            }
        }
    }
}

impl FleetObserver for CsvSnapshotWriter {
    fn on_tick_end(&mut self, tick: Tick, planned: usize) {
        let row = self
            .summaries
            .write_record([tick.0.to_string(), planned.to_string()]);
        self.record(row);
    }

    fn on_snapshot(&mut self, tick: Tick, agents: &[AgentSnapshot]) {
        for a in agents {
            let row = self.snapshots.write_record([
                a.id.0.to_string(),
                tick.0.to_string(),
                a.pos.x.to_string(),
                a.pos.y.to_string(),
                state_label(a.state).to_string(),
                a.waypoint_cursor.to_string(),
                (a.stalled as u8).to_string(),
            ]);
            self.record(row);
        }
    }

    fn on_sim_end(&mut self, _final_tick: Tick) {
        let flushed = self
            .snapshots
            .flush()
            .and_then(|_| self.summaries.flush())
            .map_err(csv::Error::from);
        self.record(flushed);
    }
}

fn state_label(state: AgentState) -> &'static str {
    match state {
        AgentState::Idle => "idle",
        AgentState::Pickup => "pickup",
        AgentState::Dropoff => "dropoff",
        AgentState::Return => "return",
    }
}
