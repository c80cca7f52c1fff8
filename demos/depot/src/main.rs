//! depot — smallest end-to-end demo of the agv fleet-routing workspace.
//!
//! Four forklifts on a two-hall grid shuttle loads from the dock row to the
//! storage row while the space-time planner keeps their schedules disjoint.
//! Run with `RUST_LOG=debug` to watch the planners work.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;

use agv_core::{AgentId, SimConfig, Vec2};
use agv_graph::{GridSpec, Rect, build_grid};
use agv_sim::{CsvSnapshotWriter, FleetBuilder};

// ── Constants ─────────────────────────────────────────────────────────────────

const AGENT_COUNT: usize = 4;
const SEED:        u64   = 42;
const TOTAL_TICKS: u64   = 3_000;
const SNAPSHOT_INTERVAL_TICKS: u64 = 10;

/// Node budget for the two-hall grid.
const GRID_POINTS: usize = 120;

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== depot — agv fleet routing ===");
    println!("Agents: {AGENT_COUNT}  |  Ticks: {TOTAL_TICKS}  |  Seed: {SEED}");
    println!();

    // 1. Build the route grid: two halls bridged by nearest-pair lanes.
    let mut graph = build_grid(&GridSpec {
        target_points: GRID_POINTS,
        areas: vec![
            Rect::new(100.0, 100.0, 600.0, 600.0),   // west hall
            Rect::new(800.0, 100.0, 600.0, 600.0),   // east hall
        ],
    });

    // 2. Attach the off-grid work positions: dock row (west) and storage
    //    row (east), each wired to its 3 nearest lane nodes.
    let docks: Vec<Vec2> = (0..AGENT_COUNT)
        .map(|i| Vec2::new(60.0, 150.0 + i as f32 * 120.0))
        .collect();
    let slots: Vec<Vec2> = (0..AGENT_COUNT)
        .map(|i| Vec2::new(1_440.0, 150.0 + i as f32 * 120.0))
        .collect();
    graph.attach_external_points(&docks);
    graph.attach_external_points(&slots);
    println!(
        "Route network: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    // 3. Home bays along the south wall.
    let homes: Vec<Vec2> = (0..AGENT_COUNT)
        .map(|i| Vec2::new(200.0 + i as f32 * 150.0, 760.0))
        .collect();

    // 4. Fleet config and build.
    let config = SimConfig {
        total_ticks:             TOTAL_TICKS,
        seed:                    SEED,
        snapshot_interval_ticks: SNAPSHOT_INTERVAL_TICKS,
        num_threads:             None,
    };
    let mut fleet = FleetBuilder::new(config, graph)
        .homes(homes)
        .time_aware(true)
        .build();

    // 5. One dock→slot job per forklift.
    for i in 0..AGENT_COUNT {
        fleet.assign_task(AgentId(i as u32), docks[i], slots[i])?;
    }

    // 6. Run with CSV snapshots.
    std::fs::create_dir_all("output/depot")?;
    let mut writer = CsvSnapshotWriter::new(Path::new("output/depot"))?;

    let t0 = Instant::now();
    fleet.run(&mut writer);
    let elapsed = t0.elapsed();

    if let Some(e) = writer.take_error() {
        eprintln!("output error: {e}");
    }

    // 7. Summary.
    let (node_res, edge_res) = fleet.reservation_counts();
    println!("Simulation complete in {:.3} s", elapsed.as_secs_f64());
    println!("Outstanding reservations: {node_res} node / {edge_res} edge");
    println!();

    println!("{:<8} {:<10} {:<10} {:<22} {:<8}", "Agent", "State", "Stalled", "Position", "Cursor");
    println!("{}", "-".repeat(60));
    for snap in fleet.snapshots() {
        println!(
            "{:<8} {:<10} {:<10} {:<22} {:<8}",
            snap.id.0,
            format!("{:?}", snap.state),
            if snap.stalled { "yes" } else { "no" },
            snap.pos.to_string(),
            snap.waypoint_cursor,
        );
    }

    Ok(())
}
