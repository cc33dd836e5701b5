//! Plays the first campaign level from placement to the summary screen.
//!
//! Run with: RUST_LOG=info cargo run --example basic_demo

use bcm_sim::{BattleStatus, Brush, SimWorld, Snapshot, Team, UnitKind, Vec2};

fn main() {
    env_logger::init();
    println!("=== Battle Commander - Simulation Demo ===\n");

    let mut sim = SimWorld::new();
    if let Err(err) = sim.load_level(0) {
        eprintln!("failed to load level: {err}");
        return;
    }
    println!("Level 1: {} enemies, {} gold to spend", sim.unit_count(Team::Bravo), sim.gold());

    // Spend the budget on a line of troops with archers behind.
    for (kind, y) in [(UnitKind::Troop, 460.0), (UnitKind::Archer, 560.0)] {
        let mut x = 200.0;
        while x < 1100.0 {
            match sim.place_unit(kind, Vec2::new(x, y), Brush::Single) {
                Ok(_) => {}
                Err(err) => println!("  skipped {} at x={x}: {err}", kind.name()),
            }
            x += 120.0;
        }
    }
    println!("Placed {} units, {} gold left\n", sim.unit_count(Team::Alpha), sim.gold());

    if let Err(err) = sim.fight() {
        eprintln!("could not start the fight: {err}");
        return;
    }

    // Host loop at ~30 fps; the simulation runs its own 60 Hz ticks.
    let mut frame = 0u32;
    while !sim.summary_due() {
        sim.step(1.0 / 30.0);
        frame += 1;
        if frame % 60 == 0 {
            print_snapshot(&sim.snapshot());
        }
        if frame > 30 * 120 {
            println!("giving up after two minutes");
            break;
        }
    }

    if let Some(report) = sim.report() {
        println!("\n=== Result: {:?} ===", report.result);
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("report serialization failed: {err}"),
        }
    }
    debug_assert_eq!(sim.status(), BattleStatus::Ended);
}

fn print_snapshot(snapshot: &Snapshot) {
    println!(
        "t={:5.1}s  {:?}  alpha {:3}  bravo {:3}  projectiles {:3}  events {}",
        snapshot.time,
        snapshot.status,
        snapshot.count(Team::Alpha),
        snapshot.count(Team::Bravo),
        snapshot.entities.len() - snapshot.count(Team::Alpha) - snapshot.count(Team::Bravo),
        snapshot.events.len()
    );
}
