//! Headless scenario runner
//!
//! Replays a scripted scenario against a fresh session and prints the
//! resulting case timeline and evidence markers.
//!
//! Run with: cargo run --bin csi_sim -- demos/break_in.toml
//!       or: cargo run --bin csi_sim -- demos/break_in.toml --config csi.toml

use csi_backend::{sign_in_or_guest, ClassRoster, MemoryAuth, MemoryStore};
use csi_runtime::{Role, Scenario, ScenarioReport, Session, SessionConfig};
use std::path::PathBuf;
use std::sync::Arc;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let mut scenario_path = None;
    let mut config_path = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config_path = args.next().map(PathBuf::from);
        } else if scenario_path.is_none() {
            scenario_path = Some(PathBuf::from(arg));
        }
    }

    let Some(scenario_path) = scenario_path else {
        eprintln!("Usage: csi_sim <scenario.toml> [--config <session.toml>]");
        std::process::exit(2);
    };

    if let Err(e) = run(scenario_path, config_path) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(
    scenario_path: PathBuf,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = SessionConfig::load(config_path.as_deref())?;
    config.print_summary();

    let scenario = Scenario::load_from_file(&scenario_path)?;

    // In-process backend standing in for the remote one
    let store = Arc::new(MemoryStore::new());
    let auth = MemoryAuth::new();
    auth.register("sim", "sim", "Simulator", true);
    let user = sign_in_or_guest(&auth, "sim", "sim");

    let roster = ClassRoster::new(store.clone());
    let every_role: Vec<&str> = Role::selectable().iter().map(|r| r.key()).collect();
    roster.create_class("demo", "Demo class", &every_role)?;
    roster.enroll("demo", "sim")?;

    let mut session = Session::new(config).with_backend(store, user);
    let report = scenario.run(&mut session)?;

    print_report(&scenario, &session, &report);
    log::info!(
        "{} log entries sent, {} dropped",
        session.logger().map_or(0, |l| l.sent()),
        session.logger().map_or(0, |l| l.dropped())
    );
    Ok(())
}

fn print_report(scenario: &Scenario, session: &Session, report: &ScenarioReport) {
    println!();
    println!("Case {}: {}", session.config().case.id, scenario.name);
    println!("Final role: {}", session.roles().active_role().display_name());

    println!();
    println!("Timeline:");
    for entry in session.timeline().entries() {
        println!("  {}  {}", entry.time.format("%H:%M:%S"), entry.event.label());
    }

    println!();
    println!("Markers:");
    if session.evidence().total() == 0 {
        println!("  (none)");
    }
    for marker in session.evidence().iter() {
        println!(
            "  #{:<3} {:?} at ({:.2}, {:.2}, {:.2}) by {} at {}",
            marker.number,
            marker.kind,
            marker.position.x,
            marker.position.y,
            marker.position.z,
            marker.placed_by.display_name(),
            marker.placed_at.format("%H:%M")
        );
    }

    println!();
    println!("Tape laid:");
    let mut laid = 0;
    for item in session.items().iter() {
        let Some(roll) = item.state.as_tape() else { continue };
        for segment in &roll.segments {
            let (center, rotation, scale) = segment.mesh_transform();
            let (yaw, _, _) = rotation.to_euler(glam::EulerRot::YXZ);
            println!(
                "  {} {:.2}m centred at ({:.2}, {:.2}, {:.2}), heading {:.0} deg",
                item.name,
                scale.x,
                center.x,
                center.y,
                center.z,
                yaw.to_degrees()
            );
            laid += 1;
        }
    }
    if laid == 0 {
        println!("  (none)");
    }

    println!();
    println!("Performed {} action(s):", report.performed.len());
    for line in &report.performed {
        println!("  {}", line);
    }

    if !report.refused.is_empty() {
        println!();
        println!("Did nothing:");
        for refusal in &report.refused {
            println!("  step {} ({}): {}", refusal.step, refusal.action, refusal.reason);
        }
    }
}
