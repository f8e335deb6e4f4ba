//! Colony Overseer - headless demo driver
//!
//! Runs the overseer against the in-memory simulation host: a home room at
//! controller level 2 with two sources, a neighbouring room to scout and a
//! handful of construction sites. Prints a summary every few ticks.

use std::path::PathBuf;

use clap::Parser;
use colony_overseer::core::types::RoomName;
use colony_overseer::host::StructureKind;
use colony_overseer::units::memory::Role;
use colony_overseer::{Host, Overseer, OverseerConfig, Result, SimHost};
use tracing_subscriber::EnvFilter;

/// Run the colony controller against a simulated world
#[derive(Parser, Debug)]
#[command(name = "colony-overseer")]
#[command(about = "Drive a simulated colony with the rule-based overseer")]
struct Args {
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 500)]
    ticks: u64,

    /// TOML file overriding the default tuning
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a summary every N ticks
    #[arg(long, default_value_t = 50)]
    report_every: u64,

    /// Write the colony memory as JSON to this file when done
    #[arg(long)]
    dump_memory: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("colony_overseer=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => OverseerConfig::load(path)?,
        None => OverseerConfig::default(),
    };

    let home = RoomName::from("W1N1");
    let mut host = demo_world(&home);
    let mut overseer = Overseer::with_config(config)?;

    tracing::info!(ticks = args.ticks, room = %home, "Colony Overseer starting");

    for _ in 0..args.ticks {
        let report = overseer.run_tick(&mut host);
        host.fulfil_orders(overseer.orders_mut());
        host.end_tick();

        if args.report_every > 0 && report.tick % args.report_every == 0 {
            print_summary(&host, &overseer, &home, report.tick);
        }
        if !report.failures.is_empty() {
            tracing::warn!(tick = report.tick, failures = ?report.failures, "managers failed");
        }
    }

    print_summary(&host, &overseer, &home, host.tick());

    if let Some(path) = &args.dump_memory {
        std::fs::write(path, overseer.save_memory()?)?;
        tracing::info!(path = %path.display(), "colony memory written");
    }

    Ok(())
}

fn demo_world(home: &RoomName) -> SimHost {
    let mut host = SimHost::new();
    let outpost = RoomName::from("W2N1");

    host.add_room(home, 2);
    let spawn = host.add_structure(home, StructureKind::Spawn, 25, 25);
    host.fill_structure(&spawn);
    host.add_source(home, "source-a", 10, 10);
    host.add_source(home, "source-b", 40, 12);
    host.add_container(home, 11, 11, 0);
    for x in 20..23 {
        host.add_site(home, StructureKind::Extension, x, 30);
    }
    host.add_site(home, StructureKind::Road, 24, 26);

    host.add_neutral_room(&outpost);
    host.add_source(&outpost, "source-c", 15, 35);
    host.set_exits(home, &["W2N1"]);
    host.set_exits(&outpost, &["W1N1"]);

    host
}

fn print_summary(host: &SimHost, overseer: &Overseer, home: &RoomName, tick: u64) {
    let names = host.unit_names();
    let count = |role: Role| {
        names
            .iter()
            .filter_map(|n| host.unit_view(n))
            .filter(|u| u.memory.as_ref().is_some_and(|m| m.role == role))
            .count()
    };
    let level = host.room(home).map_or(0, |r| r.controller_level());

    println!(
        "tick {tick:>5} | rcl {level} | units {:>2} (harvest {} haul {} build {} upgrade {} scout {}) | queued {}",
        names.len(),
        count(Role::Harvester),
        count(Role::Hauler),
        count(Role::Builder),
        count(Role::Upgrader),
        count(Role::Scout),
        overseer.orders().len(),
    );
}
