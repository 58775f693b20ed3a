use super::{load_config, print_json, Engines, GlobalArgs};
use flight_mirror::allocator::FlightId;
use serde_json::json;

pub fn run(global: &GlobalArgs) -> anyhow::Result<()> {
    let engines = Engines::open(load_config(global)?)?;
    let (a, b) = engines.sessions()?;
    let allocator = engines.config().allocator();

    let snapshot = allocator.snapshot(&a, &b);
    let as_id = |n: Option<u64>| n.map(|n| FlightId::new(n).to_string());

    print_json(&json!({
        "ok": true,
        "engine_a": as_id(snapshot.engine_a),
        "engine_b": as_id(snapshot.engine_b),
        "max": as_id(snapshot.combined()),
        "next": FlightId::new(allocator.next_start(&a, &b)).to_string(),
    }))
}
