use super::{load_config, print_json, Engines, GlobalArgs};
use anyhow::Context;
use flight_mirror::engine::Engine;
use flight_mirror::schema;
use serde_json::json;

pub fn run(global: &GlobalArgs) -> anyhow::Result<()> {
    let engines = Engines::open(load_config(global)?)?;
    let (a, b) = engines.sessions()?;

    for engine in [&a as &dyn Engine, &b] {
        schema::bootstrap(engine)
            .with_context(|| format!("Failed to create schema on {}", engine.label()))?;
    }

    print_json(&json!({
        "ok": true,
        "schema": schema::SCHEMA,
        "engines": [a.label(), b.label()],
    }))
}
