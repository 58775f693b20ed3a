use super::{load_config, print_json, Engines, GlobalArgs, Target};
use anyhow::Context;
use flight_mirror::engine::Engine;
use serde_json::json;
use test_data_gen::{Generator, RenderConfig, Renderer, Scale};
use tracing::info;

pub fn run(global: &GlobalArgs, scale: String, seed: u64, only: Target) -> anyhow::Result<()> {
    let scale: Scale = scale.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let data = Generator::new(seed, scale).generate();
    let statements = Renderer::new(RenderConfig::default()).statements(&data);

    let engines = Engines::open(load_config(global)?)?;
    let (a, b) = engines.sessions()?;

    let mut seeded = Vec::new();
    for (engine, selected) in [
        (&a as &dyn Engine, only.includes_a()),
        (&b as &dyn Engine, only.includes_b()),
    ] {
        if !selected {
            continue;
        }
        for stmt in &statements {
            engine
                .run(stmt)
                .with_context(|| format!("Failed to seed {}", engine.label()))?;
        }
        info!(engine = engine.label(), rows = data.total_rows(), "reference data loaded");
        seeded.push(engine.label().to_string());
    }

    print_json(&json!({
        "ok": true,
        "seeded": seeded,
        "airports": data.airports.rows.len(),
        "aircraft": data.aircraft.rows.len(),
        "passengers": data.passengers.rows.len(),
        "dates": data.dates.rows.len(),
    }))
}
