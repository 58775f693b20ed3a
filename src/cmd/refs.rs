use super::{load_config, parse_policy, print_json, Engines, GlobalArgs};
use flight_mirror::domain::{Dimension, DomainResolver};
use serde_json::json;

pub fn run(global: &GlobalArgs, policy: Option<String>) -> anyhow::Result<()> {
    let config = load_config(global)?;
    let policy = parse_policy(policy, &config)?;
    let engines = Engines::open(config)?;
    let (a, b) = engines.sessions()?;

    let resolved = DomainResolver::new(policy).resolve(&a, &b)?;

    let mut sizes = serde_json::Map::new();
    for dimension in Dimension::ALL {
        sizes.insert(dimension.to_string(), json!(resolved.domain.len(dimension)));
    }
    let unreadable: Vec<_> = resolved
        .unreadable
        .iter()
        .map(|(engine, dimension)| json!({ "engine": engine, "dimension": dimension }))
        .collect();

    print_json(&json!({
        "ok": true,
        "policy": resolved.policy,
        "used_intersection_all": resolved.used_intersection_all,
        "usable": sizes,
        "unreadable": unreadable,
    }))
}
