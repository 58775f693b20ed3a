use super::{load_config, print_json, Engines, GlobalArgs};
use flight_mirror::check;
use serde_json::json;

pub fn run(global: &GlobalArgs, fail_on_divergence: bool) -> anyhow::Result<()> {
    let engines = Engines::open(load_config(global)?)?;
    let (a, b) = engines.sessions()?;

    let report = check::check(&a, &b, &engines.config().allocator())?;
    let consistent = report.is_consistent();

    print_json(&json!({
        "ok": true,
        "consistent": consistent,
        "report": report,
    }))?;

    if fail_on_divergence && !consistent {
        anyhow::bail!(
            "engines diverged: {} dimension row(s) only in A, {} only in B, {} orphan(s), {} fact mismatch(es)",
            report.only_in_a.len(),
            report.only_in_b.len(),
            report.orphans_a.len()
                + report.orphans_b.len()
                + report.fact_orphans_a.len()
                + report.fact_orphans_b.len(),
            report.fact_count_mismatch.len() + report.fact_value_mismatch.len()
        );
    }
    Ok(())
}
