use super::{load_config, parse_policy, print_json, progress_bar, Engines, GlobalArgs};
use flight_mirror::allocator::IdAllocator;
use flight_mirror::coordinator::{WriteCoordinator, WriteOutcome, WriteStrategy};
use flight_mirror::domain::DomainResolver;
use flight_mirror::engine::Engine;
use flight_mirror::synth::RowSynthesizer;
use rand::Rng;
use serde_json::json;
use std::time::Instant;

#[allow(clippy::too_many_arguments)]
pub fn run(
    global: &GlobalArgs,
    count: u64,
    batch: bool,
    batch_size: Option<usize>,
    policy: Option<String>,
    seed: Option<u64>,
    progress: bool,
    verbose: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(global)?;
    if let Some(size) = batch_size {
        config.batch_size = size;
        config.validate()?;
    }
    let policy = parse_policy(policy, &config)?;
    let strategy = if batch || batch_size.is_some() {
        WriteStrategy::Batched {
            batch_size: config.batch_size,
        }
    } else {
        WriteStrategy::RowLevel
    };

    let engines = Engines::open(config)?;
    let (a, b) = engines.sessions()?;
    let allocator = engines.config().allocator();
    let resolver = DomainResolver::new(policy);

    let start_time = Instant::now();
    let outcome = match seed {
        Some(seed) => write(
            &a,
            &b,
            RowSynthesizer::seeded(seed),
            allocator,
            resolver,
            count,
            strategy,
            progress,
        )?,
        None => write(
            &a,
            &b,
            RowSynthesizer::from_entropy(),
            allocator,
            resolver,
            count,
            strategy,
            progress,
        )?,
    };
    let elapsed = start_time.elapsed();

    let mut output = json!({
        "ok": true,
        "inserted": outcome.inserted,
    });
    if verbose {
        output["skipped"] = json!(outcome.skipped);
        output["diverged"] = json!(outcome.diverged);
        output["compensation_failures"] = json!(outcome.compensation_failures);
        output["elapsed_ms"] = json!(elapsed.as_millis() as u64);
    }
    print_json(&output)?;

    if !outcome.compensation_failures.is_empty() || !outcome.diverged.is_empty() {
        eprintln!(
            "warning: {} compensation failure(s), {} diverged identifier(s); run `flight-mirror check`",
            outcome.compensation_failures.len(),
            outcome.diverged.len()
        );
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write<R: Rng>(
    a: &dyn Engine,
    b: &dyn Engine,
    synth: RowSynthesizer<R>,
    allocator: IdAllocator,
    resolver: DomainResolver,
    count: u64,
    strategy: WriteStrategy,
    progress: bool,
) -> anyhow::Result<WriteOutcome> {
    let mut coordinator = WriteCoordinator::new(a, b, synth)
        .with_allocator(allocator)
        .with_resolver(resolver);

    if progress {
        let pb = progress_bar(count, "written");
        let pb_clone = pb.clone();
        coordinator = coordinator.with_progress(move |done| pb_clone.set_position(done));
        let outcome = coordinator.write(count, strategy)?;
        pb.finish_with_message("done");
        Ok(outcome)
    } else {
        Ok(coordinator.write(count, strategy)?)
    }
}
