use super::{load_config, print_json, progress_bar, Engines, GlobalArgs};
use flight_mirror::coordinator::{DeleteCoordinator, DeleteStrategy};
use serde_json::json;

pub fn run(
    global: &GlobalArgs,
    count: Option<u64>,
    chunked: bool,
    chunk_size: Option<usize>,
    progress: bool,
    verbose: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(global)?;
    if let Some(size) = chunk_size {
        config.delete_chunk_size = size;
        config.validate()?;
    }
    let strategy = if chunked || chunk_size.is_some() {
        DeleteStrategy::Chunked {
            chunk_size: config.delete_chunk_size,
        }
    } else {
        DeleteStrategy::RowLevel
    };

    let engines = Engines::open(config)?;
    let (a, b) = engines.sessions()?;
    let coordinator = DeleteCoordinator::new(&a, &b)
        .with_allocator(engines.config().allocator())
        .with_max_span(engines.config().max_delete_span);

    let outcome = if progress {
        let total = coordinator.plan(count)?.map_or(0, |p| p.count());
        let pb = progress_bar(total, "deleted");
        let pb_clone = pb.clone();
        let outcome = coordinator
            .with_progress(move |done| pb_clone.set_position(done))
            .delete(count, strategy)?;
        pb.finish_with_message("done");
        outcome
    } else {
        coordinator.delete(count, strategy)?
    };

    let mut output = json!({
        "ok": true,
        "deleted": outcome.deleted,
    });
    if let Some(ref note) = outcome.note {
        output["note"] = json!(note);
    }
    if verbose {
        output["failures"] = json!(outcome.failures);
    }
    print_json(&output)?;

    Ok(())
}
