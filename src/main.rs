mod cmd;

use clap::Parser;
use cmd::Cli;
use flight_mirror::MirrorError;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = cmd::run(cli) {
        let client_error = e
            .downcast_ref::<MirrorError>()
            .is_some_and(MirrorError::is_client_error);
        let output = serde_json::json!({ "ok": false, "error": format!("{e:#}") });
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        tracing::error!(error = %format!("{e:#}"), client_error, "command failed");
        std::process::exit(if client_error { 2 } else { 1 });
    }
}
