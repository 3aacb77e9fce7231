use anyhow::Context;
use clap::Parser;
use portmapp::cli::{self, Args};
use portmapp::config::AppSettings;
use portmapp::output;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "portmapp=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_settings(args: &Args) -> anyhow::Result<AppSettings> {
    match &args.config {
        Some(path) => AppSettings::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display())),
        None => Ok(AppSettings::load().unwrap_or_else(|e| {
            output::print_warning(&format!("ignoring settings: {}", e));
            AppSettings::default()
        })),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let settings = load_settings(&args)?;
    let code = cli::execute(&args, &settings).await?;
    Ok(code)
}
