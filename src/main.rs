use clap::Parser;
use cpuload::cli::{self, Args};
use cpuload::config::{LoadConfig, RunHistory};
use cpuload::engine::LoadEngine;
use cpuload::error::{exit_code, user_friendly_message};
use cpuload::host::ProcessorTopology;
use cpuload::models::RunOutcome;
use cpuload::util::{format_load, format_run_duration};
use cpuload::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run(args: Args) -> Result<()> {
    if let Some(count) = args.history {
        let runs = RunHistory::new()?.recent_runs(count)?;
        if runs.is_empty() {
            println!("No recorded runs.");
        }
        for run in runs {
            println!("{}", run.summary());
        }
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => LoadConfig::load_from(path)?,
        None => LoadConfig::load()?,
    };
    let config = args.apply(config);
    config.validate()?;

    if args.save_config {
        config.save()?;
        info!(path = %LoadConfig::config_file_path()?.display(), "configuration saved");
    }

    let detected = ProcessorTopology::detect();
    info!(%detected, "detected processor topology");

    let request = args.request(&config, detected)?;
    println!(
        "Generating {} load on {} workers for {} (target ~{})",
        request.profile.describe(),
        request.num_workers(),
        format_run_duration(request.duration),
        format_load(request.profile.expected_load()),
    );

    let engine = LoadEngine::new(request)?;
    let summary = cli::run_with_progress(engine, !args.no_progress).await?;

    match summary.outcome {
        RunOutcome::Completed => println!("Done generating CPU load!"),
        RunOutcome::Stopped => println!("Stopped generating CPU load."),
    }
    println!("{}", summary.summary());

    if args.record {
        if let Err(e) = RunHistory::new().and_then(|history| history.append_run(summary)) {
            warn!(error = %e, "failed to record run");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("{}", user_friendly_message(&e));
        std::process::exit(exit_code(&e));
    }
}
