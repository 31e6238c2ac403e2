use anyhow::{Context, Result};
use clap::Parser;
use vigia::config::VigiaConfig;
use vigia::lifecycle::ThreadLifecycleManager;
use vigia::whitelist::{LoadStatus, Whitelist};
use vigia::{cli::Cli, tracer};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` forces TRACE, otherwise `RUST_LOG` or warn
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn describe_whitelist(whitelist: &Whitelist) {
    match whitelist.status() {
        LoadStatus::Loaded { path, skipped } => {
            eprintln!(
                "[vigia: Whitelist loaded from {} ({} syscalls, {} malformed entries skipped)]",
                path.display(),
                whitelist.len(),
                skipped
            );
        }
        LoadStatus::Inline => {}
        LoadStatus::Degraded { reason } => {
            eprintln!("[vigia: Warning - {}]", reason);
            eprintln!("[vigia: Continuing with an empty whitelist; every syscall is unauthorized]");
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = VigiaConfig::resolve(&args).context("Failed to load configuration")?;

    let command = match args.command {
        Some(command) => command,
        None => anyhow::bail!("Must specify a command. Usage: vigia [OPTIONS] -- COMMAND [ARGS...]"),
    };

    let whitelist = Whitelist::load_or_degraded(&config.whitelist.path);
    describe_whitelist(&whitelist);

    let sink = config.build_sink().context("Failed to set up report sinks")?;
    let manager = ThreadLifecycleManager::new(whitelist, sink);

    let run = tracer::trace_command(
        &command,
        manager,
        tracer::TracerOptions {
            follow_forks: args.follow_forks,
        },
    )?;

    for outcome in &run.outcomes {
        for failure in &outcome.sink_failures {
            eprintln!("[vigia: thread {}: {}]", outcome.thread, failure);
        }
    }

    eprintln!(
        "[vigia: {} thread(s) observed, {} fully matched{}]",
        run.summary.threads_finalized,
        run.summary.threads_matched,
        if run.summary.degraded {
            ", whitelist degraded"
        } else {
            ""
        }
    );

    if args.strict && !run.all_matched() {
        std::process::exit(1);
    }

    // Exit with traced program's exit code
    std::process::exit(run.exit_code);
}
