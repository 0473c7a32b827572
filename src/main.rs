use clap::Parser;
use jsse_promise::interpreter::{EngineOptions, Interpreter, PromiseHookEvent, ProtectorScope};
use jsse_promise::scenario::{Scenario, run_scenario};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jsse-promise", version, about = "Runs Promise engine scenarios")]
struct Cli {
    /// Scenario to run (all of them when omitted)
    #[arg(value_enum)]
    scenario: Option<Scenario>,

    /// Start with every protector invalidated
    #[arg(long)]
    slow_path: bool,

    /// Print promise lifecycle events
    #[arg(long)]
    hooks: bool,

    /// Stop draining the job queue after this many jobs
    #[arg(long)]
    job_limit: Option<usize>,

    /// Log settlements and protector changes
    #[arg(short, long)]
    verbose: bool,
}

fn install_subscriber(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    install_subscriber(cli.verbose);

    // Forcing the slow path must not leak into the process-wide protectors.
    let scope = if cli.slow_path {
        ProtectorScope::Isolated
    } else {
        ProtectorScope::Global
    };
    let options = EngineOptions::default()
        .with_protector_scope(scope)
        .with_fast_paths(!cli.slow_path)
        .with_job_limit(cli.job_limit);

    let scenarios = match cli.scenario {
        Some(s) => vec![s],
        None => Scenario::ALL.to_vec(),
    };

    let mut status = ExitCode::SUCCESS;
    for scenario in scenarios {
        let mut interp = Interpreter::with_options(options.clone());
        if cli.hooks {
            interp.add_promise_hook(|event: &PromiseHookEvent| println!("  hook: {event:?}"));
        }
        match run_scenario(&mut interp, scenario) {
            Ok(outcome) => {
                println!(
                    "{}: {} ({} jobs)",
                    scenario.name(),
                    outcome.result,
                    outcome.jobs_run
                );
                for reason in outcome.unhandled {
                    println!("  unhandled rejection: {reason}");
                }
            }
            Err(e) => {
                eprintln!("{}: {e}", scenario.name());
                status = ExitCode::from(1);
            }
        }
    }
    status
}
