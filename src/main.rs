//! parsely CLI - live test runner for grammar definitions
//!
//! Usage: parsely -t <tests-glob> (-g <artifact> | -r <source> --compiler <exe>)
//!
//! Watches the grammar and the test files; every relevant change reloads the
//! grammar and reruns the whole corpus, printing parse results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use parsely::{watch, Orchestrator, RunnerConfig, RunnerEvent};

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = RunnerConfig::new(
        cli.tests,
        cli.grammar,
        cli.raw_grammar,
        cli.compiler,
        cli.test_name_pattern,
        cli.watch_patterns,
        // NDJSON embeds rendered results in event lines; keep them one-line
        cli.raw_output || cli.json,
    )?;

    let orchestrator = Orchestrator::new(config)?;

    let json = cli.json;
    let emit = move |event: RunnerEvent| {
        if json {
            println!("{}", event.to_json());
        } else {
            print_human(&event);
        }
    };

    if cli.once {
        let mut orchestrator = orchestrator;
        orchestrator.bootstrap(&emit);
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })?;

    watch(orchestrator, running, emit)?;
    Ok(())
}

fn print_human(event: &RunnerEvent) {
    match event {
        RunnerEvent::Started { grammar, tests } => {
            println!("Watching {grammar} (tests: {tests})");
        }
        RunnerEvent::GrammarLoaded { .. } => println!("Reloading grammar..."),
        RunnerEvent::GrammarError { message, .. } => eprintln!("Grammar error: {message}"),
        RunnerEvent::TestFileUpdated { path, cases } => {
            println!("Reloading tests: {path} ({cases} cases)");
        }
        RunnerEvent::TestFileRemoved { path } => println!("Removed: {path}"),
        RunnerEvent::FileError { path, message } => eprintln!("Error ({path}): {message}"),
        RunnerEvent::CaseResult { name, rendered, .. } => {
            println!("\nRunning: {name}");
            println!("{rendered}");
        }
        RunnerEvent::CaseFailed { name, message, .. } => {
            println!("\nRunning: {name}");
            println!("Parse failed");
            println!("{message}");
        }
        RunnerEvent::RunSkipped { .. } => {
            eprintln!("No grammar loaded; skipping run");
        }
        // per-case lines carry the useful signal in human mode
        RunnerEvent::RunStarted { .. } | RunnerEvent::RunComplete { .. } => {}
        RunnerEvent::Shutdown => println!("Stopped."),
    }
}
