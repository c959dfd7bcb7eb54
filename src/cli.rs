use std::path::PathBuf;

use clap::Parser;

/// parsely - live test runner for grammar definitions
#[derive(Parser, Debug)]
#[command(name = "parsely")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Example: parsely -t 'tests/**/*.test' -g grammar.json")]
pub struct Cli {
    /// Glob pattern for test files, e.g. "tests/**/*.test"
    #[arg(short = 't', long)]
    pub tests: String,

    /// Compiled grammar artifact (JSON rules table)
    #[arg(short = 'g', long, conflicts_with = "raw_grammar")]
    pub grammar: Option<PathBuf>,

    /// Raw grammar source file, recompiled on every change
    #[arg(short = 'r', long)]
    pub raw_grammar: Option<PathBuf>,

    /// Grammar compiler executable, invoked as `<compiler> <source> -o <artifact>`
    #[arg(long, requires = "raw_grammar", conflicts_with = "grammar")]
    pub compiler: Option<String>,

    /// Regex with one capture group marking test-name delimiter lines
    #[arg(short = 'p', long)]
    pub test_name_pattern: Option<String>,

    /// Additional glob patterns whose changes trigger a grammar reload
    #[arg(short = 'w', long = "watch-pattern")]
    pub watch_patterns: Vec<String>,

    /// Print compact round-trippable JSON instead of pretty output
    #[arg(long)]
    pub raw_output: bool,

    /// Emit events as NDJSON for CI
    #[arg(long)]
    pub json: bool,

    /// Run the whole corpus once and exit instead of watching
    #[arg(long)]
    pub once: bool,
}
