//! VoteSmash E2E harness CLI
//!
//! Runs the browser test suite in dependency order, a single test, or a
//! numbered range, then prints a tally and exits non-zero on any failure.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use votesmash_harness::mode::stdin_is_interactive;
use votesmash_harness::{
    select_mode, BrowserConfig, Error, HarnessConfig, InterpreterExecutor, LogSink, Mode,
    ModeInputs, Prompt, RunController, RunSummary, StdinPrompt, TestRunner, Validate,
};

/// Summary artifact written next to the run log.
const SUMMARY_FILE: &str = "last_run.json";

#[derive(Parser, Debug)]
#[command(name = "votesmash-harness")]
#[command(about = "Run the VoteSmash end-to-end browser tests")]
#[command(version)]
struct Cli {
    /// Harness configuration file (TOML)
    #[arg(short, long, env = "HARNESS_CONFIG")]
    config: Option<PathBuf>,

    /// 1: all tests, 2: a specific test, 3: a numbered range
    #[arg(long, env = "TEST_CHOICE")]
    choice: Option<String>,

    /// Test to run for choice 2, e.g. test04.js
    #[arg(long, env = "TEST_FILE")]
    test_file: Option<String>,

    /// First test number for choice 3
    #[arg(long, env = "START_NUM")]
    start: Option<String>,

    /// Last test number for choice 3
    #[arg(long, env = "END_NUM")]
    end: Option<String>,
}

impl Cli {
    fn mode_inputs(&self) -> ModeInputs {
        ModeInputs {
            choice: self.choice.clone(),
            test_file: self.test_file.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match HarnessConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    // Scripts run with test_root as their working directory.
    if let Ok(root) = std::fs::canonicalize(&config.test_root) {
        config.test_root = root;
    }
    let browser = BrowserConfig::from_env();

    let mut stdin_prompt = StdinPrompt;
    let prompt: Option<&mut dyn Prompt> = if stdin_is_interactive() {
        Some(&mut stdin_prompt)
    } else {
        None
    };
    let mode = match select_mode(&cli.mode_inputs(), prompt) {
        Ok(mode) => mode,
        Err(Error::InvalidSelection(reason)) => {
            // Nothing ran, so nothing failed.
            println!("❌ Invalid selection: {}", reason);
            std::process::exit(0);
        }
        Err(e) => fail(&e),
    };

    let mut validation = config.validate_for(&mode);
    validation.merge(browser.validate());
    match validation.into_result() {
        Ok(warnings) => {
            for warning in warnings {
                tracing::warn!("{}", warning);
            }
        }
        Err(e) => fail(&e),
    }

    let sink = match LogSink::open(config.log_path()) {
        Ok(sink) => sink,
        Err(e) => fail(&e),
    };
    let executor = InterpreterExecutor::new(&config.interpreter)
        .with_args(config.interpreter_args.clone())
        .with_working_dir(&config.test_root);
    let runner = TestRunner::new(Arc::new(executor), config.script_layout(), sink);
    let controller = RunController::new(runner).with_catalog_ceiling(&config.catalog);

    println!("\n{}", "=".repeat(60));
    println!("Test Run Started: {}", controller.run_id());
    println!("{}", "=".repeat(60));
    tracing::debug!(
        mode = ?mode,
        app_url = %browser.app_url,
        browser = %browser.browser,
        headless = browser.headless,
        "starting test run"
    );

    let summary = match &mode {
        Mode::All => match controller.run_all(&config.catalog).await {
            Ok(summary) => summary,
            Err(e) => fail(&e),
        },
        Mode::Single(test) => controller.run_single(test).await,
        Mode::Range { start, end } => controller.run_range(*start, *end).await,
    };

    match controller
        .runner()
        .sink()
        .write_artifact(SUMMARY_FILE, &summary)
    {
        Ok(path) => tracing::debug!(path = ?path, "wrote run summary"),
        Err(e) => tracing::warn!(error = %e, "failed to write run summary"),
    }

    print_tally(&mode, &summary, &browser);
    println!("\nLogs: {}", controller.runner().sink().path().display());

    std::process::exit(summary.exit_code());
}

fn print_tally(mode: &Mode, summary: &RunSummary, browser: &BrowserConfig) {
    println!("\n{}", "=".repeat(60));
    println!("Test Run Finished");
    println!("{}", "=".repeat(60));

    if let Mode::Single(test) = mode {
        let verdict = if summary.passed() { "Passed" } else { "Failed" };
        println!("Result for {}: {}", test, verdict);
    } else {
        println!("Total Tests: {}", summary.total());
        println!("Passed: {}", summary.succeeded.len());
        println!("Failed: {}", summary.failed.len());
    }
    println!("Time: {:.2}s", summary.duration.as_secs_f64());

    if !summary.failed.is_empty() {
        println!("\nFailed Tests:");
        for test in &summary.failed {
            if summary.skipped.contains(test) {
                println!("  - {} (skipped)", test);
            } else {
                println!("  - {}", test);
            }
        }
    }

    println!("\n{}", browser.grid_description());
}

fn fail(error: &Error) -> ! {
    tracing::error!(error = %error, "aborting test run");
    eprintln!("Error: {}", error);
    std::process::exit(1);
}
