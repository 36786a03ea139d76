use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rpa_tester::player::{CancellationToken, Player};
use rpa_tester::recorder::Recorder;
use rpa_tester::report::RunResults;
use rpa_tester::runner::{self, ConsoleEventListener, EventEmitter, RunOptions};
use rpa_tester::store::ProjectStore;
use rpa_tester::utils::config::Config;
use rpa_tester::{driver, report, PlayStatus, Step, TestResult};

#[derive(Parser)]
#[command(name = "rpa-tester")]
#[command(version = "0.1.0")]
#[command(about = "Record desktop input as tests, replay them, track results", long_about = None)]
struct Cli {
    /// Config file (defaults to ./rpa-tester.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Project store file, overriding the config
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Manage test suites of a project
    Suite {
        #[command(subcommand)]
        command: SuiteCommands,
    },

    /// Manage tests of a suite
    Test {
        #[command(subcommand)]
        command: TestCommands,
    },

    /// Inspect or edit the steps of a test
    Step {
        #[command(subcommand)]
        command: StepCommands,
    },

    /// Record live input into a test, replacing its steps
    Record {
        #[command(flatten)]
        target: TestTarget,

        /// Stop automatically after this many seconds
        #[arg(short, long)]
        duration: Option<f64>,
    },

    /// Replay one test and store its result
    Play {
        #[command(flatten)]
        target: TestTarget,

        /// Replay speed multiplier (2.0 = twice as fast)
        #[arg(long)]
        speed: Option<f64>,

        /// Log actions instead of performing them
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },

    /// Replay every test of a project
    Run {
        /// Project id
        #[arg(short, long)]
        project: String,

        /// Write the run results as JSON to this path
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Stop at the first failing test
        #[arg(long, default_value = "false")]
        fail_fast: bool,

        /// Log actions instead of performing them
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },

    /// Generate report from saved run results
    Report {
        /// Path to run results JSON
        results: PathBuf,

        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Create a project
    Create { name: String },
    /// List projects
    List,
}

#[derive(Subcommand)]
enum SuiteCommands {
    /// Create a test suite
    Create {
        #[arg(short, long)]
        project: String,
        name: String,
    },
    /// List test suites
    List {
        #[arg(short, long)]
        project: String,
    },
}

#[derive(Subcommand)]
enum TestCommands {
    /// Create an empty test
    Create {
        #[arg(short, long)]
        project: String,
        #[arg(short, long)]
        suite: String,
        name: String,
    },
    /// List tests with their last result
    List {
        #[arg(short, long)]
        project: String,
        #[arg(short, long)]
        suite: String,
    },
    /// Show a test and its steps
    Show {
        #[command(flatten)]
        target: TestTarget,
    },
}

#[derive(Subcommand)]
enum StepCommands {
    /// List steps
    List {
        #[command(flatten)]
        target: TestTarget,
    },
    /// Delete the step at a 0-based index
    Delete {
        #[command(flatten)]
        target: TestTarget,
        index: usize,
    },
}

#[derive(clap::Args)]
struct TestTarget {
    /// Project id
    #[arg(short, long)]
    project: String,

    /// Test suite id
    #[arg(short, long)]
    suite: String,

    /// Test id
    #[arg(short, long)]
    test: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    match cli.command {
        Commands::Project { command } => {
            let mut store = ProjectStore::load(&config.store_path)?;
            match command {
                ProjectCommands::Create { name } => {
                    let id = store.create_project(&name).id.clone();
                    store.save()?;
                    println!("{} Created project {} ({})", "✓".green(), name.bold(), id.cyan());
                }
                ProjectCommands::List => {
                    for project in store.projects() {
                        println!(
                            "{}  {} ({} suites, {} tests)",
                            project.id.cyan(),
                            project.name.bold(),
                            project.test_suites.len(),
                            project.test_count()
                        );
                    }
                }
            }
        }

        Commands::Suite { command } => {
            let mut store = ProjectStore::load(&config.store_path)?;
            match command {
                SuiteCommands::Create { project, name } => {
                    let id = store.create_test_suite(&project, &name)?.id.clone();
                    store.save()?;
                    println!("{} Created suite {} ({})", "✓".green(), name.bold(), id.cyan());
                }
                SuiteCommands::List { project } => {
                    for suite in store.test_suites(&project)? {
                        println!(
                            "{}  {} ({} tests)",
                            suite.id.cyan(),
                            suite.name.bold(),
                            suite.tests.len()
                        );
                    }
                }
            }
        }

        Commands::Test { command } => {
            let mut store = ProjectStore::load(&config.store_path)?;
            match command {
                TestCommands::Create {
                    project,
                    suite,
                    name,
                } => {
                    let id = store.create_test(&project, &suite, &name)?.id.clone();
                    store.save()?;
                    println!("{} Created test {} ({})", "✓".green(), name.bold(), id.cyan());
                }
                TestCommands::List { project, suite } => {
                    for test in store.tests(&project, &suite)? {
                        println!(
                            "{}  {} [{}] {} steps",
                            test.id.cyan(),
                            test.name.bold(),
                            result_label(test.result),
                            test.steps.len()
                        );
                    }
                }
                TestCommands::Show { target } => {
                    let test = store.test(&target.project, &target.suite, &target.test)?;
                    println!("{} ({})", test.name.bold(), test.id.cyan());
                    println!("  Result: {}", result_label(test.result));
                    println!(
                        "  Steps: {} over {:.3}s",
                        test.steps.len(),
                        test.duration_seconds()
                    );
                    print_steps(&test.steps);
                }
            }
        }

        Commands::Step { command } => {
            let mut store = ProjectStore::load(&config.store_path)?;
            match command {
                StepCommands::List { target } => {
                    print_steps(store.steps(&target.project, &target.suite, &target.test)?);
                }
                StepCommands::Delete { target, index } => {
                    let removed =
                        store.delete_step(&target.project, &target.suite, &target.test, index)?;
                    store.save()?;
                    println!("{} Deleted step {}: {}", "✓".green(), index, removed.description());
                }
            }
        }

        Commands::Record { target, duration } => {
            record(&config, &target, duration).await?;
        }

        Commands::Play {
            target,
            speed,
            dry_run,
        } => {
            if let Some(speed) = speed {
                config.playback.speed = speed;
                config.validate()?;
            }
            let mut store = ProjectStore::load(&config.store_path)?;
            let test = store.test_mut(&target.project, &target.suite, &target.test)?;

            println!(
                "{} Playing {} ({} steps)",
                "▶".green().bold(),
                test.name.bold(),
                test.steps.len()
            );

            let player = Player::new(driver::synthesizer(dry_run), config.playback.clone());
            let cancel = cancel_on_ctrlc()?;
            let result = player.play_with_cancel(test, &cancel).await;
            result.apply_to(test);

            match &result.status {
                PlayStatus::Passed => println!(
                    "{} Passed in {:.2}s",
                    "✓".green().bold(),
                    result.duration.as_secs_f64()
                ),
                PlayStatus::Failed { index, error } => {
                    println!("{} Failed at step {}: {}", "✗".red().bold(), index, error)
                }
                PlayStatus::Cancelled { index } => {
                    println!("{} Cancelled before step {}", "■".yellow().bold(), index)
                }
            }
            store.save()?;

            if !result.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Run {
            project,
            report: report_path,
            fail_fast,
            dry_run,
        } => {
            let mut store = ProjectStore::load(&config.store_path)?;
            let project = store.project_mut(&project)?;

            let (emitter, receiver) = EventEmitter::new();
            let emitter = Arc::new(emitter);
            let console = tokio::spawn(ConsoleEventListener::listen(receiver));

            let player = Player::new(driver::synthesizer(dry_run), config.playback.clone())
                .with_emitter(emitter.clone());
            let options = RunOptions {
                continue_on_failure: config.continue_on_failure && !fail_fast,
            };
            let cancel = cancel_on_ctrlc()?;

            let run = runner::run_project(project, &player, &options, &emitter, &cancel).await;

            // Close the channel so the console listener drains and exits
            drop(player);
            drop(emitter);
            let _ = console.await;

            store.save()?;

            let summary = run.summary();
            if let Some(path) = report_path {
                let results = RunResults::from(run.to_report());
                report::json::generate(&results, Some(&path))?;
            }
            runner::print_verdict(&summary);

            if !summary.all_passed() {
                std::process::exit(1);
            }
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref())?;
        }
    }

    Ok(())
}

async fn record(config: &Config, target: &TestTarget, duration: Option<f64>) -> anyhow::Result<()> {
    let mut store = ProjectStore::load(&config.store_path)?;
    let test = store.test_mut(&target.project, &target.suite, &target.test)?;

    let listener = driver::device_listener()?;
    let recorder = Recorder::new(config.recorder.clone()).with_listener(listener);

    // Set up Ctrl+C handler with atomic flag
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_handler = stop_flag.clone();
    ctrlc::set_handler(move || {
        println!("\n{} Stopping recording...", "⏹".yellow());
        stop_flag_handler.store(true, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")?;

    #[cfg(unix)]
    let mut pause_signal =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::user_defined1())
            .context("Failed to listen for SIGUSR1")?;

    recorder.start_recording(test).await?;
    println!("{} Recording {}...", "●".red().bold(), test.name.bold());
    match duration {
        Some(secs) => println!("   Stops after {}s or on Ctrl+C.", secs),
        None => println!("   Press Ctrl+C when done."),
    }
    #[cfg(unix)]
    println!(
        "   Pause/resume with: kill -USR1 {}",
        std::process::id().to_string().cyan()
    );
    println!();

    let deadline = duration
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .and_then(|limit| tokio::time::Instant::now().checked_add(limit));
    while !stop_flag.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
            break;
        }

        let tick = Duration::from_millis(100);
        #[cfg(unix)]
        let toggled = tokio::select! {
            _ = pause_signal.recv() => true,
            _ = tokio::time::sleep(tick) => false,
        };
        #[cfg(not(unix))]
        let toggled = {
            tokio::time::sleep(tick).await;
            false
        };

        if toggled {
            if recorder.toggle_pause(test).await? {
                println!("{} Paused", "⏸".yellow());
            } else {
                println!("{} Resumed", "●".red());
            }
        }
    }

    let count = recorder.stop_recording(test).await?.len();
    store.save()?;

    println!("\n{} Recorded {} steps", "✓".green().bold(), count);
    println!("   Store: {}", store.path().display().to_string().cyan());
    Ok(())
}

/// Cancel token that fires on Ctrl+C
fn cancel_on_ctrlc() -> anyhow::Result<CancellationToken> {
    let cancel = CancellationToken::new();
    let handler = cancel.clone();
    ctrlc::set_handler(move || {
        println!("\n{} Cancelling playback...", "⏹".yellow());
        handler.cancel();
    })
    .context("Failed to install Ctrl+C handler")?;
    Ok(cancel)
}

fn result_label(result: TestResult) -> colored::ColoredString {
    match result {
        TestResult::Passed => "passed".green(),
        TestResult::Failed => "failed".red(),
        TestResult::Unknown => "unknown".normal(),
    }
}

fn print_steps(steps: &[Step]) {
    for (index, step) in steps.iter().enumerate() {
        println!("  {:>3}  {:>9.3}s  {}", index, step.offset_seconds, step.description());
    }
}
