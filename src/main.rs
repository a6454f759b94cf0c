//! Ljudmonitor CLI
//!
//! Usage:
//!   ljudmonitor                         # Interactive console, levels pushed with `energy <x>`
//!   ljudmonitor --simulate              # Interactive console with a simulated classroom
//!   ljudmonitor --serve                 # HTTP API server
//!   ljudmonitor --simulate --follow     # Print every tick
//!   ljudmonitor --json                  # JSON output

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use log::LevelFilter;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use ljudmonitor::core::{
    pick_message, run_server, Command, FeedbackMood, LevelSource, LiveUpdate, MessageContext,
    MonitorConfig, MonitorHandle, PushSource, SessionStore, SettingsStore, SimulatedSource,
};
use ljudmonitor::types::{format_duration, MonitorEvent, StreakStatus};
use ljudmonitor::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "ljudmonitor",
    version = VERSION,
    about = "Ljudmonitor - classroom noise meter with quiet streaks",
    long_about = "Ljudmonitor samples the room level, compares it with a phase-specific\n\
                  threshold and keeps a quiet streak going as long as the room stays\n\
                  below it. Short bursts are forgiven by a grace period.\n\n\
                  Modes:\n  \
                  (default)  Interactive console\n  \
                  --serve    HTTP API server\n\n\
                  Streak states:\n  \
                  IDLE     - Not recording\n  \
                  RUNNING  - Below threshold, streak growing\n  \
                  GRACE    - Too loud, waiting to see if it passes"
)]
struct Args {
    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Drive levels from a simulated classroom instead of pushed values
    #[arg(long)]
    simulate: bool,

    /// Seed for the simulated classroom and feedback messages
    #[arg(long)]
    seed: Option<u64>,

    /// Print every tick, not only events
    #[arg(short, long)]
    follow: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Directory for settings and saved sessions
    #[arg(long, default_value = "./ljudmonitor-data")]
    data_dir: PathBuf,

    /// Optional JSON file with monitor configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grace period before a streak breaks (milliseconds)
    #[arg(long)]
    grace_ms: Option<u64>,

    /// Sampling interval (milliseconds)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Emit warning events while the room is too loud
    #[arg(long)]
    chime: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.serve { LevelFilter::Info } else { LevelFilter::Warn })
        .parse_default_env()
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let settings = Arc::new(SettingsStore::in_dir(&args.data_dir)?);
    let sessions = Arc::new(SessionStore::in_dir(&args.data_dir)?);
    let seed = args.seed.unwrap_or_else(rand::random);

    let push = PushSource::new();
    let source: Box<dyn LevelSource> = if args.simulate {
        Box::new(SimulatedSource::new(seed))
    } else {
        Box::new(push.clone())
    };
    let monitor = MonitorHandle::new(config, source, settings, sessions);

    if args.serve {
        print_header("API Server", args.no_color);
        let push = (!args.simulate).then_some(push);
        run_server(&args.addr, monitor, push).await
    } else {
        run_console(&args, monitor, push, seed).await
    }
}

/// Defaults, then the optional config file, then command-line overrides
fn load_config(args: &Args) -> Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config in {}", path.display()))?
        }
        None => MonitorConfig::default(),
    };
    if let Some(grace_ms) = args.grace_ms {
        config.grace_ms = grace_ms;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.sample_interval_ms = interval_ms;
    }
    if args.chime {
        config.chime_enabled = true;
    }
    Ok(config)
}

/// Interactive console: commands from stdin, events from the monitor
async fn run_console(args: &Args, monitor: MonitorHandle, push: PushSource, seed: u64) -> Result<()> {
    print_header("Console", args.no_color);
    println!("{}", Command::USAGE);
    if !args.simulate {
        println!("No input device: feed levels with `energy <raw>` or start with --simulate.");
    }
    println!();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut updates = monitor.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(command, &monitor, &push, args, &mut rng).await,
                    Err(reason) => println!("{} ({})", reason, "try `help`".dimmed()),
                }
            }
            update = updates.recv() => match update {
                Ok(update) => print_update(&update, args, &mut rng),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
        }
    }

    if monitor.is_recording().await {
        execute(Command::Stop, &monitor, &push, args, &mut rng).await;
    }
    Ok(())
}

async fn execute(
    command: Command,
    monitor: &MonitorHandle,
    push: &PushSource,
    args: &Args,
    rng: &mut StdRng,
) {
    let result = match command {
        Command::Start => monitor.start().await.map(|_| "Recording started".to_string()),
        Command::Stop => monitor.stop().await.map(|outcome| match outcome.summary {
            Some(summary) => {
                if args.json {
                    serde_json::to_string_pretty(&summary).unwrap_or_default()
                } else {
                    format!(
                        "Session: {} | avg {:.1} dB | peak {:.1} dB | {:.0}% over | best streak {}",
                        format_duration(summary.duration_ms),
                        summary.avg_level,
                        summary.peak_level,
                        summary.over_percent,
                        format_duration(summary.best_streak_ms)
                    )
                }
            }
            None => "Recording stopped (too short for a summary)".to_string(),
        }),
        Command::Phase(phase) => {
            let threshold = monitor.set_phase(phase).await;
            Ok(format!("Phase {} - threshold {:.0}", phase.label(), threshold))
        }
        Command::Threshold(value) => monitor
            .set_threshold(value)
            .await
            .map(|t| format!("Effective threshold {:.0}", t)),
        Command::Adjust(phase, offset) => monitor
            .set_adjustment(phase, offset)
            .await
            .map(|adj| format!("{} adjustment {:+}", phase.label(), adj.get(phase))),
        Command::Calibrate => {
            let msg = pick_message(FeedbackMood::Calibrating, &MessageContext::default(), rng);
            println!("{}", msg);
            // Runs beside the console loop so `stop` can still end it early
            let monitor = monitor.clone();
            tokio::spawn(async move {
                match monitor.calibrate().await {
                    Ok(record) => println!(
                        "Calibrated: quiet {:.0} | discussion {:.0} | offset {:.6}",
                        record.thresholds.quiet, record.thresholds.discussion, record.offset
                    ),
                    Err(reason) => println!("{}", reason.to_string().red()),
                }
            });
            Ok("Calibration running".to_string())
        }
        Command::Energy(raw) => {
            push.push(raw);
            Ok(format!("Level input {}", raw))
        }
        Command::Chime(enabled) => {
            monitor.set_chime_enabled(enabled).await;
            Ok(format!("Warning chime {}", if enabled { "on" } else { "off" }))
        }
        Command::Reflect(text) => monitor.add_reflection(&text).map(|stored| {
            if stored { "Reflection saved" } else { "No session to attach to" }.to_string()
        }),
        Command::Sessions => Ok(format_sessions(monitor, args)),
        Command::Status => Ok(format_status(monitor, args).await),
        Command::Help => Ok(Command::USAGE.to_string()),
        Command::Quit => Ok(String::new()),
    };

    match result {
        Ok(text) => println!("{}", text),
        Err(reason) => println!("{}", reason.to_string().red()),
    }
}

async fn format_status(monitor: &MonitorHandle, args: &Args) -> String {
    let status = monitor.status().await;
    if args.json {
        return serde_json::to_string_pretty(&status).unwrap_or_default();
    }
    let state = if args.no_color {
        status.streak.to_string()
    } else {
        format!(
            "{}{} {}{}",
            status.streak.color_code(),
            status.streak.emoji(),
            status.streak,
            StreakStatus::color_reset()
        )
    };
    let level = match status.output {
        Some(out) if args.no_color => out.to_parseable_string(),
        Some(out) => out.to_terminal_string(),
        None => "no samples yet".to_string(),
    };
    format!(
        "[{}] phase={} threshold={:.0} best={}\n{}",
        state,
        status.phase,
        status.effective_threshold,
        format_duration(status.best_streak_ms),
        level
    )
}

fn format_sessions(monitor: &MonitorHandle, args: &Args) -> String {
    let sessions = monitor.sessions();
    if args.json {
        return serde_json::to_string_pretty(&sessions).unwrap_or_default();
    }
    if sessions.is_empty() {
        return "No saved sessions".to_string();
    }
    sessions
        .iter()
        .map(|s| {
            format!(
                "{} | {} | avg {:.1} dB | {:.0}% over | best {}{}",
                s.date,
                format_duration(s.duration_ms),
                s.avg_level,
                s.over_percent,
                format_duration(s.best_streak_ms),
                s.reflection
                    .as_deref()
                    .map(|r| format!(" | \"{}\"", r))
                    .unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_update(update: &LiveUpdate, args: &Args, rng: &mut StdRng) {
    if args.json {
        if args.follow || !update.events.is_empty() {
            println!("{}", serde_json::to_string(update).unwrap_or_default());
        }
        return;
    }

    if args.follow {
        if let Some(out) = &update.output {
            if args.no_color {
                println!("{}", out.to_parseable_string());
            } else {
                println!("{}", out.to_terminal_string());
            }
        }
    }

    for event in &update.events {
        let ctx = MessageContext {
            streak_ms: update.output.map_or(0, |o| o.streak.elapsed_ms),
            best_ms: update.output.map_or(0, |o| o.streak.best_ms),
        };
        match event {
            MonitorEvent::StreakBroken { duration_ms, .. } => {
                let ctx = MessageContext { streak_ms: *duration_ms, ..ctx };
                let msg = pick_message(FeedbackMood::StreakBroken, &ctx, rng);
                println!("{}", format!("  ⚠ {}", msg).red());
            }
            MonitorEvent::Warning { level, .. } => {
                let msg = pick_message(FeedbackMood::Warning, &ctx, rng);
                println!("{}", format!("  🔔 {} ({:.0} dB)", msg, level).yellow());
            }
            MonitorEvent::StreakRecovered { .. } => {
                let mood = FeedbackMood::from_output(update.output.as_ref(), false);
                println!("{}", format!("  ✓ {}", pick_message(mood, &ctx, rng)).green());
            }
            MonitorEvent::PhaseChanged { .. }
            | MonitorEvent::StreakStarted { .. }
            | MonitorEvent::GraceStarted { .. } => {}
        }
    }
}

fn print_header(mode: &str, no_color: bool) {
    let title = format!("Ljudmonitor v{} - {}", VERSION, mode);
    println!("========================================");
    if no_color {
        println!("  {}", title);
    } else {
        println!("  {}", title.bold());
    }
    println!("========================================");
    println!();
}
