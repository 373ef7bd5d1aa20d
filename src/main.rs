use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use clap::Parser;
use log::{debug, error, info, warn};

use hunt_tracker::config::{self, AppConfig};
use hunt_tracker::memory;
use hunt_tracker::provider::{GameStateProvider, MemoryStateProvider, ReplayProvider};
use hunt_tracker::run_log::{rotate_file, JsonRunLog, RunSink};
use hunt_tracker::{Result, Sampler, TickReport, TrackerError};

const REATTACH_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(version, about = "Records hunt statistics from a running game client")]
struct Args {
    /// Config file (default: config.toml next to the executable).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Play back snapshots from a JSON-lines file instead of reading the game.
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Log at debug level regardless of the configured level.
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(log_dir: &Path, level: log::LevelFilter) {
    let log_path = log_dir.join("hunt-tracker.log");
    rotate_file(&log_path);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path);

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_millis(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Ok(file) = log_file {
        dispatch = dispatch.chain(file);
    } else {
        eprintln!("Warning: could not open log file {}", log_path.display());
    }

    if let Err(e) = dispatch.apply() {
        eprintln!("Warning: failed to initialize logger: {}", e);
    }
}

/// Read one snapshot, sample it, and hand a finished quest to the sink.
fn step(
    provider: &mut dyn GameStateProvider,
    sampler: &mut Sampler,
    sink: &mut dyn RunSink,
) -> Result<TickReport> {
    let snapshot = provider.snapshot()?;
    let report = sampler.tick(&snapshot);
    if let Some(record) = &report.completed {
        for (quantity, series) in sampler.plots() {
            series.with_points(|points| {
                if let Some(last) = points.last() {
                    debug!(
                        "  {}: {} points, last {:.2} at {:.1}s",
                        quantity,
                        points.len(),
                        last.value,
                        last.elapsed_seconds
                    );
                }
            });
        }
        if let Err(e) = sink.record_run(record) {
            error!("Failed to record quest {}: {}", record.quest_id, e);
        }
    }
    Ok(report)
}

fn run_replay(path: &Path, sampler: &mut Sampler, sink: &mut dyn RunSink) -> Result<()> {
    let mut provider = ReplayProvider::open(path)?;
    replay(&mut provider, sampler, sink).map(|_| ())
}

/// Drive `provider` to the end. A malformed line skips that tick only.
/// Returns the number of runs recorded.
fn replay<R: BufRead>(
    provider: &mut ReplayProvider<R>,
    sampler: &mut Sampler,
    sink: &mut dyn RunSink,
) -> Result<usize> {
    let mut runs = 0usize;
    let mut skipped = 0usize;
    loop {
        match step(provider, sampler, sink) {
            Ok(report) => {
                if report.completed.is_some() {
                    runs += 1;
                }
            }
            Err(TrackerError::Json(e)) => {
                skipped += 1;
                warn!("Skipping malformed replay line {}: {}", provider.line(), e);
            }
            Err(TrackerError::ReplayFinished(count)) => {
                info!(
                    "Replay finished: {} snapshots, {} skipped, {} runs recorded",
                    count, skipped, runs
                );
                return Ok(runs);
            }
            Err(e) => return Err(e),
        }
    }
}

fn run_live(config: &AppConfig, sampler: &mut Sampler, sink: &mut dyn RunSink) {
    let mut provider = MemoryStateProvider::new(memory::create_reader(), config.addresses.clone());
    let interval = Duration::from_millis(config.poll_interval_ms.max(1));
    let mut failed_ticks = 0u32;
    let mut waiting_logged = false;

    if config.addresses.is_empty() {
        warn!("No addresses configured; every tick will fail until [addresses] is filled in");
    }

    loop {
        if !provider.is_attached() {
            match provider.attach_by_name(&config.process_name) {
                Ok(_) => waiting_logged = false,
                Err(e) => {
                    if !waiting_logged {
                        info!("Waiting for game process: {}", e);
                        waiting_logged = true;
                    }
                    thread::sleep(REATTACH_INTERVAL);
                    continue;
                }
            }
        }

        match step(&mut provider, sampler, sink) {
            Ok(_) => failed_ticks = 0,
            Err(e) => {
                failed_ticks += 1;
                debug!("Tick skipped: {}", e);
                if failed_ticks >= config.max_failed_ticks.max(1) {
                    error!("{} consecutive failed ticks ({}), detaching", failed_ticks, e);
                    provider.detach();
                    sampler.reset();
                    failed_ticks = 0;
                }
            }
        }

        thread::sleep(interval);
    }
}

// ─── Main ────────────────────────────────────────────────────────────

fn main() {
    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(config::config_dir);

    setup_logging(&config_dir, log::LevelFilter::Trace);
    let config = AppConfig::load(&config_path);
    log::set_max_level(if args.verbose {
        log::LevelFilter::Debug
    } else {
        config.log_level_filter()
    });

    info!("Frontier hunt tracker starting");
    info!(
        "Clock: {:?} at {} fps, {} mapped fields",
        config.clock_direction,
        config.frames_per_second,
        config.addresses.len()
    );
    debug!(
        "Mapped fields: {}",
        config.addresses.field_names().collect::<Vec<_>>().join(", ")
    );

    let mut sampler = Sampler::new(config.clock_settings());
    let mut sink = JsonRunLog::new(config.run_log_path(&config_dir));

    match &args.replay {
        Some(path) => {
            if let Err(e) = run_replay(path, &mut sampler, &mut sink) {
                error!("Replay of {} failed: {}", path.display(), e);
                std::process::exit(1);
            }
        }
        None => run_live(&config, &mut sampler, &mut sink),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hunt_tracker::{SessionRecord, Snapshot};

    #[derive(Default)]
    struct Collected(Vec<SessionRecord>);

    impl RunSink for Collected {
        fn record_run(&mut self, record: &SessionRecord) -> Result<()> {
            self.0.push(record.clone());
            Ok(())
        }
    }

    fn cleared(quest_id: u32, time: i64) -> String {
        let snapshot = Snapshot {
            player_hp: Some(300),
            quest_cleared: true,
            ..Snapshot::in_quest(quest_id, time, 3000)
        };
        serde_json::to_string(&snapshot).unwrap()
    }

    #[test]
    fn malformed_line_does_not_end_the_replay() {
        let input = [
            cleared(101, 2000),
            "{\"quest_id\": 101, truncated".to_string(),
            serde_json::to_string(&Snapshot::default()).unwrap(),
            cleared(202, 1500),
        ]
        .join("\n");
        let mut provider = ReplayProvider::from_reader(input.as_bytes());
        let mut sampler = Sampler::new(Default::default());
        let mut sink = Collected::default();

        let runs = replay(&mut provider, &mut sampler, &mut sink).unwrap();
        assert_eq!(runs, 2);
        let quests: Vec<u32> = sink.0.iter().map(|r| r.quest_id).collect();
        assert_eq!(quests, vec![101, 202]);
        assert_eq!(provider.served(), 3);
    }
}
