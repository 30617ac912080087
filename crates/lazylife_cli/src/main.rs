//! CLI entry point for the daily sweep.
//!
//! # Responsibility
//! - Run one lifecycle sweep over every stored forest of a user (actions
//!   and targets) against a SQLite database.
//! - Optionally stay alive and sweep again at every local midnight.

use clap::Parser;
use lazylife_core::db::open_db;
use lazylife_core::{
    init_logging, Clock, LifecycleProcessor, MidnightScheduler, SqliteActionTreeRepository,
    SqliteJournalRepository, SweepReport, SystemClock, TrackerSettings, Visibility,
};
use log::{error, warn};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "lazylife_cli",
    version,
    about = "Archive stale completed items into the activity journal"
)]
struct Args {
    /// SQLite database file; created and migrated when missing.
    db_path: PathBuf,
    user_id: String,
    /// IANA timezone name, e.g. `Europe/Berlin`.
    timezone: String,
    /// Keep running and sweep again at every local midnight.
    #[arg(long)]
    watch: bool,
    /// Write rolling log files into this directory.
    #[arg(long, value_name = "DIR")]
    log_dir: Option<String>,
}

/// Totals of one sweep over every stored forest of a user.
#[derive(Debug, Default, PartialEq, Eq)]
struct SweepTotals {
    forests: usize,
    items: usize,
    archived: usize,
    ghosted: usize,
}

impl SweepTotals {
    fn add(&mut self, report: &SweepReport) {
        self.forests += 1;
        self.items += report.tree.len();
        self.archived += report.archived.len();
        self.ghosted += report.ghosted.len();
    }
}

fn sweep_once(db_path: &Path, settings: &TrackerSettings) -> Result<SweepTotals, Box<dyn Error>> {
    let conn = open_db(db_path)?;
    let trees = SqliteActionTreeRepository::try_new(&conn)?;
    let journal = SqliteJournalRepository::try_new(&conn)?;
    let processor = LifecycleProcessor::new(&trees, &journal, settings.timezone);

    let mut totals = SweepTotals::default();
    for (_, report) in processor.run_all(&settings.user_id, SystemClock.now_ms())? {
        totals.add(&report);
    }

    let dates = journal.list_dates(&settings.user_id, Visibility::Public)?;
    println!(
        "sweep user={} forests={} items={} archived={} ghosted={} journal_days={}",
        settings.user_id,
        totals.forests,
        totals.items,
        totals.archived,
        totals.ghosted,
        dates.len()
    );
    Ok(totals)
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let settings = TrackerSettings::new(&args.user_id, &args.timezone)?;
    if let Some(log_dir) = &args.log_dir {
        init_logging(settings.log_level, log_dir)?;
    }

    sweep_once(&args.db_path, &settings)?;
    if !args.watch {
        return Ok(());
    }

    let mut scheduler = MidnightScheduler::new(settings.timezone);
    let db_path = args.db_path.clone();
    let job_settings = settings.clone();
    scheduler.schedule(SystemClock, move || {
        if let Err(err) = sweep_once(&db_path, &job_settings) {
            error!("event=midnight_sweep module=cli status=error error={err}");
            eprintln!("sweep failed: {err}");
        }
    });
    println!("watching for local midnight in {}", settings.timezone);
    loop {
        std::thread::park();
        warn!("event=cli_watch module=cli status=spurious_wakeup");
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("lazylife_cli: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{sweep_once, Args, SweepTotals};
    use clap::Parser;
    use lazylife_core::db::open_db;
    use lazylife_core::{
        ActionNode, ActionTree, ActionTreeRepository, Clock, SqliteActionTreeRepository,
        SystemClock, TrackerSettings, TreeKey,
    };
    use uuid::Uuid;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    #[test]
    fn parses_positional_and_flags() {
        let parsed = Args::try_parse_from([
            "lazylife_cli",
            "life.db",
            "user-1",
            "Asia/Tokyo",
            "--watch",
            "--log-dir",
            "/tmp/logs",
        ])
        .unwrap();
        assert_eq!(parsed.db_path.to_str(), Some("life.db"));
        assert_eq!(parsed.user_id, "user-1");
        assert_eq!(parsed.timezone, "Asia/Tokyo");
        assert!(parsed.watch);
        assert_eq!(parsed.log_dir.as_deref(), Some("/tmp/logs"));

        let plain = Args::try_parse_from(["lazylife_cli", "a", "b", "UTC"]).unwrap();
        assert!(!plain.watch);
        assert!(plain.log_dir.is_none());
    }

    #[test]
    fn rejects_missing_positionals_and_unknown_flags() {
        assert!(Args::try_parse_from(["lazylife_cli", "life.db", "user-1"]).is_err());
        assert!(Args::try_parse_from(["lazylife_cli", "a", "b", "c", "--verbose"]).is_err());
        assert!(Args::try_parse_from(["lazylife_cli", "a", "b", "c", "--log-dir"]).is_err());
    }

    #[test]
    fn sweep_once_covers_action_and_target_forests() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("life.db");
        let two_days_ago = SystemClock.now_ms() - 2 * DAY_MS;
        {
            let conn = open_db(&path).unwrap();
            let trees = SqliteActionTreeRepository::try_new(&conn).unwrap();
            for (key, n) in [
                (TreeKey::actions("user-1"), 1),
                (TreeKey::targets("user-1", None), 2),
            ] {
                let forest = vec![
                    ActionNode::new(Uuid::from_u128(n), "done").completed_at(two_days_ago)
                ];
                trees
                    .save_tree(&key, &ActionTree::from_forest(forest).unwrap())
                    .unwrap();
            }
        }

        let settings = TrackerSettings::new("user-1", "UTC").unwrap();
        let totals = sweep_once(&path, &settings).unwrap();
        assert_eq!(
            totals,
            SweepTotals {
                forests: 2,
                items: 0,
                archived: 2,
                ghosted: 0,
            }
        );
    }
}
